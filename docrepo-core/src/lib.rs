//! Core of the docrepo data-access layer: typed repositories over a
//! pluggable document store.
//!
//! The crate is backend-agnostic and provides:
//!
//! - **Document traits** ([`document`]) - Identity, audit timestamps and
//!   serialization for stored types
//! - **Store backend abstraction** ([`backend`]) - The primitive surface a
//!   database driver implements
//! - **Query API** ([`query`]) - Filter expressions and query modifiers
//! - **Repositories** ([`repository`]) - Typed CRUD, bulk writes and
//!   projections per collection
//! - **Write buffering** ([`buffer`]) - Threshold-triggered bulk flushing
//! - **Batched streaming** ([`cursor`]) - Prefetching page-by-page reads
//! - **Projections** ([`projection`]) - Declarative mapping into view types
//! - **Index reconciliation** ([`index`]) - Convergence of declared index
//!   intents onto the live store
//! - **Error handling** ([`error`]) - The crate-wide error and result types
//!
//! # Example
//!
//! ```ignore
//! use docrepo_core::{document::Document, store::DocumentStore};
//!
//! let store = DocumentStore::new(backend);
//! let users = store.repository::<User>();
//! users.configure_indexes().await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_core;

pub mod backend;
pub mod buffer;
pub mod cursor;
pub mod document;
pub mod error;
pub mod id;
pub mod index;
pub mod projection;
pub mod query;
pub mod repository;
pub mod store;
