//! In-memory storage backend for docrepo.
//!
//! A thread-safe implementation of the core `StoreBackend` trait that
//! keeps everything in process memory behind async-aware read-write
//! locks. Intended for development, testing and small datasets; it scans
//! collections on every query and never enforces index uniqueness.
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo_core::store::DocumentStore;
//! use docrepo_memory::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(MemoryStore::new());
//!     let users = store.repository::<User>();
//!
//!     let mut user = User::new("Alice");
//!     users.insert_or_update(&mut user).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_memory;

pub mod evaluator;
pub mod store;

pub use store::{MemoryStore, MemoryStoreBuilder};
