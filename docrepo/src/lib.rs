//! Typed document repositories over pluggable storage backends.
//!
//! This crate is the primary entry point for users of the docrepo
//! workspace. It re-exports the core modules and provides convenient
//! access to the storage backends.
//!
//! # Features
//!
//! - **Type-safe repositories** - Define your data structures with Serde
//!   and access them through a per-collection facade
//! - **Multiple backends** - In-memory and MongoDB storage behind one
//!   trait, extensible to others
//! - **Buffered writes** - Threshold-triggered bulk flushing through a
//!   transaction buffer
//! - **Projections** - Declarative mapping of stored documents into
//!   narrower view types
//! - **Index reconciliation** - Declared index intents converged onto the
//!   live store
//! - **Batched streaming** - Prefetching cursors for large result sets
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::MemoryStore};
//! use chrono::{DateTime, Utc};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: DocumentId,
//!     pub name: String,
//!     pub created_at: Option<DateTime<Utc>>,
//!     pub updated_at: Option<DateTime<Utc>>,
//! }
//!
//! impl Document for User {
//!     fn id(&self) -> &DocumentId { &self.id }
//!     fn set_id(&mut self, id: DocumentId) { self.id = id; }
//!     fn created_at(&self) -> Option<DateTime<Utc>> { self.created_at }
//!     fn set_created_at(&mut self, at: DateTime<Utc>) { self.created_at = Some(at); }
//!     fn updated_at(&self) -> Option<DateTime<Utc>> { self.updated_at }
//!     fn set_updated_at(&mut self, at: DateTime<Utc>) { self.updated_at = Some(at); }
//!     fn collection_name() -> &'static str { "users" }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = DocumentStore::new(MemoryStore::new());
//!     let users = store.repository::<User>();
//!
//!     let mut user = User {
//!         id: DocumentId::empty(),
//!         name: "Alice".to_string(),
//!         created_at: None,
//!         updated_at: None,
//!     };
//!     users.insert_or_update(&mut user).await.unwrap();
//!
//!     let found = users
//!         .filter_by(Query::builder().filter(Filter::eq("name", "Alice")).build())
//!         .await
//!         .unwrap();
//!     println!("Queried users: {:?}", found);
//!
//!     drop(users);
//!     store.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docrepo_core::{
    backend, buffer, cursor, document, error, id, index, projection, query, repository, store,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docrepo_memory::{MemoryStore, MemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docrepo_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
