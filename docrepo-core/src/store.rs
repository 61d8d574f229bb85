//! The top-level store handle.
//!
//! A [`DocumentStore`] owns exactly one backend and hands out typed
//! [`Repository`] instances borrowing it. Repositories are cheap to create
//! and to clone; there is no caching layer between them and the backend.
//! The backend sits behind an [`Arc`] so batch cursors can hold their own
//! handle for spawned fetches.

use std::sync::Arc;

use log::warn;

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::Document,
    error::RepositoryResult,
    repository::Repository,
};

/// Owns a backend and produces typed repositories over its collections.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: Arc<B>,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Wraps an already-constructed backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Builds the backend through its builder and wraps it.
    pub async fn open<Builder>(builder: Builder) -> RepositoryResult<Self>
    where
        Builder: StoreBackendBuilder<Backend = B>,
    {
        Ok(Self::new(builder.build().await?))
    }

    /// A typed repository over `D`'s collection.
    pub fn repository<D: Document>(&self) -> Repository<'_, B, D> {
        Repository::new(&self.backend)
    }

    /// Direct access to the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates an empty collection.
    pub async fn create_collection(&self, name: &str) -> RepositoryResult<()> {
        self.backend.create_collection(name).await
    }

    /// Drops a collection and everything in it.
    pub async fn drop_collection(&self, name: &str) -> RepositoryResult<()> {
        self.backend.drop_collection(name).await
    }

    /// Lists the names of all collections in the store.
    pub async fn list_collections(&self) -> RepositoryResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Shuts the backend down, releasing its resources. Outstanding
    /// repositories must be dropped first; the borrow checker enforces it.
    /// A batch cursor still alive holds its own backend handle, in which
    /// case shutdown is skipped and logged.
    pub async fn shutdown(self) -> RepositoryResult<()> {
        match Arc::into_inner(self.backend) {
            Some(backend) => backend.shutdown().await,
            None => {
                warn!("backend still has live cursor handles, skipping shutdown");
                Ok(())
            }
        }
    }
}
