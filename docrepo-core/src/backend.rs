//! The database-handle collaborator behind every repository.
//!
//! [`StoreBackend`] is the opaque set of primitives the core dispatches to:
//! single upserts, unordered bulk writes, queries and cursor-style paging
//! (expressed through [`Query`] limit/skip), counting, deletion, and the
//! index surface the reconciler converges. Implementations must be
//! thread-safe (`Send + Sync`) and are expected to own their own timeout
//! and cancellation policy; the core defines neither.
//!
//! Suspension points are exactly the network round trips. Operations
//! return [`RepositoryResult`]; backend failures are surfaced unmodified.

use async_trait::async_trait;
use bson::Bson;
use std::fmt::Debug;

use crate::{
    error::RepositoryResult,
    id::DocumentId,
    index::IndexRecord,
    query::{Expr, Query},
};

/// One entry of an unordered bulk write.
///
/// `Insert` and `Replace` both carry replace-or-insert (upsert-by-id)
/// semantics on the wire; the distinction exists so backends can map them
/// to their native insert vs. replace operations. Unordered execution
/// means one failing entry does not block the others from applying, and
/// partial application is possible.
#[derive(Debug, Clone)]
pub enum BulkOp {
    /// A first-time insert of a freshly-identified document.
    Insert { id: DocumentId, document: Bson },
    /// A full replacement of an already-persisted document.
    Replace { id: DocumentId, document: Bson },
    /// Removal by identifier; missing ids are silently skipped.
    Delete { id: DocumentId },
}

/// Abstract interface to a document database, scoped per call to a named
/// collection.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug + 'static {
    /// Replace-or-insert a single document keyed by id, in one atomic
    /// server-side operation.
    async fn upsert_document(
        &self,
        id: DocumentId,
        document: Bson,
        collection: &str,
    ) -> RepositoryResult<()>;

    /// Executes a mixed batch of insert/replace/delete operations in a
    /// single unordered round trip.
    async fn bulk_write(&self, ops: Vec<BulkOp>, collection: &str) -> RepositoryResult<()>;

    /// Fetches documents by id. Ids without a stored document are omitted
    /// from the result; order is not guaranteed to match the request.
    async fn get_documents(
        &self,
        ids: Vec<DocumentId>,
        collection: &str,
    ) -> RepositoryResult<Vec<Bson>>;

    /// Runs a query (filter, limit, skip, sort, projection) and returns
    /// the matching documents.
    async fn query_documents(&self, query: Query, collection: &str)
    -> RepositoryResult<Vec<Bson>>;

    /// Counts documents matching the filter; `None` counts the whole
    /// collection.
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> RepositoryResult<u64>;

    /// Deletes the first document matching the filter. Returns whether a
    /// document was removed.
    async fn delete_one_document(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> RepositoryResult<bool>;

    /// Deletes every document matching the filter (`None` deletes all) and
    /// returns the number removed.
    async fn delete_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> RepositoryResult<u64>;

    /// Lists the live indexes of a collection, including the primary-key
    /// index. The reconciler filters the primary out; backends report what
    /// the store reports.
    async fn list_indexes(&self, collection: &str) -> RepositoryResult<Vec<IndexRecord>>;

    /// Creates an ascending single-field index, optionally unique.
    async fn create_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> RepositoryResult<()>;

    /// Drops an index by its full remote name.
    async fn drop_index(&self, collection: &str, name: &str) -> RepositoryResult<()>;

    /// Creates an empty collection with the given name.
    async fn create_collection(&self, name: &str) -> RepositoryResult<()>;

    /// Drops a collection and all its documents.
    async fn drop_collection(&self, name: &str) -> RepositoryResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> RepositoryResult<Vec<String>>;

    /// Cleanly shuts down the backend, releasing connections and other
    /// resources. Default is a no-op.
    async fn shutdown(self) -> RepositoryResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Factory trait for constructing backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> RepositoryResult<Self::Backend>;
}
