//! The typed repository facade.
//!
//! A [`Repository`] binds one document type to one backend collection and
//! composes the rest of the core: identity assignment and audit stamping
//! on writes, filtered queries, unordered bulk writes, projection into
//! views, batched streaming, transaction buffering, and index
//! reconciliation. It holds nothing but the immutable backend handle and
//! the collection name, so instances are cheap and share-nothing across
//! calls.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::warn;

use crate::{
    backend::{BulkOp, StoreBackend},
    buffer::TransactionBuffer,
    cursor::BatchCursor,
    document::{Document, DocumentExt},
    error::{RepositoryError, RepositoryResult},
    id::DocumentId,
    index::{apply_plan, reconcile},
    projection::{ProjectionMapper, View},
    query::{Expr, Query, Sort},
};

/// Pause after a first insert before returning, to tolerate
/// eventual-consistency read-after-write windows on the backing store.
const SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Typed access to one collection through a backend reference.
#[derive(Debug)]
pub struct Repository<'a, B: StoreBackend, D: Document> {
    name: String,
    backend: &'a Arc<B>,
    _marker: PhantomData<fn() -> D>,
}

impl<'a, B: StoreBackend, D: Document> Clone for Repository<'a, B, D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            backend: self.backend,
            _marker: PhantomData,
        }
    }
}

impl<'a, B: StoreBackend, D: Document> Repository<'a, B, D> {
    pub(crate) fn new(backend: &'a Arc<B>) -> Self {
        Self {
            name: D::collection_name().to_string(),
            backend,
            _marker: PhantomData,
        }
    }

    /// Returns the name of the backing collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derives an identifier for a not-yet-persisted document: from the
    /// alternate key when the type supplies one, otherwise fresh random.
    fn derive_id(document: &D) -> RepositoryResult<DocumentId> {
        match document.alternate_key() {
            Some(key) => DocumentId::from_alternate_key(&key),
            None => Ok(DocumentId::generate()),
        }
    }

    /// Persists a document with upsert-by-id (replace, not merge) semantics.
    ///
    /// An empty id marks a first persist: the id is derived, both audit
    /// timestamps are set to now, and after the write a short settle delay
    /// is applied before returning. A non-empty id only refreshes
    /// `updated_at`; `created_at` and the id itself are never touched
    /// again.
    pub async fn insert_or_update(&self, document: &mut D) -> RepositoryResult<()> {
        let now = Utc::now();
        let first_persist = document.id().is_empty();

        if first_persist {
            document.set_id(Self::derive_id(document)?);
            document.set_created_at(now);
        }
        document.set_updated_at(now);

        self.backend
            .upsert_document(*document.id(), document.to_bson()?, &self.name)
            .await?;

        if first_persist {
            tokio::time::sleep(SETTLE_DELAY).await;
        }

        Ok(())
    }

    /// Best-effort variant of [`insert_or_update`](Self::insert_or_update):
    /// every error is swallowed. For call sites that tolerate eventual
    /// convergence over durability.
    pub async fn try_insert_or_update(&self, document: &mut D) {
        if let Err(err) = self.insert_or_update(document).await {
            warn!(
                "suppressed write failure on '{}': {}",
                self.name, err
            );
        }
    }

    /// Persists a batch in one unordered bulk round trip.
    ///
    /// Documents with an empty id are prepared as inserts (id derived,
    /// both timestamps set); the rest become full replacements with a
    /// refreshed `updated_at`. Unordered execution means one failing entry
    /// does not block the others.
    pub async fn insert_or_update_multiple(&self, documents: &mut [D]) -> RepositoryResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let mut ops = Vec::with_capacity(documents.len());

        for document in documents.iter_mut() {
            if document.id().is_empty() {
                document.set_id(Self::derive_id(document)?);
                document.set_created_at(now);
                document.set_updated_at(now);
                ops.push(BulkOp::Insert {
                    id: *document.id(),
                    document: document.to_bson()?,
                });
            } else {
                document.set_updated_at(now);
                ops.push(BulkOp::Replace {
                    id: *document.id(),
                    document: document.to_bson()?,
                });
            }
        }

        self.backend.bulk_write(ops, &self.name).await
    }

    /// Persists an arbitrarily large batch in fixed-size chunks, with an
    /// optional sleep between chunks to throttle load on the store.
    pub async fn insert_or_update_multiple_in_batch(
        &self,
        documents: &mut [D],
        batch_size: usize,
        delay: Option<Duration>,
    ) -> RepositoryResult<()> {
        let batch_size = batch_size.max(1);
        let last = documents.len().div_ceil(batch_size).saturating_sub(1);

        for (index, chunk) in documents.chunks_mut(batch_size).enumerate() {
            self.insert_or_update_multiple(chunk).await?;

            if index < last {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Ok(())
    }

    /// Bulk-deletes by identifier in one unordered round trip.
    pub(crate) async fn delete_by_ids(&self, ids: &[DocumentId]) -> RepositoryResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let ops = ids
            .iter()
            .map(|id| BulkOp::Delete { id: *id })
            .collect();

        self.backend.bulk_write(ops, &self.name).await
    }

    /// Runs a query against the collection. Absent modifiers on the query
    /// mean store defaults: no skip, no limit, natural order.
    pub async fn filter_by(&self, query: Query) -> RepositoryResult<Vec<D>> {
        self.backend
            .query_documents(query, &self.name)
            .await?
            .into_iter()
            .map(D::from_bson)
            .collect()
    }

    /// Fetches a single document by identifier.
    pub async fn find_by_id(&self, id: &DocumentId) -> RepositoryResult<Option<D>> {
        let mut found = self
            .backend
            .get_documents(vec![*id], &self.name)
            .await?;

        match found.pop() {
            Some(bson) => Ok(Some(D::from_bson(bson)?)),
            None => Ok(None),
        }
    }

    /// Returns the first document matching the filter, if any.
    pub async fn find_one(&self, filter: Expr) -> RepositoryResult<Option<D>> {
        let query = Query::builder().filter(filter).limit(1).build();
        let mut found = self.backend.query_documents(query, &self.name).await?;

        match found.pop() {
            Some(bson) => Ok(Some(D::from_bson(bson)?)),
            None => Ok(None),
        }
    }

    /// Counts documents matching the filter; `None` counts everything.
    pub async fn count(&self, filter: Option<Expr>) -> RepositoryResult<u64> {
        self.backend.count_documents(filter, &self.name).await
    }

    /// Deletes the first document matching the filter. Returns whether a
    /// record was removed.
    pub async fn delete_one(&self, filter: Expr) -> RepositoryResult<bool> {
        self.backend
            .delete_one_document(Some(filter), &self.name)
            .await
    }

    /// Deletes every document matching the filter and returns the count of
    /// removed records.
    pub async fn delete_many(&self, filter: Expr) -> RepositoryResult<u64> {
        self.backend
            .delete_documents(Some(filter), &self.name)
            .await
    }

    /// Deletes every document in the collection and returns the count.
    pub async fn delete_all(&self) -> RepositoryResult<u64> {
        self.backend.delete_documents(None, &self.name).await
    }

    /// Projects the whole collection into view `V`.
    pub async fn project_all<V: View>(&self) -> RepositoryResult<Vec<V>> {
        self.project_filter_by(Query::new()).await
    }

    /// Projects the documents matching a query into view `V`.
    ///
    /// The query's projection is overwritten with the server-side field
    /// selection derived from the view's mapping (identifier always
    /// included), so only the mapped fields travel over the network.
    pub async fn project_filter_by<V: View>(&self, mut query: Query) -> RepositoryResult<Vec<V>> {
        let mapper = ProjectionMapper::<V>::prepare();
        query.projection = Some(mapper.projection());

        self.backend
            .query_documents(query, &self.name)
            .await?
            .iter()
            .map(|bson| {
                let doc = bson.as_document().ok_or_else(|| {
                    RepositoryError::InvalidDocument("expected a document".to_string())
                })?;
                mapper.materialize(doc)
            })
            .collect()
    }

    /// Streams matching documents lazily in prefetched batches. Must be
    /// called inside a Tokio runtime; the cursor spawns its page fetches.
    ///
    /// Each call starts a fresh stream from the beginning; a stream cannot
    /// be resumed mid-way. See [`BatchCursor`] for the prefetch and
    /// termination rules.
    pub fn filter_in_batch(
        &self,
        filter: Option<Expr>,
        batch_size: usize,
        order_by: Option<Sort>,
    ) -> BatchCursor<B, D> {
        BatchCursor::new(
            Arc::clone(self.backend),
            self.name.clone(),
            filter,
            order_by,
            batch_size,
        )
    }

    /// Creates a write buffer bound to this repository with the given
    /// flush threshold.
    pub fn create_transaction_manager(&self, threshold: usize) -> TransactionBuffer<'a, B, D> {
        TransactionBuffer::new(self.clone(), threshold)
    }

    /// Converges the store's live indexes onto this type's declared
    /// intents: missing intents are created (ascending, with the declared
    /// uniqueness), unmatched live indexes are dropped. Idempotent.
    pub async fn configure_indexes(&self) -> RepositoryResult<()> {
        let live = self.backend.list_indexes(&self.name).await?;
        let plan = reconcile(&D::indexes(), &live);

        apply_plan(self.backend.as_ref(), &self.name, plan).await
    }
}
