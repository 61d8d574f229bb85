//! Lazy, batched streaming over large result sets.
//!
//! A [`BatchCursor`] pages through a filtered collection with limit/skip
//! queries of a fixed batch size, keeping one fetch in flight ahead of
//! consumption: each page query is spawned as a Tokio task the moment the
//! previous page arrives, so the store works on batch N+1 while the
//! consumer drains batch N. The stream ends cleanly when a fetch returns
//! fewer documents than the batch size.
//!
//! Deletions or insertions that land between two fetches can shift the
//! skip window, so a concurrently-mutated collection may yield duplicates
//! or gaps. Pass an ordering over a stable field to make the pages
//! deterministic.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use bson::Bson;
use log::warn;
use tokio::task::JoinHandle;

use crate::{
    backend::StoreBackend,
    document::{Document, DocumentExt},
    error::{RepositoryError, RepositoryResult},
    query::{Expr, Query, Sort},
};

/// Upper bound on fetches per stream, against runaway paging loops. At
/// the cap the stream ends as if the collection were exhausted.
const MAX_BATCHES: usize = 10_000;

/// A prefetching cursor over one collection's matching documents.
///
/// Obtained from
/// [`Repository::filter_in_batch`](crate::repository::Repository::filter_in_batch);
/// always starts from the beginning of the result set. Must be created
/// and driven inside a Tokio runtime, since fetches run as spawned
/// tasks.
pub struct BatchCursor<B: StoreBackend, D: Document> {
    backend: Arc<B>,
    collection: String,
    filter: Option<Expr>,
    sort: Option<Sort>,
    batch_size: usize,
    buffer: VecDeque<Bson>,
    lookahead: Option<JoinHandle<RepositoryResult<Vec<Bson>>>>,
    batches_fetched: usize,
    offset: usize,
    exhausted: bool,
    _marker: PhantomData<fn() -> D>,
}

impl<B: StoreBackend, D: Document> BatchCursor<B, D> {
    pub(crate) fn new(
        backend: Arc<B>,
        collection: String,
        filter: Option<Expr>,
        sort: Option<Sort>,
        batch_size: usize,
    ) -> Self {
        let mut cursor = Self {
            backend,
            collection,
            filter,
            sort,
            batch_size: batch_size.max(1),
            buffer: VecDeque::new(),
            lookahead: None,
            batches_fetched: 0,
            offset: 0,
            exhausted: false,
            _marker: PhantomData,
        };
        cursor.lookahead = Some(cursor.spawn_fetch());

        cursor
    }

    /// Spawns the fetch for the page at the current offset. The task owns
    /// its backend handle and query, so it makes progress independently of
    /// the cursor being polled.
    fn spawn_fetch(&self) -> JoinHandle<RepositoryResult<Vec<Bson>>> {
        let query = Query {
            filter: self.filter.clone(),
            limit: Some(self.batch_size),
            skip: Some(self.offset),
            sort: self.sort.clone(),
            projection: None,
        };
        let backend = Arc::clone(&self.backend);
        let collection = self.collection.clone();

        tokio::spawn(async move { backend.query_documents(query, &collection).await })
    }

    /// Yields the next document, awaiting the in-flight batch when the
    /// current one runs dry. Returns `None` once the result set is
    /// exhausted; a fetch or deserialization error ends the stream after
    /// being yielded.
    pub async fn next(&mut self) -> Option<RepositoryResult<D>> {
        loop {
            if let Some(bson) = self.buffer.pop_front() {
                return Some(D::from_bson(bson));
            }
            if self.exhausted {
                return None;
            }

            let fetch = match self.lookahead.take() {
                Some(fetch) => fetch,
                None => self.spawn_fetch(),
            };
            let batch = match fetch.await {
                Ok(Ok(batch)) => batch,
                Ok(Err(err)) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(RepositoryError::Backend(err.to_string())));
                }
            };

            self.batches_fetched += 1;
            self.offset += batch.len();

            if batch.len() < self.batch_size {
                self.exhausted = true;
            } else if self.batches_fetched >= MAX_BATCHES {
                warn!(
                    "cursor on '{}' hit the batch cap after {} documents",
                    self.collection, self.offset
                );
                self.exhausted = true;
            } else {
                self.lookahead = Some(self.spawn_fetch());
            }

            self.buffer.extend(batch);
        }
    }

    /// Drains the remaining stream into a vector, stopping at the first
    /// error.
    pub async fn collect(mut self) -> RepositoryResult<Vec<D>> {
        let mut documents = Vec::new();
        while let Some(next) = self.next().await {
            documents.push(next?);
        }

        Ok(documents)
    }
}

impl<B: StoreBackend, D: Document> Drop for BatchCursor<B, D> {
    fn drop(&mut self) {
        if let Some(fetch) = self.lookahead.take() {
            fetch.abort();
        }
    }
}

impl<B: StoreBackend, D: Document> std::fmt::Debug for BatchCursor<B, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCursor")
            .field("collection", &self.collection)
            .field("batch_size", &self.batch_size)
            .field("buffered", &self.buffer.len())
            .field("batches_fetched", &self.batches_fetched)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
