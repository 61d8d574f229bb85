//! Write buffering with threshold-triggered flushing.
//!
//! A [`TransactionBuffer`] accumulates staged writes in memory and
//! periodically flushes them to the store as bulk operations, trading
//! per-operation round trips for batched ones. Despite the name there is
//! no transactional isolation or rollback; a flush is up to three
//! independent bulk phases (inserts, updates, deletes) and a failure in
//! one phase does not undo the others.
//!
//! Staged state lives in three containers: a list of not-yet-persisted
//! inserts, an update map keyed by identifier with last-write-wins
//! collapsing, and a list of identifiers to delete. The flush trigger
//! counts inserts plus deletes; staged updates do not advance it.
//!
//! A buffer is a companion to one [`Repository`] and goes through it for
//! every write, so buffered documents still receive identity assignment
//! and audit stamping on the way out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use mea::rwlock::RwLock;

use crate::{
    backend::StoreBackend,
    document::Document,
    error::RepositoryResult,
    id::DocumentId,
    repository::Repository,
};

/// Accumulates writes for a single collection and flushes them in bulk.
pub struct TransactionBuffer<'a, B: StoreBackend, D: Document> {
    repository: Repository<'a, B, D>,
    inserts: RwLock<Vec<D>>,
    updates: RwLock<HashMap<DocumentId, D>>,
    deletes: RwLock<Vec<DocumentId>>,
    threshold: AtomicUsize,
}

impl<'a, B: StoreBackend, D: Document> TransactionBuffer<'a, B, D> {
    pub(crate) fn new(repository: Repository<'a, B, D>, threshold: usize) -> Self {
        Self {
            repository,
            inserts: RwLock::new(Vec::new()),
            updates: RwLock::new(HashMap::new()),
            deletes: RwLock::new(Vec::new()),
            threshold: AtomicUsize::new(threshold.max(1)),
        }
    }

    /// Stages a write and runs a threshold check.
    ///
    /// Documents without an identifier are queued as inserts; identified
    /// documents land in the update map, where a later staging of the same
    /// id replaces the earlier one. Only a staged insert can advance the
    /// trigger count, so a buffer holding nothing but updates sits until
    /// [`finish`](Self::finish).
    pub async fn stage_insert_or_update(&self, document: D) -> RepositoryResult<()> {
        if document.id().is_empty() {
            self.inserts.write().await.push(document);
        } else {
            self.updates.write().await.insert(*document.id(), document);
        }

        self.flush(false).await
    }

    /// Stages a deletion and forces a flush attempt.
    ///
    /// A document with an empty identifier was never persisted and is
    /// ignored. The forced flush still obeys the insert-gate: with no
    /// staged inserts, everything (this deletion included) stays
    /// buffered.
    pub async fn stage_delete(&self, document: &D) -> RepositoryResult<()> {
        let id = *document.id();
        if id.is_empty() {
            return Ok(());
        }

        self.deletes.write().await.push(id);
        self.flush(true).await
    }

    /// Flushes everything still staged. Call before dropping the buffer;
    /// staged writes do not survive it.
    pub async fn finish(&self) -> RepositoryResult<()> {
        self.flush(true).await
    }

    /// Number of staged operations counted against the threshold
    /// (inserts plus deletes).
    pub async fn pending(&self) -> usize {
        self.inserts.read().await.len() + self.deletes.read().await.len()
    }

    /// Replaces the flush threshold. Takes effect on the next staging.
    pub fn set_threshold(&self, threshold: usize) {
        self.threshold.store(threshold.max(1), Ordering::Relaxed);
    }

    /// Disables threshold-triggered flushing; only forced flushes
    /// ([`stage_delete`](Self::stage_delete), [`finish`](Self::finish))
    /// write anything out.
    pub fn disable_threshold(&self) {
        self.threshold.store(usize::MAX, Ordering::Relaxed);
    }

    /// Drains the staged state and dispatches it as bulk writes.
    ///
    /// A non-forced flush returns early while the trigger count is below
    /// the threshold. Either way, nothing happens while the insert list is
    /// empty; updates and deletes wait for the next flush that has inserts
    /// to carry them. The three phases run in order (inserts, updates,
    /// deletes) with no atomicity across them.
    async fn flush(&self, forced: bool) -> RepositoryResult<()> {
        if !forced && self.pending().await < self.threshold.load(Ordering::Relaxed) {
            return Ok(());
        }

        let mut inserts = self.inserts.write().await;
        if inserts.is_empty() {
            return Ok(());
        }

        let mut updates = self.updates.write().await;
        let mut deletes = self.deletes.write().await;

        let mut insert_batch: Vec<D> = std::mem::take(&mut *inserts);
        let mut update_batch: Vec<D> = updates.drain().map(|(_, doc)| doc).collect();
        let delete_batch: Vec<DocumentId> = std::mem::take(&mut *deletes);

        drop(inserts);
        drop(updates);
        drop(deletes);

        debug!(
            "flushing buffer for '{}': {} inserts, {} updates, {} deletes",
            self.repository.name(),
            insert_batch.len(),
            update_batch.len(),
            delete_batch.len()
        );

        self.repository
            .insert_or_update_multiple(&mut insert_batch)
            .await?;
        self.repository
            .insert_or_update_multiple(&mut update_batch)
            .await?;
        self.repository.delete_by_ids(&delete_batch).await?;

        Ok(())
    }
}

impl<B: StoreBackend, D: Document> std::fmt::Debug for TransactionBuffer<'_, B, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionBuffer")
            .field("collection", &self.repository.name())
            .field("threshold", &self.threshold.load(Ordering::Relaxed))
            .finish()
    }
}
