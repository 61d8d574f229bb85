//! In-memory storage backend.
//!
//! Stores documents as BSON values in ordered maps behind an async-aware
//! read-write lock. Documents within a collection are keyed by their hex
//! identifier, so unsorted scans come back in identifier order; since
//! identifiers are time-prefixed, that approximates insertion order and
//! keeps limit/skip paging stable across separate calls.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use bson::Bson;
use mea::rwlock::RwLock;

use docrepo_core::{
    backend::{BulkOp, StoreBackend, StoreBackendBuilder},
    error::{RepositoryError, RepositoryResult},
    id::DocumentId,
    index::{IndexRecord, PRIMARY_INDEX_NAME},
    query::{Expr, Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator};

/// One collection's documents plus its secondary-index records.
#[derive(Default, Debug)]
struct CollectionState {
    /// Documents keyed by hex identifier; iteration order is key order.
    documents: BTreeMap<String, Bson>,
    indexes: Vec<IndexRecord>,
}

type StoreMap = HashMap<String, CollectionState>;

/// Thread-safe in-memory document storage backend.
///
/// Cloneable; clones share the same underlying data. Queries scan every
/// document in the collection, and index records are bookkeeping only (no
/// lookup acceleration, no uniqueness enforcement), which is fine for
/// development and tests but not for large datasets.
///
/// # Example
///
/// ```ignore
/// use docrepo_memory::MemoryStore;
/// use docrepo_core::store::DocumentStore;
///
/// let store = DocumentStore::new(MemoryStore::new());
/// let users = store.repository::<User>();
/// ```
#[derive(Default, Clone, Debug)]
pub struct MemoryStore {
    store: Arc<RwLock<StoreMap>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder
    }

    /// Retains only the projected fields of a document, when the query
    /// carries a projection.
    fn apply_projection(bson: &Bson, projection: Option<&Vec<String>>) -> Bson {
        let Some(fields) = projection else {
            return bson.clone();
        };
        let Some(doc) = bson.as_document() else {
            return bson.clone();
        };

        let projected = doc
            .iter()
            .filter(|(key, _)| fields.iter().any(|field| field == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<bson::Document>();

        Bson::Document(projected)
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn upsert_document(
        &self,
        id: DocumentId,
        document: Bson,
        collection: &str,
    ) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        store
            .entry(collection.to_string())
            .or_default()
            .documents
            .insert(id.to_hex(), document);

        Ok(())
    }

    async fn bulk_write(&self, ops: Vec<BulkOp>, collection: &str) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        let state = store.entry(collection.to_string()).or_default();

        for op in ops {
            match op {
                BulkOp::Insert { id, document } | BulkOp::Replace { id, document } => {
                    state.documents.insert(id.to_hex(), document);
                }
                BulkOp::Delete { id } => {
                    state.documents.remove(&id.to_hex());
                }
            }
        }

        Ok(())
    }

    async fn get_documents(
        &self,
        ids: Vec<DocumentId>,
        collection: &str,
    ) -> RepositoryResult<Vec<Bson>> {
        let store = self.store.read().await;
        let Some(state) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = state.documents.get(&id.to_hex()) {
                documents.push(doc.clone());
            }
        }

        Ok(documents)
    }

    async fn query_documents(&self, query: Query, collection: &str) -> RepositoryResult<Vec<Bson>> {
        let store = self.store.read().await;
        let Some(state) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut matched: Vec<&Bson> = match &query.filter {
            Some(filter) => state
                .documents
                .values()
                .filter(|doc| DocumentEvaluator::matches(doc, filter))
                .collect(),
            None => state.documents.values().collect(),
        };

        if let Some(sort) = &query.sort {
            matched.sort_by(|a, b| {
                let left = a
                    .as_document()
                    .and_then(|doc| doc.get(&sort.field))
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);
                let right = b
                    .as_document()
                    .and_then(|doc| doc.get(&sort.field))
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);

                match sort.direction {
                    SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
                    SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
                }
            });
        }

        Ok(matched
            .into_iter()
            .skip(query.skip.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|doc| Self::apply_projection(doc, query.projection.as_ref()))
            .collect())
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> RepositoryResult<u64> {
        let store = self.store.read().await;
        let Some(state) = store.get(collection) else {
            return Ok(0);
        };

        let count = match &filter {
            Some(filter) => state
                .documents
                .values()
                .filter(|doc| DocumentEvaluator::matches(doc, filter))
                .count(),
            None => state.documents.len(),
        };

        Ok(count as u64)
    }

    async fn delete_one_document(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> RepositoryResult<bool> {
        let mut store = self.store.write().await;
        let Some(state) = store.get_mut(collection) else {
            return Ok(false);
        };

        let key = state
            .documents
            .iter()
            .find(|(_, doc)| match &filter {
                Some(filter) => DocumentEvaluator::matches(doc, filter),
                None => true,
            })
            .map(|(key, _)| key.clone());

        match key {
            Some(key) => {
                state.documents.remove(&key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> RepositoryResult<u64> {
        let mut store = self.store.write().await;
        let Some(state) = store.get_mut(collection) else {
            return Ok(0);
        };

        match &filter {
            Some(filter) => {
                let keys: Vec<String> = state
                    .documents
                    .iter()
                    .filter(|(_, doc)| DocumentEvaluator::matches(doc, filter))
                    .map(|(key, _)| key.clone())
                    .collect();

                for key in &keys {
                    state.documents.remove(key);
                }

                Ok(keys.len() as u64)
            }
            None => {
                let count = state.documents.len() as u64;
                state.documents.clear();

                Ok(count)
            }
        }
    }

    async fn list_indexes(&self, collection: &str) -> RepositoryResult<Vec<IndexRecord>> {
        let store = self.store.read().await;

        let mut records = vec![IndexRecord::new(PRIMARY_INDEX_NAME, true)];
        if let Some(state) = store.get(collection) {
            records.extend(state.indexes.iter().cloned());
        }

        Ok(records)
    }

    async fn create_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        let state = store.entry(collection.to_string()).or_default();

        let name = format!("{field}_1");
        state.indexes.retain(|record| record.name != name);
        state.indexes.push(IndexRecord::new(name, unique));

        Ok(())
    }

    async fn drop_index(&self, collection: &str, name: &str) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        let Some(state) = store.get_mut(collection) else {
            return Err(RepositoryError::CollectionNotFound(collection.to_string()));
        };

        state.indexes.retain(|record| record.name != name);

        Ok(())
    }

    async fn create_collection(&self, name: &str) -> RepositoryResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> RepositoryResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(RepositoryError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> RepositoryResult<Vec<String>> {
        Ok(self.store.read().await.keys().cloned().collect())
    }
}

/// Builder for [`MemoryStore`] instances. Construction cannot fail; the
/// builder exists so the memory backend fits the same
/// [`StoreBackendBuilder`] opening path as remote ones.
#[derive(Default)]
pub struct MemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for MemoryStoreBuilder {
    type Backend = MemoryStore;

    async fn build(self) -> RepositoryResult<Self::Backend> {
        Ok(MemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docrepo_core::query::{Filter, Sort};

    fn stored(name: &str, age: i32) -> Bson {
        Bson::Document(doc! { "name": name, "age": age })
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = MemoryStore::new();
        let id = DocumentId::generate();

        store
            .upsert_document(id, stored("Alice", 30), "users")
            .await
            .unwrap();

        let docs = store.get_documents(vec![id], "users").await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn query_respects_projection() {
        let store = MemoryStore::new();
        store
            .upsert_document(DocumentId::generate(), stored("Alice", 30), "users")
            .await
            .unwrap();

        let query = Query::builder()
            .projection(vec!["name".to_string()])
            .build();
        let docs = store.query_documents(query, "users").await.unwrap();

        let doc = docs[0].as_document().unwrap();
        assert!(doc.get("name").is_some());
        assert!(doc.get("age").is_none());
    }

    #[tokio::test]
    async fn unsorted_scans_come_back_in_id_order() {
        let store = MemoryStore::new();
        for n in 0..10 {
            store
                .upsert_document(DocumentId::generate(), stored("user", n), "users")
                .await
                .unwrap();
        }

        let query = Query::builder().limit(3).skip(2).build();
        let docs = store.query_documents(query, "users").await.unwrap();
        let ages: Vec<i32> = docs
            .iter()
            .map(|d| d.as_document().unwrap().get_i32("age").unwrap())
            .collect();

        // Fresh ids are generated in increasing order, so id order is
        // insertion order here.
        assert_eq!(ages, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn sorted_query_orders_by_field() {
        let store = MemoryStore::new();
        for (name, age) in [("c", 3), ("a", 1), ("b", 2)] {
            store
                .upsert_document(DocumentId::generate(), stored(name, age), "users")
                .await
                .unwrap();
        }

        let query = Query {
            sort: Some(Sort::desc("age")),
            ..Query::default()
        };
        let docs = store.query_documents(query, "users").await.unwrap();
        let ages: Vec<i32> = docs
            .iter()
            .map(|d| d.as_document().unwrap().get_i32("age").unwrap())
            .collect();
        assert_eq!(ages, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn delete_documents_counts_removals() {
        let store = MemoryStore::new();
        for age in 0..5 {
            store
                .upsert_document(DocumentId::generate(), stored("u", age), "users")
                .await
                .unwrap();
        }

        let removed = store
            .delete_documents(Some(Filter::gte("age", 3)), "users")
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count_documents(None, "users").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn index_records_use_the_remote_naming_scheme() {
        let store = MemoryStore::new();
        store.create_index("users", "email", true).await.unwrap();

        let records = store.list_indexes("users").await.unwrap();
        assert_eq!(records[0].name, PRIMARY_INDEX_NAME);
        assert_eq!(records[1], IndexRecord::new("email_1", true));

        store.drop_index("users", "email_1").await.unwrap();
        assert_eq!(store.list_indexes("users").await.unwrap().len(), 1);
    }
}
