//! MongoDB storage backend.
//!
//! Documents travel as BSON with the repository identifier injected as
//! the native `_id` on the way in and stripped again on the way out, so
//! the typed layer never sees the wire key. Bulk writes go through the
//! client-level unordered bulk API in a single round trip.

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use log::debug;
use mongodb::{
    Client, Collection as MongoCollection, IndexModel, Namespace,
    options::{
        ClientOptions, DeleteOneModel, FindOptions, IndexOptions, InsertOneModel,
        ReplaceOneModel, WriteModel,
    },
};

use docrepo_core::{
    backend::{BulkOp, StoreBackend, StoreBackendBuilder},
    error::{RepositoryError, RepositoryResult},
    id::DocumentId,
    index::IndexRecord,
    query::{Expr, Query, QueryVisitor, SortDirection},
};

use crate::{query::MongoQueryTranslator, sanitizer};

/// MongoDB-backed implementation of the core backend trait.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&sanitizer::sanitize_string(collection_name))
    }

    fn namespace(&self, collection_name: &str) -> Namespace {
        Namespace::new(
            self.database.clone(),
            sanitizer::sanitize_string(collection_name),
        )
    }

    /// Sanitizes a document body and injects the identifier as `_id`.
    fn prepare_document(&self, id: &DocumentId, document: &Bson) -> RepositoryResult<Document> {
        let mut prepared = sanitizer::sanitize_value(document)
            .as_document()
            .cloned()
            .ok_or_else(|| RepositoryError::InvalidDocument("Expected document".into()))?;
        prepared.insert("_id", Bson::from(id));

        Ok(prepared)
    }

    /// Strips the wire `_id` and reverts sanitization.
    fn restore_document(&self, document: &Document) -> Bson {
        sanitizer::restore_value(&Bson::Document(
            document
                .iter()
                .filter(|(k, _)| k.as_str() != "_id")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ))
    }

    fn translate_filter(&self, filter: Option<&Expr>) -> RepositoryResult<Document> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn upsert_document(
        &self,
        id: DocumentId,
        document: Bson,
        collection: &str,
    ) -> RepositoryResult<()> {
        self.get_collection(collection)
            .replace_one(
                doc! { "_id": &id },
                self.prepare_document(&id, &document)?,
            )
            .upsert(true)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn bulk_write(&self, ops: Vec<BulkOp>, collection: &str) -> RepositoryResult<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let namespace = self.namespace(collection);
        let models = ops
            .iter()
            .map(|op| {
                Ok(match op {
                    BulkOp::Insert { id, document } => WriteModel::InsertOne(
                        InsertOneModel::builder()
                            .namespace(namespace.clone())
                            .document(self.prepare_document(id, document)?)
                            .build(),
                    ),
                    BulkOp::Replace { id, document } => WriteModel::ReplaceOne(
                        ReplaceOneModel::builder()
                            .namespace(namespace.clone())
                            .filter(doc! { "_id": id })
                            .replacement(self.prepare_document(id, document)?)
                            .upsert(true)
                            .build(),
                    ),
                    BulkOp::Delete { id } => WriteModel::DeleteOne(
                        DeleteOneModel::builder()
                            .namespace(namespace.clone())
                            .filter(doc! { "_id": id })
                            .build(),
                    ),
                })
            })
            .collect::<RepositoryResult<Vec<WriteModel>>>()?;

        debug!(
            "bulk write of {} ops against '{}.{}'",
            models.len(),
            self.database,
            collection
        );

        self.client
            .bulk_write(models)
            .ordered(false)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get_documents(
        &self,
        ids: Vec<DocumentId>,
        collection: &str,
    ) -> RepositoryResult<Vec<Bson>> {
        let ids: Vec<Bson> = ids.iter().map(Bson::from).collect();

        Ok(self
            .get_collection(collection)
            .find(doc! { "_id": { "$in": ids } })
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?
            .iter()
            .map(|doc| self.restore_document(doc))
            .collect())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> RepositoryResult<Vec<Bson>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.skip {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(doc! {
                sort.field.clone(): match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                }
            });
        }
        if let Some(fields) = &query.projection {
            options.projection = Some(
                fields
                    .iter()
                    .map(|field| (sanitizer::sanitize_string(field), Bson::Int32(1)))
                    .collect(),
            );
        }

        Ok(self
            .get_collection(collection)
            .find(self.translate_filter(query.filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?
            .iter()
            .map(|doc| self.restore_document(doc))
            .collect())
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> RepositoryResult<u64> {
        self.get_collection(collection)
            .count_documents(self.translate_filter(filter.as_ref())?)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))
    }

    async fn delete_one_document(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> RepositoryResult<bool> {
        let result = self
            .get_collection(collection)
            .delete_one(self.translate_filter(filter.as_ref())?)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        Ok(result.deleted_count > 0)
    }

    async fn delete_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> RepositoryResult<u64> {
        let result = self
            .get_collection(collection)
            .delete_many(self.translate_filter(filter.as_ref())?)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        Ok(result.deleted_count)
    }

    async fn list_indexes(&self, collection: &str) -> RepositoryResult<Vec<IndexRecord>> {
        Ok(self
            .get_collection(collection)
            .list_indexes()
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?
            .try_collect::<Vec<IndexModel>>()
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?
            .into_iter()
            .map(|model| {
                let options = model.options.unwrap_or_default();
                let name = options.name.unwrap_or_else(|| {
                    // The server's default naming scheme: key_direction pairs
                    // joined by underscores.
                    model
                        .keys
                        .iter()
                        .map(|(field, dir)| format!("{}_{}", field, dir))
                        .collect::<Vec<_>>()
                        .join("_")
                });

                IndexRecord::new(name, options.unique.unwrap_or(false))
            })
            .collect())
    }

    async fn create_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> RepositoryResult<()> {
        let field = sanitizer::sanitize_string(field);

        self.get_collection(collection)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { &field: 1 })
                    .options(
                        IndexOptions::builder()
                            .name(format!("{field}_1"))
                            .unique(unique)
                            .build(),
                    )
                    .build(),
            )
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn drop_index(&self, collection: &str, name: &str) -> RepositoryResult<()> {
        self.get_collection(collection)
            .drop_index(name)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn create_collection(&self, name: &str) -> RepositoryResult<()> {
        self.client
            .database(&self.database)
            .create_collection(sanitizer::sanitize_string(name))
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> RepositoryResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn list_collections(&self) -> RepositoryResult<Vec<String>> {
        Ok(self
            .client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?
            .iter()
            .map(|name| sanitizer::restore_string(name))
            .collect())
    }

    async fn shutdown(self) -> RepositoryResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Builds a [`MongoDbStore`] from a connection string and database name.
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> RepositoryResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| RepositoryError::Initialization(e.to_string()))?,
            )
            .map_err(|e| RepositoryError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
