//! Error and result types shared by every repository operation.
//!
//! All fallible operations in this workspace return [`RepositoryResult<T>`].
//! Backend errors are propagated unmodified as [`RepositoryError::Backend`];
//! the core performs no retries of its own.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Errors produced by repository, buffer, projection and index operations.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Serialization/deserialization failure when converting documents
    /// between their typed and BSON/JSON representations.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error while building or connecting a storage backend.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A caller-supplied natural key cannot be encoded into the fixed-width
    /// identifier space, or an identifier string is malformed.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    /// The requested document was not found. First argument is the document
    /// id, second the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// A stored value does not have the expected document structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error surfaced by the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A specialized `Result` for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<BsonError> for RepositoryError {
    fn from(err: BsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RepositoryError {
    fn from(err: SerdeJsonError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
