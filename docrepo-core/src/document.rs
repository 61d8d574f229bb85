//! The stored entity contract and serialization helpers.
//!
//! Every persisted type implements [`Document`]: identity, audit
//! timestamps, an optional deterministic alternate key, and the explicit
//! index registration the reconciler reads. [`DocumentExt`] adds BSON/JSON
//! conversion plus a content fingerprint for in-memory change detection.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::prelude::*;
//! use chrono::{DateTime, Utc};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: DocumentId,
//!     pub email: String,
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
//!
//!     fn indexes() -> Vec<IndexIntent> {
//!         vec![IndexIntent::unique("email")]
//!     }
//! }
//! ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};
use sha2::{Digest, Sha256};

use crate::error::RepositoryResult;
use crate::id::DocumentId;
use crate::index::IndexIntent;

/// Core trait for every type stored through a repository.
///
/// Identity and audit timestamps are managed by the repository, never by
/// the caller: the first persist assigns the id and both timestamps, every
/// subsequent persist refreshes `updated_at` only. Once assigned, the id
/// never changes for the lifetime of the entity.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns this document's identifier. [`DocumentId::is_empty`] means
    /// "not yet persisted".
    fn id(&self) -> &DocumentId;

    /// Assigns the identifier. Called by the repository exactly once, on
    /// first persist.
    fn set_id(&mut self, id: DocumentId);

    /// UTC timestamp of the first persist, if any.
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// Sets the creation timestamp. Repository use only.
    fn set_created_at(&mut self, at: DateTime<Utc>);

    /// UTC timestamp of the latest persist, if any.
    fn updated_at(&self) -> Option<DateTime<Utc>>;

    /// Sets the update timestamp. Repository use only.
    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// The name of the collection this document type lives in.
    fn collection_name() -> &'static str;

    /// Optional deterministic natural key.
    ///
    /// When present, the repository derives the identifier from this key
    /// instead of generating a random one, so two in-memory instances
    /// sharing a natural key converge on the same stored record.
    fn alternate_key(&self) -> Option<String> {
        None
    }

    /// Declared index intents for this document type.
    ///
    /// This is the explicit per-type registration consumed by
    /// [`configure_indexes`](crate::repository::Repository::configure_indexes);
    /// the default declares no secondary indexes.
    fn indexes() -> Vec<IndexIntent> {
        Vec::new()
    }
}

/// Serialization and fingerprint utilities, blanket-implemented for every
/// [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    fn to_bson(&self) -> RepositoryResult<Bson>;

    /// Reconstructs a document from a stored BSON value.
    fn from_bson(bson: Bson) -> RepositoryResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> RepositoryResult<Value>;

    /// Reconstructs a document from a JSON value.
    fn from_json(value: Value) -> RepositoryResult<Self>;

    /// Content fingerprint for in-memory change detection.
    ///
    /// Derived from the canonical JSON form (sorted keys) hashed with
    /// SHA-256 and encoded as unpadded base64url. Never persisted or
    /// transmitted; two instances with identical content share a hash.
    fn content_hash(&self) -> RepositoryResult<String>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> RepositoryResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> RepositoryResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> RepositoryResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> RepositoryResult<Self> {
        Ok(from_value(value)?)
    }

    fn content_hash(&self) -> RepositoryResult<String> {
        let canonical = serde_json::to_string(&self.to_json()?)?;
        let digest = Sha256::digest(canonical.as_bytes());

        Ok(URL_SAFE_NO_PAD.encode(digest))
    }
}
