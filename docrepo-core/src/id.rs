//! The fixed-width document identifier.
//!
//! Identifiers occupy a 12-byte, time-ordered space (24 hex characters on
//! the wire). The all-zero value is the sentinel for "not yet persisted";
//! the repository assigns a real id on first insert and never changes it
//! afterwards.

use std::fmt;
use std::str::FromStr;

use bson::{Bson, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, RepositoryResult};

const ID_WIDTH: usize = 12;

/// A 12-byte document identifier with a time-derived prefix.
///
/// Two ways to obtain a non-empty id:
///
/// - [`DocumentId::generate`] produces a fresh random, roughly
///   time-ordered identifier.
/// - [`DocumentId::from_alternate_key`] derives a deterministic identifier
///   from a natural key, enabling idempotent upserts: the key's bytes are
///   hex-encoded and left-padded with zeros to the full 24-character width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(ObjectId);

impl DocumentId {
    /// The "not yet persisted" sentinel (all-zero bytes).
    pub fn empty() -> Self {
        Self(ObjectId::from_bytes([0u8; ID_WIDTH]))
    }

    /// Generates a fresh time-derived identifier.
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    /// Returns true if this is the unassigned sentinel value.
    pub fn is_empty(&self) -> bool {
        self.0.bytes() == [0u8; ID_WIDTH]
    }

    /// Derives a deterministic identifier from a natural key.
    ///
    /// The key's raw bytes land right-aligned in the 12-byte identifier,
    /// zero-padded on the left, so the hex form is the hex encoding of the
    /// key left-padded with zeros to 24 characters.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidKey`] if the key's encoding
    /// exceeds the identifier width.
    pub fn from_alternate_key(key: &str) -> RepositoryResult<Self> {
        let raw = key.as_bytes();
        if raw.is_empty() {
            return Err(RepositoryError::InvalidKey("alternate key is empty".to_string()));
        }
        if raw.len() > ID_WIDTH {
            return Err(RepositoryError::InvalidKey(format!(
                "alternate key '{}' exceeds {} bytes",
                key, ID_WIDTH
            )));
        }

        let mut bytes = [0u8; ID_WIDTH];
        bytes[ID_WIDTH - raw.len()..].copy_from_slice(raw);

        Ok(Self(ObjectId::from_bytes(bytes)))
    }

    /// Returns the 24-character hex encoding.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Returns the underlying object id.
    pub fn as_object_id(&self) -> &ObjectId {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for DocumentId {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
            .map(Self)
            .map_err(|e| RepositoryError::InvalidKey(e.to_string()))
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

// Conversion from &DocumentId comes for free through bson's blanket
// `impl<T: Clone + Into<Bson>> From<&T> for Bson`.
impl From<DocumentId> for Bson {
    fn from(id: DocumentId) -> Bson {
        Bson::ObjectId(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_sentinel() {
        assert!(DocumentId::empty().is_empty());
        assert!(!DocumentId::generate().is_empty());
    }

    #[test]
    fn alternate_key_is_deterministic_and_padded() {
        let a = DocumentId::from_alternate_key("user42").unwrap();
        let b = DocumentId::from_alternate_key("user42").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), "000000000000757365723432");
    }

    #[test]
    fn oversized_alternate_key_is_rejected() {
        let err = DocumentId::from_alternate_key("thirteen-long").unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidKey(_)));
    }

    #[test]
    fn full_width_alternate_key_is_accepted() {
        let id = DocumentId::from_alternate_key("exactly12chr").unwrap();
        assert!(!id.is_empty());
        assert_eq!(id.to_hex().len(), 24);
    }

    #[test]
    fn converts_to_bson_by_value_and_by_reference() {
        let id = DocumentId::generate();
        let expected = Bson::ObjectId(*id.as_object_id());
        assert_eq!(Bson::from(id), expected);
        assert_eq!(Bson::from(&id), expected);
    }

    #[test]
    fn hex_round_trip() {
        let id = DocumentId::generate();
        let parsed: DocumentId = id.to_hex().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
