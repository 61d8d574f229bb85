//! Reflection-free projection of stored documents into narrower views.
//!
//! A view declares its correspondence to the stored shape once, as an
//! explicit [`ViewMapping`] built at registration time, instead of being
//! discovered through runtime inspection. The mapper resolves that table
//! in [`ProjectionMapper::prepare`], emits the server-side field selection
//! via [`ProjectionMapper::projection`], and copies fields one by one in
//! [`ProjectionMapper::materialize`].
//!
//! Unmatched names are silently skipped on both sides: a mapping entry
//! whose source field is absent from a given document leaves the view
//! property at its default, and an entry whose target property does not
//! exist on the view shape is ignored.
//!
//! ```ignore
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct UserSummary {
//!     display_name: String,
//!     email: String,
//! }
//!
//! impl View for UserSummary {
//!     fn mapping() -> ViewMapping {
//!         ViewMapping::builder()
//!             .map("display_name", "name")
//!             .field("email")
//!             .build()
//!     }
//! }
//! ```

use std::marker::PhantomData;

use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{RepositoryError, RepositoryResult};

/// A client-facing shape narrower than the stored document.
///
/// `Default` is the explicit construction capability: materialization
/// starts from `Self::default()` and overwrites only the mapped fields, so
/// unmapped properties keep their default values.
pub trait View: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// The declared field correspondence for this view.
    fn mapping() -> ViewMapping;
}

#[derive(Debug, Clone)]
struct MappingEntry {
    target: String,
    source: Option<String>,
    ignored: bool,
}

/// Declared correspondence between view properties and stored fields.
///
/// Each entry names a target property and optionally the source field it
/// is fed from (defaulting to the same name), or marks the property as
/// ignored so it never participates in projection or materialization.
#[derive(Debug, Clone, Default)]
pub struct ViewMapping {
    entries: Vec<MappingEntry>,
}

impl ViewMapping {
    pub fn builder() -> ViewMappingBuilder {
        ViewMappingBuilder::default()
    }
}

/// Fluent construction of a [`ViewMapping`].
#[derive(Debug, Default)]
pub struct ViewMappingBuilder {
    entries: Vec<MappingEntry>,
}

impl ViewMappingBuilder {
    /// Maps a view property from the same-named stored field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.entries.push(MappingEntry {
            target: name.into(),
            source: None,
            ignored: false,
        });
        self
    }

    /// Maps a view property from a differently-named stored field.
    pub fn map(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.entries.push(MappingEntry {
            target: target.into(),
            source: Some(source.into()),
            ignored: false,
        });
        self
    }

    /// Excludes a view property from projection and materialization.
    pub fn ignore(mut self, name: impl Into<String>) -> Self {
        self.entries.push(MappingEntry {
            target: name.into(),
            source: None,
            ignored: true,
        });
        self
    }

    pub fn build(self) -> ViewMapping {
        ViewMapping { entries: self.entries }
    }
}

/// Field-by-field mapper from stored documents to a view shape `V`.
#[derive(Debug)]
pub struct ProjectionMapper<V: View> {
    /// Resolved (target property, source field) pairs, ignores removed.
    resolved: Vec<(String, String)>,
    _marker: PhantomData<V>,
}

impl<V: View> ProjectionMapper<V> {
    /// Resolves the view's declared mapping once. Ignored entries are
    /// dropped; every other entry pairs its target property with the
    /// declared source field, or its own name when none was declared.
    pub fn prepare() -> Self {
        let resolved = V::mapping()
            .entries
            .into_iter()
            .filter(|entry| !entry.ignored)
            .map(|entry| {
                let source = entry.source.unwrap_or_else(|| entry.target.clone());
                (entry.target, source)
            })
            .collect();

        Self { resolved, _marker: PhantomData }
    }

    /// The server-side field selection for this view: every resolved
    /// source field, with the identifier always included.
    pub fn projection(&self) -> Vec<String> {
        let mut fields: Vec<String> = vec!["_id".to_string()];
        for (_, source) in &self.resolved {
            if !fields.iter().any(|f| f == source) {
                fields.push(source.clone());
            }
        }

        fields
    }

    /// Builds a view instance from a stored document.
    ///
    /// Starts from `V::default()`, then copies each resolved source field
    /// into its target property — only when the source field is present in
    /// the document and the target property exists on the view. Everything
    /// else stays at its default value.
    pub fn materialize(&self, source: &bson::Document) -> RepositoryResult<V> {
        let defaults = serialize_to_bson(&V::default())?;
        let Bson::Document(mut target) = defaults else {
            return Err(RepositoryError::InvalidDocument(
                "view shape must serialize to a document".to_string(),
            ));
        };

        for (target_prop, source_field) in &self.resolved {
            if !target.contains_key(target_prop) {
                continue;
            }
            if let Some(value) = source.get(source_field) {
                target.insert(target_prop.clone(), value.clone());
            }
        }

        Ok(deserialize_from_bson(Bson::Document(target))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Summary {
        display_name: String,
        email: String,
        cached_score: i64,
    }

    impl View for Summary {
        fn mapping() -> ViewMapping {
            ViewMapping::builder()
                .map("display_name", "name")
                .field("email")
                .ignore("cached_score")
                .build()
        }
    }

    #[test]
    fn projection_always_includes_the_identifier() {
        let mapper = ProjectionMapper::<Summary>::prepare();
        let fields = mapper.projection();
        assert_eq!(fields[0], "_id");
        assert!(fields.contains(&"name".to_string()));
        assert!(fields.contains(&"email".to_string()));
        assert!(!fields.contains(&"cached_score".to_string()));
    }

    #[test]
    fn materialize_copies_mapped_fields() {
        let mapper = ProjectionMapper::<Summary>::prepare();
        let stored = doc! { "name": "Alice", "email": "alice@example.com", "age": 30 };

        let view = mapper.materialize(&stored).unwrap();
        assert_eq!(view.display_name, "Alice");
        assert_eq!(view.email, "alice@example.com");
        assert_eq!(view.cached_score, 0);
    }

    #[test]
    fn missing_source_field_leaves_the_default() {
        let mapper = ProjectionMapper::<Summary>::prepare();
        let stored = doc! { "email": "bob@example.com" };

        let view = mapper.materialize(&stored).unwrap();
        assert_eq!(view.display_name, "");
        assert_eq!(view.email, "bob@example.com");
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Misdeclared {
        email: String,
    }

    impl View for Misdeclared {
        fn mapping() -> ViewMapping {
            ViewMappingBuilder::default()
                .field("email")
                .field("no_such_property")
                .build()
        }
    }

    #[test]
    fn unknown_target_property_is_silently_skipped() {
        let mapper = ProjectionMapper::<Misdeclared>::prepare();
        let stored = doc! { "email": "x@example.com", "no_such_property": 7 };

        let view = mapper.materialize(&stored).unwrap();
        assert_eq!(view.email, "x@example.com");
    }
}
