//! Field-name sanitization for MongoDB compatibility.
//!
//! MongoDB forbids dots, dollar signs and null bytes in document keys,
//! since those characters carry meaning in its query syntax. Values and
//! keys are escaped on the way in and unescaped on the way out, so
//! callers never see the encoded form.

use bson::Bson;

const REPLACEMENTS: [(&str, &str); 3] = [
    (".", "__dot__"),
    ("$", "__dollar__"),
    ("\0", "__null__"),
];

/// Escapes problematic characters in a key or collection name.
pub(crate) fn sanitize_string(input: &str) -> String {
    let mut sanitized = input.to_string();
    for (target, replacement) in REPLACEMENTS.iter() {
        sanitized = sanitized.replace(target, replacement);
    }

    sanitized
}

/// Reverts [`sanitize_string`] escapes.
pub(crate) fn restore_string(input: &str) -> String {
    let mut restored = input.to_string();
    for (target, replacement) in REPLACEMENTS.iter().rev() {
        restored = restored.replace(replacement, target);
    }

    restored
}

/// Recursively escapes strings, array elements and document keys/values.
/// Non-string scalar types pass through unchanged.
pub(crate) fn sanitize_value(value: &Bson) -> Bson {
    match value {
        Bson::String(s) => Bson::String(sanitize_string(s)),
        Bson::Array(arr) => Bson::Array(arr.iter().map(sanitize_value).collect()),
        Bson::Document(doc) => Bson::Document(
            doc.iter()
                .map(|(k, v)| (sanitize_string(k), sanitize_value(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Inverse of [`sanitize_value`], applied to values read back from the
/// store.
pub(crate) fn restore_value(value: &Bson) -> Bson {
    match value {
        Bson::String(s) => Bson::String(restore_string(s)),
        Bson::Array(arr) => Bson::Array(arr.iter().map(restore_value).collect()),
        Bson::Document(doc) => Bson::Document(
            doc.iter()
                .map(|(k, v)| (restore_string(k), restore_value(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn escaping_round_trips() {
        let original = Bson::Document(doc! {
            "price.usd": "$12",
            "nested": { "a.b": ["$x", "plain"] },
        });

        let stored = sanitize_value(&original);
        assert!(
            stored
                .as_document()
                .unwrap()
                .get("price__dot__usd")
                .is_some()
        );
        assert_eq!(restore_value(&stored), original);
    }
}
