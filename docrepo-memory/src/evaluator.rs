//! Filter expression evaluation over in-memory BSON documents.
//!
//! Implements the core's [`QueryVisitor`] against a single document,
//! producing a match/no-match verdict per expression tree.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, datetime::DateTime};

use docrepo_core::{
    error::RepositoryError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Type-erased, comparable representation of BSON values.
///
/// Normalizes all numeric types to f64 so that cross-width comparisons
/// behave as a query author expects.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => {
                Comparable::Array(arr.iter().map(Comparable::from).collect::<Vec<_>>())
            }
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>(),
            ),
            // Other types are not comparable
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Evaluates one filter tree against one document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a bson::Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a bson::Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<bool, RepositoryError> {
        self.visit_expr(expr)
    }

    /// Whether `bson` matches `expr`. Non-document values and evaluation
    /// failures count as no match.
    pub fn matches(bson: &Bson, expr: &Expr) -> bool {
        bson.as_document()
            .map(|doc| DocumentEvaluator::new(doc).evaluate(expr).unwrap_or(false))
            .unwrap_or(false)
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = RepositoryError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(self.document.get(field).is_some() == should_exist)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        match self.document.get(field) {
            Some(field_value) => match op {
                FieldOp::Eq => Ok(Comparable::from(field_value) == Comparable::from(value)),
                FieldOp::Ne => Ok(Comparable::from(field_value) != Comparable::from(value)),
                FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                    match Comparable::from(field_value).partial_cmp(&Comparable::from(value)) {
                        Some(ordering) => Ok(match op {
                            FieldOp::Gt => ordering == Ordering::Greater,
                            FieldOp::Gte => {
                                ordering == Ordering::Greater || ordering == Ordering::Equal
                            }
                            FieldOp::Lt => ordering == Ordering::Less,
                            FieldOp::Lte => {
                                ordering == Ordering::Less || ordering == Ordering::Equal
                            }
                            _ => unreachable!(),
                        }),
                        None => Ok(false),
                    }
                }
                FieldOp::Contains => match Comparable::from(field_value) {
                    Comparable::Array(array) => {
                        Ok(array.iter().any(|item| item == &Comparable::from(value)))
                    }
                    Comparable::String(left) => match Comparable::from(value) {
                        Comparable::String(right) => Ok(left.contains(right)),
                        _ => Ok(false),
                    },
                    _ => Ok(false),
                },
                FieldOp::NotContains => match Comparable::from(field_value) {
                    Comparable::Array(array) => {
                        Ok(!array.iter().any(|item| item == &Comparable::from(value)))
                    }
                    Comparable::String(left) => match Comparable::from(value) {
                        Comparable::String(right) => Ok(!left.contains(right)),
                        _ => Ok(true),
                    },
                    _ => Ok(true),
                },
                FieldOp::StartsWith => {
                    match (Comparable::from(field_value), Comparable::from(value)) {
                        (Comparable::String(left), Comparable::String(right)) => {
                            Ok(left.starts_with(right))
                        }
                        _ => Ok(false),
                    }
                }
                FieldOp::EndsWith => {
                    match (Comparable::from(field_value), Comparable::from(value)) {
                        (Comparable::String(left), Comparable::String(right)) => {
                            Ok(left.ends_with(right))
                        }
                        _ => Ok(false),
                    }
                }
                FieldOp::AnyOf => match (Comparable::from(field_value), Comparable::from(value)) {
                    (Comparable::Array(array), Comparable::Array(values)) => Ok(values
                        .iter()
                        .any(|val| array.iter().any(|item| item == val))),
                    (Comparable::Array(array), single) => {
                        Ok(array.iter().any(|item| item == &single))
                    }
                    (single, Comparable::Array(values)) => {
                        Ok(values.iter().any(|val| val == &single))
                    }
                    _ => Ok(false),
                },
                FieldOp::NoneOf => match (Comparable::from(field_value), Comparable::from(value)) {
                    (Comparable::Array(array), Comparable::Array(values)) => Ok(!values
                        .iter()
                        .any(|val| array.iter().any(|item| item == val))),
                    (Comparable::Array(array), single) => {
                        Ok(!array.iter().any(|item| item == &single))
                    }
                    (single, Comparable::Array(values)) => {
                        Ok(!values.iter().any(|val| val == &single))
                    }
                    _ => Ok(true),
                },
            },
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docrepo_core::query::Filter;

    fn subject() -> bson::Document {
        doc! {
            "name": "Alice",
            "age": 30,
            "tags": ["admin", "staff"],
        }
    }

    #[test]
    fn numeric_comparison_crosses_widths() {
        let doc = subject();
        let expr = Filter::gte("age", 30.0);
        assert!(DocumentEvaluator::new(&doc).evaluate(&expr).unwrap());
    }

    #[test]
    fn contains_matches_arrays_and_substrings() {
        let doc = subject();
        assert!(
            DocumentEvaluator::new(&doc)
                .evaluate(&Filter::contains("tags", "admin"))
                .unwrap()
        );
        assert!(
            DocumentEvaluator::new(&doc)
                .evaluate(&Filter::contains("name", "lic"))
                .unwrap()
        );
    }

    #[test]
    fn missing_field_never_matches() {
        let doc = subject();
        let expr = Filter::eq("no_such", 1);
        assert!(!DocumentEvaluator::new(&doc).evaluate(&expr).unwrap());
        assert!(
            DocumentEvaluator::new(&doc)
                .evaluate(&Filter::not_exists("no_such"))
                .unwrap()
        );
    }

    #[test]
    fn logical_combinators_compose() {
        let doc = subject();
        let expr = Filter::eq("name", "Alice")
            .and(Filter::gt("age", 18))
            .and(Filter::eq("age", 0).not());
        assert!(DocumentEvaluator::new(&doc).evaluate(&expr).unwrap());
    }
}
