//! Convenient re-exports of commonly used types from docrepo.
//!
//! Import this prelude module to quickly access the most frequently used
//! types and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docrepo::prelude::*;
//! ```

pub use docrepo_core::{
    backend::{BulkOp, StoreBackend, StoreBackendBuilder},
    buffer::TransactionBuffer,
    cursor::BatchCursor,
    document::{Document, DocumentExt},
    error::{RepositoryError, RepositoryResult},
    id::DocumentId,
    index::{IndexIntent, IndexRecord},
    projection::{ProjectionMapper, View, ViewMapping},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, Sort, SortDirection},
    repository::Repository,
    store::DocumentStore,
};
