use sieve_query::{Operator, QueryError};
use sieve_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("type mismatch on `{field}` ({operator}): expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        operator: Operator,
        expected: String,
        found: String,
    },

    #[error("unsupported operator {operator} on `{field}`: {reason}")]
    UnsupportedOperator {
        field: String,
        operator: Operator,
        reason: String,
    },

    #[error("scan of `{collection}` requires a full scan but scans are disabled")]
    ScansDisabled { collection: String },

    #[error(
        "storage error scanning `{collection}`{}: {source}",
        .filter.as_ref().map(|f| format!(" with filter `{f}`")).unwrap_or_default()
    )]
    Storage {
        collection: String,
        filter: Option<String>,
        source: StoreError,
    },

    #[error("scan of `{collection}` cancelled")]
    Cancelled { collection: String },
}
