use sieve_query::Operator;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("index already exists: {0}")]
    IndexExists(String),

    #[error("no index on `{collection}.{field}`")]
    IndexNotFound { collection: String, field: String },

    #[error("index on `{field}` cannot answer {operator}: {reason}")]
    UnsupportedQuery {
        field: String,
        operator: Operator,
        reason: String,
    },

    #[error("record encoding error: {0}")]
    Encoding(String),

    #[error("storage error: {0}")]
    Storage(String),
}
