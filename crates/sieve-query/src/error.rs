use crate::operator::Operator;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid predicate on `{field}` ({operator}): {reason}")]
    InvalidPredicate {
        field: String,
        operator: Operator,
        reason: String,
    },
    #[error("invalid predicate tree: {0}")]
    InvalidTree(String),
    #[error("invalid geojson: {0}")]
    InvalidGeoJson(String),
}
