use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sieve_query::{Operator, Value};

/// Kind of secondary index, which decides the operand types it can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    Numeric,
    String,
    Geo2dSphere,
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexType::Numeric => write!(f, "NUMERIC"),
            IndexType::String => write!(f, "STRING"),
            IndexType::Geo2dSphere => write!(f, "GEO2DSPHERE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub collection: String,
    pub name: String,
    pub field: String,
    pub index_type: IndexType,
}

/// Read-only view of the secondary indexes that exist per collection.
pub trait IndexCatalog {
    /// The index covering `field` in `collection`, if one exists.
    fn lookup_index(&self, collection: &str, field: &str) -> Option<IndexDescriptor>;
}

impl<T: IndexCatalog + ?Sized> IndexCatalog for &T {
    fn lookup_index(&self, collection: &str, field: &str) -> Option<IndexDescriptor> {
        (**self).lookup_index(collection, field)
    }
}

impl<T: IndexCatalog + ?Sized> IndexCatalog for Arc<T> {
    fn lookup_index(&self, collection: &str, field: &str) -> Option<IndexDescriptor> {
        (**self).lookup_index(collection, field)
    }
}

/// A single-field condition handed to storage for an index-driven scan.
///
/// `BETWEEN` ranges are answered as `[bound1, bound2)` by storage; see
/// [`crate::RecordStore::query_range`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexQuery {
    pub field: String,
    pub operator: Operator,
    pub bound1: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound2: Option<Value>,
}

impl IndexQuery {
    pub fn new(field: impl Into<String>, operator: Operator, bound1: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            bound1: bound1.into(),
            bound2: None,
        }
    }

    pub fn between(
        field: impl Into<String>,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: Operator::Between,
            bound1: lower.into(),
            bound2: Some(upper.into()),
        }
    }
}

impl fmt::Display for IndexQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.bound1)?;
        if let Some(bound2) = &self.bound2 {
            write!(f, ", {bound2}")?;
        }
        Ok(())
    }
}
