mod error;
mod operator;
mod predicate;
mod region;
mod tree;
mod value;

pub use error::QueryError;
pub use operator::{ElementSelector, FieldShape, OperandDomain, Operator};
pub use predicate::{
    EXPIRATION_FIELD, GENERATION_FIELD, Predicate, PredicateBuilder, is_metadata_field,
};
pub use region::GeoJson;
pub use tree::{LogicalOp, PredicateTree};
pub use value::Value;
