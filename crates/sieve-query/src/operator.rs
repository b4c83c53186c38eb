use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison applied by a single predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Between,
    StartsWith,
    EndsWith,
    Containing,
    In,
    ListValContaining,
    ListValBetween,
    ListValGt,
    ListValLtEq,
    MapKeysContain,
    MapValuesContain,
    MapKeysBetween,
    MapValBetween,
    MapValGt,
    /// Map holds `value1` as a key mapped to `value2`.
    MapValEqByKey,
    GeoWithin,
}

/// Which part of a container a `Containing` predicate inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementSelector {
    Key,
    Value,
    KeyValue,
}

/// Operand domain an operator accepts for `value1` (and `value2` when binary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandDomain {
    /// Integer, float, string or boolean.
    Scalar,
    /// Numeric or string; both bounds must share the domain.
    Ordered,
    Text,
    ScalarList,
    Geo,
}

/// Shape of the record field an operator is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Scalar,
    List,
    Map,
    Geo,
}

impl Operator {
    pub const ALL: [Operator; 22] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::Lt,
        Operator::LtEq,
        Operator::Gt,
        Operator::GtEq,
        Operator::Between,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::Containing,
        Operator::In,
        Operator::ListValContaining,
        Operator::ListValBetween,
        Operator::ListValGt,
        Operator::ListValLtEq,
        Operator::MapKeysContain,
        Operator::MapValuesContain,
        Operator::MapKeysBetween,
        Operator::MapValBetween,
        Operator::MapValGt,
        Operator::MapValEqByKey,
        Operator::GeoWithin,
    ];

    /// Number of operands the operator takes.
    pub const fn arity(self) -> usize {
        match self {
            Operator::Between
            | Operator::ListValBetween
            | Operator::MapKeysBetween
            | Operator::MapValBetween
            | Operator::MapValEqByKey => 2,
            _ => 1,
        }
    }

    /// Whether a secondary index can evaluate this operator directly.
    /// The field still needs a matching index and no ignore-case modifier.
    pub const fn is_index_pushable(self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::Lt
                | Operator::LtEq
                | Operator::Gt
                | Operator::GtEq
                | Operator::Between
                | Operator::GeoWithin
        )
    }

    pub const fn operand_domain(self) -> OperandDomain {
        match self {
            Operator::Eq
            | Operator::NotEq
            | Operator::Containing
            | Operator::ListValContaining
            | Operator::MapKeysContain
            | Operator::MapValuesContain
            | Operator::MapValEqByKey => OperandDomain::Scalar,
            Operator::Lt
            | Operator::LtEq
            | Operator::Gt
            | Operator::GtEq
            | Operator::Between
            | Operator::ListValBetween
            | Operator::ListValGt
            | Operator::ListValLtEq
            | Operator::MapKeysBetween
            | Operator::MapValBetween
            | Operator::MapValGt => OperandDomain::Ordered,
            Operator::StartsWith | Operator::EndsWith => OperandDomain::Text,
            Operator::In => OperandDomain::ScalarList,
            Operator::GeoWithin => OperandDomain::Geo,
        }
    }

    /// `Containing` also applies to lists and maps when given an element selector.
    pub const fn field_shape(self) -> FieldShape {
        match self {
            Operator::ListValContaining
            | Operator::ListValBetween
            | Operator::ListValGt
            | Operator::ListValLtEq => FieldShape::List,
            Operator::MapKeysContain
            | Operator::MapValuesContain
            | Operator::MapKeysBetween
            | Operator::MapValBetween
            | Operator::MapValGt
            | Operator::MapValEqByKey => FieldShape::Map,
            Operator::GeoWithin => FieldShape::Geo,
            _ => FieldShape::Scalar,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "EQ",
            Operator::NotEq => "NOT_EQ",
            Operator::Lt => "LT",
            Operator::LtEq => "LTEQ",
            Operator::Gt => "GT",
            Operator::GtEq => "GTEQ",
            Operator::Between => "BETWEEN",
            Operator::StartsWith => "STARTS_WITH",
            Operator::EndsWith => "ENDS_WITH",
            Operator::Containing => "CONTAINING",
            Operator::In => "IN",
            Operator::ListValContaining => "LIST_VAL_CONTAINING",
            Operator::ListValBetween => "LIST_VAL_BETWEEN",
            Operator::ListValGt => "LIST_VAL_GT",
            Operator::ListValLtEq => "LIST_VAL_LTEQ",
            Operator::MapKeysContain => "MAP_KEYS_CONTAIN",
            Operator::MapValuesContain => "MAP_VALUES_CONTAIN",
            Operator::MapKeysBetween => "MAP_KEYS_BETWEEN",
            Operator::MapValBetween => "MAP_VAL_BETWEEN",
            Operator::MapValGt => "MAP_VAL_GT",
            Operator::MapValEqByKey => "MAP_VAL_EQ_BY_KEY",
            Operator::GeoWithin => "GEO_WITHIN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
