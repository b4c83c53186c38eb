use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::operator::{ElementSelector, OperandDomain, Operator};
use crate::value::Value;

/// Reserved field path addressing a record's write generation.
pub const GENERATION_FIELD: &str = "@generation";
/// Reserved field path addressing a record's expiration (epoch seconds).
pub const EXPIRATION_FIELD: &str = "@expiration";

pub fn is_metadata_field(field: &str) -> bool {
    field == GENERATION_FIELD || field == EXPIRATION_FIELD
}

/// One comparison against one field.
///
/// Immutable once built. Every constructor (builder, shorthands, serde)
/// runs the same validation, so a `Predicate` value is always well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PredicateBuilder")]
pub struct Predicate {
    field: String,
    operator: Operator,
    value1: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    value2: Option<Value>,
    ignore_case: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector: Option<ElementSelector>,
}

impl Predicate {
    pub fn builder(field: impl Into<String>, operator: Operator) -> PredicateBuilder {
        PredicateBuilder {
            field: field.into(),
            operator,
            value1: None,
            value2: None,
            ignore_case: false,
            selector: None,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::builder(field, Operator::Eq).value(value).build()
    }

    pub fn not_eq(field: impl Into<String>, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::builder(field, Operator::NotEq).value(value).build()
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::builder(field, Operator::Lt).value(value).build()
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::builder(field, Operator::LtEq).value(value).build()
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::builder(field, Operator::Gt).value(value).build()
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::builder(field, Operator::GtEq).value(value).build()
    }

    pub fn between(
        field: impl Into<String>,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        Self::builder(field, Operator::Between)
            .value(lower)
            .value2(upper)
            .build()
    }

    pub fn starts_with(field: impl Into<String>, prefix: &str) -> Result<Self, QueryError> {
        Self::builder(field, Operator::StartsWith).value(prefix).build()
    }

    pub fn ends_with(field: impl Into<String>, suffix: &str) -> Result<Self, QueryError> {
        Self::builder(field, Operator::EndsWith).value(suffix).build()
    }

    pub fn containing(
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        Self::builder(field, Operator::Containing).value(value).build()
    }

    pub fn is_in<T: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Result<Self, QueryError> {
        Self::builder(field, Operator::In)
            .value(Value::list(values))
            .build()
    }

    pub fn geo_within(
        field: impl Into<String>,
        region: crate::region::GeoJson,
    ) -> Result<Self, QueryError> {
        Self::builder(field, Operator::GeoWithin).value(region).build()
    }

    /// Compare a record's expiration (epoch seconds). The operand must be an integer.
    pub fn expiry(operator: Operator, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::builder(EXPIRATION_FIELD, operator).value(value).build()
    }

    /// Compare a record's write generation. The operand must be an integer.
    pub fn generation(operator: Operator, value: impl Into<Value>) -> Result<Self, QueryError> {
        Self::builder(GENERATION_FIELD, operator).value(value).build()
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub const fn operator(&self) -> Operator {
        self.operator
    }

    pub const fn value1(&self) -> &Value {
        &self.value1
    }

    pub const fn value2(&self) -> Option<&Value> {
        self.value2.as_ref()
    }

    pub const fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub const fn selector(&self) -> Option<ElementSelector> {
        self.selector
    }

    pub fn is_metadata(&self) -> bool {
        is_metadata_field(&self.field)
    }

    /// Operand count after accounting for a key/value element selector.
    pub const fn arity(&self) -> usize {
        effective_arity(self.operator, self.selector)
    }
}

const fn effective_arity(operator: Operator, selector: Option<ElementSelector>) -> usize {
    match (operator, selector) {
        (Operator::Containing, Some(ElementSelector::KeyValue)) => 2,
        _ => operator.arity(),
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value1)?;
        if let Some(v2) = &self.value2 {
            write!(f, ", {v2}")?;
        }
        if let Some(selector) = self.selector {
            write!(f, " [{selector:?}]")?;
        }
        if self.ignore_case {
            f.write_str(" (ignore case)")?;
        }
        Ok(())
    }
}

// ── Builder ─────────────────────────────────────────────────

/// Collects the parts of a [`Predicate`] and validates them in [`build`](Self::build).
#[derive(Debug, Clone, Deserialize)]
pub struct PredicateBuilder {
    field: String,
    operator: Operator,
    #[serde(default)]
    value1: Option<Value>,
    #[serde(default)]
    value2: Option<Value>,
    #[serde(default)]
    ignore_case: bool,
    #[serde(default)]
    selector: Option<ElementSelector>,
}

impl PredicateBuilder {
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value1 = Some(value.into());
        self
    }

    pub fn value2(mut self, value: impl Into<Value>) -> Self {
        self.value2 = Some(value.into());
        self
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn selector(mut self, selector: ElementSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn build(self) -> Result<Predicate, QueryError> {
        Predicate::try_from(self)
    }
}

impl TryFrom<PredicateBuilder> for Predicate {
    type Error = QueryError;

    fn try_from(b: PredicateBuilder) -> Result<Self, Self::Error> {
        let checked = check(&b);
        let PredicateBuilder {
            field,
            operator,
            value1,
            value2,
            ignore_case,
            selector,
        } = b;
        match (checked, value1) {
            (Ok(()), Some(value1)) => Ok(Predicate {
                field,
                operator,
                value1,
                value2,
                ignore_case,
                selector,
            }),
            (Err(reason), _) => Err(QueryError::InvalidPredicate {
                field,
                operator,
                reason,
            }),
            (Ok(()), None) => Err(QueryError::InvalidPredicate {
                field,
                operator,
                reason: "missing operand".into(),
            }),
        }
    }
}

// ── Validation ──────────────────────────────────────────────

fn check(b: &PredicateBuilder) -> Result<(), String> {
    if b.field.is_empty() {
        return Err("field path is empty".into());
    }
    let Some(value1) = &b.value1 else {
        return Err("missing operand".into());
    };
    let value2 = b.value2.as_ref();

    if b.selector.is_some() && b.operator != Operator::Containing {
        return Err("element selector only applies to CONTAINING".into());
    }
    match (effective_arity(b.operator, b.selector), value2) {
        (2, None) => return Err("expected two operands".into()),
        (1, Some(_)) => return Err("expected one operand".into()),
        _ => {}
    }

    if is_metadata_field(&b.field) {
        check_metadata(b.operator, value1, value2)?;
    }
    check_domain(b.operator, value1, value2)?;

    if b.ignore_case && !compares_strings(b.operator, b.selector, value1, value2) {
        return Err("ignore-case requires string operands".into());
    }
    Ok(())
}

fn check_metadata(
    operator: Operator,
    value1: &Value,
    value2: Option<&Value>,
) -> Result<(), String> {
    if !matches!(
        operator,
        Operator::Eq
            | Operator::NotEq
            | Operator::Lt
            | Operator::LtEq
            | Operator::Gt
            | Operator::GtEq
            | Operator::Between
    ) {
        return Err("metadata fields only support scalar comparisons".into());
    }
    if std::iter::once(value1)
        .chain(value2)
        .any(|v| !matches!(v, Value::Int(_)))
    {
        return Err("metadata operand must be an integer".into());
    }
    Ok(())
}

fn check_domain(operator: Operator, value1: &Value, value2: Option<&Value>) -> Result<(), String> {
    match operator.operand_domain() {
        OperandDomain::Scalar => {
            for v in std::iter::once(value1).chain(value2) {
                if !v.is_scalar() {
                    return Err(format!("expected a scalar operand, got {}", v.kind()));
                }
            }
        }
        OperandDomain::Ordered => {
            for v in std::iter::once(value1).chain(value2) {
                if !v.is_numeric() && !matches!(v, Value::String(_)) {
                    return Err(format!(
                        "expected a numeric or string operand, got {}",
                        v.kind()
                    ));
                }
            }
            if let Some(v2) = value2
                && value1.is_numeric() != v2.is_numeric()
            {
                return Err("range bounds must both be numeric or both be strings".into());
            }
        }
        OperandDomain::Text => {
            if !matches!(value1, Value::String(_)) {
                return Err(format!("expected a string operand, got {}", value1.kind()));
            }
        }
        OperandDomain::ScalarList => match value1 {
            Value::List(items) => {
                if let Some(bad) = items.iter().find(|v| !v.is_scalar()) {
                    return Err(format!("IN list holds a non-scalar {}", bad.kind()));
                }
                // int and float compare with each other; any other mix cannot
                if let Some(first) = items.first()
                    && let Some(other) = items.iter().find(|v| !same_domain(first, v))
                {
                    return Err(format!(
                        "IN list mixes {} and {} candidates",
                        first.kind(),
                        other.kind()
                    ));
                }
            }
            other => return Err(format!("expected a list operand, got {}", other.kind())),
        },
        OperandDomain::Geo => {
            if !matches!(value1, Value::Geo(_)) {
                return Err(format!("expected a geo region, got {}", value1.kind()));
            }
        }
    }
    Ok(())
}

fn same_domain(a: &Value, b: &Value) -> bool {
    (a.is_numeric() && b.is_numeric()) || std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// Whether the operand the record value is compared against is textual.
fn compares_strings(
    operator: Operator,
    selector: Option<ElementSelector>,
    value1: &Value,
    value2: Option<&Value>,
) -> bool {
    let compared = match (operator, selector) {
        (Operator::MapValEqByKey, _) | (Operator::Containing, Some(ElementSelector::KeyValue)) => {
            value2
        }
        _ => Some(value1),
    };
    match compared {
        Some(Value::String(_)) => true,
        Some(Value::List(items)) if operator == Operator::In => {
            !items.is_empty() && items.iter().all(|v| matches!(v, Value::String(_)))
        }
        _ => false,
    }
}
