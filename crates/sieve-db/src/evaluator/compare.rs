use std::cmp::Ordering;

use sieve_query::{Predicate, Value};

use crate::error::DbError;

/// Scalar comparison rules shared by every leaf operator.
///
/// Integers compare exactly, an integer against a float compares as floats,
/// strings compare literally (case-folded when `fold` is set), booleans only
/// support equality. Any other pairing is a [`DbError::TypeMismatch`].
pub(super) struct Comparator<'p> {
    predicate: &'p Predicate,
}

impl<'p> Comparator<'p> {
    pub(super) const fn new(predicate: &'p Predicate) -> Self {
        Self { predicate }
    }

    pub(super) fn eq(&self, stored: &Value, operand: &Value, fold: bool) -> Result<bool, DbError> {
        match (stored, operand) {
            (Value::Int(a), Value::Int(b)) => Ok(a == b),
            (Value::String(a), Value::String(b)) => Ok(if fold {
                a.to_lowercase() == b.to_lowercase()
            } else {
                a == b
            }),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Geo(a), Value::Geo(b)) => Ok(a == b),
            _ => Ok(self.numeric(stored, operand)? == Ordering::Equal),
        }
    }

    pub(super) fn order(
        &self,
        stored: &Value,
        operand: &Value,
        fold: bool,
    ) -> Result<Ordering, DbError> {
        match (stored, operand) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::String(a), Value::String(b)) if fold => {
                Ok(a.to_lowercase().cmp(&b.to_lowercase()))
            }
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            _ => self.numeric(stored, operand),
        }
    }

    /// Inclusive on both bounds.
    pub(super) fn between(
        &self,
        stored: &Value,
        lower: &Value,
        upper: &Value,
        fold: bool,
    ) -> Result<bool, DbError> {
        Ok(self.order(stored, lower, fold)? != Ordering::Less
            && self.order(stored, upper, fold)? != Ordering::Greater)
    }

    /// Literal prefix, suffix or substring test; the operand is never a pattern.
    pub(super) fn text(
        &self,
        stored: &Value,
        operand: &Value,
        fold: bool,
        test: fn(&str, &str) -> bool,
    ) -> Result<bool, DbError> {
        match (stored, operand) {
            (Value::String(haystack), Value::String(needle)) if fold => {
                Ok(test(&haystack.to_lowercase(), &needle.to_lowercase()))
            }
            (Value::String(haystack), Value::String(needle)) => Ok(test(haystack, needle)),
            (_, Value::String(_)) => Err(self.mismatch("string", stored)),
            _ => Err(self.mismatch(operand.kind(), stored)),
        }
    }

    fn numeric(&self, stored: &Value, operand: &Value) -> Result<Ordering, DbError> {
        match (stored.as_f64(), operand.as_f64()) {
            (Some(a), Some(b)) => Ok(a.total_cmp(&b)),
            _ => Err(self.mismatch(operand.kind(), stored)),
        }
    }

    pub(super) fn mismatch(&self, expected: &str, found: &Value) -> DbError {
        DbError::TypeMismatch {
            field: self.predicate.field().to_string(),
            operator: self.predicate.operator(),
            expected: expected.to_string(),
            found: found.kind().to_string(),
        }
    }
}
