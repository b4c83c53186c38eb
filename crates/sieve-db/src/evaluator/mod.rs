mod compare;

use std::fmt;
use std::sync::Arc;

use sieve_query::{ElementSelector, GeoJson, Operator, Predicate, PredicateTree, Value};
use sieve_store::Record;

use crate::error::DbError;

use compare::Comparator;

/// Point-in-region test used by `GEO_WITHIN`.
pub trait GeoPredicate: Send + Sync {
    /// Whether `value` lies within `region`, or `None` when the pair of
    /// geometries cannot be tested.
    fn within(&self, value: &GeoJson, region: &GeoJson) -> Option<bool>;
}

/// Point containment in polygons (planar) and circles (haversine distance).
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoContainment;

impl GeoPredicate for GeoContainment {
    fn within(&self, value: &GeoJson, region: &GeoJson) -> Option<bool> {
        region.contains(value)
    }
}

/// Evaluates predicate trees against fetched records.
#[derive(Clone)]
pub struct RecordEvaluator {
    geo: Option<Arc<dyn GeoPredicate>>,
}

impl Default for RecordEvaluator {
    fn default() -> Self {
        Self::new(GeoContainment)
    }
}

impl fmt::Debug for RecordEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordEvaluator")
            .field("geo", &self.geo.is_some())
            .finish()
    }
}

impl RecordEvaluator {
    pub fn new(geo: impl GeoPredicate + 'static) -> Self {
        Self {
            geo: Some(Arc::new(geo)),
        }
    }

    /// An evaluator with no geo support; `GEO_WITHIN` fails with
    /// [`DbError::UnsupportedOperator`].
    pub fn without_geo() -> Self {
        Self { geo: None }
    }

    /// Accept or reject `record`.
    ///
    /// `And` stops at the first rejecting child, `Or` at the first accepting
    /// one, both in declaration order.
    pub fn evaluate(&self, record: &Record, tree: &PredicateTree) -> Result<bool, DbError> {
        match tree {
            PredicateTree::Leaf(predicate) => self.evaluate_leaf(record, predicate),
            PredicateTree::And(children) => {
                for child in children {
                    if !self.evaluate(record, child)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            PredicateTree::Or(children) => {
                for child in children {
                    if self.evaluate(record, child)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn evaluate_leaf(&self, record: &Record, p: &Predicate) -> Result<bool, DbError> {
        // missing field: reject
        let Some(stored) = record.resolve(p.field()) else {
            return Ok(false);
        };
        let stored = &*stored;
        let cmp = Comparator::new(p);
        let fold = p.ignore_case();
        let v1 = p.value1();

        match p.operator() {
            Operator::Eq => cmp.eq(stored, v1, fold),
            Operator::NotEq => cmp.eq(stored, v1, fold).map(|eq| !eq),
            Operator::Lt => Ok(cmp.order(stored, v1, fold)?.is_lt()),
            Operator::LtEq => Ok(cmp.order(stored, v1, fold)?.is_le()),
            Operator::Gt => Ok(cmp.order(stored, v1, fold)?.is_gt()),
            Operator::GtEq => Ok(cmp.order(stored, v1, fold)?.is_ge()),
            Operator::Between => cmp.between(stored, v1, second(p)?, fold),
            Operator::StartsWith => cmp.text(stored, v1, fold, |h, n| h.starts_with(n)),
            Operator::EndsWith => cmp.text(stored, v1, fold, |h, n| h.ends_with(n)),
            Operator::Containing => self.containing(&cmp, stored, p),
            Operator::In => {
                let candidates = v1.as_list().ok_or_else(|| cmp.mismatch("list", v1))?;
                any(candidates, |candidate| cmp.eq(stored, candidate, fold))
            }
            Operator::ListValContaining => {
                any(list(&cmp, stored)?, |item| cmp.eq(item, v1, fold))
            }
            Operator::ListValBetween => {
                let upper = second(p)?;
                any(list(&cmp, stored)?, |item| cmp.between(item, v1, upper, fold))
            }
            Operator::ListValGt => any(list(&cmp, stored)?, |item| {
                Ok(cmp.order(item, v1, fold)?.is_gt())
            }),
            Operator::ListValLtEq => any(list(&cmp, stored)?, |item| {
                Ok(cmp.order(item, v1, fold)?.is_le())
            }),
            Operator::MapKeysContain => {
                any(map(&cmp, stored)?, |(key, _)| cmp.eq(key, v1, fold))
            }
            Operator::MapValuesContain => {
                any(map(&cmp, stored)?, |(_, value)| cmp.eq(value, v1, fold))
            }
            Operator::MapKeysBetween => {
                let upper = second(p)?;
                any(map(&cmp, stored)?, |(key, _)| cmp.between(key, v1, upper, fold))
            }
            Operator::MapValBetween => {
                let upper = second(p)?;
                any(map(&cmp, stored)?, |(_, value)| {
                    cmp.between(value, v1, upper, fold)
                })
            }
            Operator::MapValGt => any(map(&cmp, stored)?, |(_, value)| {
                Ok(cmp.order(value, v1, fold)?.is_gt())
            }),
            Operator::MapValEqByKey => key_value(&cmp, stored, v1, second(p)?, fold),
            Operator::GeoWithin => self.geo_within(&cmp, stored, p),
        }
    }

    /// `CONTAINING` without a selector is a substring test on strings and
    /// membership on lists; maps need a selector.
    fn containing(
        &self,
        cmp: &Comparator<'_>,
        stored: &Value,
        p: &Predicate,
    ) -> Result<bool, DbError> {
        let fold = p.ignore_case();
        let v1 = p.value1();
        match (p.selector(), stored) {
            (None, Value::String(_)) => cmp.text(stored, v1, fold, |h, n| h.contains(n)),
            (None, Value::List(items)) | (Some(ElementSelector::Value), Value::List(items)) => {
                any(items, |item| cmp.eq(item, v1, fold))
            }
            (None, Value::Map(_)) => {
                Err(cmp.mismatch("string or list (maps need a selector)", stored))
            }
            (Some(ElementSelector::Key), Value::Map(entries)) => {
                any(entries, |(key, _)| cmp.eq(key, v1, fold))
            }
            (Some(ElementSelector::Value), Value::Map(entries)) => {
                any(entries, |(_, value)| cmp.eq(value, v1, fold))
            }
            (Some(ElementSelector::KeyValue), Value::Map(_)) => {
                key_value(cmp, stored, v1, second(p)?, fold)
            }
            (None, _) => Err(cmp.mismatch("string or list", stored)),
            (Some(ElementSelector::Value), _) => Err(cmp.mismatch("list or map", stored)),
            (Some(_), _) => Err(cmp.mismatch("map", stored)),
        }
    }

    fn geo_within(
        &self,
        cmp: &Comparator<'_>,
        stored: &Value,
        p: &Predicate,
    ) -> Result<bool, DbError> {
        let unsupported = |reason: &str| DbError::UnsupportedOperator {
            field: p.field().to_string(),
            operator: p.operator(),
            reason: reason.to_string(),
        };
        let geo = self
            .geo
            .as_ref()
            .ok_or_else(|| unsupported("no geo predicate configured"))?;
        let region = p.value1().as_geo().ok_or_else(|| cmp.mismatch("geo", p.value1()))?;
        let value = stored.as_geo().ok_or_else(|| cmp.mismatch("geo", stored))?;
        geo.within(value, region)
            .ok_or_else(|| unsupported("only point values can be tested for containment"))
    }
}

fn second(p: &Predicate) -> Result<&Value, DbError> {
    p.value2().ok_or_else(|| DbError::UnsupportedOperator {
        field: p.field().to_string(),
        operator: p.operator(),
        reason: "missing second operand".into(),
    })
}

fn list<'v>(cmp: &Comparator<'_>, stored: &'v Value) -> Result<&'v [Value], DbError> {
    stored.as_list().ok_or_else(|| cmp.mismatch("list", stored))
}

fn map<'v>(cmp: &Comparator<'_>, stored: &'v Value) -> Result<&'v [(Value, Value)], DbError> {
    stored.as_map().ok_or_else(|| cmp.mismatch("map", stored))
}

/// The map holds `key` mapped to a value equal to `expected`. Only the value
/// comparison is case-folded.
fn key_value(
    cmp: &Comparator<'_>,
    stored: &Value,
    key: &Value,
    expected: &Value,
    fold: bool,
) -> Result<bool, DbError> {
    let entries = map(cmp, stored)?;
    let mut found = None;
    for (k, v) in entries {
        if cmp.eq(k, key, false)? && found.is_none() {
            found = Some(v);
        }
    }
    match found {
        Some(v) => cmp.eq(v, expected, fold),
        None => Ok(false),
    }
}

/// Whether any element passes `test`. Every element is tested, so a type
/// mismatch anywhere in the container fails regardless of element order.
fn any<T>(
    items: &[T],
    mut test: impl FnMut(&T) -> Result<bool, DbError>,
) -> Result<bool, DbError> {
    let mut matched = false;
    for item in items {
        matched |= test(item)?;
    }
    Ok(matched)
}
