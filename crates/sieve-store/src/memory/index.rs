use std::cmp::Ordering;
use std::ops::Bound;

use imbl::{OrdMap, OrdSet};
use sieve_query::{GeoJson, Operator, Value};

use crate::error::StoreError;
use crate::index::{IndexDescriptor, IndexQuery, IndexType};
use crate::record::Record;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum IndexKey {
    Num(NumKey),
    Str(String),
}

/// Numeric index key ordering integers and floats on one axis.
///
/// Floats holding an integral value in `i64` range are stored as integers,
/// so equal numbers share a key. The remaining floats order against
/// integers through `f64::total_cmp`, with integers first on a tie.
#[derive(Debug, Clone, Copy)]
enum NumKey {
    Int(i64),
    Float(f64),
}

impl NumKey {
    fn from_float(f: f64) -> Self {
        let limit = -(i64::MIN as f64);
        if f.fract() == 0.0 && f >= -limit && f < limit {
            NumKey::Int(f as i64)
        } else {
            NumKey::Float(f)
        }
    }
}

impl Ord for NumKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (NumKey::Int(a), NumKey::Int(b)) => a.cmp(b),
            (NumKey::Float(a), NumKey::Float(b)) => a.total_cmp(b),
            (NumKey::Int(a), NumKey::Float(b)) => {
                (*a as f64).total_cmp(b).then(Ordering::Less)
            }
            (NumKey::Float(a), NumKey::Int(b)) => {
                a.total_cmp(&(*b as f64)).then(Ordering::Greater)
            }
        }
    }
}

impl PartialOrd for NumKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NumKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NumKey {}

#[derive(Debug, Clone)]
enum Entries {
    /// Sorted index key -> primary keys holding that value.
    Ordered(OrdMap<IndexKey, OrdSet<String>>),
    /// Primary key -> indexed point.
    Geo(OrdMap<String, GeoJson>),
}

/// An in-memory secondary index over one field of one collection.
#[derive(Debug, Clone)]
pub(crate) struct SecondaryIndex {
    pub(crate) descriptor: IndexDescriptor,
    entries: Entries,
}

impl SecondaryIndex {
    pub(crate) fn new(descriptor: IndexDescriptor) -> Self {
        let entries = match descriptor.index_type {
            IndexType::Geo2dSphere => Entries::Geo(OrdMap::new()),
            IndexType::Numeric | IndexType::String => Entries::Ordered(OrdMap::new()),
        };
        Self {
            descriptor,
            entries,
        }
    }

    /// Index `record` if its field holds a value of the index's type
    /// (integer or float for NUMERIC). Records with a missing or differently
    /// typed value are skipped.
    pub(crate) fn insert(&mut self, record: &Record) {
        let Some(value) = record.get_path(&self.descriptor.field) else {
            return;
        };
        match &mut self.entries {
            Entries::Ordered(map) => {
                if let Some(key) = index_key(self.descriptor.index_type, value) {
                    map.entry(key).or_insert_with(OrdSet::new).insert(record.key.clone());
                }
            }
            Entries::Geo(map) => {
                if let Value::Geo(point @ GeoJson::Point { .. }) = value {
                    map.insert(record.key.clone(), point.clone());
                }
            }
        }
    }

    pub(crate) fn remove(&mut self, record: &Record) {
        let Some(value) = record.get_path(&self.descriptor.field) else {
            return;
        };
        match &mut self.entries {
            Entries::Ordered(map) => {
                let Some(key) = index_key(self.descriptor.index_type, value) else {
                    return;
                };
                if let Some(keys) = map.get_mut(&key) {
                    keys.remove(&record.key);
                    if keys.is_empty() {
                        map.remove(&key);
                    }
                }
            }
            Entries::Geo(map) => {
                map.remove(&record.key);
            }
        }
    }

    /// Primary keys matching `query`, in index order.
    pub(crate) fn lookup(&self, query: &IndexQuery) -> Result<Vec<String>, StoreError> {
        match &self.entries {
            Entries::Ordered(map) => {
                let (start, end) = self.bounds(query)?;
                if is_empty_range(&start, &end) {
                    return Ok(Vec::new());
                }
                Ok(map
                    .range((start, end))
                    .flat_map(|(_, keys)| keys.iter().cloned())
                    .collect())
            }
            Entries::Geo(map) => {
                let region = match (query.operator, &query.bound1) {
                    (Operator::GeoWithin, Value::Geo(region)) => region,
                    _ => return Err(self.unsupported(query, "expected GEO_WITHIN with a region")),
                };
                Ok(map
                    .iter()
                    .filter(|(_, point)| region.contains(point) == Some(true))
                    .map(|(key, _)| key.clone())
                    .collect())
            }
        }
    }

    fn bounds(&self, query: &IndexQuery) -> Result<(Bound<IndexKey>, Bound<IndexKey>), StoreError> {
        let index_type = self.descriptor.index_type;
        let bound1 = index_key(index_type, &query.bound1)
            .ok_or_else(|| self.unsupported(query, "operand does not match index type"))?;
        let bounds = match query.operator {
            Operator::Eq => (Bound::Included(bound1.clone()), Bound::Included(bound1)),
            Operator::Lt => (Bound::Unbounded, Bound::Excluded(bound1)),
            Operator::LtEq => (Bound::Unbounded, Bound::Included(bound1)),
            Operator::Gt => (Bound::Excluded(bound1), Bound::Unbounded),
            Operator::GtEq => (Bound::Included(bound1), Bound::Unbounded),
            Operator::Between => {
                let bound2 = query
                    .bound2
                    .as_ref()
                    .and_then(|v| index_key(index_type, v))
                    .ok_or_else(|| self.unsupported(query, "missing or mistyped upper bound"))?;
                (Bound::Included(bound1), Bound::Excluded(bound2))
            }
            _ => return Err(self.unsupported(query, "operator is not index-answerable")),
        };
        Ok(bounds)
    }

    fn unsupported(&self, query: &IndexQuery, reason: &str) -> StoreError {
        StoreError::UnsupportedQuery {
            field: query.field.clone(),
            operator: query.operator,
            reason: format!("{reason} ({} index)", self.descriptor.index_type),
        }
    }
}

fn index_key(index_type: IndexType, value: &Value) -> Option<IndexKey> {
    match (index_type, value) {
        (IndexType::Numeric, Value::Int(i)) => Some(IndexKey::Num(NumKey::Int(*i))),
        (IndexType::Numeric, Value::Float(f)) => Some(IndexKey::Num(NumKey::from_float(*f))),
        (IndexType::String, Value::String(s)) => Some(IndexKey::Str(s.clone())),
        _ => None,
    }
}

/// Inverted or degenerate ranges select nothing.
fn is_empty_range(start: &Bound<IndexKey>, end: &Bound<IndexKey>) -> bool {
    match (start, end) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}
