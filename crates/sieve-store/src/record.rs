use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sieve_query::{EXPIRATION_FIELD, GENERATION_FIELD, Value};

/// A stored record: a primary key, named bins, and server-maintained metadata.
///
/// `generation` counts writes to the record. `expiration` is an absolute
/// timestamp in seconds, or `None` for records that never expire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    #[serde(default)]
    pub bins: BTreeMap<String, Value>,
    #[serde(default)]
    pub generation: u32,
    #[serde(default)]
    pub expiration: Option<i64>,
}

impl Record {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            bins: BTreeMap::new(),
            generation: 0,
            expiration: None,
        }
    }

    pub fn with(mut self, bin: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bins.insert(bin.into(), value.into());
        self
    }

    pub fn expires_at(mut self, expiration: i64) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn get(&self, bin: &str) -> Option<&Value> {
        self.bins.get(bin)
    }

    /// Resolve a field path against the record's bins.
    ///
    /// An exact bin name wins. Otherwise the path is split on `.` and walked
    /// through string-keyed maps, with numeric segments indexing into lists.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.bins.get(path) {
            return Some(value);
        }
        let mut segments = path.split('.');
        let mut current = self.bins.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Map(_) => current.get(segment)?,
                Value::List(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Resolve a predicate field, including the `@generation` and
    /// `@expiration` metadata pseudo-fields.
    pub fn resolve(&self, field: &str) -> Option<Cow<'_, Value>> {
        match field {
            GENERATION_FIELD => Some(Cow::Owned(Value::Int(i64::from(self.generation)))),
            EXPIRATION_FIELD => self.expiration.map(|ts| Cow::Owned(Value::Int(ts))),
            _ => self.get_path(field).map(Cow::Borrowed),
        }
    }
}
