use std::sync::Arc;

use crate::error::StoreError;
use crate::index::IndexQuery;
use crate::record::Record;

/// Lazily pulled record stream. Dropping it releases the storage cursor.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<Record, StoreError>> + 'a>;

pub trait RecordStore {
    /// Stream every record in `collection`.
    fn scan_all(&self, collection: &str) -> Result<RecordStream<'_>, StoreError>;

    /// Stream the records whose indexed `query.field` satisfies the query.
    ///
    /// Range semantics: `EQ` is exact, `LT`/`GT` are strict, `LTEQ`/`GTEQ`
    /// are inclusive, and `BETWEEN` is `[bound1, bound2)`. `GEO_WITHIN`
    /// yields records whose indexed point lies inside the region.
    fn query_range(
        &self,
        collection: &str,
        query: &IndexQuery,
    ) -> Result<RecordStream<'_>, StoreError>;
}

impl<T: RecordStore + ?Sized> RecordStore for &T {
    fn scan_all(&self, collection: &str) -> Result<RecordStream<'_>, StoreError> {
        (**self).scan_all(collection)
    }

    fn query_range(
        &self,
        collection: &str,
        query: &IndexQuery,
    ) -> Result<RecordStream<'_>, StoreError> {
        (**self).query_range(collection, query)
    }
}

impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn scan_all(&self, collection: &str) -> Result<RecordStream<'_>, StoreError> {
        (**self).scan_all(collection)
    }

    fn query_range(
        &self,
        collection: &str,
        query: &IndexQuery,
    ) -> Result<RecordStream<'_>, StoreError> {
        (**self).query_range(collection, query)
    }
}
