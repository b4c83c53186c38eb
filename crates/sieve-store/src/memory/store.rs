use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use arc_swap::ArcSwap;
use imbl::OrdMap;

use crate::error::StoreError;
use crate::index::{IndexCatalog, IndexDescriptor, IndexQuery, IndexType};
use crate::record::Record;
use crate::store::{RecordStore, RecordStream};

use super::index::SecondaryIndex;

/// One collection's state. Cloning is cheap due to imbl structural sharing,
/// so readers hold a snapshot while writers swap in a modified copy.
#[derive(Debug, Clone, Default)]
pub(crate) struct CollectionData {
    /// Primary key -> BSON-encoded record.
    records: OrdMap<String, Vec<u8>>,
    /// Index name -> index.
    indexes: OrdMap<String, SecondaryIndex>,
}

/// In-memory record store with secondary indexes.
///
/// Scans read from a snapshot taken when the stream is opened, so writes
/// made while a stream is being consumed are not observed by it.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Arc<ArcSwap<CollectionData>>>>,
    write_lock: Mutex<()>,
    open_cursors: Arc<AtomicUsize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
            open_cursors: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a collection. Creating one that already exists is a no-op.
    pub fn create_collection(&self, name: &str) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Storage(format!("collection lock poisoned: {e}")))?;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ArcSwap::from_pointee(CollectionData::default())));
        Ok(())
    }

    /// Insert or replace a record, returning its new generation.
    ///
    /// The stored generation is one past the previous record's, starting at 1.
    pub fn put(&self, collection: &str, mut record: Record) -> Result<u32, StoreError> {
        let handle = self.collection(collection)?;
        let _guard = self.lock_writes()?;

        let mut data = (**handle.load()).clone();
        let previous = data.records.get(&record.key).map(|b| decode(b)).transpose()?;
        if let Some(previous) = &previous {
            update_indexes(&mut data.indexes, |index| index.remove(previous));
        }

        record.generation = previous.map_or(1, |p| p.generation.saturating_add(1));
        let bytes = bson::serialize_to_vec(&record)
            .map_err(|e| StoreError::Encoding(format!("failed to encode {}: {e}", record.key)))?;
        update_indexes(&mut data.indexes, |index| index.insert(&record));
        data.records.insert(record.key.clone(), bytes);
        handle.store(Arc::new(data));
        Ok(record.generation)
    }

    /// Remove a record. Returns whether it existed.
    pub fn delete(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        let handle = self.collection(collection)?;
        let _guard = self.lock_writes()?;

        let mut data = (**handle.load()).clone();
        let Some(bytes) = data.records.remove(key) else {
            return Ok(false);
        };
        let previous = decode(&bytes)?;
        update_indexes(&mut data.indexes, |index| index.remove(&previous));
        handle.store(Arc::new(data));
        Ok(true)
    }

    pub fn get(&self, collection: &str, key: &str) -> Result<Option<Record>, StoreError> {
        let data = self.collection(collection)?.load_full();
        data.records.get(key).map(|b| decode(b)).transpose()
    }

    pub fn len(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.collection(collection)?.load().records.len())
    }

    pub fn is_empty(&self, collection: &str) -> Result<bool, StoreError> {
        Ok(self.len(collection)? == 0)
    }

    /// Build a secondary index over `field`, indexing existing records.
    pub fn create_index(
        &self,
        collection: &str,
        name: &str,
        field: &str,
        index_type: IndexType,
    ) -> Result<(), StoreError> {
        let handle = self.collection(collection)?;
        let _guard = self.lock_writes()?;

        let mut data = (**handle.load()).clone();
        if data.indexes.contains_key(name) {
            return Err(StoreError::IndexExists(name.to_string()));
        }
        let mut index = SecondaryIndex::new(IndexDescriptor {
            collection: collection.to_string(),
            name: name.to_string(),
            field: field.to_string(),
            index_type,
        });
        for bytes in data.records.values() {
            index.insert(&decode(bytes)?);
        }
        data.indexes.insert(name.to_string(), index);
        handle.store(Arc::new(data));
        tracing::debug!(collection, name, field, %index_type, "created index");
        Ok(())
    }

    /// Drop a secondary index. Returns whether it existed.
    pub fn drop_index(&self, collection: &str, name: &str) -> Result<bool, StoreError> {
        let handle = self.collection(collection)?;
        let _guard = self.lock_writes()?;

        let mut data = (**handle.load()).clone();
        if data.indexes.remove(name).is_none() {
            return Ok(false);
        }
        handle.store(Arc::new(data));
        tracing::debug!(collection, name, "dropped index");
        Ok(true)
    }

    /// Number of record streams handed out and not yet dropped.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    fn collection(&self, name: &str) -> Result<Arc<ArcSwap<CollectionData>>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Storage(format!("collection lock poisoned: {e}")))?;
        collections
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|e| StoreError::Storage(format!("write lock poisoned: {e}")))
    }

    fn open(
        &self,
        iter: impl Iterator<Item = Result<Record, StoreError>> + 'static,
    ) -> RecordStream<'_> {
        Box::new(MemoryCursor::new(iter, Arc::clone(&self.open_cursors)))
    }
}

impl RecordStore for MemoryStore {
    fn scan_all(&self, collection: &str) -> Result<RecordStream<'_>, StoreError> {
        let snapshot = self.collection(collection)?.load_full();
        tracing::trace!(collection, records = snapshot.records.len(), "opening full scan");
        let records = snapshot.records.clone();
        Ok(self.open(records.into_iter().map(|(_, bytes)| decode(&bytes))))
    }

    fn query_range(
        &self,
        collection: &str,
        query: &IndexQuery,
    ) -> Result<RecordStream<'_>, StoreError> {
        let snapshot = self.collection(collection)?.load_full();
        let index = snapshot
            .indexes
            .values()
            .find(|index| index.descriptor.field == query.field)
            .ok_or_else(|| StoreError::IndexNotFound {
                collection: collection.to_string(),
                field: query.field.clone(),
            })?;
        let keys = index.lookup(query)?;
        tracing::trace!(collection, %query, candidates = keys.len(), "opening index scan");

        let records = snapshot.records.clone();
        Ok(self.open(keys.into_iter().filter_map(move |key| {
            records.get(&key).map(|bytes| decode(bytes))
        })))
    }
}

impl IndexCatalog for MemoryStore {
    fn lookup_index(&self, collection: &str, field: &str) -> Option<IndexDescriptor> {
        let data = self.collection(collection).ok()?.load_full();
        data.indexes
            .values()
            .find(|index| index.descriptor.field == field)
            .map(|index| index.descriptor.clone())
    }
}

fn update_indexes(
    indexes: &mut OrdMap<String, SecondaryIndex>,
    mut apply: impl FnMut(&mut SecondaryIndex),
) {
    let names: Vec<String> = indexes.keys().cloned().collect();
    for name in names {
        if let Some(index) = indexes.get_mut(&name) {
            apply(index);
        }
    }
}

fn decode(bytes: &[u8]) -> Result<Record, StoreError> {
    bson::deserialize_from_slice(bytes)
        .map_err(|e| StoreError::Encoding(format!("invalid stored record: {e}")))
}

/// Record stream over a snapshot that tracks itself in the store's
/// open-cursor count until dropped.
struct MemoryCursor<I> {
    inner: I,
    open: Arc<AtomicUsize>,
}

impl<I> MemoryCursor<I> {
    fn new(inner: I, open: Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self { inner, open }
    }
}

impl<I: Iterator<Item = Result<Record, StoreError>>> Iterator for MemoryCursor<I> {
    type Item = Result<Record, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<I> Drop for MemoryCursor<I> {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!("released memory cursor");
    }
}
