mod common;
use common::*;

use std::sync::Arc;

use sieve_db::{DbError, EngineConfig, QueryEngine, ScanState, SelectRequest, SharedConfig};
use sieve_query::Predicate;
use sieve_store::{
    IndexCatalog, IndexDescriptor, IndexQuery, Record, RecordStore, RecordStream, StoreError,
};

fn no_scans() -> Arc<SharedConfig> {
    Arc::new(SharedConfig::new(EngineConfig {
        scans_enabled: false,
        ..EngineConfig::default()
    }))
}

// ── Scans disabled ──────────────────────────────────────────────

#[test]
fn full_scan_rejected_when_scans_disabled() {
    let fx = populate();
    let engine = fx.engine().with_config(no_scans());

    let request = select(PEOPLE, leaf(Predicate::eq("name", "Person 3").unwrap()));
    let err = engine.select(&request).err().unwrap();
    assert!(matches!(err, DbError::ScansDisabled { ref collection } if collection == PEOPLE));

    // no predicate at all is a full scan too
    let err = engine.select_all(&SelectRequest::new(PEOPLE)).unwrap_err();
    assert!(matches!(err, DbError::ScansDisabled { .. }));
}

#[test]
fn indexed_select_allowed_when_scans_disabled() {
    let fx = populate();
    let engine = fx.engine().with_config(no_scans());

    let request = select(PEOPLE, leaf(Predicate::eq("age", 29).unwrap()));
    let records = engine.select_all(&request).unwrap();
    assert_eq!(keys(records), fx.expected_people(|r| age(r) == 29));
}

// ── Configuration snapshot ──────────────────────────────────────

#[test]
fn config_changes_do_not_affect_running_scan() {
    let fx = populate();
    let config = Arc::new(SharedConfig::default());
    let engine = fx.engine().with_config(Arc::clone(&config));

    let mut cursor = engine.select(&SelectRequest::new(PEOPLE)).unwrap();
    cursor.next().unwrap().unwrap();

    config.set_scans_enabled(false);
    config.set_max_records(1);

    let rest = cursor.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(rest.len(), PEOPLE_COUNT - 1);

    // the next scan sees the new values
    let err = engine.select(&SelectRequest::new(PEOPLE)).err().unwrap();
    assert!(matches!(err, DbError::ScansDisabled { .. }));
}

#[test]
fn writes_after_start_are_not_seen() {
    let fx = populate();
    let engine = fx.engine();

    let cursor = engine.select(&SelectRequest::new(PEOPLE)).unwrap();
    fx.store
        .put(PEOPLE, Record::new("person-new").with("age", 30))
        .unwrap();
    fx.store.delete(PEOPLE, "person-000").unwrap();

    let records = cursor.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(records.len(), PEOPLE_COUNT);
    assert!(records.iter().any(|r| r.key == "person-000"));
}

// ── Record cap ──────────────────────────────────────────────────

#[test]
fn configured_max_records_caps_the_scan() {
    let fx = populate();
    let config = Arc::new(SharedConfig::new(EngineConfig {
        max_records: 7,
        ..EngineConfig::default()
    }));
    let engine = fx.engine().with_config(config);

    let mut cursor = engine.select(&SelectRequest::new(PEOPLE)).unwrap();
    let mut seen = 0;
    for record in cursor.by_ref() {
        record.unwrap();
        seen += 1;
    }
    assert_eq!(seen, 7);
    assert_eq!(cursor.state(), ScanState::Exhausted);
    assert_eq!(cursor.yielded(), 7);
}

#[test]
fn request_max_records_overrides_config() {
    let fx = populate();
    let engine = fx.engine();

    let request = select(PEOPLE, leaf(Predicate::eq("color", "red").unwrap())).max_records(3);
    let records = engine.select_all(&request).unwrap();
    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(color(record), "red");
    }

    let none = SelectRequest::new(PEOPLE).max_records(0);
    assert!(engine.select_all(&none).unwrap().is_empty());
}

// ── Cancellation and resource release ───────────────────────────

#[test]
fn cancel_yields_error_and_releases_cursor() {
    let fx = populate();
    let engine = fx.engine();

    let mut cursor = engine.select(&SelectRequest::new(PEOPLE)).unwrap();
    let handle = cursor.cancel_handle();
    cursor.next().unwrap().unwrap();
    assert_eq!(fx.store.open_cursors(), 1);

    handle.cancel();
    assert!(matches!(cursor.next(), Some(Err(DbError::Cancelled { .. }))));
    assert_eq!(cursor.state(), ScanState::Failed);
    assert_eq!(fx.store.open_cursors(), 0);
    assert!(cursor.next().is_none());
}

#[test]
fn cancel_from_another_thread() {
    let fx = populate();
    let engine = fx.engine();
    let mut cursor = engine.select(&SelectRequest::new(PEOPLE)).unwrap();
    let handle = cursor.cancel_handle();

    std::thread::spawn(move || handle.cancel()).join().unwrap();

    assert!(matches!(cursor.next(), Some(Err(DbError::Cancelled { .. }))));
    assert_eq!(cursor.yielded(), 0);
}

#[test]
fn cursor_released_on_exhaustion_cap_and_drop() {
    let fx = populate();
    let engine = fx.engine();

    let mut cursor = engine.select(&SelectRequest::new(PLACES)).unwrap();
    assert_eq!(fx.store.open_cursors(), 1);
    while cursor.next().is_some() {}
    assert_eq!(cursor.state(), ScanState::Exhausted);
    assert_eq!(fx.store.open_cursors(), 0);

    let mut capped = engine
        .select(&SelectRequest::new(PEOPLE).max_records(2))
        .unwrap();
    capped.next().unwrap().unwrap();
    capped.next().unwrap().unwrap();
    assert_eq!(fx.store.open_cursors(), 0);

    let abandoned = engine.select(&SelectRequest::new(PEOPLE)).unwrap();
    assert_eq!(fx.store.open_cursors(), 1);
    drop(abandoned);
    assert_eq!(fx.store.open_cursors(), 0);
}

#[test]
fn evaluation_error_releases_cursor() {
    let fx = populate();
    let engine = fx.engine();
    let request = select(PEOPLE, leaf(Predicate::starts_with("age", "2").unwrap()));

    let mut cursor = engine.select(&request).unwrap();
    assert!(matches!(cursor.next(), Some(Err(DbError::TypeMismatch { .. }))));
    assert_eq!(fx.store.open_cursors(), 0);
}

// ── Storage failures ────────────────────────────────────────────

/// Yields `good` records, then fails.
struct FailingStore {
    good: usize,
}

impl RecordStore for FailingStore {
    fn scan_all(&self, _collection: &str) -> Result<RecordStream<'_>, StoreError> {
        let records = (0..self.good).map(|i| Ok(Record::new(format!("r{i}")).with("n", i as i64)));
        let failure = std::iter::once(Err(StoreError::Storage("disk went away".into())));
        Ok(Box::new(records.chain(failure)))
    }

    fn query_range(
        &self,
        collection: &str,
        _query: &IndexQuery,
    ) -> Result<RecordStream<'_>, StoreError> {
        Err(StoreError::CollectionNotFound(collection.to_string()))
    }
}

struct NoIndexes;

impl IndexCatalog for NoIndexes {
    fn lookup_index(&self, _collection: &str, _field: &str) -> Option<IndexDescriptor> {
        None
    }
}

#[test]
fn mid_scan_storage_error_carries_context() {
    let engine = QueryEngine::new(FailingStore { good: 2 }, NoIndexes);
    let mut cursor = engine.select(&SelectRequest::new("events")).unwrap();

    cursor.next().unwrap().unwrap();
    cursor.next().unwrap().unwrap();
    let err = cursor.next().unwrap().unwrap_err();
    assert!(matches!(
        err,
        DbError::Storage { ref collection, filter: None, source: StoreError::Storage(_) }
            if collection == "events"
    ));
    assert!(err.to_string().contains("events"));
    assert!(err.to_string().contains("disk went away"));
    assert!(cursor.next().is_none());
}

#[test]
fn open_failure_carries_pushed_filter() {
    let engine = QueryEngine::new(FailingStore { good: 0 }, NoIndexes);
    let request =
        SelectRequest::new("events").index_hint(IndexQuery::between("n", 1, 5));
    let err = engine.select(&request).err().unwrap();
    assert!(matches!(
        err,
        DbError::Storage { ref filter, .. } if filter.as_deref() == Some("n BETWEEN 1, 5")
    ));
}

#[test]
fn unknown_collection_is_a_storage_error() {
    let fx = populate();
    let err = fx.engine().select(&SelectRequest::new("nope")).err().unwrap();
    assert!(matches!(
        err,
        DbError::Storage { source: StoreError::CollectionNotFound(_), .. }
    ));
}
