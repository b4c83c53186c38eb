use std::sync::Arc;

use sieve_query::PredicateTree;
use sieve_store::{IndexCatalog, IndexQuery, Record, RecordStore};

use crate::config::SharedConfig;
use crate::cursor::{RecordCursor, ScanState};
use crate::error::DbError;
use crate::evaluator::RecordEvaluator;
use crate::planner::FilterPlanner;

/// Parameters of one `select`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectRequest {
    pub collection: String,
    pub predicate: Option<PredicateTree>,
    pub index_hint: Option<IndexQuery>,
    /// Overrides the configured `max_records` for this scan.
    pub max_records: Option<usize>,
}

impl SelectRequest {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            predicate: None,
            index_hint: None,
            max_records: None,
        }
    }

    pub fn predicate(mut self, predicate: impl Into<PredicateTree>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Push `hint` to storage as given instead of planning one; the whole
    /// predicate is then evaluated as the residual.
    pub fn index_hint(mut self, hint: IndexQuery) -> Self {
        self.index_hint = Some(hint);
        self
    }

    pub fn max_records(mut self, max_records: usize) -> Self {
        self.max_records = Some(max_records);
        self
    }
}

/// Plans and runs selects against a record store and its index catalog.
///
/// The engine owns no threads; the streaming [`select`](Self::select) and
/// the materializing [`select_all`](Self::select_all) share one code path.
pub struct QueryEngine<S, C> {
    store: S,
    catalog: C,
    config: Arc<SharedConfig>,
    evaluator: RecordEvaluator,
}

impl<S: RecordStore, C: IndexCatalog> QueryEngine<S, C> {
    pub fn new(store: S, catalog: C) -> Self {
        Self {
            store,
            catalog,
            config: Arc::new(SharedConfig::default()),
            evaluator: RecordEvaluator::default(),
        }
    }

    pub fn with_config(mut self, config: Arc<SharedConfig>) -> Self {
        self.config = config;
        self
    }

    pub fn with_evaluator(mut self, evaluator: RecordEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Start a lazy scan. Configuration is read once, here.
    pub fn select(&self, request: &SelectRequest) -> Result<RecordCursor<'_>, DbError> {
        let collection = request.collection.as_str();
        let config = self.config.snapshot();
        let max_records = request.max_records.unwrap_or(config.max_records);
        let mut cursor = RecordCursor::new(collection, self.evaluator.clone(), max_records);

        cursor.transition(ScanState::Planning);
        let planned = FilterPlanner::new(&self.catalog, &config).plan(
            collection,
            request.predicate.as_ref(),
            request.index_hint.as_ref(),
        );
        let plan = match planned {
            Ok(plan) => plan,
            Err(err) => {
                cursor.transition(ScanState::Failed);
                return Err(err);
            }
        };

        let (state, opened) = match &plan.pushed {
            Some(query) => (
                ScanState::IndexScanning,
                self.store.query_range(collection, query),
            ),
            None => (ScanState::FullScanning, self.store.scan_all(collection)),
        };
        match opened {
            Ok(source) => {
                cursor.start(plan, source, state);
                Ok(cursor)
            }
            Err(source) => {
                cursor.transition(ScanState::Failed);
                let err = DbError::Storage {
                    collection: collection.to_string(),
                    filter: plan.pushed.as_ref().map(ToString::to_string),
                    source,
                };
                tracing::warn!(collection, error = %err, "failed to open scan");
                Err(err)
            }
        }
    }

    /// Run a scan to completion. Either every matching record or the first
    /// error is returned.
    pub fn select_all(&self, request: &SelectRequest) -> Result<Vec<Record>, DbError> {
        self.select(request)?.collect()
    }

    pub fn count(&self, request: &SelectRequest) -> Result<usize, DbError> {
        self.select(request)?
            .try_fold(0, |count, record| record.map(|_| count + 1))
    }
}
