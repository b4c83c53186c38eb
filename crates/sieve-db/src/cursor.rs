use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sieve_store::{Record, RecordStream, StoreError};

use crate::error::DbError;
use crate::evaluator::RecordEvaluator;
use crate::planner::Plan;

/// Lifecycle of one scan.
///
/// `Idle -> Planning -> (IndexScanning | FullScanning) -> Streaming ->
/// Exhausted`, with `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Planning,
    IndexScanning,
    FullScanning,
    Streaming,
    Exhausted,
    Failed,
}

impl ScanState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, ScanState::Exhausted | ScanState::Failed)
    }
}

/// Cancels a running scan from another thread. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A lazy, forward-only stream of matching records.
///
/// The storage cursor is released as soon as the scan reaches a terminal
/// state (end of data, record cap, error or cancellation) and when the
/// cursor is dropped.
pub struct RecordCursor<'s> {
    collection: String,
    plan: Plan,
    evaluator: RecordEvaluator,
    source: Option<RecordStream<'s>>,
    state: ScanState,
    max_records: usize,
    yielded: usize,
    cancel: CancelHandle,
}

impl<'s> RecordCursor<'s> {
    pub(crate) fn new(collection: &str, evaluator: RecordEvaluator, max_records: usize) -> Self {
        Self {
            collection: collection.to_string(),
            plan: Plan::full_scan(),
            evaluator,
            source: None,
            state: ScanState::Idle,
            max_records,
            yielded: 0,
            cancel: CancelHandle::default(),
        }
    }

    /// Attach the planned storage stream; `state` is the scanning state
    /// matching how the stream was opened.
    pub(crate) fn start(&mut self, plan: Plan, source: RecordStream<'s>, state: ScanState) {
        self.plan = plan;
        self.source = Some(source);
        self.transition(state);
    }

    pub(crate) fn transition(&mut self, next: ScanState) {
        tracing::trace!(
            collection = %self.collection,
            from = ?self.state,
            to = ?next,
            "scan state"
        );
        self.state = next;
        if next.is_terminal() {
            self.source = None;
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Number of matching records yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn fail(&mut self, err: DbError) -> Option<Result<Record, DbError>> {
        tracing::warn!(collection = %self.collection, error = %err, "scan failed");
        self.transition(ScanState::Failed);
        Some(Err(err))
    }

    fn storage_error(&self, source: StoreError) -> DbError {
        DbError::Storage {
            collection: self.collection.clone(),
            filter: self.plan.pushed.as_ref().map(ToString::to_string),
            source,
        }
    }
}

impl Iterator for RecordCursor<'_> {
    type Item = Result<Record, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.state.is_terminal() {
                return None;
            }
            if self.yielded >= self.max_records {
                self.transition(ScanState::Exhausted);
                return None;
            }
            if self.cancel.is_cancelled() {
                let collection = self.collection.clone();
                return self.fail(DbError::Cancelled { collection });
            }

            let Some(source) = self.source.as_mut() else {
                self.transition(ScanState::Exhausted);
                return None;
            };
            let record = match source.next() {
                None => {
                    self.transition(ScanState::Exhausted);
                    return None;
                }
                Some(Err(e)) => {
                    let err = self.storage_error(e);
                    return self.fail(err);
                }
                Some(Ok(record)) => record,
            };
            if self.state != ScanState::Streaming {
                self.transition(ScanState::Streaming);
            }

            let accepted = match &self.plan.residual {
                Some(residual) => self.evaluator.evaluate(&record, residual),
                None => Ok(true),
            };
            match accepted {
                Ok(true) => {
                    self.yielded += 1;
                    if self.yielded >= self.max_records {
                        self.transition(ScanState::Exhausted);
                    }
                    return Some(Ok(record));
                }
                Ok(false) => continue,
                Err(err) => return self.fail(err),
            }
        }
    }
}
