mod config;
mod cursor;
mod engine;
mod error;
mod evaluator;
mod planner;

pub use config::{EngineConfig, SharedConfig};
pub use cursor::{CancelHandle, RecordCursor, ScanState};
pub use engine::{QueryEngine, SelectRequest};
pub use error::DbError;
pub use evaluator::{GeoContainment, GeoPredicate, RecordEvaluator};
pub use planner::{FilterPlanner, Plan, plan};

