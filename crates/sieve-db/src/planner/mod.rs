pub mod plan;
#[allow(clippy::module_inception)]
pub mod planner;

pub use plan::Plan;
pub use planner::{FilterPlanner, plan};
