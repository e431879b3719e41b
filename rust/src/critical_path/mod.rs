//! Critical path method over a task graph.
//!
//! Works purely in abstract working-day offsets; mapping onto calendar dates
//! is the date assigner's job, so everything here is plain integer arithmetic.

mod calculation;
mod types;

pub use calculation::calculate_critical_path;
pub use types::{CriticalPathResult, TaskTiming};
