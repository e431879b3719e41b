//! Backward, calendar-aware critical-path scheduling for marketing assets.
//!
//! Given one asset's tasks, optional dependencies and a go-live date, the
//! engine works backward over a working-day calendar and returns concrete
//! start/end dates with float and criticality for every task.
//!
//! Pipeline per asset: validation, graph construction, CPM forward/backward
//! passes, then calendar date assignment. Assets without dependencies can use
//! the legacy sequential chain instead.

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

pub mod calendar;
pub mod config;
pub mod critical_path;
pub mod date_assignment;
pub mod graph;
mod interner;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod validation;

#[cfg(feature = "python")]
mod python;

pub use calendar::{Calendar, CalendarError, MAX_CALENDAR_STEPS};
pub use config::{DurationOverrides, SchedulingConfig, SchedulingMode};
pub use critical_path::{calculate_critical_path, CriticalPathResult, TaskTiming};
pub use date_assignment::{floor_warnings, DateAssigner, DateAssignmentError};
pub use graph::{CycleError, EdgeOrigin, GraphEdge, GraphError, TaskGraph};
pub use interner::NodeId;
pub use models::{
    Dependency, DependencyType, ScheduleOutcome, ScheduleWarning, ScheduledTask, Task,
};
pub use scheduler::{schedule, AssetScheduler, ScheduleError};
pub use validation::{validate, ValidEdgeSet, ValidationError, ValidationErrorKind};
