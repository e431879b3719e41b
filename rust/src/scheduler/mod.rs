//! Scheduling orchestrator.
//!
//! Chooses between the dependency-aware pipeline (validate, build graph, CPM,
//! assign dates) and the legacy sequential chain, one asset at a time.

mod core;
mod sequential;

pub use core::{schedule, AssetScheduler, ScheduleError};
