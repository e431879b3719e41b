//! Core data types for the scheduling engine.

use chrono::NaiveDate;
use std::fmt;

/// How a dependency ties the successor to its predecessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DependencyType {
    /// Successor starts after the predecessor finishes.
    #[default]
    FinishToStart,
    /// Successor starts when the predecessor starts.
    StartToStart,
    /// Successor finishes when the predecessor finishes.
    FinishToFinish,
}

impl DependencyType {
    /// Short code used by the surrounding application ("FS", "SS", "FF").
    pub fn code(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "FS",
            DependencyType::StartToStart => "SS",
            DependencyType::FinishToFinish => "FF",
        }
    }

    /// Parse a short code, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "FS" => Some(DependencyType::FinishToStart),
            "SS" => Some(DependencyType::StartToStart),
            "FF" => Some(DependencyType::FinishToFinish),
            _ => None,
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A directed edge `predecessor_id -> successor_id`.
///
/// `lag_days` is in working days. A negative lag on a finish-to-start edge is
/// an overlap: the successor starts before the predecessor has finished.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub predecessor_id: String,
    pub successor_id: String,
    pub dependency_type: DependencyType,
    pub lag_days: i32,
}

impl Dependency {
    pub fn new(
        predecessor_id: impl Into<String>,
        successor_id: impl Into<String>,
        dependency_type: DependencyType,
        lag_days: i32,
    ) -> Self {
        Self {
            predecessor_id: predecessor_id.into(),
            successor_id: successor_id.into(),
            dependency_type,
            lag_days,
        }
    }

    pub fn finish_to_start(
        predecessor_id: impl Into<String>,
        successor_id: impl Into<String>,
        lag_days: i32,
    ) -> Self {
        Self::new(
            predecessor_id,
            successor_id,
            DependencyType::FinishToStart,
            lag_days,
        )
    }

    pub fn start_to_start(
        predecessor_id: impl Into<String>,
        successor_id: impl Into<String>,
        lag_days: i32,
    ) -> Self {
        Self::new(
            predecessor_id,
            successor_id,
            DependencyType::StartToStart,
            lag_days,
        )
    }

    pub fn finish_to_finish(
        predecessor_id: impl Into<String>,
        successor_id: impl Into<String>,
        lag_days: i32,
    ) -> Self {
        Self::new(
            predecessor_id,
            successor_id,
            DependencyType::FinishToFinish,
            lag_days,
        )
    }

    /// Working days of overlap requested by this edge (0 unless FS with negative lag).
    pub fn overlap_days(&self) -> u32 {
        match self.dependency_type {
            DependencyType::FinishToStart if self.lag_days < 0 => self.lag_days.unsigned_abs(),
            _ => 0,
        }
    }
}

/// A task of one asset, as supplied by the catalog or inserted by a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub name: String,
    /// Working days. The terminal task always occupies exactly its go-live day.
    pub duration_days: u32,
    /// Owning team or role; carried through untouched.
    pub owner_tag: String,
    /// Grouping key. Dependencies may only connect tasks of the same asset.
    pub asset_id: String,
    /// The go-live event the schedule is anchored to.
    pub is_terminal: bool,
    /// Inserted by a user rather than the catalog template.
    pub is_custom: bool,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        duration_days: u32,
        asset_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration_days,
            owner_tag: String::new(),
            asset_id: asset_id.into(),
            is_terminal: false,
            is_custom: false,
        }
    }

    /// Mark this task as the asset's go-live event.
    pub fn terminal(mut self) -> Self {
        self.is_terminal = true;
        self
    }

    pub fn custom(mut self) -> Self {
        self.is_custom = true;
        self
    }

    pub fn with_owner(mut self, owner_tag: impl Into<String>) -> Self {
        self.owner_tag = owner_tag.into();
        self
    }
}

/// A task with concrete calendar dates. The only artifact handed back to callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledTask {
    pub task_id: String,
    pub name: String,
    pub owner_tag: String,
    pub asset_id: String,
    pub is_terminal: bool,
    pub is_custom: bool,
    /// Effective duration after overrides (1 for the terminal task).
    pub duration_days: u32,
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
    pub is_critical: bool,
    /// Working days this task can slip later without moving go-live.
    pub total_float: i64,
}

impl ScheduledTask {
    pub(crate) fn from_task(
        task: &Task,
        duration_days: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
        total_float: i64,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            name: task.name.clone(),
            owner_tag: task.owner_tag.clone(),
            asset_id: task.asset_id.clone(),
            is_terminal: task.is_terminal,
            is_custom: task.is_custom,
            duration_days,
            start_date,
            end_date,
            is_critical: total_float == 0,
            total_float,
        }
    }
}

/// Soft signal attached to an otherwise valid schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleWarning {
    /// The task would have to start before the configured floor date
    /// (usually "today"). `working_days_short` is how many working days
    /// must be saved for it to start on the floor date.
    StartsBeforeFloor {
        task_id: String,
        start_date: NaiveDate,
        floor_date: NaiveDate,
        working_days_short: u32,
    },
}

impl fmt::Display for ScheduleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleWarning::StartsBeforeFloor {
                task_id,
                start_date,
                floor_date,
                working_days_short,
            } => write!(
                f,
                "Task '{}' starts {} which is before {}: needs {} working day(s) saved",
                task_id, start_date, floor_date, working_days_short
            ),
        }
    }
}

/// Result of a scheduling run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleOutcome {
    /// One entry per input task, in input order.
    pub scheduled: Vec<ScheduledTask>,
    pub warnings: Vec<ScheduleWarning>,
}

impl ScheduleOutcome {
    pub fn get(&self, task_id: &str) -> Option<&ScheduledTask> {
        self.scheduled.iter().find(|t| t.task_id == task_id)
    }

    /// Earliest start date over all scheduled tasks.
    pub fn project_start(&self) -> Option<NaiveDate> {
        self.scheduled.iter().map(|t| t.start_date).min()
    }

    pub fn critical_task_ids(&self) -> Vec<&str> {
        self.scheduled
            .iter()
            .filter(|t| t.is_critical)
            .map(|t| t.task_id.as_str())
            .collect()
    }

    /// Largest floor shortfall among warnings, if any task starts too early.
    pub fn working_days_short(&self) -> Option<u32> {
        self.warnings
            .iter()
            .map(|w| match w {
                ScheduleWarning::StartsBeforeFloor {
                    working_days_short, ..
                } => *working_days_short,
            })
            .max()
    }
}
