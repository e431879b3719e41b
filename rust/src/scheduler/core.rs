//! Orchestrator: validation, graph, CPM and date assignment per asset.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::calendar::Calendar;
use crate::config::{DurationOverrides, SchedulingConfig, SchedulingMode};
use crate::critical_path::calculate_critical_path;
use crate::date_assignment::{floor_warnings, DateAssigner, DateAssignmentError};
use crate::graph::{GraphError, TaskGraph};
use crate::models::{Dependency, ScheduleOutcome, ScheduledTask, Task};
use crate::validation::{group_by_asset, validate, ValidationError};
use crate::{log_stages, log_trace};

use super::sequential::schedule_chain;

/// Errors that stop a scheduling run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Schedule input is invalid: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    DateAssignment(#[from] DateAssignmentError),
}

impl From<Vec<ValidationError>> for ScheduleError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ScheduleError::Validation(errors)
    }
}

impl ScheduleError {
    /// Calendar faults point at bad holiday data, not at the user's edit.
    pub fn is_configuration_fault(&self) -> bool {
        matches!(self, ScheduleError::DateAssignment(_))
    }

    /// Validation problems, if that is what stopped the run.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            ScheduleError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Schedules every asset in a task list backward from one live date.
///
/// Holds a snapshot of the caller's input with duration overrides already
/// applied. Nothing is cached between calls to [`AssetScheduler::schedule`].
pub struct AssetScheduler<'a> {
    tasks: Vec<Task>,
    dependencies: Vec<Dependency>,
    live_date: NaiveDate,
    calendar: &'a Calendar,
    config: SchedulingConfig,
}

impl<'a> AssetScheduler<'a> {
    /// Create a new scheduler. Overrides are resolved here, before any graph is built.
    pub fn new(
        tasks: Vec<Task>,
        dependencies: Vec<Dependency>,
        live_date: NaiveDate,
        calendar: &'a Calendar,
        overrides: &DurationOverrides,
        config: SchedulingConfig,
    ) -> Self {
        let tasks = if overrides.is_empty() {
            tasks
        } else {
            overrides.apply(&tasks)
        };
        Self {
            tasks,
            dependencies,
            live_date,
            calendar,
            config,
        }
    }

    /// The scheduling path this input will take.
    pub fn mode(&self) -> SchedulingMode {
        self.config.mode.resolve(!self.dependencies.is_empty())
    }

    /// Run the scheduling pipeline.
    pub fn schedule(&self) -> Result<ScheduleOutcome, ScheduleError> {
        let verbosity = self.config.verbosity;
        let mode = self.mode();
        log_stages!(
            verbosity,
            "Scheduling {} tasks, {} dependencies, live {} ({:?})",
            self.tasks.len(),
            self.dependencies.len(),
            self.live_date,
            mode
        );

        // The sequential path ignores dependencies but keeps every task check.
        let dependencies: &[Dependency] = match mode {
            SchedulingMode::Sequential => &[],
            _ => &self.dependencies,
        };
        let valid = validate(&self.tasks, dependencies)?;
        log_stages!(verbosity, "Validation passed ({} edges)", valid.len());

        let asset_of: FxHashMap<&str, &str> = self
            .tasks
            .iter()
            .map(|t| (t.id.as_str(), t.asset_id.as_str()))
            .collect();

        let mut by_id: FxHashMap<String, ScheduledTask> =
            FxHashMap::with_capacity_and_hasher(self.tasks.len(), Default::default());
        for (asset_id, asset_tasks) in group_by_asset(&self.tasks) {
            let asset_tasks: Vec<Task> = asset_tasks.into_iter().cloned().collect();
            let asset_edges: Vec<Dependency> = valid
                .as_slice()
                .iter()
                .filter(|dep| asset_of.get(dep.successor_id.as_str()) == Some(&asset_id))
                .cloned()
                .collect();

            let scheduled = match mode {
                SchedulingMode::Sequential => {
                    schedule_chain(&asset_tasks, self.live_date, self.calendar, verbosity)?
                }
                _ => self.schedule_graph(&asset_tasks, &asset_edges)?,
            };

            log_stages!(
                verbosity,
                "Asset '{}': {} tasks from {} to {}",
                asset_id,
                scheduled.len(),
                scheduled
                    .iter()
                    .map(|t| t.start_date)
                    .min()
                    .unwrap_or(self.live_date),
                self.live_date
            );
            by_id.extend(scheduled.into_iter().map(|t| (t.task_id.clone(), t)));
        }

        // Output follows input order.
        let scheduled: Vec<ScheduledTask> = self
            .tasks
            .iter()
            .filter_map(|t| by_id.remove(&t.id))
            .collect();

        let warnings = match self.config.floor_date {
            Some(floor_date) => floor_warnings(&scheduled, floor_date, self.calendar),
            None => Vec::new(),
        };
        if !warnings.is_empty() {
            log_stages!(verbosity, "{} task(s) start before the floor date", warnings.len());
        }

        Ok(ScheduleOutcome {
            scheduled,
            warnings,
        })
    }

    fn schedule_graph(
        &self,
        tasks: &[Task],
        dependencies: &[Dependency],
    ) -> Result<Vec<ScheduledTask>, ScheduleError> {
        let verbosity = self.config.verbosity;
        let graph = TaskGraph::build(tasks, dependencies)?;
        let cpm = calculate_critical_path(&graph, verbosity);
        log_trace!(
            verbosity,
            "Asset '{}': project length {} working days, {} critical",
            graph.asset_id(),
            cpm.project_length,
            cpm.critical_nodes.len()
        );

        let scheduled = DateAssigner::new(self.calendar, self.live_date)
            .with_verbosity(verbosity)
            .assign(&graph, &cpm)?;
        Ok(scheduled)
    }
}

/// Schedule `tasks` backward from `live_date` in one call.
pub fn schedule(
    tasks: &[Task],
    dependencies: &[Dependency],
    live_date: NaiveDate,
    calendar: &Calendar,
    overrides: &DurationOverrides,
    config: &SchedulingConfig,
) -> Result<ScheduleOutcome, ScheduleError> {
    AssetScheduler::new(
        tasks.to_vec(),
        dependencies.to_vec(),
        live_date,
        calendar,
        overrides,
        config.clone(),
    )
    .schedule()
}
