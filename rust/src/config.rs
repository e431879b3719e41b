//! Configuration types for the scheduling engine.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::models::Task;

/// Which scheduling path the orchestrator runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SchedulingMode {
    /// Sequential when no dependencies are supplied, dependency-aware otherwise.
    #[default]
    Auto,
    /// Legacy chain: walk back from the live date task by task in catalog order.
    Sequential,
    /// Validate, build the graph, run CPM, then materialize dates.
    DependencyAware,
}

impl SchedulingMode {
    /// Parse "auto", "sequential" or "dependency_aware" (also "dag").
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(SchedulingMode::Auto),
            "sequential" | "legacy" => Some(SchedulingMode::Sequential),
            "dependency_aware" | "dag" => Some(SchedulingMode::DependencyAware),
            _ => None,
        }
    }

    /// Resolve `Auto` against the shape of the input.
    pub fn resolve(self, has_dependencies: bool) -> Self {
        match self {
            SchedulingMode::Auto if has_dependencies => SchedulingMode::DependencyAware,
            SchedulingMode::Auto => SchedulingMode::Sequential,
            other => other,
        }
    }
}

/// Configuration for one scheduling run.
#[derive(Clone, Debug, Default)]
pub struct SchedulingConfig {
    pub mode: SchedulingMode,
    /// 0=silent, 1=stages, 2=placements, 3=trace.
    pub verbosity: u8,
    /// Tasks starting before this date produce a warning (not an error).
    pub floor_date: Option<NaiveDate>,
}

impl SchedulingConfig {
    pub fn with_mode(mut self, mode: SchedulingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_floor_date(mut self, floor_date: NaiveDate) -> Self {
        self.floor_date = Some(floor_date);
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// User duration edits layered over catalog durations.
///
/// Per-instance overrides (keyed by task id) win over per-name overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DurationOverrides {
    pub by_instance: FxHashMap<String, u32>,
    pub by_name: FxHashMap<String, u32>,
}

impl DurationOverrides {
    pub fn is_empty(&self) -> bool {
        self.by_instance.is_empty() && self.by_name.is_empty()
    }

    pub fn set_instance(mut self, task_id: impl Into<String>, duration_days: u32) -> Self {
        self.by_instance.insert(task_id.into(), duration_days);
        self
    }

    pub fn set_name(mut self, name: impl Into<String>, duration_days: u32) -> Self {
        self.by_name.insert(name.into(), duration_days);
        self
    }

    /// Effective duration of a task before terminal normalisation.
    pub fn duration_for(&self, task: &Task) -> u32 {
        self.by_instance
            .get(&task.id)
            .or_else(|| self.by_name.get(&task.name))
            .copied()
            .unwrap_or(task.duration_days)
    }

    /// Copy of `tasks` with every override applied.
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        tasks
            .iter()
            .map(|task| Task {
                duration_days: self.duration_for(task),
                ..task.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SchedulingConfig::default();
        assert_eq!(config.mode, SchedulingMode::Auto);
        assert_eq!(config.verbosity, 0);
        assert!(config.floor_date.is_none());
    }

    #[test]
    fn test_mode_resolution() {
        assert_eq!(
            SchedulingMode::Auto.resolve(false),
            SchedulingMode::Sequential
        );
        assert_eq!(
            SchedulingMode::Auto.resolve(true),
            SchedulingMode::DependencyAware
        );
        assert_eq!(
            SchedulingMode::Sequential.resolve(true),
            SchedulingMode::Sequential
        );
        assert_eq!(
            SchedulingMode::parse("DAG"),
            Some(SchedulingMode::DependencyAware)
        );
        assert_eq!(SchedulingMode::parse("fastest"), None);
    }

    #[test]
    fn test_instance_override_beats_name_override() {
        let first = Task::new("copy-1", "Copywriting", 3, "email");
        let second = Task::new("copy-2", "Copywriting", 3, "email");
        let other = Task::new("review", "Review", 2, "email");

        let overrides = DurationOverrides::default()
            .set_name("Copywriting", 5)
            .set_instance("copy-2", 1);

        assert_eq!(overrides.duration_for(&first), 5);
        assert_eq!(overrides.duration_for(&second), 1);
        assert_eq!(overrides.duration_for(&other), 2);

        let applied = overrides.apply(&[first, second, other]);
        let durations: Vec<u32> = applied.iter().map(|t| t.duration_days).collect();
        assert_eq!(durations, vec![5, 1, 2]);
    }
}
