//! Python bindings (`backplan.rust`).

use chrono::NaiveDate;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::collections::HashMap;

use crate::calendar::Calendar;
use crate::config::{DurationOverrides, SchedulingConfig, SchedulingMode};
use crate::models::{Dependency, DependencyType, ScheduleWarning, ScheduledTask, Task};
use crate::scheduler::{schedule, ScheduleError};

/// A task of one asset (PyO3 wrapper).
#[pyclass(name = "Task")]
#[derive(Clone, Debug)]
pub struct PyTask {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub name: String,
    #[pyo3(get, set)]
    pub duration_days: u32,
    #[pyo3(get, set)]
    pub asset_id: String,
    #[pyo3(get, set)]
    pub owner_tag: String,
    #[pyo3(get, set)]
    pub is_terminal: bool,
    #[pyo3(get, set)]
    pub is_custom: bool,
}

#[pymethods]
impl PyTask {
    #[new]
    #[pyo3(signature = (id, name, duration_days, asset_id, owner_tag=String::new(), is_terminal=false, is_custom=false))]
    fn new(
        id: String,
        name: String,
        duration_days: u32,
        asset_id: String,
        owner_tag: String,
        is_terminal: bool,
        is_custom: bool,
    ) -> Self {
        Self {
            id,
            name,
            duration_days,
            asset_id,
            owner_tag,
            is_terminal,
            is_custom,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Task(id={:?}, duration={}, asset={:?}, terminal={})",
            self.id, self.duration_days, self.asset_id, self.is_terminal
        )
    }
}

impl From<PyTask> for Task {
    fn from(task: PyTask) -> Self {
        Task {
            id: task.id,
            name: task.name,
            duration_days: task.duration_days,
            owner_tag: task.owner_tag,
            asset_id: task.asset_id,
            is_terminal: task.is_terminal,
            is_custom: task.is_custom,
        }
    }
}

/// A dependency edge (PyO3 wrapper). `dependency_type` is "FS", "SS" or "FF".
#[pyclass(name = "Dependency")]
#[derive(Clone, Debug)]
pub struct PyDependency {
    #[pyo3(get)]
    pub predecessor_id: String,
    #[pyo3(get)]
    pub successor_id: String,
    #[pyo3(get)]
    pub lag_days: i32,
    dependency_type: DependencyType,
}

#[pymethods]
impl PyDependency {
    #[new]
    #[pyo3(signature = (predecessor_id, successor_id, dependency_type="FS", lag_days=0))]
    fn new(
        predecessor_id: String,
        successor_id: String,
        dependency_type: &str,
        lag_days: i32,
    ) -> PyResult<Self> {
        let dependency_type = DependencyType::from_code(dependency_type).ok_or_else(|| {
            PyValueError::new_err(format!("Unknown dependency type: {}", dependency_type))
        })?;
        Ok(Self {
            predecessor_id,
            successor_id,
            lag_days,
            dependency_type,
        })
    }

    #[getter]
    fn dependency_type(&self) -> &'static str {
        self.dependency_type.code()
    }

    fn __repr__(&self) -> String {
        format!(
            "Dependency({} -> {}, {}, lag={})",
            self.predecessor_id, self.successor_id, self.dependency_type, self.lag_days
        )
    }
}

impl From<PyDependency> for Dependency {
    fn from(dep: PyDependency) -> Self {
        Dependency::new(
            dep.predecessor_id,
            dep.successor_id,
            dep.dependency_type,
            dep.lag_days,
        )
    }
}

/// A task with assigned dates (PyO3 wrapper).
#[pyclass(name = "ScheduledTask")]
#[derive(Clone, Debug)]
pub struct PyScheduledTask {
    #[pyo3(get)]
    pub task_id: String,
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub owner_tag: String,
    #[pyo3(get)]
    pub asset_id: String,
    #[pyo3(get)]
    pub is_terminal: bool,
    #[pyo3(get)]
    pub is_custom: bool,
    #[pyo3(get)]
    pub duration_days: u32,
    #[pyo3(get)]
    pub start_date: NaiveDate,
    #[pyo3(get)]
    pub end_date: NaiveDate,
    #[pyo3(get)]
    pub is_critical: bool,
    #[pyo3(get)]
    pub total_float: i64,
}

#[pymethods]
impl PyScheduledTask {
    fn __repr__(&self) -> String {
        format!(
            "ScheduledTask(id={:?}, {} .. {}, critical={}, float={})",
            self.task_id, self.start_date, self.end_date, self.is_critical, self.total_float
        )
    }
}

impl From<ScheduledTask> for PyScheduledTask {
    fn from(task: ScheduledTask) -> Self {
        Self {
            task_id: task.task_id,
            name: task.name,
            owner_tag: task.owner_tag,
            asset_id: task.asset_id,
            is_terminal: task.is_terminal,
            is_custom: task.is_custom,
            duration_days: task.duration_days,
            start_date: task.start_date,
            end_date: task.end_date,
            is_critical: task.is_critical,
            total_float: task.total_float,
        }
    }
}

/// A task starting before the floor date (PyO3 wrapper).
#[pyclass(name = "ScheduleWarning")]
#[derive(Clone, Debug)]
pub struct PyScheduleWarning {
    #[pyo3(get)]
    pub task_id: String,
    #[pyo3(get)]
    pub start_date: NaiveDate,
    #[pyo3(get)]
    pub floor_date: NaiveDate,
    #[pyo3(get)]
    pub working_days_short: u32,
    #[pyo3(get)]
    pub message: String,
}

#[pymethods]
impl PyScheduleWarning {
    fn __repr__(&self) -> String {
        format!("ScheduleWarning({})", self.message)
    }
}

impl From<ScheduleWarning> for PyScheduleWarning {
    fn from(warning: ScheduleWarning) -> Self {
        let message = warning.to_string();
        match warning {
            ScheduleWarning::StartsBeforeFloor {
                task_id,
                start_date,
                floor_date,
                working_days_short,
            } => Self {
                task_id,
                start_date,
                floor_date,
                working_days_short,
                message,
            },
        }
    }
}

/// Result of `schedule_asset`.
#[pyclass(name = "ScheduleResult")]
#[derive(Clone, Debug)]
pub struct PyScheduleResult {
    #[pyo3(get)]
    pub scheduled: Vec<PyScheduledTask>,
    #[pyo3(get)]
    pub warnings: Vec<PyScheduleWarning>,
}

fn to_py_err(err: ScheduleError) -> PyErr {
    if err.is_configuration_fault() {
        PyRuntimeError::new_err(err.to_string())
    } else {
        PyValueError::new_err(err.to_string())
    }
}

/// Schedule one or more assets backward from `live_date`.
///
/// # Arguments
/// * `tasks` - Tasks in catalog order
/// * `live_date` - Go-live date the terminal task is pinned to
/// * `dependencies` - Explicit edges; empty means the legacy sequential chain
/// * `holidays` - Non-working dates on top of Saturday/Sunday
/// * `name_overrides` - Duration overrides keyed by task name
/// * `instance_overrides` - Duration overrides keyed by task id (win over names)
/// * `mode` - "auto", "sequential" or "dependency_aware"
/// * `floor_date` - Warn for tasks starting before this date
/// * `verbosity` - 0=silent, 1=stages, 2=placements, 3=trace
///
/// # Raises
/// * ValueError for invalid input (cycles, bad edges, unknown mode)
/// * RuntimeError when the calendar has no working days in range
#[pyfunction]
#[pyo3(signature = (tasks, live_date, dependencies=None, holidays=None, name_overrides=None, instance_overrides=None, mode="auto", floor_date=None, verbosity=0))]
#[allow(clippy::too_many_arguments)]
fn schedule_asset(
    tasks: Vec<PyTask>,
    live_date: NaiveDate,
    dependencies: Option<Vec<PyDependency>>,
    holidays: Option<Vec<NaiveDate>>,
    name_overrides: Option<HashMap<String, u32>>,
    instance_overrides: Option<HashMap<String, u32>>,
    mode: &str,
    floor_date: Option<NaiveDate>,
    verbosity: u8,
) -> PyResult<PyScheduleResult> {
    let mode = SchedulingMode::parse(mode)
        .ok_or_else(|| PyValueError::new_err(format!("Unknown scheduling mode: {}", mode)))?;
    let mut config = SchedulingConfig::default()
        .with_mode(mode)
        .with_verbosity(verbosity);
    config.floor_date = floor_date;

    let tasks: Vec<Task> = tasks.into_iter().map(Task::from).collect();
    let dependencies: Vec<Dependency> = dependencies
        .unwrap_or_default()
        .into_iter()
        .map(Dependency::from)
        .collect();
    let calendar = Calendar::new(holidays.unwrap_or_default());
    let overrides = DurationOverrides {
        by_instance: instance_overrides.unwrap_or_default().into_iter().collect(),
        by_name: name_overrides.unwrap_or_default().into_iter().collect(),
    };

    let outcome = schedule(
        &tasks,
        &dependencies,
        live_date,
        &calendar,
        &overrides,
        &config,
    )
    .map_err(to_py_err)?;

    Ok(PyScheduleResult {
        scheduled: outcome.scheduled.into_iter().map(Into::into).collect(),
        warnings: outcome.warnings.into_iter().map(Into::into).collect(),
    })
}

/// The backplan.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTask>()?;
    m.add_class::<PyDependency>()?;
    m.add_class::<PyScheduledTask>()?;
    m.add_class::<PyScheduleWarning>()?;
    m.add_class::<PyScheduleResult>()?;

    m.add_function(wrap_pyfunction!(schedule_asset, m)?)?;

    Ok(())
}
