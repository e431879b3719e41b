//! Edge-set validation ahead of graph construction.
//!
//! Detects:
//! - Duplicate task ids and non-positive durations
//! - More than one terminal task per asset
//! - Terminal tasks used as predecessors
//! - Edges crossing assets or naming unknown tasks
//! - Overlaps at least as long as the predecessor itself
//! - Cycles in the merged template + explicit edge set
//!
//! Every problem is collected so callers can show the complete list at once.
//! Input is never mutated.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::graph::{
    chain_order, merge_edges, sorted_ids, topological_order, CycleError, EdgeOrigin, GraphEdge,
};
use crate::interner::TaskIndex;
use crate::models::{Dependency, DependencyType, Task};

/// A single validation problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Duplicate task id: {task_id}")]
    DuplicateTaskId { task_id: String },
    #[error("Task '{task_id}' has duration {duration_days}; durations must be at least 1 working day")]
    InvalidDuration { task_id: String, duration_days: u32 },
    #[error("Asset '{asset_id}' has more than one terminal task: {}", .task_ids.join(", "))]
    MultipleTerminals {
        asset_id: String,
        task_ids: Vec<String>,
    },
    #[error("Terminal task '{task_id}' cannot be a predecessor (of '{successor_id}')")]
    TerminalAsPredecessor {
        task_id: String,
        successor_id: String,
    },
    #[error("Dependency {predecessor_id} -> {successor_id} crosses assets ('{predecessor_asset}' vs '{successor_asset}')")]
    CrossAssetEdge {
        predecessor_id: String,
        successor_id: String,
        predecessor_asset: String,
        successor_asset: String,
    },
    #[error("Dependency {predecessor_id} -> {successor_id} references unknown task '{missing_id}'")]
    DanglingReference {
        predecessor_id: String,
        successor_id: String,
        missing_id: String,
    },
    #[error("Dependency {predecessor_id} -> {successor_id} overlaps {overlap_days} day(s) but the predecessor only lasts {predecessor_duration}")]
    ExcessiveOverlap {
        predecessor_id: String,
        successor_id: String,
        overlap_days: u32,
        predecessor_duration: u32,
    },
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    DuplicateTaskId,
    InvalidDuration,
    MultipleTerminals,
    TerminalAsPredecessor,
    CrossAssetEdge,
    DanglingReference,
    ExcessiveOverlap,
    Cycle,
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::DuplicateTaskId { .. } => ValidationErrorKind::DuplicateTaskId,
            ValidationError::InvalidDuration { .. } => ValidationErrorKind::InvalidDuration,
            ValidationError::MultipleTerminals { .. } => ValidationErrorKind::MultipleTerminals,
            ValidationError::TerminalAsPredecessor { .. } => {
                ValidationErrorKind::TerminalAsPredecessor
            }
            ValidationError::CrossAssetEdge { .. } => ValidationErrorKind::CrossAssetEdge,
            ValidationError::DanglingReference { .. } => ValidationErrorKind::DanglingReference,
            ValidationError::ExcessiveOverlap { .. } => ValidationErrorKind::ExcessiveOverlap,
            ValidationError::Cycle(_) => ValidationErrorKind::Cycle,
        }
    }
}

/// Dependencies that passed validation against a specific task snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidEdgeSet {
    edges: Vec<Dependency>,
}

impl ValidEdgeSet {
    pub fn as_slice(&self) -> &[Dependency] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn into_inner(self) -> Vec<Dependency> {
        self.edges
    }
}

/// Validate tasks (durations already resolved) and their dependencies.
///
/// # Returns
/// * `Ok(ValidEdgeSet)` when nothing is wrong
/// * `Err(errors)` with every detected problem, in detection order
pub fn validate(
    tasks: &[Task],
    dependencies: &[Dependency],
) -> Result<ValidEdgeSet, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut by_id: FxHashMap<&str, &Task> =
        FxHashMap::with_capacity_and_hasher(tasks.len(), Default::default());
    for task in tasks {
        if by_id.contains_key(task.id.as_str()) {
            errors.push(ValidationError::DuplicateTaskId {
                task_id: task.id.clone(),
            });
        } else {
            by_id.insert(task.id.as_str(), task);
        }
        if !task.is_terminal && task.duration_days == 0 {
            errors.push(ValidationError::InvalidDuration {
                task_id: task.id.clone(),
                duration_days: task.duration_days,
            });
        }
    }

    let assets = group_by_asset(tasks);
    for (asset_id, asset_tasks) in &assets {
        let terminals: Vec<String> = asset_tasks
            .iter()
            .filter(|t| t.is_terminal)
            .map(|t| t.id.clone())
            .collect();
        if terminals.len() > 1 {
            errors.push(ValidationError::MultipleTerminals {
                asset_id: asset_id.to_string(),
                task_ids: terminals,
            });
        }
    }

    // Edges that are structurally sound enough to take part in cycle detection.
    let mut usable: Vec<&Dependency> = Vec::with_capacity(dependencies.len());

    for dep in dependencies {
        let pred = by_id.get(dep.predecessor_id.as_str());
        let succ = by_id.get(dep.successor_id.as_str());

        let (pred, succ) = match (pred, succ) {
            (Some(p), Some(s)) => (*p, *s),
            _ => {
                for missing in [&dep.predecessor_id, &dep.successor_id] {
                    if !by_id.contains_key(missing.as_str()) {
                        errors.push(ValidationError::DanglingReference {
                            predecessor_id: dep.predecessor_id.clone(),
                            successor_id: dep.successor_id.clone(),
                            missing_id: missing.clone(),
                        });
                    }
                }
                continue;
            }
        };

        if pred.asset_id != succ.asset_id {
            errors.push(ValidationError::CrossAssetEdge {
                predecessor_id: pred.id.clone(),
                successor_id: succ.id.clone(),
                predecessor_asset: pred.asset_id.clone(),
                successor_asset: succ.asset_id.clone(),
            });
            continue;
        }

        if pred.is_terminal {
            errors.push(ValidationError::TerminalAsPredecessor {
                task_id: pred.id.clone(),
                successor_id: succ.id.clone(),
            });
        }

        let overlap_days = dep.overlap_days();
        let predecessor_duration = if pred.is_terminal { 1 } else { pred.duration_days };
        if dep.dependency_type == DependencyType::FinishToStart
            && overlap_days > 0
            && overlap_days >= predecessor_duration
        {
            errors.push(ValidationError::ExcessiveOverlap {
                predecessor_id: pred.id.clone(),
                successor_id: succ.id.clone(),
                overlap_days,
                predecessor_duration,
            });
        }

        usable.push(dep);
    }

    for (_, asset_tasks) in &assets {
        if let Some(cycle) = detect_cycle(asset_tasks, &usable) {
            errors.push(ValidationError::Cycle(cycle));
        }
    }

    if errors.is_empty() {
        Ok(ValidEdgeSet {
            edges: dependencies.to_vec(),
        })
    } else {
        Err(errors)
    }
}

/// Group tasks by asset in first-appearance order, keeping catalog order within each.
pub(crate) fn group_by_asset(tasks: &[Task]) -> Vec<(&str, Vec<&Task>)> {
    let mut positions: FxHashMap<&str, usize> = FxHashMap::default();
    let mut groups: Vec<(&str, Vec<&Task>)> = Vec::new();
    for task in tasks {
        let slot = *positions.entry(task.asset_id.as_str()).or_insert_with(|| {
            groups.push((task.asset_id.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(task);
    }
    groups
}

/// Cycle check over the asset's merged edge set.
fn detect_cycle(asset_tasks: &[&Task], dependencies: &[&Dependency]) -> Option<CycleError> {
    let mut index = TaskIndex::with_capacity(asset_tasks.len());
    let mut unique: Vec<&Task> = Vec::with_capacity(asset_tasks.len());
    for task in asset_tasks {
        if index.intern(&task.id).1 {
            unique.push(task);
        }
    }

    let explicit: Vec<GraphEdge> = dependencies
        .iter()
        .filter_map(|dep| {
            let predecessor = index.get(&dep.predecessor_id)?;
            let successor = index.get(&dep.successor_id)?;
            Some(GraphEdge {
                predecessor,
                successor,
                dependency_type: dep.dependency_type,
                lag_days: i64::from(dep.lag_days),
                origin: EdgeOrigin::Explicit,
            })
        })
        .collect();

    let merged = merge_edges(&chain_order(&unique), explicit);
    topological_order(unique.len(), &merged)
        .err()
        .map(|members| CycleError {
            task_ids: sorted_ids(&index, &members),
        })
}
