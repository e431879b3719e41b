//! Types for critical path calculation.

use crate::interner::NodeId;

/// Per-task timing in working-day offsets from the project start.
///
/// Finishes are exclusive: a task with `earliest_start = 2` and duration 3
/// occupies days 2, 3 and 4 and has `earliest_finish = 5`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskTiming {
    /// Earliest possible start (from forward pass).
    pub earliest_start: i64,
    /// Earliest possible finish (from forward pass).
    pub earliest_finish: i64,
    /// Latest allowable start (from backward pass).
    pub latest_start: i64,
    /// Latest allowable finish (from backward pass).
    pub latest_finish: i64,
    /// latest_start - earliest_start.
    pub total_float: i64,
}

impl TaskTiming {
    pub fn is_critical(&self) -> bool {
        self.total_float == 0
    }
}

/// Result of one CPM run, indexed by [`NodeId`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CriticalPathResult {
    /// Timing for every node, indexed by node id.
    pub timings: Vec<TaskTiming>,
    /// Every zero-float node, in topological order.
    pub critical_nodes: Vec<NodeId>,
    /// Earliest finish of the terminal task.
    pub project_length: i64,
}

impl CriticalPathResult {
    #[inline]
    pub fn timing(&self, node: NodeId) -> &TaskTiming {
        &self.timings[node as usize]
    }

    pub fn is_critical(&self, node: NodeId) -> bool {
        self.timing(node).is_critical()
    }
}
