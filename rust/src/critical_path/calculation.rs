//! Critical path calculation using forward and backward passes.
//!
//! Offsets are whole working days from the start of the project, with
//! exclusive finishes (`EF = ES + duration`). Calendar dates are applied
//! afterwards by the date assigner.

use crate::graph::{GraphEdge, TaskGraph};
use crate::interner::NodeId;
use crate::log_trace;
use crate::models::DependencyType;

use super::types::{CriticalPathResult, TaskTiming};

/// Earliest start the edge allows for its successor.
#[inline]
fn forward_requirement(edge: &GraphEdge, pred: &TaskTiming, succ_duration: i64) -> i64 {
    match edge.dependency_type {
        DependencyType::FinishToStart => pred.earliest_finish + edge.lag_days,
        DependencyType::StartToStart => pred.earliest_start + edge.lag_days,
        DependencyType::FinishToFinish => pred.earliest_finish + edge.lag_days - succ_duration,
    }
}

/// Latest finish the edge allows for its predecessor.
#[inline]
fn backward_requirement(edge: &GraphEdge, succ: &TaskTiming, pred_duration: i64) -> i64 {
    match edge.dependency_type {
        DependencyType::FinishToStart => succ.latest_start - edge.lag_days,
        DependencyType::StartToStart => succ.latest_start - edge.lag_days + pred_duration,
        DependencyType::FinishToFinish => succ.latest_finish - edge.lag_days,
    }
}

/// Run CPM over an acyclic graph.
///
/// The project length is the terminal's earliest finish. Every task with zero
/// total float is reported as critical, so parallel critical paths all show up.
pub fn calculate_critical_path(graph: &TaskGraph, verbosity: u8) -> CriticalPathResult {
    let n = graph.len();
    let order = graph.topo_order();
    let mut timings = vec![TaskTiming::default(); n];

    // Forward pass
    for &node in order {
        let duration = graph.duration(node);
        let earliest_start = graph
            .incoming(node)
            .map(|edge| forward_requirement(edge, &timings[edge.predecessor as usize], duration))
            .fold(0, i64::max);
        let timing = &mut timings[node as usize];
        timing.earliest_start = earliest_start;
        timing.earliest_finish = earliest_start + duration;
    }

    let terminal = graph.terminal_node();
    let project_length = timings[terminal as usize].earliest_finish;

    // Backward pass (reverse topological order)
    for &node in order.iter().rev() {
        let duration = graph.duration(node);
        let latest_finish = if node == terminal {
            project_length
        } else {
            graph
                .outgoing(node)
                .map(|edge| backward_requirement(edge, &timings[edge.successor as usize], duration))
                .min()
                .unwrap_or(project_length)
        };
        let timing = &mut timings[node as usize];
        timing.latest_finish = latest_finish;
        timing.latest_start = latest_finish - duration;
        timing.total_float = timing.latest_start - timing.earliest_start;

        log_trace!(
            verbosity,
            "{}: ES={} EF={} LS={} LF={} TF={}",
            graph.task(node).id,
            timing.earliest_start,
            timing.earliest_finish,
            timing.latest_start,
            timing.latest_finish,
            timing.total_float
        );
    }

    let critical_nodes: Vec<NodeId> = order
        .iter()
        .copied()
        .filter(|&node| timings[node as usize].is_critical())
        .collect();

    CriticalPathResult {
        timings,
        critical_nodes,
        project_length,
    }
}
