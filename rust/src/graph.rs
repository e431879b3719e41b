//! Task graph construction for one asset.
//!
//! Tasks live in a flat arena in catalog order and are addressed by
//! [`NodeId`]. Edges come from two layers that are merged exactly once:
//! the template chain (every task without an explicit predecessor follows the
//! previous task in chain order) and the user's explicit dependencies. After
//! the merge, every non-terminal task whose finish is not bounded by a
//! successor is tied to the terminal so the whole asset finishes before go-live.

use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use thiserror::Error;

use crate::interner::{NodeId, TaskIndex};
use crate::models::{Dependency, DependencyType, Task};

/// Tasks that form (or sit between) dependency cycles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Circular dependency between tasks: {}", .task_ids.join(", "))]
pub struct CycleError {
    /// Sorted task ids.
    pub task_ids: Vec<String>,
}

/// Errors raised while building a [`TaskGraph`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Cannot build a graph without tasks")]
    Empty,
    #[error("Task '{task_id}' belongs to asset '{found}', expected '{expected}'")]
    MixedAssets {
        task_id: String,
        expected: String,
        found: String,
    },
    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),
    #[error("Dependency references unknown task: {0}")]
    UnknownTask(String),
    #[error("Task '{task_id}' has invalid duration {duration_days}")]
    InvalidDuration { task_id: String, duration_days: u32 },
    #[error("Asset has more than one terminal task: {}", .0.join(", "))]
    MultipleTerminals(Vec<String>),
    #[error("Terminal task '{0}' cannot be a predecessor")]
    TerminalAsPredecessor(String),
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

/// Where an edge came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeOrigin {
    /// Implicit link to the previous task in chain order.
    Template,
    /// Supplied by the caller.
    Explicit,
    /// Ties a dangling sink to the terminal task.
    Anchor,
}

/// A resolved edge between two nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphEdge {
    pub predecessor: NodeId,
    pub successor: NodeId,
    pub dependency_type: DependencyType,
    pub lag_days: i64,
    pub origin: EdgeOrigin,
}

impl GraphEdge {
    fn chained(predecessor: NodeId, successor: NodeId, origin: EdgeOrigin) -> Self {
        Self {
            predecessor,
            successor,
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
            origin,
        }
    }
}

/// Validated, acyclic dependency graph for one asset.
///
/// Built once per scheduling run and discarded afterwards.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    asset_id: String,
    index: TaskIndex,
    tasks: Vec<Task>,
    /// Effective durations (terminal normalised to one day).
    durations: Vec<i64>,
    edges: Vec<GraphEdge>,
    /// Edge indices per node.
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
    topo_order: Vec<NodeId>,
    start: NodeId,
    terminal: NodeId,
    terminal_flagged: bool,
}

impl TaskGraph {
    /// Build the graph for one asset's tasks (in catalog order) and its explicit edges.
    pub fn build(tasks: &[Task], dependencies: &[Dependency]) -> Result<Self, GraphError> {
        let first = tasks.first().ok_or(GraphError::Empty)?;
        let asset_id = first.asset_id.clone();

        let mut index = TaskIndex::with_capacity(tasks.len());
        for task in tasks {
            if task.asset_id != asset_id {
                return Err(GraphError::MixedAssets {
                    task_id: task.id.clone(),
                    expected: asset_id,
                    found: task.asset_id.clone(),
                });
            }
            if !task.is_terminal && task.duration_days == 0 {
                return Err(GraphError::InvalidDuration {
                    task_id: task.id.clone(),
                    duration_days: task.duration_days,
                });
            }
            if !index.intern(&task.id).1 {
                return Err(GraphError::DuplicateTask(task.id.clone()));
            }
        }

        let terminals: Vec<NodeId> = (0..tasks.len() as NodeId)
            .filter(|&n| tasks[n as usize].is_terminal)
            .collect();
        if terminals.len() > 1 {
            return Err(GraphError::MultipleTerminals(
                terminals
                    .iter()
                    .map(|&n| tasks[n as usize].id.clone())
                    .collect(),
            ));
        }

        let explicit = resolve_explicit_edges(&index, dependencies)?;
        if let Some(edge) = explicit
            .iter()
            .find(|e| tasks[e.predecessor as usize].is_terminal)
        {
            return Err(GraphError::TerminalAsPredecessor(
                tasks[edge.predecessor as usize].id.clone(),
            ));
        }

        let chain = chain_order(tasks);
        let mut edges = merge_edges(&chain, explicit);

        let node_count = tasks.len();
        let order = topological_order(node_count, &edges).map_err(|members| CycleError {
            task_ids: sorted_ids(&index, &members),
        })?;

        let durations: Vec<i64> = tasks
            .iter()
            .map(|t| {
                if t.is_terminal {
                    1
                } else {
                    i64::from(t.duration_days)
                }
            })
            .collect();

        // Anchor: flagged terminal, else the last sink in chain order.
        let mut has_successor = vec![false; node_count];
        let mut finish_bound = vec![false; node_count];
        for edge in &edges {
            has_successor[edge.predecessor as usize] = true;
            if bounds_finish(edge, durations[edge.successor as usize]) {
                finish_bound[edge.predecessor as usize] = true;
            }
        }
        let terminal = match terminals.first() {
            Some(&t) => t,
            None => chain
                .iter()
                .rev()
                .copied()
                .find(|&n| !has_successor[n as usize])
                .ok_or(GraphError::Empty)?,
        };
        for &node in &chain {
            if node != terminal && !finish_bound[node as usize] {
                edges.push(GraphEdge::chained(node, terminal, EdgeOrigin::Anchor));
            }
        }

        // The terminal has no successors, so moving it last keeps the order valid.
        let mut topo_order: Vec<NodeId> = order.into_iter().filter(|&n| n != terminal).collect();
        topo_order.push(terminal);

        let mut incoming = vec![Vec::new(); node_count];
        let mut outgoing = vec![Vec::new(); node_count];
        for (i, edge) in edges.iter().enumerate() {
            outgoing[edge.predecessor as usize].push(i);
            incoming[edge.successor as usize].push(i);
        }

        let start = topo_order
            .iter()
            .copied()
            .find(|&n| incoming[n as usize].is_empty())
            .unwrap_or(terminal);

        Ok(Self {
            asset_id,
            index,
            tasks: tasks.to_vec(),
            durations,
            edges,
            incoming,
            outgoing,
            topo_order,
            start,
            terminal,
            terminal_flagged: !terminals.is_empty(),
        })
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn node_of(&self, task_id: &str) -> Option<NodeId> {
        self.index.get(task_id)
    }

    #[inline]
    pub fn task(&self, node: NodeId) -> &Task {
        &self.tasks[node as usize]
    }

    #[inline]
    pub fn duration(&self, node: NodeId) -> i64 {
        self.durations[node as usize]
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn incoming(&self, node: NodeId) -> impl Iterator<Item = &GraphEdge> + '_ {
        self.incoming[node as usize].iter().map(|&i| &self.edges[i])
    }

    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &GraphEdge> + '_ {
        self.outgoing[node as usize].iter().map(|&i| &self.edges[i])
    }

    /// Predecessors before successors; the terminal is always last.
    pub fn topo_order(&self) -> &[NodeId] {
        &self.topo_order
    }

    /// First task with no predecessors.
    pub fn start_node(&self) -> NodeId {
        self.start
    }

    /// Calendar anchor: the flagged terminal task, or the fallback sink.
    pub fn terminal_node(&self) -> NodeId {
        self.terminal
    }

    /// Whether the anchor is a flagged go-live task (calendar-exempt).
    pub fn terminal_is_flagged(&self) -> bool {
        self.terminal_flagged
    }
}

/// Whether the edge keeps its predecessor from finishing after its successor.
///
/// SS never does. FF needs a non-negative lag. FS allows an overlap of at
/// most the successor's own length.
fn bounds_finish(edge: &GraphEdge, successor_duration: i64) -> bool {
    match edge.dependency_type {
        DependencyType::StartToStart => false,
        DependencyType::FinishToFinish => edge.lag_days >= 0,
        DependencyType::FinishToStart => edge.lag_days >= -successor_duration,
    }
}

/// Chain order positions: non-terminal tasks in catalog order, terminal tasks last.
pub(crate) fn chain_order<T: std::borrow::Borrow<Task>>(tasks: &[T]) -> Vec<NodeId> {
    let (mut regular, terminals): (Vec<NodeId>, Vec<NodeId>) =
        (0..tasks.len() as NodeId).partition(|&n| !tasks[n as usize].borrow().is_terminal);
    regular.extend(terminals);
    regular
}

/// Merge the template chain with explicit edges into one edge list.
///
/// A task only gets a template edge when no explicit edge targets it.
pub(crate) fn merge_edges(chain: &[NodeId], explicit: Vec<GraphEdge>) -> Vec<GraphEdge> {
    let explicitly_targeted: FxHashSet<NodeId> = explicit.iter().map(|e| e.successor).collect();

    let mut merged: Vec<GraphEdge> = chain
        .windows(2)
        .filter(|pair| !explicitly_targeted.contains(&pair[1]))
        .map(|pair| GraphEdge::chained(pair[0], pair[1], EdgeOrigin::Template))
        .collect();
    merged.extend(explicit);
    merged
}

/// Kahn's algorithm. On failure returns the nodes lying on cycles.
pub(crate) fn topological_order(
    node_count: usize,
    edges: &[GraphEdge],
) -> Result<Vec<NodeId>, Vec<NodeId>> {
    let mut in_degree = vec![0usize; node_count];
    let mut successors: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
    for edge in edges {
        in_degree[edge.successor as usize] += 1;
        successors[edge.predecessor as usize].push(edge.successor);
    }

    let mut queue: VecDeque<NodeId> = (0..node_count as NodeId)
        .filter(|&n| in_degree[n as usize] == 0)
        .collect();
    let mut order: Vec<NodeId> = Vec::with_capacity(node_count);

    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &succ in &successors[node as usize] {
            in_degree[succ as usize] -= 1;
            if in_degree[succ as usize] == 0 {
                queue.push_back(succ);
            }
        }
    }

    if order.len() == node_count {
        return Ok(order);
    }

    // Nodes left after draining sources; now drain sinks among them so only
    // cycle members (and nodes between cycles) remain.
    let mut alive: Vec<bool> = in_degree.iter().map(|&degree| degree > 0).collect();
    let mut out_degree = vec![0usize; node_count];
    let mut predecessors: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
    for edge in edges {
        if alive[edge.predecessor as usize] && alive[edge.successor as usize] {
            out_degree[edge.predecessor as usize] += 1;
            predecessors[edge.successor as usize].push(edge.predecessor);
        }
    }
    let mut sinks: VecDeque<NodeId> = (0..node_count as NodeId)
        .filter(|&n| alive[n as usize] && out_degree[n as usize] == 0)
        .collect();
    while let Some(node) = sinks.pop_front() {
        alive[node as usize] = false;
        for &pred in &predecessors[node as usize] {
            out_degree[pred as usize] -= 1;
            if out_degree[pred as usize] == 0 && alive[pred as usize] {
                sinks.push_back(pred);
            }
        }
    }

    Err((0..node_count as NodeId)
        .filter(|&n| alive[n as usize])
        .collect())
}

pub(crate) fn sorted_ids(index: &TaskIndex, nodes: &[NodeId]) -> Vec<String> {
    let mut ids: Vec<String> = nodes
        .iter()
        .filter_map(|&n| index.resolve(n))
        .map(str::to_string)
        .collect();
    ids.sort();
    ids
}

fn resolve_explicit_edges(
    index: &TaskIndex,
    dependencies: &[Dependency],
) -> Result<Vec<GraphEdge>, GraphError> {
    dependencies
        .iter()
        .map(|dep| {
            let predecessor = index
                .get(&dep.predecessor_id)
                .ok_or_else(|| GraphError::UnknownTask(dep.predecessor_id.clone()))?;
            let successor = index
                .get(&dep.successor_id)
                .ok_or_else(|| GraphError::UnknownTask(dep.successor_id.clone()))?;
            Ok(GraphEdge {
                predecessor,
                successor,
                dependency_type: dep.dependency_type,
                lag_days: i64::from(dep.lag_days),
                origin: EdgeOrigin::Explicit,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(id: &str, duration: u32) -> Task {
        Task::new(id, id.to_uppercase(), duration, "poster")
    }

    fn edge_pairs(graph: &TaskGraph, origin: EdgeOrigin) -> Vec<(String, String)> {
        graph
            .edges()
            .iter()
            .filter(|e| e.origin == origin)
            .map(|e| {
                (
                    graph.task(e.predecessor).id.clone(),
                    graph.task(e.successor).id.clone(),
                )
            })
            .collect()
    }

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_template_chain_without_dependencies() {
        let tasks = vec![
            make_task("a", 3),
            make_task("b", 2),
            make_task("c", 1).terminal(),
        ];
        let graph = TaskGraph::build(&tasks, &[]).unwrap();

        assert_eq!(
            edge_pairs(&graph, EdgeOrigin::Template),
            vec![pair("a", "b"), pair("b", "c")]
        );
        assert!(edge_pairs(&graph, EdgeOrigin::Anchor).is_empty());
        assert_eq!(graph.topo_order(), &[0, 1, 2]);
        assert_eq!(graph.start_node(), 0);
        assert_eq!(graph.terminal_node(), 2);
        assert!(graph.terminal_is_flagged());
    }

    #[test]
    fn test_terminal_moves_to_end_of_chain() {
        let tasks = vec![
            make_task("a", 3),
            make_task("live", 4).terminal(),
            make_task("b", 2),
        ];
        let graph = TaskGraph::build(&tasks, &[]).unwrap();

        assert_eq!(
            edge_pairs(&graph, EdgeOrigin::Template),
            vec![pair("a", "b"), pair("b", "live")]
        );
        // Terminal always occupies one day.
        assert_eq!(graph.duration(graph.node_of("live").unwrap()), 1);
        assert_eq!(graph.topo_order().last(), graph.node_of("live").as_ref());
    }

    #[test]
    fn test_explicit_edge_replaces_template_link() {
        // b and c both follow a directly; b is left without successor and gets anchored.
        let tasks = vec![
            make_task("a", 3),
            make_task("b", 2),
            make_task("c", 4),
            make_task("live", 1).terminal(),
        ];
        let deps = vec![Dependency::finish_to_start("a", "c", 0)];
        let graph = TaskGraph::build(&tasks, &deps).unwrap();

        assert_eq!(
            edge_pairs(&graph, EdgeOrigin::Template),
            vec![pair("a", "b"), pair("c", "live")]
        );
        assert_eq!(edge_pairs(&graph, EdgeOrigin::Explicit), vec![pair("a", "c")]);
        assert_eq!(edge_pairs(&graph, EdgeOrigin::Anchor), vec![pair("b", "live")]);

        let b = graph.node_of("b").unwrap();
        let preds: Vec<&str> = graph
            .incoming(b)
            .map(|e| graph.task(e.predecessor).id.as_str())
            .collect();
        assert_eq!(preds, vec!["a"]);
        let succs: Vec<&str> = graph
            .outgoing(b)
            .map(|e| graph.task(e.successor).id.as_str())
            .collect();
        assert_eq!(succs, vec!["live"]);
    }

    #[test]
    fn test_start_to_start_only_task_is_anchored() {
        let tasks = vec![
            make_task("a", 3),
            make_task("b", 2),
            make_task("live", 1).terminal(),
        ];
        let deps = vec![Dependency::start_to_start("a", "b", 0)];
        let graph = TaskGraph::build(&tasks, &deps).unwrap();

        assert_eq!(edge_pairs(&graph, EdgeOrigin::Template), vec![pair("b", "live")]);
        assert_eq!(edge_pairs(&graph, EdgeOrigin::Anchor), vec![pair("a", "live")]);
    }

    #[test]
    fn test_negative_finish_lag_is_anchored() {
        let tasks = vec![
            make_task("a", 3),
            make_task("b", 2),
            make_task("live", 1).terminal(),
        ];
        let early = vec![Dependency::finish_to_finish("a", "b", -3)];
        let graph = TaskGraph::build(&tasks, &early).unwrap();
        assert_eq!(edge_pairs(&graph, EdgeOrigin::Anchor), vec![pair("a", "live")]);

        let aligned = vec![Dependency::finish_to_finish("a", "b", 0)];
        let graph = TaskGraph::build(&tasks, &aligned).unwrap();
        assert!(edge_pairs(&graph, EdgeOrigin::Anchor).is_empty());
    }

    #[test]
    fn test_overlap_longer_than_successor_is_anchored() {
        let tasks = vec![
            make_task("a", 5),
            make_task("b", 1),
            make_task("live", 1).terminal(),
        ];
        let deps = vec![Dependency::finish_to_start("a", "b", -2)];
        let graph = TaskGraph::build(&tasks, &deps).unwrap();
        assert_eq!(edge_pairs(&graph, EdgeOrigin::Anchor), vec![pair("a", "live")]);

        let deps = vec![Dependency::finish_to_start("a", "b", -1)];
        let graph = TaskGraph::build(&tasks, &deps).unwrap();
        assert!(edge_pairs(&graph, EdgeOrigin::Anchor).is_empty());
    }

    #[test]
    fn test_fallback_anchor_is_last_sink() {
        let tasks = vec![make_task("a", 3), make_task("b", 2)];
        let graph = TaskGraph::build(&tasks, &[]).unwrap();

        assert_eq!(graph.terminal_node(), 1);
        assert!(!graph.terminal_is_flagged());
        assert_eq!(graph.duration(1), 2);
    }

    #[test]
    fn test_cycle_names_ring_members() {
        let tasks = vec![make_task("a", 1), make_task("b", 1), make_task("c", 1)];
        let deps = vec![
            Dependency::finish_to_start("a", "b", 0),
            Dependency::finish_to_start("b", "c", 0),
            Dependency::finish_to_start("c", "a", 0),
        ];
        let err = TaskGraph::build(&tasks, &deps).unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle(CycleError {
                task_ids: vec!["a".to_string(), "b".to_string(), "c".to_string()]
            })
        );
    }

    #[test]
    fn test_cycle_with_template_chain_excludes_bystanders() {
        // Template a -> b -> c -> d, explicit c -> b closes b <-> c; d hangs off the cycle.
        let tasks = vec![
            make_task("a", 1),
            make_task("b", 1),
            make_task("c", 1),
            make_task("d", 1),
        ];
        let deps = vec![Dependency::finish_to_start("c", "b", 0)];
        let err = TaskGraph::build(&tasks, &deps).unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle(CycleError {
                task_ids: vec!["b".to_string(), "c".to_string()]
            })
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(TaskGraph::build(&[], &[]).unwrap_err(), GraphError::Empty);

        let mixed = vec![make_task("a", 1), Task::new("x", "X", 1, "video")];
        assert!(matches!(
            TaskGraph::build(&mixed, &[]),
            Err(GraphError::MixedAssets { .. })
        ));

        let tasks = vec![make_task("a", 1), make_task("b", 1)];
        let dangling = vec![Dependency::finish_to_start("a", "zzz", 0)];
        assert_eq!(
            TaskGraph::build(&tasks, &dangling).unwrap_err(),
            GraphError::UnknownTask("zzz".to_string())
        );

        let dupes = vec![make_task("a", 1), make_task("a", 2)];
        assert_eq!(
            TaskGraph::build(&dupes, &[]).unwrap_err(),
            GraphError::DuplicateTask("a".to_string())
        );

        let zero = vec![make_task("a", 0)];
        assert!(matches!(
            TaskGraph::build(&zero, &[]),
            Err(GraphError::InvalidDuration { .. })
        ));

        let from_terminal = vec![make_task("live", 1).terminal(), make_task("a", 1)];
        let deps = vec![Dependency::finish_to_start("live", "a", 0)];
        assert_eq!(
            TaskGraph::build(&from_terminal, &deps).unwrap_err(),
            GraphError::TerminalAsPredecessor("live".to_string())
        );
    }
}
