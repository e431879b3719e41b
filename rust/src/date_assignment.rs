//! Calendar date assignment.
//!
//! CPM works in working-day offsets from the project start. The terminal's
//! offset is pinned to the live date and every other offset is mapped back
//! onto the working calendar from there. A second pass in topological order
//! re-checks each incoming edge against the predecessor's actual dates so
//! calendar gaps can never make a successor start too early.

use chrono::NaiveDate;
use thiserror::Error;

use crate::calendar::{Calendar, CalendarError};
use crate::critical_path::CriticalPathResult;
use crate::graph::{GraphEdge, TaskGraph};
use crate::interner::NodeId;
use crate::models::{DependencyType, ScheduleWarning, ScheduledTask};
use crate::{log_placements, log_trace};

/// A calendar fault while placing a specific task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot place task '{task_id}': {source}")]
pub struct DateAssignmentError {
    pub task_id: String,
    #[source]
    pub source: CalendarError,
}

/// Assigned dates for one node.
#[derive(Clone, Copy, Debug)]
struct Placement {
    start: NaiveDate,
    end: NaiveDate,
}

/// Maps CPM offsets onto the working calendar, anchored at the live date.
pub struct DateAssigner<'a> {
    calendar: &'a Calendar,
    live_date: NaiveDate,
    verbosity: u8,
}

impl<'a> DateAssigner<'a> {
    pub fn new(calendar: &'a Calendar, live_date: NaiveDate) -> Self {
        Self {
            calendar,
            live_date,
            verbosity: 0,
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Assign start and end dates to every task, returned in catalog order.
    ///
    /// A flagged terminal lands exactly on the live date, even when that is
    /// not a working day. Without one, the fallback anchor ends on the last
    /// working day on or before the live date.
    pub fn assign(
        &self,
        graph: &TaskGraph,
        cpm: &CriticalPathResult,
    ) -> Result<Vec<ScheduledTask>, DateAssignmentError> {
        let anchor = graph.terminal_node();
        let flagged = graph.terminal_is_flagged();
        let anchor_day = cpm.timing(anchor).earliest_finish - 1;

        // Last working day any non-terminal task may occupy.
        let anchor_date = self
            .calendar
            .subtract_working_days(self.live_date, 0)
            .map_err(|source| self.fault(graph, anchor, source))?;

        // A go-live on a non-working day has no working slot of its own, so
        // the day before it is the last usable one. Overlaps into the
        // terminal can occupy later offsets; they are pulled back so no task
        // ends after go-live.
        let default_day = if flagged && !self.calendar.is_working_day(self.live_date) {
            anchor_day - 1
        } else {
            anchor_day
        };
        let last_busy_day = (0..graph.len() as NodeId)
            .filter(|&node| !(flagged && node == anchor))
            .map(|node| cpm.timing(node).earliest_finish - 1)
            .max()
            .unwrap_or(default_day);
        let base_day = default_day.max(last_busy_day);

        log_trace!(
            self.verbosity,
            "anchor '{}' at offset {}; offset {} -> {}",
            graph.task(anchor).id,
            anchor_day,
            base_day,
            anchor_date
        );

        // Topological order places every predecessor before its successors.
        let mut placements = vec![
            Placement {
                start: anchor_date,
                end: anchor_date,
            };
            graph.len()
        ];
        for &node in graph.topo_order() {
            let placement = if flagged && node == anchor {
                Placement {
                    start: self.live_date,
                    end: self.live_date,
                }
            } else {
                let offset = cpm.timing(node).earliest_start;
                let mapped = self
                    .calendar
                    .shift_working_days(anchor_date, offset - base_day)
                    .map_err(|source| self.fault(graph, node, source))?;
                let start = self.refine_start(graph, node, mapped, &placements)?;
                let end = self
                    .calendar
                    .add_working_days(start, working_span(graph.duration(node)))
                    .map_err(|source| self.fault(graph, node, source))?;
                Placement { start, end }
            };

            log_placements!(
                self.verbosity,
                "{} -> {} .. {}",
                graph.task(node).id,
                placement.start,
                placement.end
            );
            placements[node as usize] = placement;
        }

        Ok(placements
            .into_iter()
            .enumerate()
            .map(|(i, placement)| {
                let node = i as NodeId;
                ScheduledTask::from_task(
                    graph.task(node),
                    graph.duration(node) as u32,
                    placement.start,
                    placement.end,
                    cpm.timing(node).total_float,
                )
            })
            .collect())
    }

    /// Push `start` later until every incoming edge holds on real dates.
    fn refine_start(
        &self,
        graph: &TaskGraph,
        node: NodeId,
        mapped: NaiveDate,
        placements: &[Placement],
    ) -> Result<NaiveDate, DateAssignmentError> {
        let mut start = mapped;
        for edge in graph.incoming(node) {
            let pred = placements[edge.predecessor as usize];
            let required = self
                .required_start(edge, pred, graph.duration(node))
                .map_err(|source| self.fault(graph, node, source))?;
            if required > start {
                log_placements!(
                    self.verbosity,
                    "{} pushed {} -> {} by '{}' ({})",
                    graph.task(node).id,
                    start,
                    required,
                    graph.task(edge.predecessor).id,
                    edge.dependency_type
                );
                start = required;
            }
        }
        Ok(start)
    }

    /// Earliest start date an edge permits, given the predecessor's dates.
    fn required_start(
        &self,
        edge: &GraphEdge,
        pred: Placement,
        duration: i64,
    ) -> Result<NaiveDate, CalendarError> {
        let calendar = self.calendar;
        match edge.dependency_type {
            // End dates are inclusive. A lag of -k shares k working days, so
            // the successor starts k - 1 working days before the
            // predecessor's end date (k = 1 starts on that same day).
            DependencyType::FinishToStart => {
                calendar.shift_working_days(pred.end, edge.lag_days + 1)
            }
            DependencyType::StartToStart => calendar.shift_working_days(pred.start, edge.lag_days),
            DependencyType::FinishToFinish => {
                let finish = calendar.shift_working_days(pred.end, edge.lag_days)?;
                calendar.subtract_working_days(finish, working_span(duration))
            }
        }
    }

    fn fault(&self, graph: &TaskGraph, node: NodeId, source: CalendarError) -> DateAssignmentError {
        DateAssignmentError {
            task_id: graph.task(node).id.clone(),
            source,
        }
    }
}

/// Working days between a task's first and last day.
#[inline]
fn working_span(duration: i64) -> u32 {
    u32::try_from(duration - 1).unwrap_or(0)
}

/// Warn for every task that starts before `floor_date`.
pub fn floor_warnings(
    scheduled: &[ScheduledTask],
    floor_date: NaiveDate,
    calendar: &Calendar,
) -> Vec<ScheduleWarning> {
    scheduled
        .iter()
        .filter(|task| task.start_date < floor_date)
        .filter_map(|task| {
            let day_before_floor = floor_date.pred_opt()?;
            Some(ScheduleWarning::StartsBeforeFloor {
                task_id: task.task_id.clone(),
                start_date: task.start_date,
                floor_date,
                working_days_short: calendar
                    .working_days_between(task.start_date, day_before_floor),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::critical_path::calculate_critical_path;
    use crate::models::{Dependency, Task};

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn make_task(id: &str, duration: u32) -> Task {
        Task::new(id, id.to_uppercase(), duration, "mailer")
    }

    fn chain() -> Vec<Task> {
        vec![
            make_task("a", 3),
            make_task("b", 2),
            make_task("c", 1).terminal(),
        ]
    }

    fn assign(
        tasks: &[Task],
        deps: &[Dependency],
        calendar: &Calendar,
        live: NaiveDate,
    ) -> Result<Vec<ScheduledTask>, DateAssignmentError> {
        let graph = TaskGraph::build(tasks, deps).unwrap();
        let cpm = calculate_critical_path(&graph, 0);
        DateAssigner::new(calendar, live).assign(&graph, &cpm)
    }

    fn dates(scheduled: &[ScheduledTask], id: &str) -> (NaiveDate, NaiveDate) {
        let task = scheduled.iter().find(|t| t.task_id == id).unwrap();
        (task.start_date, task.end_date)
    }

    // 2025-03-07 is a Friday.

    #[test]
    fn test_chain_back_from_friday() {
        let calendar = Calendar::default();
        let scheduled = assign(&chain(), &[], &calendar, d(2025, 3, 7)).unwrap();

        assert_eq!(dates(&scheduled, "c"), (d(2025, 3, 7), d(2025, 3, 7)));
        assert_eq!(dates(&scheduled, "b"), (d(2025, 3, 5), d(2025, 3, 6)));
        assert_eq!(dates(&scheduled, "a"), (d(2025, 2, 28), d(2025, 3, 4)));
        assert!(scheduled.iter().all(|t| t.is_critical));

        let ids: Vec<&str> = scheduled.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_overlap_starts_on_predecessor_last_day() {
        let calendar = Calendar::default();
        let deps = vec![Dependency::finish_to_start("a", "b", -1)];
        let scheduled = assign(&chain(), &deps, &calendar, d(2025, 3, 7)).unwrap();

        let (a_start, a_end) = dates(&scheduled, "a");
        let (b_start, b_end) = dates(&scheduled, "b");
        assert_eq!((a_start, a_end), (d(2025, 3, 3), d(2025, 3, 5)));
        assert_eq!((b_start, b_end), (d(2025, 3, 5), d(2025, 3, 6)));
        assert_eq!(b_start, a_end);
        assert!(scheduled.iter().all(|t| t.is_critical));
    }

    #[test]
    fn test_sunday_live_date() {
        let calendar = Calendar::default();
        let scheduled = assign(&chain(), &[], &calendar, d(2025, 3, 9)).unwrap();

        assert_eq!(dates(&scheduled, "c"), (d(2025, 3, 9), d(2025, 3, 9)));
        assert_eq!(dates(&scheduled, "b"), (d(2025, 3, 6), d(2025, 3, 7)));
        assert_eq!(dates(&scheduled, "a"), (d(2025, 3, 3), d(2025, 3, 5)));
    }

    #[test]
    fn test_overlap_into_weekend_terminal_stays_before_live() {
        let calendar = Calendar::default();
        let tasks = vec![make_task("a", 2), make_task("live", 1).terminal()];
        let deps = vec![Dependency::finish_to_start("a", "live", -1)];
        let live = d(2025, 3, 9);
        let scheduled = assign(&tasks, &deps, &calendar, live).unwrap();

        assert_eq!(dates(&scheduled, "live"), (live, live));
        assert_eq!(dates(&scheduled, "a"), (d(2025, 3, 6), d(2025, 3, 7)));
        for task in scheduled.iter().filter(|t| !t.is_terminal) {
            assert!(task.end_date <= live, "task {} ends {}", task.task_id, task.end_date);
            assert_eq!(
                calendar.working_days_between(task.start_date, task.end_date),
                task.duration_days
            );
        }
    }

    #[test]
    fn test_overlap_into_terminal_never_passes_live() {
        let calendar = Calendar::default();
        let tasks = vec![make_task("a", 3), make_task("live", 1).terminal()];
        let deps = vec![Dependency::finish_to_start("a", "live", -1)];

        for live in d(2025, 3, 3).iter_days().take(14) {
            let scheduled = assign(&tasks, &deps, &calendar, live).unwrap();
            let (start, end) = dates(&scheduled, "a");
            assert!(end <= live, "live {} but a ends {}", live, end);
            assert_eq!(calendar.working_days_between(start, end), 3);
        }

        // Working live date: the overlap shares the go-live day itself.
        let scheduled = assign(&tasks, &deps, &calendar, d(2025, 3, 7)).unwrap();
        assert_eq!(dates(&scheduled, "a"), (d(2025, 3, 5), d(2025, 3, 7)));
    }

    #[test]
    fn test_negative_finish_lag_keeps_task_before_live() {
        let calendar = Calendar::default();
        let tasks = vec![
            make_task("a", 3),
            make_task("b", 2),
            make_task("live", 1).terminal(),
        ];
        let deps = vec![Dependency::finish_to_finish("a", "b", -3)];
        let scheduled = assign(&tasks, &deps, &calendar, d(2025, 3, 7)).unwrap();

        assert_eq!(dates(&scheduled, "a"), (d(2025, 3, 4), d(2025, 3, 6)));
        let a = scheduled.iter().find(|t| t.task_id == "a").unwrap();
        assert_eq!(a.total_float, 0);
        assert!(a.is_critical);
        let b = scheduled.iter().find(|t| t.task_id == "b").unwrap();
        assert_eq!(b.total_float, 1);
        assert!(b.end_date < d(2025, 3, 7));
    }

    #[test]
    fn test_holiday_inside_task_window() {
        let calendar = Calendar::new([d(2025, 3, 5)]);
        let scheduled = assign(&chain(), &[], &calendar, d(2025, 3, 7)).unwrap();

        assert_eq!(dates(&scheduled, "b"), (d(2025, 3, 4), d(2025, 3, 6)));
        assert_eq!(dates(&scheduled, "a"), (d(2025, 2, 27), d(2025, 3, 3)));

        for task in &scheduled {
            assert_eq!(
                calendar.working_days_between(task.start_date, task.end_date),
                task.duration_days,
                "task {}",
                task.task_id
            );
        }
    }

    #[test]
    fn test_start_to_start_shares_start_date() {
        let calendar = Calendar::default();
        let tasks = vec![
            make_task("a", 3),
            make_task("b", 2),
            make_task("live", 1).terminal(),
        ];
        let deps = vec![Dependency::start_to_start("a", "b", 0)];
        let scheduled = assign(&tasks, &deps, &calendar, d(2025, 3, 7)).unwrap();

        assert_eq!(dates(&scheduled, "a"), (d(2025, 3, 4), d(2025, 3, 6)));
        assert_eq!(dates(&scheduled, "b"), (d(2025, 3, 4), d(2025, 3, 5)));
        let b = scheduled.iter().find(|t| t.task_id == "b").unwrap();
        assert_eq!(b.total_float, 1);
        assert!(!b.is_critical);
    }

    #[test]
    fn test_finish_to_finish_shares_end_date() {
        let calendar = Calendar::default();
        let tasks = vec![
            make_task("a", 3),
            make_task("b", 2),
            make_task("live", 1).terminal(),
        ];
        let deps = vec![Dependency::finish_to_finish("a", "b", 0)];
        let scheduled = assign(&tasks, &deps, &calendar, d(2025, 3, 7)).unwrap();

        assert_eq!(dates(&scheduled, "a"), (d(2025, 3, 4), d(2025, 3, 6)));
        assert_eq!(dates(&scheduled, "b"), (d(2025, 3, 5), d(2025, 3, 6)));
    }

    #[test]
    fn test_unflagged_anchor_ends_on_working_day() {
        let calendar = Calendar::default();
        let tasks = vec![make_task("a", 3), make_task("b", 2)];
        let scheduled = assign(&tasks, &[], &calendar, d(2025, 3, 9)).unwrap();

        assert_eq!(dates(&scheduled, "b"), (d(2025, 3, 6), d(2025, 3, 7)));
        assert_eq!(dates(&scheduled, "a"), (d(2025, 3, 3), d(2025, 3, 5)));
    }

    #[test]
    fn test_iteration_cap_names_the_task() {
        let calendar = Calendar::default().with_step_cap(3);
        let tasks = vec![
            make_task("a", 10),
            make_task("b", 2),
            make_task("c", 1).terminal(),
        ];
        let err = assign(&tasks, &[], &calendar, d(2025, 3, 7)).unwrap_err();

        assert_eq!(err.task_id, "a");
        assert!(matches!(
            err.source,
            CalendarError::IterationCapExceeded { cap: 3, .. }
        ));
    }

    #[test]
    fn test_floor_warnings() {
        let calendar = Calendar::default();
        let scheduled = assign(&chain(), &[], &calendar, d(2025, 3, 7)).unwrap();

        let warnings = floor_warnings(&scheduled, d(2025, 3, 4), &calendar);
        assert_eq!(
            warnings,
            vec![ScheduleWarning::StartsBeforeFloor {
                task_id: "a".to_string(),
                start_date: d(2025, 2, 28),
                floor_date: d(2025, 3, 4),
                working_days_short: 2,
            }]
        );

        assert!(floor_warnings(&scheduled, d(2025, 2, 28), &calendar).is_empty());
    }
}
