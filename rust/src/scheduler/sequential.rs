//! Legacy sequential chain.
//!
//! Walks backward from the live date one task at a time in chain order.
//! Used when an asset has no explicit dependencies; produces the same dates
//! as the dependency-aware path for that case.

use chrono::NaiveDate;

use crate::calendar::Calendar;
use crate::date_assignment::DateAssignmentError;
use crate::graph::chain_order;
use crate::log_placements;
use crate::models::{ScheduledTask, Task};

/// Schedule one asset's tasks back-to-back, ending at `live_date`.
///
/// Tasks come back in catalog order. Every task is critical.
pub(crate) fn schedule_chain(
    tasks: &[Task],
    live_date: NaiveDate,
    calendar: &Calendar,
    verbosity: u8,
) -> Result<Vec<ScheduledTask>, DateAssignmentError> {
    let mut placed: Vec<Option<ScheduledTask>> = vec![None; tasks.len()];
    // End date for the next task walking backward.
    let mut next_end: Option<NaiveDate> = None;

    for node in chain_order(tasks).into_iter().rev() {
        let task = &tasks[node as usize];
        let fault = |source| DateAssignmentError {
            task_id: task.id.clone(),
            source,
        };

        let (start, end, duration) = if task.is_terminal {
            (live_date, live_date, 1)
        } else {
            let end = match next_end {
                Some(end) => end,
                None => calendar.subtract_working_days(live_date, 0).map_err(fault)?,
            };
            let start = calendar
                .subtract_working_days(end, task.duration_days.saturating_sub(1))
                .map_err(fault)?;
            (start, end, task.duration_days)
        };
        next_end = Some(calendar.subtract_working_days(start, 1).map_err(fault)?);

        log_placements!(verbosity, "{} -> {} .. {}", task.id, start, end);
        placed[node as usize] = Some(ScheduledTask::from_task(task, duration, start, end, 0));
    }

    Ok(placed.into_iter().flatten().collect())
}
