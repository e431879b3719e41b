//! Working-day calendar: weekends plus a holiday set.
//!
//! All stepping is done one calendar day at a time and is bounded by an
//! iteration cap. Exceeding the cap means the calendar has no working days in
//! a very long window (e.g. an all-holiday range), which is a configuration
//! fault rather than a scheduling outcome.

use chrono::{Datelike, NaiveDate, Weekday};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Default iteration cap for calendar stepping (about 13 years of days).
pub const MAX_CALENDAR_STEPS: u32 = 5_000;

/// Errors raised while stepping through the calendar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Calendar stepping from {from} exceeded {cap} days ({steps} steps taken); check holiday data")]
    IterationCapExceeded {
        from: NaiveDate,
        steps: u32,
        cap: u32,
    },
    #[error("Calendar stepping from {from} ran past the supported date range")]
    DateOutOfRange { from: NaiveDate },
    #[error("Invalid calendar date '{input}' (expected YYYY-MM-DD)")]
    InvalidDate { input: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Immutable working-day calendar, shared by reference across a run.
#[derive(Clone, Debug)]
pub struct Calendar {
    holidays: FxHashSet<NaiveDate>,
    /// Indexed by `Weekday::num_days_from_monday()`.
    weekend: [bool; 7],
    step_cap: u32,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

impl Calendar {
    /// Saturday/Sunday weekend plus the given holidays.
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut weekend = [false; 7];
        weekend[Weekday::Sat.num_days_from_monday() as usize] = true;
        weekend[Weekday::Sun.num_days_from_monday() as usize] = true;
        Self {
            holidays: holidays.into_iter().collect(),
            weekend,
            step_cap: MAX_CALENDAR_STEPS,
        }
    }

    /// Build from ISO `YYYY-MM-DD` strings, as delivered by holiday feeds.
    pub fn from_iso_dates<'a>(
        holidays: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, CalendarError> {
        let parsed = holidays
            .into_iter()
            .map(|raw| {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                    CalendarError::InvalidDate {
                        input: raw.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(parsed))
    }

    /// Replace the weekend rule.
    pub fn with_weekend(mut self, days: &[Weekday]) -> Self {
        self.weekend = [false; 7];
        for day in days {
            self.weekend[day.num_days_from_monday() as usize] = true;
        }
        self
    }

    /// Replace the stepping cap.
    pub fn with_step_cap(mut self, step_cap: u32) -> Self {
        self.step_cap = step_cap;
        self
    }

    pub fn holidays(&self) -> &FxHashSet<NaiveDate> {
        &self.holidays
    }

    pub fn step_cap(&self) -> u32 {
        self.step_cap
    }

    #[inline]
    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        self.weekend[date.weekday().num_days_from_monday() as usize]
    }

    #[inline]
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.is_weekend(date) && !self.holidays.contains(&date)
    }

    /// Move forward until `n` working days have been consumed.
    ///
    /// With `n == 0` a non-working `date` is rolled forward to the next working day.
    pub fn add_working_days(&self, date: NaiveDate, n: u32) -> Result<NaiveDate, CalendarError> {
        self.step_working_days(date, n, Direction::Forward)
    }

    /// Move backward until `n` working days have been consumed.
    ///
    /// With `n == 0` a non-working `date` is rolled back to the previous working day.
    pub fn subtract_working_days(
        &self,
        date: NaiveDate,
        n: u32,
    ) -> Result<NaiveDate, CalendarError> {
        self.step_working_days(date, n, Direction::Backward)
    }

    /// Signed variant: positive moves forward, negative moves backward.
    pub fn shift_working_days(&self, date: NaiveDate, n: i64) -> Result<NaiveDate, CalendarError> {
        let magnitude = u32::try_from(n.unsigned_abs())
            .map_err(|_| CalendarError::DateOutOfRange { from: date })?;
        if n >= 0 {
            self.add_working_days(date, magnitude)
        } else {
            self.subtract_working_days(date, magnitude)
        }
    }

    /// Number of working days in `start..=end` (0 when `end < start`).
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        if end < start {
            return 0;
        }
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| self.is_working_day(*day))
            .count() as u32
    }

    fn step_working_days(
        &self,
        from: NaiveDate,
        n: u32,
        direction: Direction,
    ) -> Result<NaiveDate, CalendarError> {
        let mut current = from;
        let mut remaining = n;
        let mut steps: u32 = 0;

        while remaining > 0 {
            current = self.step_once(from, current, direction, &mut steps)?;
            if self.is_working_day(current) {
                remaining -= 1;
            }
        }

        // Landing day is only non-working when n == 0.
        while !self.is_working_day(current) {
            current = self.step_once(from, current, direction, &mut steps)?;
        }

        Ok(current)
    }

    fn step_once(
        &self,
        from: NaiveDate,
        current: NaiveDate,
        direction: Direction,
        steps: &mut u32,
    ) -> Result<NaiveDate, CalendarError> {
        if *steps >= self.step_cap {
            return Err(CalendarError::IterationCapExceeded {
                from,
                steps: *steps,
                cap: self.step_cap,
            });
        }
        *steps += 1;
        let next = match direction {
            Direction::Forward => current.succ_opt(),
            Direction::Backward => current.pred_opt(),
        };
        next.ok_or(CalendarError::DateOutOfRange { from })
    }
}
