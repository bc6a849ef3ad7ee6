//! # Day Cursor
//!
//! Walks an [`EnergyTrace`] hour by hour and reports day and year
//! boundaries. Keeping the two boundaries apart lets the power manager reward
//! at the end of each day while only terminating an episode at the end of the
//! year.
//!
//! Two traversal modes share one type:
//!
//! - [`CursorMode::Sequential`]: days in trace order, starting at any day
//! - [`CursorMode::DayType`]: only days of one type, in the trace's shuffled
//!   per-type order, cycling back to the first such day after the last

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::EnvError;
use crate::trace::{DayType, EnergyTrace};

/// Which days of the trace the cursor visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorMode {
    /// Every day in trace order
    #[default]
    Sequential,
    /// Only days of the given type
    DayType(DayType),
}

impl From<Option<DayType>> for CursorMode {
    fn from(day_type: Option<DayType>) -> Self {
        match day_type {
            Some(day_type) => CursorMode::DayType(day_type),
            None => CursorMode::Sequential,
        }
    }
}

/// Harvest and boundary flags after a reset or advance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorStep {
    /// Raw harvest of the current hour in mW
    pub harvest_mw: f64,
    /// Type of the current day
    pub day_type: DayType,
    /// The previous hour was the last of its day
    pub day_ended: bool,
    /// The previous hour was the last of the traversed days
    pub year_ended: bool,
}

/// Stateful position within a shared trace
#[derive(Debug, Clone)]
pub struct DayCursor {
    trace: Arc<EnergyTrace>,
    mode: CursorMode,
    day: usize,
    hour: usize,
    /// Index into the per-type day list (day-type mode only)
    position: usize,
    /// Set once the per-type cycle ran out; the next advance restarts it
    wrap_pending: bool,
}

impl DayCursor {
    /// Create a cursor positioned at the first applicable day
    pub fn new(trace: Arc<EnergyTrace>, mode: CursorMode) -> Result<Self, EnvError> {
        if let CursorMode::DayType(day_type) = mode {
            if trace.days_of_type(day_type).is_empty() {
                return Err(EnvError::EmptyDayType(day_type));
            }
        }

        let mut cursor = Self {
            trace,
            mode,
            day: 0,
            hour: 0,
            position: 0,
            wrap_pending: false,
        };
        cursor.reset(0);
        Ok(cursor)
    }

    /// Sequential cursor over every day
    pub fn sequential(trace: Arc<EnergyTrace>) -> Self {
        Self {
            trace,
            mode: CursorMode::Sequential,
            day: 0,
            hour: 0,
            position: 0,
            wrap_pending: false,
        }
    }

    /// Restart at hour 0
    ///
    /// Sequential cursors start at `start_day`; day-type cursors ignore it and
    /// start at the first day of their type.
    ///
    /// # Panics
    /// Panics if a sequential `start_day` is outside the trace.
    pub fn reset(&mut self, start_day: usize) -> CursorStep {
        match self.mode {
            CursorMode::Sequential => {
                assert!(
                    start_day < self.trace.num_days(),
                    "start day {start_day} outside trace of {} days",
                    self.trace.num_days()
                );
                self.day = start_day;
            }
            CursorMode::DayType(day_type) => {
                self.position = 0;
                self.day = self.trace.days_of_type(day_type)[0];
            }
        }
        self.hour = 0;
        self.wrap_pending = false;

        self.step(false, false)
    }

    /// Move to the next hour
    pub fn advance(&mut self) -> CursorStep {
        if self.hour < self.trace.hours_per_day() - 1 {
            self.hour += 1;
            return self.step(false, false);
        }

        match self.mode {
            CursorMode::Sequential => {
                if self.day < self.trace.num_days() - 1 {
                    self.day += 1;
                    self.hour = 0;
                    self.step(true, false)
                } else {
                    self.step(true, true)
                }
            }
            CursorMode::DayType(day_type) => {
                let days = self.trace.days_of_type(day_type);
                if self.wrap_pending {
                    self.wrap_pending = false;
                    self.day = days[self.position];
                    self.hour = 0;
                    self.step(true, false)
                } else if self.position < days.len() - 1 {
                    self.position += 1;
                    self.day = days[self.position];
                    self.hour = 0;
                    self.step(true, false)
                } else {
                    debug!(day_type = %day_type, days = days.len(), "day type cycle complete");
                    self.position = 0;
                    self.wrap_pending = true;
                    self.step(true, true)
                }
            }
        }
    }

    fn step(&self, day_ended: bool, year_ended: bool) -> CursorStep {
        CursorStep {
            harvest_mw: self.trace.harvest(self.day, self.hour),
            day_type: self.trace.day_type(self.day),
            day_ended,
            year_ended,
        }
    }

    /// Current harvest and day type without moving
    pub fn current(&self) -> CursorStep {
        self.step(false, false)
    }

    pub fn trace(&self) -> &Arc<EnergyTrace> {
        &self.trace
    }

    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    /// Trace index of the current day
    pub fn day(&self) -> usize {
        self.day
    }

    pub fn hour(&self) -> usize {
        self.hour
    }

    /// Index within the per-type day list (always 0 in sequential mode)
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of days one traversal covers
    pub fn days_in_cycle(&self) -> usize {
        match self.mode {
            CursorMode::Sequential => self.trace.num_days(),
            CursorMode::DayType(day_type) => self.trace.days_of_type(day_type).len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{DayRow, TraceConfig, HOURS_PER_DAY};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn trace_from(days: Vec<DayRow>) -> Arc<EnergyTrace> {
        let mut rng = StdRng::seed_from_u64(1);
        Arc::new(
            EnergyTrace::from_harvest("lab", 2010, days, &TraceConfig::default(), &mut rng).unwrap(),
        )
    }

    fn ramp_day(base: f64) -> DayRow {
        std::array::from_fn(|hour| base + hour as f64)
    }

    #[test]
    fn test_reset_reads_first_hour() {
        let trace = trace_from(vec![ramp_day(100.0), ramp_day(200.0)]);
        let mut cursor = DayCursor::new(trace, CursorMode::Sequential).unwrap();

        let step = cursor.reset(1);
        assert!((step.harvest_mw - 200.0).abs() < 1e-9);
        assert!(!step.day_ended);
        assert!(!step.year_ended);
        assert_eq!(cursor.day(), 1);
        assert_eq!(cursor.hour(), 0);
    }

    #[test]
    fn test_hourly_advance_within_day() {
        let trace = trace_from(vec![ramp_day(100.0)]);
        let mut cursor = DayCursor::new(trace, CursorMode::Sequential).unwrap();

        for hour in 1..HOURS_PER_DAY {
            let step = cursor.advance();
            assert!((step.harvest_mw - (100.0 + hour as f64)).abs() < 1e-9);
            assert!(!step.day_ended);
        }
        assert_eq!(cursor.hour(), HOURS_PER_DAY - 1);
    }

    #[test]
    fn test_year_end_is_terminal_for_sequential() {
        let trace = trace_from(vec![ramp_day(0.0)]);
        let mut cursor = DayCursor::new(trace, CursorMode::Sequential).unwrap();

        for _ in 1..HOURS_PER_DAY {
            cursor.advance();
        }
        let step = cursor.advance();
        assert!(step.day_ended && step.year_ended);
        assert_eq!(cursor.hour(), HOURS_PER_DAY - 1);

        let again = cursor.advance();
        assert!(again.day_ended && again.year_ended);
        assert_eq!(cursor.day(), 0);
        assert_eq!(cursor.hour(), HOURS_PER_DAY - 1);
    }

    #[test]
    #[should_panic(expected = "outside trace")]
    fn test_reset_past_end_panics() {
        let trace = trace_from(vec![ramp_day(0.0)]);
        let mut cursor = DayCursor::sequential(trace);
        cursor.reset(1);
    }

    #[test]
    fn test_empty_day_type_rejected() {
        let trace = trace_from(vec![ramp_day(0.0)]);
        let err = DayCursor::new(trace, CursorMode::DayType(DayType::new(5))).unwrap_err();
        assert!(matches!(err, EnvError::EmptyDayType(t) if t == DayType::new(5)));
    }

    #[test]
    fn test_cursor_mode_from_option() {
        assert_eq!(CursorMode::from(None), CursorMode::Sequential);
        assert_eq!(
            CursorMode::from(Some(DayType::new(2))),
            CursorMode::DayType(DayType::new(2))
        );
    }
}
