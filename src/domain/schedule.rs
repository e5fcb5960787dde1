//! Cycle day arithmetic.
//!
//! A timetable repeats every `cycle_length` days. It records the cycle day in
//! effect at `cycle_day_updated`; every calendar day after that advances the
//! cycle by one, wrapping back to day 1 after `cycle_length`.

use super::entities::Timetable;
use chrono::{NaiveDate, Utc};

impl Timetable {
    /// Cycle day (1-based) in effect on `date`.
    ///
    /// Dates before `cycle_day_updated` count backwards through the cycle.
    pub fn cycle_day_on(&self, date: NaiveDate) -> i32 {
        let anchor = self.cycle_day_updated.date_naive();
        let elapsed = date.signed_duration_since(anchor).num_days();
        let length = i64::from(self.cycle_length.max(1));
        let offset = i64::from(self.current_cycle_day.max(1) - 1);
        // bounded by cycle_length, which is an i32
        ((offset + elapsed).rem_euclid(length) + 1) as i32
    }

    pub fn cycle_day_today(&self) -> i32 {
        self.cycle_day_on(Utc::now().date_naive())
    }
}
