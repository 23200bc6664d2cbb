use crate::time_extent::TimeExtent;
use chrono::{NaiveDate, TimeDelta};
use std::mem::replace;

/// Default slider stop interval: one week.
pub const WEEK_DAYS: i64 = 7;

/// Iterator over the slider stops of an extent: every `step_days` from the
/// start date, always finishing on the end date (inclusive) even when the
/// extent is not a whole number of steps long.
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct StopRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
    step: TimeDelta,
}

impl StopRange {
    /// `step_days` below one is treated as one.
    pub fn new(start: NaiveDate, end: NaiveDate, step_days: i64) -> Self {
        let step = TimeDelta::try_days(step_days.clamp(1, 1_000_000)).unwrap_or_default();
        let next = if start <= end { Some(start) } else { None };
        Self { next, end, step }
    }

    pub fn weekly(extent: &TimeExtent) -> Self {
        Self::new(extent.start(), extent.end(), WEEK_DAYS)
    }
}

impl Iterator for StopRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let following = match current.checked_add_signed(self.step) {
            Some(date) if date < self.end => Some(date),
            _ if current < self.end => Some(self.end),
            _ => None,
        };
        Some(replace(&mut self.next, following).unwrap_or(current))
    }
}

/// The stop of `extent` nearest to `date`. Ties go to the later stop; the
/// extent end always counts as a stop.
pub fn nearest_stop(extent: &TimeExtent, step_days: i64, date: NaiveDate) -> NaiveDate {
    let date = extent.clamp(date);
    let step = step_days.clamp(1, 1_000_000);
    let offset = (date - extent.start()).num_days();
    let below = offset - offset.rem_euclid(step);
    let above = below + step;
    let pick = if offset - below < above - offset {
        below
    } else {
        above
    };
    let candidate = TimeDelta::try_days(pick)
        .and_then(|delta| extent.start().checked_add_signed(delta))
        .map(|stop| extent.clamp(stop))
        .unwrap_or(extent.end());
    let to_candidate = (candidate - date).num_days().abs();
    let to_end = (extent.end() - date).num_days();
    if to_end <= to_candidate {
        extent.end()
    } else {
        candidate
    }
}

/// The stop following `date`, or `None` once `date` is at or past the end.
pub fn next_stop(extent: &TimeExtent, step_days: i64, date: NaiveDate) -> Option<NaiveDate> {
    if date >= extent.end() {
        return None;
    }
    StopRange::new(extent.start(), extent.end(), step_days).find(|stop| *stop > date)
}
