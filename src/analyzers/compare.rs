//! Report windows derived from a reference instant and the comparison of
//! their summaries.

use crate::analyzers::delta::{AbsoluteChange, PercentChange};
use crate::analyzers::types::PeriodSummary;
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Inclusive `[start, end]` range of checkin instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }

    /// `YYYY-MM-DD to YYYY-MM-DD`
    pub fn label(&self) -> String {
        format!("{} to {}", self.start.date(), self.end.date())
    }
}

/// The current month-to-date window and the matching span of the previous
/// month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindows {
    pub current: Window,
    pub reference: Window,
}

impl ReportWindows {
    /// Windows anchored at `now`.
    ///
    /// The reference window ends on the same day-of-month and time-of-day one
    /// month earlier, clamped to the last day of that month (Mar 31 maps to
    /// Feb 28/29).
    pub fn for_instant(now: NaiveDateTime) -> Self {
        let today = now.date();
        let reference_day = today
            .checked_sub_months(Months::new(1))
            .unwrap_or(NaiveDate::MIN);

        ReportWindows {
            current: Window {
                start: first_of_month(today).and_time(NaiveTime::MIN),
                end: now,
            },
            reference: Window {
                start: first_of_month(reference_day).and_time(NaiveTime::MIN),
                end: reference_day.and_time(now.time()),
            },
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// A metric compared by relative change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentMetric {
    pub current: f64,
    pub reference: f64,
    pub change: PercentChange,
}

impl PercentMetric {
    fn new(current: f64, reference: f64) -> Self {
        Self {
            current,
            reference,
            change: PercentChange::between(current, reference),
        }
    }
}

/// A metric compared by absolute difference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountMetric {
    pub current: usize,
    pub reference: usize,
    pub change: AbsoluteChange,
}

impl CountMetric {
    fn new(current: usize, reference: usize) -> Self {
        Self {
            current,
            reference,
            change: AbsoluteChange::between(current, reference),
        }
    }
}

/// Per-metric change between two [`PeriodSummary`] values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub total_hours: PercentMetric,
    pub man_hours: PercentMetric,
    pub average_occupancy: PercentMetric,
    pub unique_users: CountMetric,
    pub total_sessions: CountMetric,
    pub peak_occupancy: CountMetric,
}

impl ComparisonResult {
    pub fn between(current: &PeriodSummary, reference: &PeriodSummary) -> Self {
        ComparisonResult {
            total_hours: PercentMetric::new(current.total_hours, reference.total_hours),
            man_hours: PercentMetric::new(current.man_hours as f64, reference.man_hours as f64),
            average_occupancy: PercentMetric::new(
                current.average_occupancy,
                reference.average_occupancy,
            ),
            unique_users: CountMetric::new(current.unique_users, reference.unique_users),
            total_sessions: CountMetric::new(current.total_sessions, reference.total_sessions),
            peak_occupancy: CountMetric::new(current.peak_occupancy, reference.peak_occupancy),
        }
    }
}
