//! Data types used by the occupancy pipeline.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::analyzers::compare::{ComparisonResult, Window};
use crate::analyzers::utility::{minutes, serialize_hours, serialize_minutes};
use crate::parser::RejectedRecord;

/// Calendar hour identifying a [`Bucket`]. Orders by date, then hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub date: NaiveDate,
    pub hour: u32,
}

impl BucketKey {
    /// The bucket containing instant `t`.
    pub fn of(t: NaiveDateTime) -> Self {
        Self {
            date: t.date(),
            hour: t.hour(),
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:00", self.date, self.hour)
    }
}

// Serialized as a string so bucket maps can be JSON objects.
impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// The part of one visit's interval inside a single calendar hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub key: BucketKey,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Slot {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> f64 {
        minutes(self.duration())
    }
}

/// One customer's contribution to a bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Occupant {
    pub customer_id: String,
    #[serde(rename = "minutes", serialize_with = "serialize_minutes")]
    pub duration: TimeDelta,
}

/// Aggregated occupancy of one calendar hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub count: usize,
    #[serde(rename = "total_minutes", serialize_with = "serialize_minutes")]
    pub total: TimeDelta,
    pub members: Vec<Occupant>,
}

impl Default for Bucket {
    fn default() -> Self {
        Self {
            count: 0,
            total: TimeDelta::zero(),
            members: Vec::new(),
        }
    }
}

/// Per-day totals, attributed by each visit's checkin date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStat {
    #[serde(rename = "total_hours", serialize_with = "serialize_hours")]
    pub total: TimeDelta,
    pub sessions: usize,
    pub customers: BTreeSet<String>,
}

impl Default for DailyStat {
    fn default() -> Self {
        Self {
            total: TimeDelta::zero(),
            sessions: 0,
            customers: BTreeSet::new(),
        }
    }
}

/// Finished accumulators of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    pub buckets: BTreeMap<BucketKey, Bucket>,
    pub daily_stats: BTreeMap<NaiveDate, DailyStat>,
    pub record_count: usize,
}

/// Scalar metrics of one period, rounded to one decimal place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub total_hours: f64,
    pub total_sessions: usize,
    /// One session per person; equal to `total_sessions`.
    pub man_hours: usize,
    pub unique_users: usize,
    pub peak_occupancy: usize,
    pub average_occupancy: f64,
    pub active_days: usize,
}

/// Occupancy of one hour of the day across every day it was occupied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourProfile {
    pub hour: u32,
    pub occupied_days: usize,
    pub average_occupancy: f64,
    pub peak_occupancy: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusyHour {
    pub bucket: BucketKey,
    pub occupancy: usize,
    pub customers: Vec<String>,
}

/// Everything computed for one analysis window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub window: Window,
    pub summary: PeriodSummary,
    pub buckets: BTreeMap<BucketKey, Bucket>,
    pub daily_stats: BTreeMap<NaiveDate, DailyStat>,
    pub hourly_profile: Vec<HourProfile>,
    pub busiest_hours: Vec<BusyHour>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub generated_at: NaiveDateTime,
    pub current_window_label: String,
    pub reference_window_label: String,
}

/// Month-over-month comparison handed to the output formatter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub current_period: PeriodReport,
    pub reference_period: PeriodReport,
    pub comparison: ComparisonResult,
    pub rejected: Vec<RejectedRecord>,
    pub metadata: ReportMetadata,
}
