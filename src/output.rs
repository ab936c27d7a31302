//! Output formatting and persistence for occupancy reports.
//!
//! Supports pretty-printing, JSON serialization, and CSV export of buckets.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::types::{Bucket, BucketKey, Report};
use crate::analyzers::utility::{minutes, round1};
use csv::WriterBuilder;

/// Logs the full report using Rust's debug pretty-print format.
pub fn print_pretty(report: &Report) {
    debug!("{:#?}", report);
}

/// Logs the headline metrics of both periods and their changes.
pub fn log_summary(report: &Report) {
    let c = &report.comparison;
    info!(
        current = %report.metadata.current_window_label,
        reference = %report.metadata.reference_window_label,
        rejected = report.rejected.len(),
        "Occupancy report"
    );
    info!(
        current = c.total_hours.current,
        reference = c.total_hours.reference,
        change = %c.total_hours.change,
        "Total hours"
    );
    info!(
        current = c.man_hours.current,
        reference = c.man_hours.reference,
        change = %c.man_hours.change,
        "Man-hours"
    );
    info!(
        current = c.average_occupancy.current,
        reference = c.average_occupancy.reference,
        change = %c.average_occupancy.change,
        "Average occupancy"
    );
    info!(
        current = c.unique_users.current,
        reference = c.unique_users.reference,
        change = %c.unique_users.change,
        "Unique users"
    );
    info!(
        current = c.total_sessions.current,
        reference = c.total_sessions.reference,
        change = %c.total_sessions.change,
        "Total sessions"
    );
    info!(
        current = c.peak_occupancy.current,
        reference = c.peak_occupancy.reference,
        change = %c.peak_occupancy.change,
        "Peak occupancy"
    );
}

fn create(path: &str) -> Result<File> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create '{}'", parent.display()))?;
    }
    File::create(path).with_context(|| format!("failed to create '{path}'"))
}

/// Writes the report as pretty-printed JSON, replacing any existing file.
pub fn write_report_json(path: &str, report: &Report) -> Result<()> {
    let file = create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    debug!(path, "Report JSON written");
    Ok(())
}

/// One CSV row per occupied hour.
#[derive(Debug, Serialize)]
struct BucketRow {
    date: NaiveDate,
    hour: u32,
    occupancy: usize,
    total_minutes: f64,
    /// Distinct customers joined with `;`.
    customers: String,
}

impl BucketRow {
    fn new(key: &BucketKey, bucket: &Bucket) -> Self {
        let mut customers: Vec<&str> = bucket
            .members
            .iter()
            .map(|m| m.customer_id.as_str())
            .collect();
        customers.dedup();

        BucketRow {
            date: key.date,
            hour: key.hour,
            occupancy: bucket.count,
            total_minutes: round1(minutes(bucket.total)),
            customers: customers.join(";"),
        }
    }
}

/// Writes hourly buckets to a CSV file with a header row.
pub fn write_buckets_csv(path: &str, buckets: &BTreeMap<BucketKey, Bucket>) -> Result<()> {
    let file = create(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for (key, bucket) in buckets {
        writer.serialize(BucketRow::new(key, bucket))?;
    }
    writer.flush()?;

    debug!(path, rows = buckets.len(), "Bucket CSV written");
    Ok(())
}
