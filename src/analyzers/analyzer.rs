use crate::analyzers::aggregate::aggregate;
use crate::analyzers::compare::{ComparisonResult, ReportWindows, Window};
use crate::analyzers::summary::{busiest_hours, hourly_profile};
use crate::analyzers::types::{Occupancy, PeriodReport, PeriodSummary, Report, ReportMetadata};
use crate::config::ColumnConfig;
use crate::fetch::load_source;
use crate::parser::{Normalized, RejectedRecord, normalize_csv};
use crate::visit::Visit;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tracing::{debug, info};

/// Number of busiest hours kept per period unless configured otherwise.
pub const DEFAULT_TOP_HOURS: usize = 5;

impl PeriodReport {
    /// Aggregates and summarizes the visits of one window.
    pub fn build(window: Window, visits: &[Visit], top_hours: usize) -> Self {
        let occupancy = aggregate(visits);
        Self::from_occupancy(window, occupancy, top_hours)
    }

    pub fn from_occupancy(window: Window, occupancy: Occupancy, top_hours: usize) -> Self {
        let summary = PeriodSummary::from_occupancy(&occupancy);
        let hourly_profile = hourly_profile(&occupancy.buckets);
        let busiest_hours = busiest_hours(&occupancy.buckets, top_hours);

        debug!(
            window = %window.label(),
            buckets = occupancy.buckets.len(),
            days = occupancy.daily_stats.len(),
            records = occupancy.record_count,
            "Period aggregated"
        );

        PeriodReport {
            window,
            summary,
            buckets: occupancy.buckets,
            daily_stats: occupancy.daily_stats,
            hourly_profile,
            busiest_hours,
        }
    }
}

/// Splits `visits` by checkin into the current and reference windows.
/// Visits outside both windows are dropped.
pub fn partition(visits: &[Visit], windows: &ReportWindows) -> (Vec<Visit>, Vec<Visit>) {
    let mut current = Vec::new();
    let mut reference = Vec::new();

    for visit in visits {
        if windows.current.contains(visit.checkin()) {
            current.push(visit.clone());
        } else if windows.reference.contains(visit.checkin()) {
            reference.push(visit.clone());
        }
    }

    (current, reference)
}

/// Assembles the report from two finished periods.
pub fn compose_report(
    current_period: PeriodReport,
    reference_period: PeriodReport,
    rejected: Vec<RejectedRecord>,
    now: NaiveDateTime,
) -> Report {
    let comparison = ComparisonResult::between(&current_period.summary, &reference_period.summary);

    let metadata = ReportMetadata {
        generated_at: now,
        current_window_label: current_period.window.label(),
        reference_window_label: reference_period.window.label(),
    };

    Report {
        current_period,
        reference_period,
        comparison,
        rejected,
        metadata,
    }
}

/// Builds the month-over-month report for `now` on the calling thread.
///
/// Deterministic: the same visits and instant always give the same report.
pub fn build_report(
    visits: &[Visit],
    rejected: Vec<RejectedRecord>,
    now: NaiveDateTime,
    top_hours: usize,
) -> Report {
    let windows = ReportWindows::for_instant(now);
    let (current, reference) = partition(visits, &windows);

    compose_report(
        PeriodReport::build(windows.current, &current, top_hours),
        PeriodReport::build(windows.reference, &reference, top_hours),
        rejected,
        now,
    )
}

/// Options for [`analyze`].
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub columns: ColumnConfig,
    pub top_hours: usize,
    pub api_token: Option<String>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            columns: ColumnConfig::default(),
            top_hours: DEFAULT_TOP_HOURS,
            api_token: None,
        }
    }
}

/// Loads and normalizes the visits of `source`.
pub async fn load_visits(source: &str, options: &AnalyzeOptions) -> Result<Normalized> {
    let bytes = load_source(source, options.api_token.as_deref())
        .await
        .with_context(|| format!("cannot load visits from '{source}'"))?;

    let normalized = normalize_csv(&bytes, &options.columns)
        .with_context(|| format!("cannot read visits from '{source}'"))?;

    info!(
        accepted = normalized.visits.len(),
        rejected = normalized.rejected.len(),
        "Visits loaded"
    );

    Ok(normalized)
}

/// Loads `source` and compares the month to date at `now` against the same
/// span of the previous month.
///
/// The two windows are aggregated on separate blocking tasks and joined
/// before the comparison.
#[tracing::instrument(skip(options))]
pub async fn analyze(source: &str, now: NaiveDateTime, options: &AnalyzeOptions) -> Result<Report> {
    let Normalized { visits, rejected } = load_visits(source, options).await?;

    let windows = ReportWindows::for_instant(now);
    let (current, reference) = partition(&visits, &windows);
    info!(
        current = current.len(),
        reference = reference.len(),
        outside = visits.len() - current.len() - reference.len(),
        "Visits assigned to windows"
    );

    let top_hours = options.top_hours;
    let current_task = tokio::task::spawn_blocking(move || {
        PeriodReport::build(windows.current, &current, top_hours)
    });
    let reference_task = tokio::task::spawn_blocking(move || {
        PeriodReport::build(windows.reference, &reference, top_hours)
    });

    let (current_period, reference_period) = tokio::try_join!(current_task, reference_task)
        .context("period aggregation task failed")?;

    Ok(compose_report(current_period, reference_period, rejected, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::delta::PercentChange;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn visit(customer: &str, checkin: &str, minutes: f64) -> Visit {
        Visit::new(customer, ts(checkin), minutes, None).unwrap()
    }

    fn sample() -> Vec<Visit> {
        vec![
            // reference window: 2024-03-01 .. 2024-03-15 12:00
            visit("a", "2024-03-02 10:00:00", 60.0),
            visit("b", "2024-03-02 10:30:00", 60.0),
            visit("a", "2024-03-10 09:00:00", 120.0),
            // after the reference window ends
            visit("z", "2024-03-20 09:00:00", 600.0),
            // current window: 2024-04-01 .. 2024-04-15 12:00
            visit("a", "2024-04-03 10:00:00", 120.0),
            visit("b", "2024-04-03 10:15:00", 30.0),
            visit("c", "2024-04-03 10:20:00", 30.0),
            visit("d", "2024-04-15 11:00:00", 120.0),
            // after `now`
            visit("e", "2024-04-15 12:00:01", 30.0),
        ]
    }

    #[test]
    fn test_partition_by_checkin() {
        let windows = ReportWindows::for_instant(ts("2024-04-15 12:00:00"));
        let (current, reference) = partition(&sample(), &windows);
        assert_eq!(current.len(), 4);
        assert_eq!(reference.len(), 3);
    }

    #[test]
    fn test_build_report() {
        let report = build_report(&sample(), Vec::new(), ts("2024-04-15 12:00:00"), 3);

        let current = &report.current_period.summary;
        assert_eq!(current.total_sessions, 4);
        assert_eq!(current.unique_users, 4);
        assert_eq!(current.peak_occupancy, 3);
        assert_eq!(current.total_hours, 5.0);
        assert_eq!(current.active_days, 2);

        let reference = &report.reference_period.summary;
        assert_eq!(reference.total_sessions, 3);
        assert_eq!(reference.unique_users, 2);
        assert_eq!(reference.total_hours, 4.0);

        assert_eq!(report.comparison.total_hours.change.to_string(), "+25%");
        assert_eq!(report.comparison.man_hours.change.to_string(), "+33.3%");
        assert_eq!(report.comparison.unique_users.change.to_string(), "+2");
        assert_eq!(report.comparison.total_sessions.change.to_string(), "+1");

        assert_eq!(report.metadata.generated_at, ts("2024-04-15 12:00:00"));
        assert_eq!(report.metadata.current_window_label, "2024-04-01 to 2024-04-15");
        assert_eq!(report.metadata.reference_window_label, "2024-03-01 to 2024-03-15");
        assert!(report.current_period.busiest_hours.len() <= 3);
    }

    #[test]
    fn test_build_report_empty() {
        let report = build_report(&[], Vec::new(), ts("2024-04-15 12:00:00"), 5);

        assert_eq!(report.current_period.summary, PeriodSummary::default());
        assert_eq!(report.reference_period.summary, PeriodSummary::default());
        assert_eq!(report.comparison.total_hours.change, PercentChange::Unchanged);
        assert_eq!(report.comparison.average_occupancy.change.to_string(), "0%");
        assert!(report.current_period.buckets.is_empty());
    }

    #[test]
    fn test_build_report_is_reproducible() {
        let now = ts("2024-04-15 12:00:00");
        let mut shuffled = sample();
        shuffled.rotate_left(4);

        assert_eq!(
            build_report(&sample(), Vec::new(), now, 5),
            build_report(&shuffled, Vec::new(), now, 5)
        );
    }

    #[tokio::test]
    async fn test_analyze_local_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visits.csv");
        std::fs::write(
            &path,
            "customer_id,checkin,stay\n\
             a,2024-04-02 10:00:00,60\n\
             b,2024-03-02 10:00:00,30\n\
             c,broken,30\n",
        )
        .unwrap();

        let report = analyze(
            path.to_str().unwrap(),
            ts("2024-04-15 12:00:00"),
            &AnalyzeOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.current_period.summary.total_hours, 1.0);
        assert_eq!(report.reference_period.summary.total_hours, 0.5);
        assert_eq!(report.comparison.total_hours.change.to_string(), "+100%");
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].line, 4);
    }

    #[tokio::test]
    async fn test_analyze_missing_source_fails() {
        let result = analyze(
            "/nonexistent/visits.csv",
            ts("2024-04-15 12:00:00"),
            &AnalyzeOptions::default(),
        )
        .await;
        assert!(result.is_err());
    }
}
