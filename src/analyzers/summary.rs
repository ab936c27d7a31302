//! Period metrics, hour-of-day profile and busiest hours.

use crate::analyzers::types::{Bucket, BucketKey, BusyHour, HourProfile, Occupancy, PeriodSummary};
use crate::analyzers::utility::{hours, mean, round1};
use chrono::TimeDelta;
use std::collections::{BTreeMap, BTreeSet};

impl PeriodSummary {
    /// Reduces one period's accumulators to scalar metrics.
    ///
    /// An empty [`Occupancy`] yields all zeros.
    pub fn from_occupancy(occupancy: &Occupancy) -> Self {
        let total = occupancy
            .daily_stats
            .values()
            .fold(TimeDelta::zero(), |acc, day| acc + day.total);

        let unique_users = occupancy
            .daily_stats
            .values()
            .flat_map(|day| day.customers.iter())
            .collect::<BTreeSet<_>>()
            .len();

        let counts: Vec<f64> = occupancy
            .buckets
            .values()
            .map(|b| b.count as f64)
            .collect();

        let peak_occupancy = occupancy
            .buckets
            .values()
            .map(|b| b.count)
            .max()
            .unwrap_or(0);

        PeriodSummary {
            total_hours: round1(hours(total)),
            total_sessions: occupancy.record_count,
            man_hours: occupancy.record_count,
            unique_users,
            peak_occupancy,
            average_occupancy: round1(mean(&counts)),
            active_days: occupancy.daily_stats.len(),
        }
    }
}

/// Average and peak occupancy per hour of the day, for hours that were ever
/// occupied.
pub fn hourly_profile(buckets: &BTreeMap<BucketKey, Bucket>) -> Vec<HourProfile> {
    let mut by_hour: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (key, bucket) in buckets {
        by_hour.entry(key.hour).or_default().push(bucket.count);
    }

    by_hour
        .into_iter()
        .map(|(hour, counts)| {
            let as_f64: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
            HourProfile {
                hour,
                occupied_days: counts.len(),
                average_occupancy: round1(mean(&as_f64)),
                peak_occupancy: counts.iter().copied().max().unwrap_or(0),
            }
        })
        .collect()
}

/// The `limit` most occupied buckets, earliest first among ties.
pub fn busiest_hours(buckets: &BTreeMap<BucketKey, Bucket>, limit: usize) -> Vec<BusyHour> {
    let mut ranked: Vec<(&BucketKey, &Bucket)> = buckets.iter().collect();
    // Stable sort keeps BTreeMap order (earliest key) among equal counts.
    ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count));

    ranked
        .into_iter()
        .take(limit)
        .map(|(key, bucket)| {
            let customers: BTreeSet<&str> = bucket
                .members
                .iter()
                .map(|m| m.customer_id.as_str())
                .collect();
            BusyHour {
                bucket: *key,
                occupancy: bucket.count,
                customers: customers.into_iter().map(str::to_string).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::aggregate;
    use crate::visit::Visit;
    use chrono::{NaiveDate, NaiveDateTime};

    fn visit(customer: &str, checkin: &str, minutes: f64) -> Visit {
        let checkin = NaiveDateTime::parse_from_str(checkin, "%Y-%m-%d %H:%M:%S").unwrap();
        Visit::new(customer, checkin, minutes, None).unwrap()
    }

    #[test]
    fn test_empty_period_is_all_zero() {
        let summary = PeriodSummary::from_occupancy(&Occupancy::default());
        assert_eq!(summary, PeriodSummary::default());
        assert_eq!(summary.peak_occupancy, 0);
        assert_eq!(summary.average_occupancy, 0.0);
    }

    #[test]
    fn test_single_short_visit() {
        let occupancy = aggregate(&[visit("c1", "2024-03-05 14:10:00", 30.0)]);
        let summary = PeriodSummary::from_occupancy(&occupancy);

        assert_eq!(summary.peak_occupancy, 1);
        assert_eq!(summary.average_occupancy, 1.0);
        assert_eq!(summary.total_sessions, 1);
        assert_eq!(summary.man_hours, 1);
        assert_eq!(summary.unique_users, 1);
        assert_eq!(summary.active_days, 1);
        assert_eq!(summary.total_hours, 0.5);
    }

    #[test]
    fn test_average_ignores_empty_hours() {
        // 10:00 has two occupants, 11:00 one, 15:00 one: mean over 3 buckets.
        let occupancy = aggregate(&[
            visit("a", "2024-03-05 10:00:00", 90.0),
            visit("b", "2024-03-05 10:15:00", 30.0),
            visit("a", "2024-03-05 15:00:00", 20.0),
        ]);
        let summary = PeriodSummary::from_occupancy(&occupancy);

        assert_eq!(summary.peak_occupancy, 2);
        assert_eq!(summary.average_occupancy, 1.3);
        assert_eq!(summary.unique_users, 2);
        assert_eq!(summary.total_sessions, 3);
        assert_eq!(summary.total_hours, 2.3);
    }

    #[test]
    fn test_unique_users_across_days() {
        let occupancy = aggregate(&[
            visit("a", "2024-03-05 10:00:00", 60.0),
            visit("a", "2024-03-06 10:00:00", 60.0),
            visit("b", "2024-03-06 11:00:00", 60.0),
        ]);
        let summary = PeriodSummary::from_occupancy(&occupancy);
        assert_eq!(summary.unique_users, 2);
        assert_eq!(summary.active_days, 2);
    }

    #[test]
    fn test_hourly_profile() {
        let occupancy = aggregate(&[
            visit("a", "2024-03-05 10:00:00", 30.0),
            visit("b", "2024-03-05 10:10:00", 30.0),
            visit("a", "2024-03-06 10:00:00", 30.0),
        ]);
        let profile = hourly_profile(&occupancy.buckets);

        assert_eq!(profile.len(), 1);
        assert_eq!(profile[0].hour, 10);
        assert_eq!(profile[0].occupied_days, 2);
        assert_eq!(profile[0].average_occupancy, 1.5);
        assert_eq!(profile[0].peak_occupancy, 2);
    }

    #[test]
    fn test_busiest_hours_ranked() {
        let occupancy = aggregate(&[
            visit("a", "2024-03-05 09:00:00", 30.0),
            visit("b", "2024-03-05 10:10:00", 30.0),
            visit("c", "2024-03-05 10:20:00", 30.0),
            visit("d", "2024-03-05 11:00:00", 30.0),
        ]);
        let top = busiest_hours(&occupancy.buckets, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].occupancy, 2);
        assert_eq!(top[0].bucket.hour, 10);
        assert_eq!(top[0].customers, vec!["b".to_string(), "c".to_string()]);
        // Tie between 09:00 and 11:00 resolves to the earlier hour.
        assert_eq!(top[1].bucket.hour, 9);
        assert_eq!(
            top[1].bucket.date,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
    }
}
