//! Folding visits into hourly buckets and per-day statistics.

use crate::analyzers::types::{Bucket, BucketKey, DailyStat, Occupancy, Occupant, Slot};
use crate::visit::Visit;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Accumulates hourly buckets and daily statistics for one period.
///
/// Durations are summed as exact millisecond counts and member lists are
/// sorted by [`OccupancyAggregator::finish`], so any ordering of the same
/// visits produces an identical [`Occupancy`].
#[derive(Debug, Clone, Default)]
pub struct OccupancyAggregator {
    buckets: BTreeMap<BucketKey, Bucket>,
    daily: BTreeMap<NaiveDate, DailyStat>,
    records: usize,
}

impl OccupancyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one slot owned by `customer_id` to its hour bucket.
    pub fn add_slot(&mut self, customer_id: &str, slot: &Slot) {
        let bucket = self.buckets.entry(slot.key).or_default();
        bucket.count += 1;
        bucket.total += slot.duration();
        bucket.members.push(Occupant {
            customer_id: customer_id.to_string(),
            duration: slot.duration(),
        });
    }

    /// Adds every slot of `visit`, then counts the visit once against its
    /// checkin date.
    pub fn add_visit(&mut self, visit: &Visit) {
        for slot in visit.slots() {
            self.add_slot(visit.customer_id(), &slot);
        }

        let day = self.daily.entry(visit.checkin_date()).or_default();
        day.total += visit.stay();
        day.sessions += 1;
        day.customers.insert(visit.customer_id().to_string());

        self.records += 1;
    }

    /// Combines two aggregators built over disjoint visit sets.
    pub fn merge(mut self, other: Self) -> Self {
        for (key, bucket) in other.buckets {
            let target = self.buckets.entry(key).or_default();
            target.count += bucket.count;
            target.total += bucket.total;
            target.members.extend(bucket.members);
        }

        for (date, stat) in other.daily {
            let target = self.daily.entry(date).or_default();
            target.total += stat.total;
            target.sessions += stat.sessions;
            target.customers.extend(stat.customers);
        }

        self.records += other.records;
        self
    }

    pub fn finish(self) -> Occupancy {
        let mut buckets = self.buckets;
        for bucket in buckets.values_mut() {
            bucket.members.sort();
        }

        Occupancy {
            buckets,
            daily_stats: self.daily,
            record_count: self.records,
        }
    }
}

impl<'a> Extend<&'a Visit> for OccupancyAggregator {
    fn extend<I: IntoIterator<Item = &'a Visit>>(&mut self, visits: I) {
        for visit in visits {
            self.add_visit(visit);
        }
    }
}

/// Aggregates `visits` in a single pass.
pub fn aggregate<'a>(visits: impl IntoIterator<Item = &'a Visit>) -> Occupancy {
    let mut aggregator = OccupancyAggregator::new();
    aggregator.extend(visits);
    aggregator.finish()
}
