use chrono::{NaiveDateTime, TimeDelta, Timelike};

use crate::analyzers::types::{BucketKey, Slot};

/// Splits `[checkin, checkout)` into hour-aligned [`Slot`]s.
///
/// The slots are contiguous, ordered by start and cover the interval exactly
/// once. An empty or inverted interval yields nothing.
pub fn decompose(checkin: NaiveDateTime, checkout: NaiveDateTime) -> Slots {
    Slots {
        cursor: checkin,
        end: checkout,
    }
}

/// Iterator returned by [`decompose`].
#[derive(Debug, Clone)]
pub struct Slots {
    cursor: NaiveDateTime,
    end: NaiveDateTime,
}

impl Iterator for Slots {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        while self.cursor < self.end {
            let start = self.cursor;
            let end = next_hour_boundary(start).min(self.end);
            self.cursor = end;

            if end > start {
                return Some(Slot {
                    key: BucketKey::of(start),
                    start,
                    end,
                });
            }
        }
        None
    }
}

/// Minute 0 of the hour following `t`.
fn next_hour_boundary(t: NaiveDateTime) -> NaiveDateTime {
    let into_hour = TimeDelta::seconds(i64::from(t.minute() * 60 + t.second()))
        + TimeDelta::nanoseconds(i64::from(t.nanosecond()));
    t - into_hour + TimeDelta::hours(1)
}
