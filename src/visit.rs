//! Validated check-in sessions.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::analyzers::decompose::{Slots, decompose};
use crate::error::VisitError;

/// Largest gap tolerated between an explicit checkout and `checkin + stay`.
const STAY_TOLERANCE_MS: i64 = 60_000;

/// One check-in/check-out session by one customer.
///
/// Only constructed through [`Visit::new`], so `checkout > checkin` and the
/// stay is always positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    customer_id: String,
    checkin: NaiveDateTime,
    checkout: NaiveDateTime,
    stay: TimeDelta,
}

impl Visit {
    /// Validates the raw parts of a session.
    ///
    /// When `checkout` is `None` it is derived as `checkin + stay`. When it is
    /// given it must come after `checkin` and must agree with the stay within
    /// one minute.
    pub fn new(
        customer_id: &str,
        checkin: NaiveDateTime,
        stay_minutes: f64,
        checkout: Option<NaiveDateTime>,
    ) -> Result<Self, VisitError> {
        let customer_id = customer_id.trim();
        if customer_id.is_empty() {
            return Err(VisitError::MissingField("customer_id"));
        }

        if !stay_minutes.is_finite() {
            return Err(VisitError::InvalidStay(stay_minutes.to_string()));
        }

        let stay_ms = (stay_minutes * 60_000.0).round() as i64;
        if stay_ms <= 0 {
            return Err(VisitError::NonPositiveStay(stay_minutes));
        }
        let stay = TimeDelta::try_milliseconds(stay_ms)
            .ok_or_else(|| VisitError::InvalidStay(stay_minutes.to_string()))?;

        let checkout = match checkout {
            Some(checkout) => {
                if checkout < checkin {
                    return Err(VisitError::CheckoutBeforeCheckin {
                        checkin: checkin.to_string(),
                        checkout: checkout.to_string(),
                    });
                }
                let interval = checkout - checkin;
                if interval <= TimeDelta::zero() {
                    return Err(VisitError::NonPositiveStay(0.0));
                }
                if (interval - stay).num_milliseconds().abs() > STAY_TOLERANCE_MS {
                    return Err(VisitError::InconsistentStay {
                        interval_minutes: interval.num_milliseconds() as f64 / 60_000.0,
                        stay_minutes,
                    });
                }
                checkout
            }
            None => checkin
                .checked_add_signed(stay)
                .ok_or_else(|| VisitError::InvalidStay(stay_minutes.to_string()))?,
        };

        Ok(Self {
            customer_id: customer_id.to_string(),
            checkin,
            checkout,
            stay,
        })
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn checkin(&self) -> NaiveDateTime {
        self.checkin
    }

    pub fn checkout(&self) -> NaiveDateTime {
        self.checkout
    }

    /// Calendar date the visit's sessions and hours are attributed to.
    pub fn checkin_date(&self) -> NaiveDate {
        self.checkin.date()
    }

    pub fn stay(&self) -> TimeDelta {
        self.stay
    }

    pub fn stay_minutes(&self) -> f64 {
        self.stay.num_milliseconds() as f64 / 60_000.0
    }

    /// Hour-aligned pieces of `[checkin, checkout)`.
    pub fn slots(&self) -> Slots {
        decompose(self.checkin, self.checkout)
    }
}
