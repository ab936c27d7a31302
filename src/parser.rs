//! Record normalizer: turns raw CSV rows into validated [`Visit`]s.
//!
//! Rows that fail validation are dropped and reported as
//! [`RejectedRecord`]s; only an unusable header aborts the parse.

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::iter::Peekable;
use std::str::Chars;
use tracing::{debug, warn};

use crate::config::ColumnConfig;
use crate::error::{SourceError, VisitError};
use crate::visit::Visit;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parses a local checkin/checkout timestamp.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, VisitError> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| VisitError::InvalidTimestamp(raw.to_string()))
}

/// Parses a stay duration into minutes.
///
/// Accepts plain minutes (`90`, `90.5`), clock form (`1:30`, `1:30:15`) and
/// unit-suffixed forms (`1h30m`, `1 hour 30 min`, `45min`, `1時間30分`).
/// The sign is not checked here.
pub fn parse_stay_minutes(raw: &str) -> Result<f64, VisitError> {
    let raw = raw.trim();
    let invalid = || VisitError::InvalidStay(raw.to_string());

    if raw.is_empty() {
        return Err(invalid());
    }

    if let Ok(minutes) = raw.parse::<f64>() {
        return if minutes.is_finite() {
            Ok(minutes)
        } else {
            Err(invalid())
        };
    }

    if raw.contains(':') {
        return parse_clock(raw).ok_or_else(invalid);
    }

    parse_units(raw).ok_or_else(invalid)
}

fn parse_clock(raw: &str) -> Option<f64> {
    let parts: Vec<u32> = raw
        .split(':')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;

    match parts.as_slice() {
        [h, m] if *m < 60 => Some(f64::from(*h) * 60.0 + f64::from(*m)),
        [h, m, s] if *m < 60 && *s < 60 => {
            Some(f64::from(*h) * 60.0 + f64::from(*m) + f64::from(*s) / 60.0)
        }
        _ => None,
    }
}

fn unit_factor(unit: &str) -> Option<f64> {
    match unit {
        "h" | "hr" | "hrs" | "hour" | "hours" | "時間" => Some(60.0),
        "m" | "min" | "mins" | "minute" | "minutes" | "分" => Some(1.0),
        "s" | "sec" | "secs" | "second" | "seconds" | "秒" => Some(1.0 / 60.0),
        _ => None,
    }
}

fn take_while(chars: &mut Peekable<Chars<'_>>, pred: impl Fn(char) -> bool) -> String {
    std::iter::from_fn(|| chars.next_if(|&c| pred(c))).collect()
}

/// `<number><unit>` pairs; a bare trailing number after hours means minutes
/// (`1h30`).
fn parse_units(raw: &str) -> Option<f64> {
    let mut chars = raw.chars().peekable();
    let mut total = 0.0;
    let mut last_factor: Option<f64> = None;

    loop {
        take_while(&mut chars, char::is_whitespace);
        if chars.peek().is_none() {
            break;
        }

        let number = take_while(&mut chars, |c| c.is_ascii_digit() || c == '.');
        let value: f64 = number.parse().ok()?;

        take_while(&mut chars, char::is_whitespace);
        let unit = take_while(&mut chars, char::is_alphabetic).to_lowercase();

        let factor = if unit.is_empty() {
            match last_factor {
                Some(f) if f == 60.0 => 1.0,
                _ => return None,
            }
        } else {
            unit_factor(&unit)?
        };

        total += value * factor;
        last_factor = Some(factor);
    }

    last_factor.map(|_| total)
}

/// A row dropped during normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    /// 1-based line in the source, header included.
    pub line: u64,
    pub customer_id: Option<String>,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: VisitError,
}

fn serialize_reason<S: serde::Serializer>(reason: &VisitError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(reason)
}

/// Result of normalizing one source.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub visits: Vec<Visit>,
    pub rejected: Vec<RejectedRecord>,
}

/// Header positions of the configured columns.
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    customer_id: usize,
    checkin: usize,
    checkout: Option<usize>,
    stay: usize,
}

impl ColumnLayout {
    fn resolve(config: &ColumnConfig, headers: &StringRecord) -> Result<Self, SourceError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
        };
        let require = |name: &str| find(name).ok_or_else(|| SourceError::MissingColumn(name.to_string()));

        Ok(Self {
            customer_id: require(&config.customer_id)?,
            checkin: require(&config.checkin)?,
            checkout: find(&config.checkout),
            stay: require(&config.stay)?,
        })
    }

    fn field<'r>(&self, record: &'r StringRecord, index: usize) -> Option<&'r str> {
        record.get(index).map(str::trim).filter(|v| !v.is_empty())
    }

    fn visit(&self, record: &StringRecord) -> Result<Visit, VisitError> {
        let customer_id = self
            .field(record, self.customer_id)
            .ok_or(VisitError::MissingField("customer_id"))?;
        let checkin = self
            .field(record, self.checkin)
            .ok_or(VisitError::MissingField("checkin"))
            .and_then(parse_timestamp)?;
        let stay = self
            .field(record, self.stay)
            .ok_or(VisitError::MissingField("stay"))
            .and_then(parse_stay_minutes)?;
        let checkout = self
            .checkout
            .and_then(|i| self.field(record, i))
            .map(parse_timestamp)
            .transpose()?;

        Visit::new(customer_id, checkin, stay, checkout)
    }
}

/// Normalizes CSV `bytes` into visits using the header names in `columns`.
///
/// # Errors
///
/// Returns an error only when the header is unreadable or lacks a required
/// column; bad rows end up in [`Normalized::rejected`].
pub fn normalize_csv(bytes: &[u8], columns: &ColumnConfig) -> Result<Normalized, SourceError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let layout = ColumnLayout::resolve(columns, &headers)?;
    debug!(?headers, "CSV header resolved");

    let mut out = Normalized::default();

    for (index, result) in reader.records().enumerate() {
        // Header is line 1.
        let fallback_line = index as u64 + 2;

        let (line, outcome) = match result {
            Ok(record) => {
                let line = record.position().map_or(fallback_line, |p| p.line());
                let customer_id = layout
                    .field(&record, layout.customer_id)
                    .map(str::to_string);
                (line, layout.visit(&record).map_err(|e| (customer_id, e)))
            }
            Err(e) => (
                fallback_line,
                Err((None, VisitError::MalformedRow(e.to_string()))),
            ),
        };

        match outcome {
            Ok(visit) => out.visits.push(visit),
            Err((customer_id, reason)) => {
                warn!(line, customer_id = ?customer_id, reason = %reason, "Record rejected");
                out.rejected.push(RejectedRecord {
                    line,
                    customer_id,
                    reason,
                });
            }
        }
    }

    debug!(
        accepted = out.visits.len(),
        rejected = out.rejected.len(),
        "Records normalized"
    );

    Ok(out)
}
