//! Error types for record sources and individual visit rows.
//!
//! [`SourceError`] is fatal: the run stops before any computation.
//! [`VisitError`] only drops the offending row.

use thiserror::Error;

/// Reasons a single input row cannot become a [`crate::visit::Visit`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisitError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),

    #[error("unparsable stay duration `{0}`")]
    InvalidStay(String),

    #[error("stay duration must be positive, got {0} minutes")]
    NonPositiveStay(f64),

    #[error("checkout {checkout} is before checkin {checkin}")]
    CheckoutBeforeCheckin { checkin: String, checkout: String },

    #[error("checkout implies {interval_minutes:.1} minutes but stay is {stay_minutes:.1}")]
    InconsistentStay {
        interval_minutes: f64,
        stay_minutes: f64,
    },

    #[error("malformed row: {0}")]
    MalformedRow(String),
}

/// Failures that make the whole record source unusable.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch `{url}`: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid source url `{0}`")]
    InvalidUrl(String),

    #[error("api token contains characters not allowed in an http header")]
    InvalidToken,

    #[error("failed to decompress `{path}`: {source}")]
    Decompress {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable csv header: {0}")]
    Header(#[from] csv::Error),

    #[error("required column `{0}` not found in header")]
    MissingColumn(String),
}
