//! Signed change between a current and a reference value.
//!
//! | current | reference | [`PercentChange`] |
//! |---------|-----------|-------------------|
//! | 0       | 0         | `0%`              |
//! | > 0     | 0         | `+∞%`             |
//! | any     | > 0       | `+12.5%`, `-100%` |

use crate::analyzers::utility::round1;
use serde::{Serialize, Serializer};
use std::fmt;

/// Relative change in percent, rounded to 0.1 %.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentChange {
    /// Both values are zero.
    Unchanged,
    /// The reference is zero and the current value is not.
    Infinite,
    Finite(f64),
}

impl PercentChange {
    pub fn between(current: f64, reference: f64) -> Self {
        if reference == 0.0 {
            if current > 0.0 {
                PercentChange::Infinite
            } else {
                PercentChange::Unchanged
            }
        } else {
            PercentChange::Finite(round1((current - reference) / reference * 100.0))
        }
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PercentChange::Unchanged => f.write_str("0%"),
            PercentChange::Infinite => f.write_str("+∞%"),
            PercentChange::Finite(pct) => {
                // Collapse -0.0 so a tiny negative change prints as "+0%".
                let pct = if pct == 0.0 { 0.0 } else { pct };
                let sign = if pct >= 0.0 { "+" } else { "" };
                if pct.fract() == 0.0 {
                    write!(f, "{sign}{pct:.0}%")
                } else {
                    write!(f, "{sign}{pct:.1}%")
                }
            }
        }
    }
}

impl Serialize for PercentChange {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// Signed integer difference `current - reference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsoluteChange(pub i64);

impl AbsoluteChange {
    pub fn between(current: usize, reference: usize) -> Self {
        AbsoluteChange(current as i64 - reference as i64)
    }
}

impl fmt::Display for AbsoluteChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

impl Serialize for AbsoluteChange {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}
