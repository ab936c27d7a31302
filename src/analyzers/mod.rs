//! Occupancy aggregation and month-over-month comparison.
//!
//! Each visit is split into hour-aligned slots, the slots and visits are
//! folded into hourly buckets and daily statistics, and two calendar windows
//! are summarized and compared.

pub mod aggregate;
pub mod analyzer;
pub mod compare;
pub mod decompose;
pub mod delta;
pub mod summary;
pub mod types;
pub mod utility;
