//! Hourly occupancy statistics and month-over-month comparison for check-in logs.

pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod visit;
