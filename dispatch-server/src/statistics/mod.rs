//! Statistics ledger (统计台账)
//!
//! Append-only counters per (key, day, author, org, publisher, source) plus
//! the calendar aggregations and the live dashboard summary built on them.

pub mod aggregate;
mod ledger;
mod summary;

pub use ledger::StatisticsLedger;
