//! Personal ministry time tracker.
//!
//! Entries are kept in a single key-value store under one key, guarded by a soft quota,
//! and aggregated on demand into daily, monthly and service year reports.

pub mod aggregation;
pub mod config;
pub mod console;
pub mod daily_command;
pub mod datetime;
pub mod entry_command;
pub mod error;
pub mod logger;
pub mod monthly_command;
pub mod notify;
pub mod report;
pub mod repository;
pub mod storage;
pub mod storage_guard;
pub mod time_entry;
pub mod yearly_command;
