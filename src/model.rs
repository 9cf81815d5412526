//! Core data model: rules, schedules, and the persisted config.
//!
//! Field names serialize as camelCase to match the persisted JSON format
//! (the revision files written by the pipeline).

mod manager;
mod rule;
mod schedule;

pub use manager::ScheduleConfig;
pub use rule::{DEFAULT_CLOSED_REASON, Rule, RuleError};
pub use schedule::{MANUAL_CLOSE_REASON, Schedule, ScheduleError, ScheduleStatus};
