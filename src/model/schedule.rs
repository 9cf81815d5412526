//! Schedule: an ordered composition of rules plus a timezone and a
//! manual-override flag.

use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The reason reported when a schedule is manually closed.
pub const MANUAL_CLOSE_REASON: &str = "manually closed";

/// Authoring-time validation errors for schedules.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("schedule name is required")]
    MissingName,

    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),
}

/// A named, ordered composition of rules.
///
/// Rule order is semantically significant: among matching closed rules the
/// topmost wins, so closures listed first (holidays, say) take priority over
/// a general always-open rule listed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub name: String,

    /// IANA zone identifier the schedule's rules are evaluated in.
    pub time_zone: String,

    /// Emergency override: unconditionally closed, no rule consulted.
    #[serde(default)]
    pub manual_close: bool,

    /// Ordered rule ids. Ids that no longer resolve to a rule are skipped
    /// at evaluation time rather than repaired.
    #[serde(default)]
    pub rules: Vec<Uuid>,

    /// Last evaluation result. Transient: attached by List, stripped on
    /// write, never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ScheduleStatus>,
}

impl Schedule {
    /// Validate the schedule's fields, resolving the zone against the tzdb.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.name.trim().is_empty() {
            return Err(ScheduleError::MissingName);
        }

        TimeZone::get(&self.time_zone)
            .map_err(|_| ScheduleError::UnknownTimeZone(self.time_zone.clone()))?;

        Ok(())
    }
}

/// A point-in-time open/closed verdict for one schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStatus {
    pub is_open: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_reason: Option<String>,

    /// Populated when the status could not be computed (malformed rule
    /// data, unknown zone) instead of failing the whole listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScheduleStatus {
    pub fn open() -> Self {
        Self {
            is_open: true,
            closed_reason: None,
            error: None,
        }
    }

    pub fn closed(reason: impl Into<String>) -> Self {
        Self {
            is_open: false,
            closed_reason: Some(reason.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            is_open: false,
            closed_reason: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schedule() -> Schedule {
        Schedule {
            name: "support".to_string(),
            time_zone: "America/New_York".to_string(),
            manual_close: false,
            rules: vec![],
            status: None,
        }
    }

    #[test]
    fn valid_schedule() {
        assert!(sample_schedule().validate().is_ok());
    }

    #[test]
    fn rejects_empty_name() {
        let mut schedule = sample_schedule();
        schedule.name = String::new();
        assert!(matches!(
            schedule.validate(),
            Err(ScheduleError::MissingName)
        ));
    }

    #[test]
    fn rejects_unknown_zone() {
        let mut schedule = sample_schedule();
        schedule.time_zone = "Mars/Olympus_Mons".to_string();
        assert!(matches!(
            schedule.validate(),
            Err(ScheduleError::UnknownTimeZone(_))
        ));
    }

    #[test]
    fn status_is_not_serialized_when_absent() {
        let json = serde_json::to_string(&sample_schedule()).unwrap();
        assert!(!json.contains("status"));
        assert!(json.contains("\"timeZone\":\"America/New_York\""));
        assert!(json.contains("\"manualClose\":false"));
    }
}
