//! Rule: a named open/closed predicate evaluated against a point in time.

use jiff::civil::{Date, Time};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recurrence::{Recurrence, RecurrenceError};

/// The generic reason used when a closed rule gives no specific one.
pub const DEFAULT_CLOSED_REASON: &str = "closed";

/// Authoring-time validation errors. Caught client-side; a rule that fails
/// validation never reaches the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule name is required")]
    MissingName,

    #[error("a closed rule needs a reason")]
    MissingClosedReason,

    #[error("start and end time must be given together")]
    HalfOpenTimeWindow,

    #[error("end time must be after start time")]
    EndNotAfterStart,

    #[error("a rule without a recurrence needs a single date")]
    MissingSingleDate,

    #[error("end date must not be before start date")]
    EndDateBeforeStart,

    #[error("invalid recurrence: {0}")]
    Recurrence(#[from] RecurrenceError),
}

/// A named open/closed predicate.
///
/// Date applicability is either a single absolute date
/// (`start_date == end_date`, no recurrence) or a recurrence, optionally
/// bounded by an inclusive date range. The optional time window restricts
/// matches to `[start_time, end_time)` on a matching date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: Uuid,
    pub name: String,
    pub is_open: bool,

    #[serde(default = "default_closed_reason")]
    pub closed_reason: String,

    /// Encoded recurrence string; absent means single fixed date.
    #[serde(rename = "dateRRule", default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Date>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Date>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Time>,
}

fn default_closed_reason() -> String {
    DEFAULT_CLOSED_REASON.to_string()
}

impl Rule {
    /// Validate the rule's fields. Evaluation assumes a validated rule,
    /// so ordering errors (end before start) can never occur there.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.name.trim().is_empty() {
            return Err(RuleError::MissingName);
        }

        if !self.is_open && self.closed_reason.trim().is_empty() {
            return Err(RuleError::MissingClosedReason);
        }

        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                if end <= start {
                    return Err(RuleError::EndNotAfterStart);
                }
            }
            (None, None) => {}
            _ => return Err(RuleError::HalfOpenTimeWindow),
        }

        match &self.recurrence {
            None => {
                // Single fixed date: both bounds present and equal.
                match (self.start_date, self.end_date) {
                    (Some(start), Some(end)) if start == end => {}
                    _ => return Err(RuleError::MissingSingleDate),
                }
            }
            Some(raw) => {
                Recurrence::parse(raw)?;

                if let (Some(start), Some(end)) = (self.start_date, self.end_date)
                    && end < start
                {
                    return Err(RuleError::EndDateBeforeStart);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::{date, time};

    fn open_daily() -> Rule {
        Rule {
            id: Uuid::new_v4(),
            name: "weekdays".to_string(),
            is_open: true,
            closed_reason: DEFAULT_CLOSED_REASON.to_string(),
            recurrence: Some("FREQ=DAILY".to_string()),
            start_date: None,
            end_date: None,
            start_time: None,
            end_time: None,
        }
    }

    #[test]
    fn valid_recurring_rule() {
        assert!(open_daily().validate().is_ok());
    }

    #[test]
    fn valid_single_date_rule() {
        let mut rule = open_daily();
        rule.recurrence = None;
        rule.start_date = Some(date(2024, 12, 25));
        rule.end_date = Some(date(2024, 12, 25));
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn rejects_empty_name() {
        let mut rule = open_daily();
        rule.name = "  ".to_string();
        assert!(matches!(rule.validate(), Err(RuleError::MissingName)));
    }

    #[test]
    fn rejects_closed_rule_without_reason() {
        let mut rule = open_daily();
        rule.is_open = false;
        rule.closed_reason = String::new();
        assert!(matches!(
            rule.validate(),
            Err(RuleError::MissingClosedReason)
        ));
    }

    #[test]
    fn rejects_end_time_not_after_start() {
        let mut rule = open_daily();
        rule.start_time = Some(time(17, 0, 0, 0));
        rule.end_time = Some(time(9, 0, 0, 0));
        assert!(matches!(rule.validate(), Err(RuleError::EndNotAfterStart)));
    }

    #[test]
    fn rejects_half_open_time_window() {
        let mut rule = open_daily();
        rule.start_time = Some(time(9, 0, 0, 0));
        assert!(matches!(
            rule.validate(),
            Err(RuleError::HalfOpenTimeWindow)
        ));
    }

    #[test]
    fn rejects_no_recurrence_without_single_date() {
        let mut rule = open_daily();
        rule.recurrence = None;
        assert!(matches!(rule.validate(), Err(RuleError::MissingSingleDate)));

        rule.start_date = Some(date(2024, 1, 1));
        rule.end_date = Some(date(2024, 1, 2));
        assert!(matches!(rule.validate(), Err(RuleError::MissingSingleDate)));
    }

    #[test]
    fn rejects_inverted_date_range() {
        let mut rule = open_daily();
        rule.start_date = Some(date(2024, 6, 1));
        rule.end_date = Some(date(2024, 1, 1));
        assert!(matches!(
            rule.validate(),
            Err(RuleError::EndDateBeforeStart)
        ));
    }

    #[test]
    fn rejects_bad_recurrence_string() {
        let mut rule = open_daily();
        rule.recurrence = Some("FREQ=SOMETIMES".to_string());
        assert!(matches!(rule.validate(), Err(RuleError::Recurrence(_))));
    }

    #[test]
    fn serializes_with_original_field_names() {
        let mut rule = open_daily();
        rule.start_time = Some(time(9, 0, 0, 0));
        rule.end_time = Some(time(17, 0, 0, 0));

        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"isOpen\":true"));
        assert!(json.contains("\"closedReason\":\"closed\""));
        assert!(json.contains("\"dateRRule\":\"FREQ=DAILY\""));
        assert!(json.contains("\"startTime\":\"09:00:00\""));
        assert!(!json.contains("startDate"));
    }
}
