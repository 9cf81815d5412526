//! Output formatting for CLI display.

use crate::model::{DEFAULT_CLOSED_REASON, Rule, Schedule, ScheduleStatus};
use crate::recurrence::Recurrence;

/// "Open" or "Closed (reason)" for a rule's kind column.
pub(super) fn format_rule_kind(rule: &Rule) -> String {
    if rule.is_open {
        return "Open".to_string();
    }

    if rule.closed_reason == DEFAULT_CLOSED_REASON {
        "Closed".to_string()
    } else {
        format!("Closed ({})", rule.closed_reason)
    }
}

/// The rule's time-of-day window, or "any time".
pub(super) fn format_rule_time(rule: &Rule) -> String {
    match (rule.start_time, rule.end_time) {
        (Some(start), Some(end)) => format!("{start} - {end}"),
        _ => "any time".to_string(),
    }
}

/// The rule's date applicability: a single date, or a recurrence with its
/// optional bounding range.
pub(super) fn format_rule_date(rule: &Rule) -> String {
    let Some(raw) = &rule.recurrence else {
        return match rule.start_date {
            Some(date) => date.to_string(),
            None => "no date".to_string(),
        };
    };

    let mut parts = Vec::new();

    if let Some(start) = rule.start_date {
        parts.push(format!("from {start}"));
    }
    if let Some(end) = rule.end_date {
        parts.push(format!("to {end}"));
    }

    parts.push(match Recurrence::parse(raw) {
        Ok(Recurrence::Daily) => "every day".to_string(),
        Ok(Recurrence::Weekly { weekdays }) => {
            let days: Vec<String> = weekdays.iter().map(|d| format!("{d:?}")).collect();
            format!("weekly on {}", days.join(", "))
        }
        Ok(Recurrence::Monthly { day }) => format!("monthly on day {day}"),
        Ok(Recurrence::Yearly { month, day }) => format!("yearly on {month}/{day}"),
        Err(_) => format!("invalid recurrence ({raw})"),
    });

    parts.join(" ")
}

/// A schedule's status line, mirroring the original display: "Open",
/// "Closed", "Closed (reason)", or the evaluation error.
pub(super) fn format_status(status: &ScheduleStatus) -> String {
    if let Some(error) = &status.error {
        return format!("Error: {error}");
    }

    if status.is_open {
        return "Open".to_string();
    }

    match status.closed_reason.as_deref() {
        None | Some(DEFAULT_CLOSED_REASON) => "Closed".to_string(),
        Some(reason) => format!("Closed ({reason})"),
    }
}

/// The names of a schedule's rules, in order, skipping unresolved ids.
pub(super) fn format_schedule_rules(schedule: &Schedule, rules: &[Rule]) -> String {
    let names: Vec<&str> = schedule
        .rules
        .iter()
        .filter_map(|id| rules.iter().find(|rule| rule.id == *id))
        .map(|rule| rule.name.as_str())
        .collect();

    names.join(", ")
}
