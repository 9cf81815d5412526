//! Rule matching: does one rule apply at a given instant?
//!
//! The instant arrives already converted into the schedule's zone, so all
//! comparisons here are against civil (wall-clock) date and time.

use jiff::Zoned;
use jiff::civil::Date;

use crate::model::Rule;
use crate::recurrence::{Recurrence, RecurrenceError};

/// Errors from evaluating a rule against an instant.
///
/// These only occur on malformed persisted data; a rule that passed
/// authoring validation always evaluates cleanly.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("invalid recurrence on rule {rule}: {source}")]
    Recurrence {
        rule: String,
        source: RecurrenceError,
    },
}

/// Whether `rule` matches the instant `zoned`.
///
/// Date applicability first: a single-date rule matches on that calendar
/// date only; a recurring rule matches when the date satisfies the
/// expansion and falls inside the optional inclusive date range. When the
/// date applies and the rule carries a time window, the local time must
/// additionally fall in `[start_time, end_time)`.
pub fn matches(rule: &Rule, zoned: &Zoned) -> Result<bool, MatchError> {
    let date = zoned.date();

    let date_applies = match &rule.recurrence {
        None => rule.start_date == Some(date),
        Some(raw) => {
            let recurrence =
                Recurrence::parse(raw).map_err(|source| MatchError::Recurrence {
                    rule: rule.name.clone(),
                    source,
                })?;

            recurs_on(&recurrence, date) && within_range(rule, date)
        }
    };

    if !date_applies {
        return Ok(false);
    }

    match (rule.start_time, rule.end_time) {
        (Some(start), Some(end)) => Ok(zoned.time() >= start && zoned.time() < end),
        // No (or half-open, pre-validation) window: any time of day.
        _ => Ok(true),
    }
}

/// Whether the recurrence expansion includes `date`.
fn recurs_on(recurrence: &Recurrence, date: Date) -> bool {
    match recurrence {
        Recurrence::Daily => true,
        Recurrence::Weekly { weekdays } => weekdays.contains(&date.weekday()),
        Recurrence::Monthly { day } => date.day() == *day,
        Recurrence::Yearly { month, day } => date.month() == *month && date.day() == *day,
    }
}

/// Whether `date` falls inside the rule's optional inclusive date range.
/// A missing bound is unbounded on that side.
fn within_range(rule: &Rule, date: Date) -> bool {
    if let Some(start) = rule.start_date
        && date < start
    {
        return false;
    }

    if let Some(end) = rule.end_date
        && date > end
    {
        return false;
    }

    true
}
