//! Schedule resolution: combine a schedule's rules into one open/closed
//! verdict at an instant.

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::matcher;
use crate::model::{DEFAULT_CLOSED_REASON, MANUAL_CLOSE_REASON, Rule, Schedule, ScheduleStatus};

/// Resolve a schedule's status at `now`.
///
/// Precedence, in order:
///
/// 1. `manual_close` wins unconditionally; no rule is consulted.
/// 2. Rules are scanned in list order. The first matching closed rule wins
///    its reason; a closed match beats any open match regardless of
///    position.
/// 3. Otherwise, any open match means open.
/// 4. No match at all means closed with the generic reason. Closed by
///    default is the conservative choice for contact routing: an empty or
///    fully non-matching schedule should not accept traffic.
///
/// Rule ids that resolve to no known rule are skipped. Evaluation failures
/// (unknown zone, malformed recurrence) produce a status with `error` set
/// rather than failing the caller.
pub fn resolve(schedule: &Schedule, rules: &[Rule], now: Timestamp) -> ScheduleStatus {
    if schedule.manual_close {
        return ScheduleStatus::closed(MANUAL_CLOSE_REASON);
    }

    let zone = match TimeZone::get(&schedule.time_zone) {
        Ok(zone) => zone,
        Err(_) => {
            return ScheduleStatus::failed(format!("unknown time zone: {}", schedule.time_zone));
        }
    };

    let zoned = now.to_zoned(zone);
    let mut open_matched = false;

    for id in &schedule.rules {
        let Some(rule) = rules.iter().find(|rule| rule.id == *id) else {
            continue;
        };

        match matcher::matches(rule, &zoned) {
            Ok(true) if rule.is_open => open_matched = true,
            Ok(true) => return ScheduleStatus::closed(rule.closed_reason.clone()),
            Ok(false) => {}
            Err(e) => return ScheduleStatus::failed(e.to_string()),
        }
    }

    if open_matched {
        ScheduleStatus::open()
    } else {
        ScheduleStatus::closed(DEFAULT_CLOSED_REASON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;
    use uuid::Uuid;

    fn at_noon() -> Timestamp {
        date(2024, 1, 3)
            .at(12, 0, 0, 0)
            .in_tz("America/New_York")
            .unwrap()
            .timestamp()
    }

    fn open_rule(name: &str, recurrence: &str) -> Rule {
        Rule {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_open: true,
            closed_reason: DEFAULT_CLOSED_REASON.to_string(),
            recurrence: Some(recurrence.to_string()),
            start_date: None,
            end_date: None,
            start_time: None,
            end_time: None,
        }
    }

    fn closed_rule(name: &str, recurrence: &str, reason: &str) -> Rule {
        let mut rule = open_rule(name, recurrence);
        rule.is_open = false;
        rule.closed_reason = reason.to_string();
        rule
    }

    fn schedule_of(rules: &[&Rule]) -> Schedule {
        Schedule {
            name: "support".to_string(),
            time_zone: "America/New_York".to_string(),
            manual_close: false,
            rules: rules.iter().map(|rule| rule.id).collect(),
            status: None,
        }
    }

    // FREQ=WEEKLY;BYDAY=SA never matches 2024-01-03, a Wednesday.
    const NO_MATCH: &str = "FREQ=WEEKLY;BYDAY=SA";

    #[test]
    fn manual_close_beats_everything() {
        let always_open = open_rule("always", "FREQ=DAILY");
        let mut schedule = schedule_of(&[&always_open]);
        schedule.manual_close = true;

        let status = resolve(&schedule, &[always_open], at_noon());
        assert_eq!(status, ScheduleStatus::closed(MANUAL_CLOSE_REASON));
    }

    #[test]
    fn closed_match_overrides_open_match_regardless_of_order() {
        let open = open_rule("hours", "FREQ=DAILY");
        let closed = closed_rule("holiday", "FREQ=DAILY", "holiday");

        // Open listed first; the closed match still wins.
        let schedule = schedule_of(&[&open, &closed]);
        let status = resolve(&schedule, &[open, closed], at_noon());
        assert_eq!(status, ScheduleStatus::closed("holiday"));
    }

    #[test]
    fn first_closed_match_in_order_wins() {
        let first = closed_rule("maintenance", "FREQ=DAILY", "maintenance");
        let second = closed_rule("holiday", "FREQ=DAILY", "holiday");

        let schedule = schedule_of(&[&first, &second]);
        let status = resolve(&schedule, &[first, second], at_noon());
        assert_eq!(status, ScheduleStatus::closed("maintenance"));
    }

    #[test]
    fn open_when_only_open_rules_match() {
        let open = open_rule("hours", "FREQ=DAILY");
        let closed = closed_rule("weekend", NO_MATCH, "weekend");

        let schedule = schedule_of(&[&open, &closed]);
        let status = resolve(&schedule, &[open, closed], at_noon());
        assert_eq!(status, ScheduleStatus::open());
    }

    #[test]
    fn closed_by_default_when_nothing_matches() {
        let open = open_rule("saturdays", NO_MATCH);

        let schedule = schedule_of(&[&open]);
        let status = resolve(&schedule, &[open], at_noon());
        assert_eq!(status, ScheduleStatus::closed(DEFAULT_CLOSED_REASON));
    }

    #[test]
    fn closed_by_default_with_no_rules() {
        let schedule = schedule_of(&[]);
        let status = resolve(&schedule, &[], at_noon());
        assert_eq!(status, ScheduleStatus::closed(DEFAULT_CLOSED_REASON));
    }

    #[test]
    fn unresolved_rule_ids_are_skipped() {
        let open = open_rule("hours", "FREQ=DAILY");
        let mut schedule = schedule_of(&[&open]);
        schedule.rules.insert(0, Uuid::new_v4());

        let status = resolve(&schedule, &[open], at_noon());
        assert_eq!(status, ScheduleStatus::open());
    }

    #[test]
    fn unknown_zone_reports_an_error_status() {
        let open = open_rule("hours", "FREQ=DAILY");
        let mut schedule = schedule_of(&[&open]);
        schedule.time_zone = "Nowhere/Void".to_string();

        let status = resolve(&schedule, &[open], at_noon());
        assert!(!status.is_open);
        assert!(status.error.is_some());
    }

    #[test]
    fn malformed_rule_reports_an_error_status() {
        let mut bad = open_rule("bad", "FREQ=DAILY");
        bad.recurrence = Some("garbage".to_string());

        let schedule = schedule_of(&[&bad]);
        let status = resolve(&schedule, &[bad], at_noon());
        assert!(status.error.is_some());
    }
}
