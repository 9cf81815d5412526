//! Recurrence codec: the compact rule string persisted on a rule's
//! `dateRRule` field.
//!
//! The grammar is a small subset of RRULE: a frequency plus the constraint
//! fields that frequency needs, with no end condition. One canonical string
//! per recurrence shape, so encode and parse round-trip exactly:
//!
//! ```text
//! FREQ=DAILY
//! FREQ=WEEKLY;BYDAY=MO,WE,FR
//! FREQ=MONTHLY;BYMONTHDAY=15
//! FREQ=YEARLY;BYMONTH=12;BYMONTHDAY=25
//! ```
//!
//! A rule with no recurrence string is a single fixed date instead; that case
//! never reaches this module.

use jiff::civil::Weekday;

/// Errors from parsing a recurrence string.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecurrenceError {
    #[error("malformed segment: {0:?}")]
    MalformedSegment(String),

    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("unknown frequency: {0}")]
    UnknownFrequency(String),

    #[error("unknown weekday code: {0}")]
    UnknownWeekday(String),

    #[error("{0} is required for this frequency")]
    MissingField(&'static str),

    #[error("{0} is not valid for this frequency")]
    UnexpectedField(&'static str),

    #[error("{field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: i8 },
}

/// Which calendar dates a rule recurs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    /// Every day.
    Daily,

    /// The given weekdays, every week. Never empty.
    Weekly { weekdays: Vec<Weekday> },

    /// One day of every month (1–31).
    Monthly { day: i8 },

    /// One day of one month, every year.
    Yearly { month: i8, day: i8 },
}

impl Recurrence {
    /// Parse a recurrence string.
    ///
    /// Strict: unknown keys, keys that don't belong to the frequency, and
    /// out-of-range values are all errors rather than being ignored, so bad
    /// persisted data surfaces instead of silently matching nothing.
    pub fn parse(input: &str) -> Result<Self, RecurrenceError> {
        let mut freq = None;
        let mut byday = None;
        let mut bymonthday = None;
        let mut bymonth = None;

        for segment in input.split(';') {
            let Some((key, value)) = segment.split_once('=') else {
                return Err(RecurrenceError::MalformedSegment(segment.to_string()));
            };

            match key {
                "FREQ" => freq = Some(value),
                "BYDAY" => byday = Some(value),
                "BYMONTHDAY" => {
                    bymonthday = Some(parse_number("BYMONTHDAY", value, 1..=31)?);
                }
                "BYMONTH" => bymonth = Some(parse_number("BYMONTH", value, 1..=12)?),
                _ => return Err(RecurrenceError::UnknownKey(key.to_string())),
            }
        }

        let recurrence = match freq {
            Some("DAILY") => {
                reject("BYDAY", byday.is_some())?;
                reject("BYMONTHDAY", bymonthday.is_some())?;
                reject("BYMONTH", bymonth.is_some())?;
                Self::Daily
            }
            Some("WEEKLY") => {
                reject("BYMONTHDAY", bymonthday.is_some())?;
                reject("BYMONTH", bymonth.is_some())?;
                let codes = byday.ok_or(RecurrenceError::MissingField("BYDAY"))?;
                Self::Weekly {
                    weekdays: parse_weekdays(codes)?,
                }
            }
            Some("MONTHLY") => {
                reject("BYDAY", byday.is_some())?;
                reject("BYMONTH", bymonth.is_some())?;
                Self::Monthly {
                    day: bymonthday.ok_or(RecurrenceError::MissingField("BYMONTHDAY"))?,
                }
            }
            Some("YEARLY") => {
                reject("BYDAY", byday.is_some())?;
                Self::Yearly {
                    month: bymonth.ok_or(RecurrenceError::MissingField("BYMONTH"))?,
                    day: bymonthday.ok_or(RecurrenceError::MissingField("BYMONTHDAY"))?,
                }
            }
            Some(other) => return Err(RecurrenceError::UnknownFrequency(other.to_string())),
            None => return Err(RecurrenceError::MissingField("FREQ")),
        };

        Ok(recurrence)
    }

    /// Encode to the canonical string for this shape.
    ///
    /// The inverse of [`Recurrence::parse`]: `parse(encode(x)) == x` for
    /// every value rule validation admits.
    pub fn encode(&self) -> String {
        match self {
            Self::Daily => "FREQ=DAILY".to_string(),
            Self::Weekly { weekdays } => {
                let mut out = String::from("FREQ=WEEKLY;BYDAY=");
                for (i, weekday) in weekdays.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(weekday_code(*weekday));
                }
                out
            }
            Self::Monthly { day } => format!("FREQ=MONTHLY;BYMONTHDAY={day}"),
            Self::Yearly { month, day } => {
                format!("FREQ=YEARLY;BYMONTH={month};BYMONTHDAY={day}")
            }
        }
    }
}

fn reject(field: &'static str, present: bool) -> Result<(), RecurrenceError> {
    if present {
        return Err(RecurrenceError::UnexpectedField(field));
    }
    Ok(())
}

fn parse_number(
    field: &'static str,
    value: &str,
    range: std::ops::RangeInclusive<i8>,
) -> Result<i8, RecurrenceError> {
    let number: i8 = value.parse().map_err(|_| RecurrenceError::InvalidNumber {
        field,
        value: value.to_string(),
    })?;

    if !range.contains(&number) {
        return Err(RecurrenceError::OutOfRange {
            field,
            value: number,
        });
    }

    Ok(number)
}

/// Parse a comma-separated weekday set. A single weekday is a set of one.
fn parse_weekdays(codes: &str) -> Result<Vec<Weekday>, RecurrenceError> {
    let mut weekdays = Vec::new();

    for code in codes.split(',') {
        let weekday = weekday_from_code(code)
            .ok_or_else(|| RecurrenceError::UnknownWeekday(code.to_string()))?;
        if !weekdays.contains(&weekday) {
            weekdays.push(weekday);
        }
    }

    if weekdays.is_empty() {
        return Err(RecurrenceError::MissingField("BYDAY"));
    }

    Ok(weekdays)
}

fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "MO",
        Weekday::Tuesday => "TU",
        Weekday::Wednesday => "WE",
        Weekday::Thursday => "TH",
        Weekday::Friday => "FR",
        Weekday::Saturday => "SA",
        Weekday::Sunday => "SU",
    }
}

fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code {
        "MO" => Some(Weekday::Monday),
        "TU" => Some(Weekday::Tuesday),
        "WE" => Some(Weekday::Wednesday),
        "TH" => Some(Weekday::Thursday),
        "FR" => Some(Weekday::Friday),
        "SA" => Some(Weekday::Saturday),
        "SU" => Some(Weekday::Sunday),
        _ => None,
    }
}
