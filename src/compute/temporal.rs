//! Temporal key extractors derived from event times.
//!
//! Extractors map a time to a calendar component. A null time yields a null
//! key; grouping on a temporal key always drops such rows instead of
//! bucketing them into a default.

use crate::table::Value;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Calendar component of a UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePart {
    /// Calendar year, as an integer.
    Year,
    /// Month number 1..=12.
    Month,
    /// English month name ("March").
    MonthName,
    /// English weekday name ("Monday").
    DayName,
    /// Hour of day 0..=23.
    Hour,
    /// Year and month as `YYYY-MM`.
    MonthPeriod,
}

impl TimePart {
    pub fn name(&self) -> &'static str {
        match self {
            TimePart::Year => "year",
            TimePart::Month => "month",
            TimePart::MonthName => "month_name",
            TimePart::DayName => "day_name",
            TimePart::Hour => "hour",
            TimePart::MonthPeriod => "month_period",
        }
    }

    pub fn of(&self, time: &DateTime<Utc>) -> Value {
        match self {
            TimePart::Year => Value::Int(i64::from(time.year())),
            TimePart::Month => Value::Int(i64::from(time.month())),
            TimePart::MonthName => Value::text(MONTH_NAMES[time.month0() as usize]),
            TimePart::DayName => {
                Value::text(DAY_NAMES[time.weekday().num_days_from_monday() as usize])
            }
            TimePart::Hour => Value::Int(i64::from(time.hour())),
            TimePart::MonthPeriod => {
                Value::Text(format!("{:04}-{:02}", time.year(), time.month()))
            }
        }
    }

    /// Extract from a cell. Null stays null; `None` when the cell is not a
    /// time.
    pub fn extract(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Null => Some(Value::Null),
            Value::Time(t) => Some(self.of(t)),
            _ => None,
        }
    }
}

impl fmt::Display for TimePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::loader::parse_timestamp;

    #[test]
    fn test_parts_of_known_time() {
        // A Monday
        let t = parse_timestamp("2023-02-06T01:17:34Z").unwrap();
        assert_eq!(TimePart::Year.of(&t), Value::Int(2023));
        assert_eq!(TimePart::Month.of(&t), Value::Int(2));
        assert_eq!(TimePart::MonthName.of(&t), Value::text("February"));
        assert_eq!(TimePart::DayName.of(&t), Value::text("Monday"));
        assert_eq!(TimePart::Hour.of(&t), Value::Int(1));
        assert_eq!(TimePart::MonthPeriod.of(&t), Value::text("2023-02"));
    }

    #[test]
    fn test_extract_null_and_wrong_kind() {
        assert_eq!(TimePart::Hour.extract(&Value::Null), Some(Value::Null));
        assert_eq!(TimePart::Hour.extract(&Value::Int(3)), None);
    }

    #[test]
    fn test_sunday_name() {
        let t = parse_timestamp("2024-12-29 23:59:59").unwrap();
        assert_eq!(TimePart::DayName.of(&t), Value::text("Sunday"));
        assert_eq!(TimePart::Hour.of(&t), Value::Int(23));
    }
}
