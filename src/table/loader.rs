//! Building record tables from rows and JSON exports.
//!
//! The engine itself performs no I/O; these helpers are the reference
//! collaborator that turns a JSON array of event objects (the shape of a
//! `records`-oriented dataframe export) into a [`RecordTable`].
//!
//! ## Coercion rules
//!
//! | Column kind | Accepted JSON                                   |
//! |-------------|-------------------------------------------------|
//! | float       | number, numeric string                          |
//! | int         | integral number (`23` or `23.0`), integer string |
//! | bool        | `true`/`false`, `0`/`1`, `"0"`/`"1"`/`"true"`/`"false"` |
//! | text        | string, number or bool (stringified)            |
//! | time        | timestamp string, epoch milliseconds            |
//!
//! `null` and empty strings are null everywhere. A timestamp that cannot be
//! parsed becomes null (the row then drops out of temporal operations);
//! any other value that cannot be coerced is a schema error.

use super::{Column, ColumnType, EVENT_SCHEMA, REQUIRED_COLUMNS, RecordTable};
use crate::error::{QueryError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::io::Read;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parse a timestamp in any of the accepted layouts. Naive timestamps are
/// taken as UTC.
///
/// # Examples
///
/// ```
/// use quake_query::table::loader::parse_timestamp;
///
/// assert!(parse_timestamp("2023-02-06T01:17:34.345Z").is_some());
/// assert!(parse_timestamp("2023-02-06 01:17:34").is_some());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(t) = DateTime::parse_from_str(raw, fmt) {
            return Some(t.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// One seismic event, row-oriented.
///
/// Used to build tables programmatically; every field except `id` is
/// optional and defaults to null. Also deserializes from one strictly typed
/// JSON object (RFC 3339 `time`, schema column names such as `magType`); the
/// lenient coercions of [`from_json_str`] do not apply.
///
/// ```
/// use quake_query::{EventRecord, RecordTable};
///
/// let table = RecordTable::from_events(vec![
///     EventRecord::new("us7000abcd").at("2023-02-06T01:17:34Z").location(37.2, 37.0).mag(7.8),
///     EventRecord::new("us7000abce").mag(6.1),
/// ])?;
/// assert_eq!(table.len(), 2);
/// # Ok::<(), quake_query::QueryError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    pub id: String,
    pub time: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub depth: Option<f64>,
    pub mag: Option<f64>,
    #[serde(rename = "magType")]
    pub mag_type: Option<String>,
    pub net: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub types: Option<String>,
    pub alert: Option<String>,
    pub place: Option<String>,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub region: Option<String>,
    pub casualties: Option<f64>,
    pub economic_loss: Option<f64>,
    pub nst: Option<i64>,
    pub gap: Option<f64>,
    pub rms: Option<f64>,
    pub tsunami: Option<bool>,
}

macro_rules! text_setter {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name(mut self, value: impl Into<String>) -> Self {
                self.$name = Some(value.into());
                self
            }
        )*
    };
}

macro_rules! float_setter {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name(mut self, value: f64) -> Self {
                self.$name = Some(value);
                self
            }
        )*
    };
}

impl EventRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Set the time from a string; unparseable input leaves it null.
    pub fn at(mut self, raw: &str) -> Self {
        self.time = parse_timestamp(raw);
        self
    }

    pub fn location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn nst(mut self, stations: i64) -> Self {
        self.nst = Some(stations);
        self
    }

    pub fn tsunami(mut self, triggered: bool) -> Self {
        self.tsunami = Some(triggered);
        self
    }

    float_setter!(depth, mag, casualties, economic_loss, gap, rms);

    text_setter!(
        mag_type, net, status, event_type, types, alert, place, country, continent, region,
    );
}

pub(crate) fn columns_from_events<I>(events: I) -> Vec<(String, Column)>
where
    I: IntoIterator<Item = EventRecord>,
{
    let events: Vec<EventRecord> = events.into_iter().collect();

    macro_rules! collect {
        ($variant:ident, $field:ident) => {
            Column::$variant(events.iter().map(|e| e.$field.to_owned()).collect())
        };
    }

    let columns = vec![
        (
            "id",
            Column::Text(events.iter().map(|e| Some(e.id.clone())).collect()),
        ),
        ("time", collect!(Time, time)),
        ("latitude", collect!(Float, latitude)),
        ("longitude", collect!(Float, longitude)),
        ("depth", collect!(Float, depth)),
        ("mag", collect!(Float, mag)),
        ("magType", collect!(Text, mag_type)),
        ("net", collect!(Text, net)),
        ("status", collect!(Text, status)),
        ("type", collect!(Text, event_type)),
        ("types", collect!(Text, types)),
        ("alert", collect!(Text, alert)),
        ("place", collect!(Text, place)),
        ("country", collect!(Text, country)),
        ("continent", collect!(Text, continent)),
        ("region", collect!(Text, region)),
        ("casualties", collect!(Float, casualties)),
        ("economic_loss", collect!(Float, economic_loss)),
        ("nst", collect!(Int, nst)),
        ("gap", collect!(Float, gap)),
        ("rms", collect!(Float, rms)),
        ("tsunami", collect!(Bool, tsunami)),
    ];

    columns
        .into_iter()
        .map(|(name, column)| (name.to_string(), sanitize(column)))
        .collect()
}

/// Fold non-finite floats into nulls.
fn sanitize(column: Column) -> Column {
    match column {
        Column::Float(values) => Column::Float(
            values
                .into_iter()
                .map(|v| v.filter(|f| f.is_finite()))
                .collect(),
        ),
        other => other,
    }
}

/// Load a table from a JSON array of event objects.
pub fn from_json_str(json: &str) -> Result<RecordTable> {
    let records: Vec<Map<String, JsonValue>> = serde_json::from_str(json)?;
    from_json_records(&records)
}

/// Load a table from a reader yielding a JSON array of event objects.
pub fn from_json_reader<R: Read>(reader: R) -> Result<RecordTable> {
    let records: Vec<Map<String, JsonValue>> = serde_json::from_reader(reader)?;
    from_json_records(&records)
}

/// Load a table from already-parsed JSON objects.
///
/// Every required column must be present as a key (null allowed) in every
/// record. Optional schema columns that never appear become all-null.
pub fn from_json_records(records: &[Map<String, JsonValue>]) -> Result<RecordTable> {
    for (pos, record) in records.iter().enumerate() {
        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !record.contains_key(**c)) {
            return Err(QueryError::incompatible(
                *missing,
                format!("is absent from record {}", pos),
            ));
        }
    }

    let mut unparsed_times = 0usize;
    let mut columns = Vec::with_capacity(EVENT_SCHEMA.len());

    for &(name, ty) in EVENT_SCHEMA {
        let mut column = Column::empty(ty, records.len());
        for (pos, record) in records.iter().enumerate() {
            let raw = record.get(name).unwrap_or(&JsonValue::Null);
            push_coerced(&mut column, raw, &mut unparsed_times).map_err(|found| {
                QueryError::incompatible(
                    name,
                    format!("expects {} but record {} holds {}", ty, pos, found),
                )
            })?;
        }
        columns.push((name.to_string(), column));
    }

    if unparsed_times > 0 {
        log::warn!(
            "{} of {} timestamps could not be parsed and were set to null",
            unparsed_times,
            records.len()
        );
    }

    let known: Vec<&str> = EVENT_SCHEMA.iter().map(|(name, _)| *name).collect();
    if let Some(first) = records.first() {
        let extra = first.keys().filter(|k| !known.contains(&k.as_str())).count();
        if extra > 0 {
            log::debug!("ignoring {} columns outside the event schema", extra);
        }
    }

    RecordTable::from_columns(columns)
}

/// Coerce one JSON value onto the end of `column`. On failure returns a
/// description of the offending value.
fn push_coerced(
    column: &mut Column,
    raw: &JsonValue,
    unparsed_times: &mut usize,
) -> std::result::Result<(), String> {
    match column {
        Column::Float(values) => values.push(coerce_float(raw)?),
        Column::Int(values) => values.push(coerce_int(raw)?),
        Column::Bool(values) => values.push(coerce_bool(raw)?),
        Column::Text(values) => values.push(coerce_text(raw)?),
        Column::Time(values) => {
            let time = coerce_time(raw)?;
            if time.is_none() && !is_blank(raw) {
                *unparsed_times += 1;
            }
            values.push(time);
        }
    }
    Ok(())
}

fn is_blank(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn describe(raw: &JsonValue) -> String {
    let text = raw.to_string();
    if text.chars().count() > 40 {
        format!("{}...", text.chars().take(40).collect::<String>())
    } else {
        text
    }
}

fn coerce_float(raw: &JsonValue) -> std::result::Result<Option<f64>, String> {
    match raw {
        JsonValue::Null => Ok(None),
        JsonValue::Number(n) => Ok(n.as_f64().filter(|f| f.is_finite())),
        JsonValue::String(s) if s.trim().is_empty() => Ok(None),
        JsonValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| Some(f).filter(|f| f.is_finite()))
            .map_err(|_| describe(raw)),
        _ => Err(describe(raw)),
    }
}

fn coerce_int(raw: &JsonValue) -> std::result::Result<Option<i64>, String> {
    let integral = |f: f64| {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            Ok(Some(f as i64))
        } else {
            Err(describe(raw))
        }
    };
    match raw {
        JsonValue::Null => Ok(None),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Ok(Some(i)),
            None => integral(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) if s.trim().is_empty() => Ok(None),
        JsonValue::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Ok(Some(i)),
            Err(_) => integral(s.trim().parse::<f64>().map_err(|_| describe(raw))?),
        },
        _ => Err(describe(raw)),
    }
}

fn coerce_bool(raw: &JsonValue) -> std::result::Result<Option<bool>, String> {
    match raw {
        JsonValue::Null => Ok(None),
        JsonValue::Bool(b) => Ok(Some(*b)),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => Ok(Some(false)),
            Some(f) if f == 1.0 => Ok(Some(true)),
            _ => Err(describe(raw)),
        },
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "1" | "true" => Ok(Some(true)),
            "0" | "false" => Ok(Some(false)),
            _ => Err(describe(raw)),
        },
        _ => Err(describe(raw)),
    }
}

fn coerce_text(raw: &JsonValue) -> std::result::Result<Option<String>, String> {
    match raw {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) if s.is_empty() => Ok(None),
        JsonValue::String(s) => Ok(Some(s.clone())),
        JsonValue::Number(n) => Ok(Some(n.to_string())),
        JsonValue::Bool(b) => Ok(Some(b.to_string())),
        _ => Err(describe(raw)),
    }
}

fn coerce_time(raw: &JsonValue) -> std::result::Result<Option<DateTime<Utc>>, String> {
    match raw {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) => Ok(parse_timestamp(s)),
        JsonValue::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64));
            Ok(millis.and_then(DateTime::from_timestamp_millis))
        }
        _ => Err(describe(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::io::Write;

    const SAMPLE: &str = r#"[
        {"id": "a", "time": "2021-03-04 05:06:07", "latitude": 1.0, "longitude": 2.0,
         "depth": 10.0, "mag": 5.5, "nst": 23.0, "tsunami": 1, "country": "Japan"},
        {"id": "b", "time": "garbage", "latitude": null, "longitude": null,
         "depth": "", "mag": "6.25", "nst": null, "tsunami": "0", "extra": [1, 2]}
    ]"#;

    #[test]
    fn test_event_record_deserializes_schema_names() {
        let json = r#"{"id": "us1", "time": "2011-03-11T05:46:24Z", "magType": "mww",
                       "type": "earthquake", "mag": 9.1, "unused": true}"#;
        let record: EventRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            record,
            EventRecord::new("us1")
                .at("2011-03-11 05:46:24")
                .mag_type("mww")
                .event_type("earthquake")
                .mag(9.1)
        );

        let table = RecordTable::from_events(vec![record]).unwrap();
        assert_eq!(table.texts("magType").unwrap()[0].as_deref(), Some("mww"));
        assert_eq!(table.texts("type").unwrap()[0].as_deref(), Some("earthquake"));
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let t = parse_timestamp("2023-02-06T01:17:34.345Z").unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2023, 2, 6));
        assert_eq!(t.hour(), 1);

        let offset = parse_timestamp("2023-02-06 03:17:34+02:00").unwrap();
        assert_eq!(offset.hour(), 1);

        let date_only = parse_timestamp("2020-12-31").unwrap();
        assert_eq!(date_only.hour(), 0);

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("31/12/2020").is_none());
    }

    #[test]
    fn test_load_coerces_values() {
        let table = from_json_str(SAMPLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.floats("mag").unwrap(), &[Some(5.5), Some(6.25)]);
        assert_eq!(table.floats("depth").unwrap(), &[Some(10.0), None]);
        assert_eq!(table.ints("nst").unwrap(), &[Some(23), None]);
        assert_eq!(table.bools("tsunami").unwrap(), &[Some(true), Some(false)]);
        assert_eq!(
            table.texts("country").unwrap(),
            &[Some("Japan".to_string()), None]
        );
    }

    #[test]
    fn test_unparseable_time_becomes_null() {
        let table = from_json_str(SAMPLE).unwrap();
        let times = table.times("time").unwrap();
        assert!(times[0].is_some());
        assert!(times[1].is_none());
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        let json = r#"[{"id": "a", "time": null, "latitude": 1.0, "longitude": 2.0, "depth": 3.0}]"#;
        let err = from_json_str(json).unwrap_err();
        assert_eq!(err.column(), Some("mag"));
    }

    #[test]
    fn test_incompatible_value_is_schema_error() {
        let json = r#"[{"id": "a", "time": null, "latitude": 1.0, "longitude": 2.0,
                        "depth": 3.0, "mag": "strong"}]"#;
        let err = from_json_str(json).unwrap_err();
        assert_eq!(err.column(), Some("mag"));
        assert!(err.to_string().contains("record 0"));
    }

    #[test]
    fn test_epoch_millis_time() {
        let json = r#"[{"id": "a", "time": 1675646254345, "latitude": 1.0, "longitude": 2.0,
                        "depth": 3.0, "mag": 4.0}]"#;
        let table = from_json_str(json).unwrap();
        let t = table.times("time").unwrap()[0].unwrap();
        assert_eq!(t.year(), 2023);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[
            {"id": "a", "time": null, "latitude": 1.0, "longitude": 2.0, "depth": 3.0, "mag": 4.0},
            {"id": "a", "time": null, "latitude": 1.0, "longitude": 2.0, "depth": 3.0, "mag": 4.0}
        ]"#;
        assert!(matches!(
            from_json_str(json),
            Err(QueryError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn test_from_reader_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let reader = std::fs::File::open(file.path()).unwrap();
        let table = from_json_reader(reader).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_non_finite_event_values_become_null() {
        let table =
            RecordTable::from_events(vec![EventRecord::new("a").mag(f64::NAN).depth(1.0)])
                .unwrap();
        assert_eq!(table.floats("mag").unwrap(), &[None]);
    }

    #[test]
    fn test_column_kinds_match_schema() {
        let table = from_json_str("[]").unwrap();
        for (name, ty) in EVENT_SCHEMA {
            assert_eq!(table.column(name).unwrap().column_type(), *ty);
        }
        assert_eq!(ColumnType::Time.to_string(), "time");
    }
}
