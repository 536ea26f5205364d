//! Text rendering helpers shared by the capability formatters.
//!
//! Upstream records are untrusted and often sparse, so every helper takes
//! `Option<&Value>` and degrades instead of failing: an absent field renders
//! as `undefined`, JSON null as `null`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Number, Value};

/// Rendering of an absent field.
pub const UNDEFINED: &str = "undefined";

/// Render a JSON value the way it reads inline in text output.
///
/// Strings are unquoted, integral floats lose their fraction, arrays are
/// comma-joined and objects collapse to `[object Object]`.
pub fn display(value: Option<&Value>) -> String {
    match value {
        None => UNDEFINED.to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => display_number(n),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

fn display_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Whether a field would pass a plain truthiness check: present, not null,
/// not `false`, not zero and not an empty string.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Whether a numeric time field is set and not the `-1` "unset" marker.
pub fn is_set_time(value: Option<&Value>) -> bool {
    truthy(value) && value.and_then(Value::as_f64) != Some(-1.0)
}

/// Format a timestamp (epoch milliseconds or ISO 8601 string) as
/// `YYYY-MM-DD HH:MM:SS` in UTC.
///
/// Strings without an offset, and bare dates, are read as UTC.
pub fn format_timestamp(value: Option<&Value>) -> String {
    let parsed: Option<DateTime<Utc>> = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Some(Value::String(s)) => parse_iso_timestamp(s),
        _ => None,
    };

    match parsed {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("Invalid timestamp: {}", display(value)),
    }
}

const NAIVE_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn parse_iso_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Join `labels` with `", "`, keeping at most `cap` and appending
/// ` (+N more)` when some were dropped.
pub fn capped_join<I>(labels: I, cap: usize) -> String
where
    I: IntoIterator<Item = String>,
{
    let labels: Vec<String> = labels.into_iter().collect();
    let mut out = labels
        .iter()
        .take(cap)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if labels.len() > cap {
        out.push_str(&format!(" (+{} more)", labels.len() - cap));
    }
    out
}

/// Label for a management zone: its name, else its id, else the value itself.
pub fn zone_label(zone: &Value) -> String {
    for key in ["name", "id"] {
        let field = zone.get(key);
        if truthy(field) {
            return display(field);
        }
    }
    display(Some(zone))
}

/// Render a `managementZones`-style array, or `None` when absent or empty.
pub fn management_zones(value: Option<&Value>, cap: usize) -> Option<String> {
    let zones = value.and_then(Value::as_array).filter(|z| !z.is_empty())?;
    Some(capped_join(zones.iter().map(zone_label), cap))
}

/// Render an object as `k=v` pairs, or `None` when absent or empty.
pub fn key_values(value: Option<&Value>, cap: usize) -> Option<String> {
    let map = value.and_then(Value::as_object).filter(|m| !m.is_empty())?;
    Some(capped_join(
        map.iter().map(|(k, v)| format!("{}={}", k, display(Some(v)))),
        cap,
    ))
}

/// Compact JSON, as embedded in detail output.
pub fn compact_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| display(Some(value)))
}
