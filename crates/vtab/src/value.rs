//! Column values produced by cursors and arguments passed to them.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use serde::Serialize;

/// A single SQL value.
///
/// Booleans are stored as `0`/`1` integers and timestamps as RFC 3339 text,
/// which is what SQLite's date functions expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn bool(b: bool) -> Self {
        Value::Integer(i64::from(b))
    }

    /// RFC 3339 with nanosecond precision when present; the Unix epoch is
    /// treated as "unset" and becomes NULL.
    pub fn timestamp(ts: DateTime<FixedOffset>) -> Self {
        if ts.timestamp() == 0 && ts.timestamp_subsec_nanos() == 0 {
            return Value::Null;
        }
        Value::Text(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn timestamp_utc(ts: DateTime<Utc>) -> Self {
        Value::timestamp(ts.fixed_offset())
    }

    /// Parses an RFC 3339 string and re-emits it normalized; unparsable or
    /// empty input becomes NULL.
    pub fn parse_timestamp(raw: &str) -> Self {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => Value::timestamp(ts),
            Err(_) => Value::Null,
        }
    }

    /// Encodes a composite value as JSON text.
    pub fn json(value: &serde_json::Value) -> Self {
        Value::Text(value.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Name of the SQL storage class, used in argument error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    /// Converts into the JSON representation used by query output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(n) => serde_json::Value::Number((*n).into()),
            Value::Real(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Blob(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<SqlValue> for Value {
    fn from(v: SqlValue) -> Self {
        match v {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(n) => Value::Integer(n),
            SqlValue::Real(f) => Value::Real(f),
            SqlValue::Text(s) => Value::Text(s),
            SqlValue::Blob(b) => Value::Blob(b),
        }
    }
}

impl From<Value> for SqlValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => SqlValue::Null,
            Value::Integer(n) => SqlValue::Integer(n),
            Value::Real(f) => SqlValue::Real(f),
            Value::Text(s) => SqlValue::Text(s),
            Value::Blob(b) => SqlValue::Blob(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_encoding() {
        assert_eq!(Value::bool(true), Value::Integer(1));
        assert_eq!(Value::from(false), Value::Integer(0));
    }

    #[test]
    fn test_timestamp_keeps_offset_and_nanos() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T10:20:30.123456789+02:00").unwrap();
        assert_eq!(
            Value::timestamp(ts),
            Value::Text("2024-03-01T10:20:30.123456789+02:00".into())
        );
    }

    #[test]
    fn test_zero_timestamp_is_null() {
        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        assert!(Value::timestamp_utc(epoch).is_null());
        assert!(Value::parse_timestamp("").is_null());
        assert!(Value::parse_timestamp("yesterday").is_null());
    }

    #[test]
    fn test_parse_timestamp_normalizes_zulu() {
        assert_eq!(
            Value::parse_timestamp("2021-06-01T12:00:00Z"),
            Value::Text("2021-06-01T12:00:00Z".into())
        );
    }

    #[test]
    fn test_json_encoding() {
        let topics = serde_json::json!(["rust", "sql"]);
        assert_eq!(Value::json(&topics), Value::Text(r#"["rust","sql"]"#.into()));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".into()));
    }
}
