//! Type coercion for request values (query strings and JSON bodies).

use crate::config::FieldType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Number, Value};

impl FieldType {
    /// PostgreSQL type used in DDL and in parameter casts.
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldType::Integer => "BIGINT",
            FieldType::Float => "DOUBLE PRECISION",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Text => "TEXT",
            FieldType::Uuid => "UUID",
            FieldType::Datetime => "TIMESTAMPTZ",
            FieldType::Date => "DATE",
            FieldType::Json => "JSONB",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Text => "text",
            FieldType::Uuid => "uuid",
            FieldType::Datetime => "datetime",
            FieldType::Date => "date",
            FieldType::Json => "json",
        }
    }

    /// Parse a raw query-string value into a typed JSON value.
    pub fn coerce_str(&self, s: &str) -> Result<Value, String> {
        let invalid = || format!("'{}' is not a valid {}", s, self.name());
        match self {
            FieldType::Integer => s.trim().parse::<i64>().map(Value::from).map_err(|_| invalid()),
            FieldType::Float => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(invalid),
            FieldType::Boolean => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            FieldType::Text => Ok(Value::String(s.to_string())),
            FieldType::Uuid => uuid::Uuid::parse_str(s.trim())
                .map(|u| Value::String(u.to_string()))
                .map_err(|_| invalid()),
            FieldType::Datetime => parse_datetime(s.trim())
                .map(|d| Value::String(d.to_rfc3339()))
                .ok_or_else(invalid),
            FieldType::Date => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .map_err(|_| invalid()),
            FieldType::Json => Ok(serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))),
        }
    }

    /// Coerce a JSON body value. Strings are accepted for every scalar type; `null` passes through.
    pub fn coerce_json(&self, v: &Value) -> Result<Value, String> {
        if v.is_null() || *self == FieldType::Json {
            return Ok(v.clone());
        }
        if let Value::String(s) = v {
            return self.coerce_str(s);
        }
        let mismatch = || format!("expected {}, got {}", self.name(), json_kind(v));
        match (self, v) {
            (FieldType::Integer, Value::Number(n)) => match n.as_i64() {
                Some(i) => Ok(Value::from(i)),
                None => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| Value::from(f as i64))
                    .ok_or_else(mismatch),
            },
            (FieldType::Float, Value::Number(_)) => Ok(v.clone()),
            (FieldType::Boolean, Value::Bool(_)) => Ok(v.clone()),
            (FieldType::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        }
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|n| n.and_utc())
}

pub(crate) fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_strings_coerce_by_type() {
        assert_eq!(FieldType::Integer.coerce_str("42").unwrap(), json!(42));
        assert!(FieldType::Integer.coerce_str("4x").is_err());
        assert_eq!(FieldType::Boolean.coerce_str("Yes").unwrap(), json!(true));
        assert_eq!(FieldType::Date.coerce_str("2024-02-29").unwrap(), json!("2024-02-29"));
        assert_eq!(
            FieldType::Datetime.coerce_str("2024-01-02 03:04:05").unwrap(),
            json!("2024-01-02T03:04:05+00:00")
        );
    }

    #[test]
    fn json_values_coerce_leniently() {
        assert_eq!(FieldType::Integer.coerce_json(&json!("7")).unwrap(), json!(7));
        assert_eq!(FieldType::Integer.coerce_json(&json!(3.0)).unwrap(), json!(3));
        assert!(FieldType::Integer.coerce_json(&json!(3.5)).is_err());
        assert!(FieldType::Text.coerce_json(&json!(12)).is_err());
        assert_eq!(FieldType::Json.coerce_json(&json!({ "a": 1 })).unwrap(), json!({ "a": 1 }));
        assert_eq!(FieldType::Text.coerce_json(&Value::Null).unwrap(), Value::Null);
    }
}
