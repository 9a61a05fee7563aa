// SQL literal helpers shared by the default and built-in serializers
//
// Everything here renders PostgreSQL syntax with
// `standard_conforming_strings = on`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::{FieldDescriptor, ScalarSerializer, Value};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Wrap text in single quotes, doubling embedded quotes.
#[must_use]
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Wrap an identifier in double quotes, doubling embedded double quotes.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// JSON text of a value, as `JSON.stringify` would produce it for the
/// equivalent JSON document.
#[must_use]
pub fn json_text(value: &Value) -> String {
    serde_json::Value::from(value.clone()).to_string()
}

/// Generic serializer: everything becomes a quoted string; arrays and
/// objects are stored as their JSON text.
#[must_use]
pub fn text_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Text(s) => quote_literal(s),
        Value::Json(_) | Value::Array(_) => quote_literal(&json_text(value)),
        other => quote_literal(&other.to_string()),
    }
}

/// `ARRAY[a, b]`, or `'{}'` for an empty array.
#[must_use]
pub fn array_literal(values: &[Value], field: &FieldDescriptor, serializer: &ScalarSerializer) -> String {
    if values.is_empty() {
        return "'{}'".to_string();
    }

    let items: Vec<String> = values.iter().map(|value| serializer(value, field)).collect();
    format!("ARRAY[{}]", items.join(", "))
}

/// `name type[ NOT NULL][ DEFAULT default]`
#[must_use]
pub fn column_definition(
    name: &str,
    sql_type: &str,
    default: Option<&str>,
    quote_identifiers: bool,
    not_null_with_default: bool,
) -> String {
    let name = if quote_identifiers {
        quote_identifier(name)
    } else {
        name.to_string()
    };

    match default {
        Some(default) if not_null_with_default => format!("{name} {sql_type} NOT NULL DEFAULT {default}"),
        Some(default) => format!("{name} {sql_type} DEFAULT {default}"),
        None => format!("{name} {sql_type}"),
    }
}

#[must_use]
pub fn number_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) if r.is_finite() => r.to_string(),
        Value::Real(r) if r.is_nan() => "'NaN'".to_string(),
        Value::Real(r) if r.is_sign_negative() => "'-Infinity'".to_string(),
        Value::Real(_) => "'Infinity'".to_string(),
        Value::Numeric(d) => d.to_string(),
        Value::Boolean(b) => u8::from(*b).to_string(),
        Value::Text(s) => {
            let trimmed = s.trim();
            if trimmed.parse::<i64>().is_ok() || trimmed.parse::<f64>().is_ok_and(f64::is_finite) {
                trimmed.to_string()
            } else {
                quote_literal(s)
            }
        }
        other => text_literal(other),
    }
}

#[must_use]
pub fn decimal_literal(value: &Value) -> String {
    let parsed = match value {
        Value::Numeric(d) => Some(*d),
        Value::Integer(i) => Some(Decimal::from(*i)),
        Value::Real(r) => Decimal::try_from(*r).ok(),
        Value::Text(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };

    match parsed {
        Some(d) => d.normalize().to_string(),
        None => number_literal(value),
    }
}

#[must_use]
pub fn bool_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other if other.is_truthy() => "TRUE".to_string(),
        _ => "FALSE".to_string(),
    }
}

/// `'<json>'::jsonb` (or `::json` when `cast` says so)
#[must_use]
pub fn json_literal(value: &Value, cast: &str) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => format!("{}::{cast}", quote_literal(&json_text(other))),
    }
}

#[must_use]
pub fn uuid_literal(value: &Value) -> String {
    match value {
        Value::Uuid(u) => quote_literal(&u.hyphenated().to_string()),
        Value::Text(s) => match Uuid::parse_str(s.trim()) {
            Ok(u) => quote_literal(&u.hyphenated().to_string()),
            Err(_) => quote_literal(s),
        },
        other => text_literal(other),
    }
}

#[must_use]
pub fn bytea_literal(value: &Value) -> String {
    let bytes = match value {
        Value::Null => return "NULL".to_string(),
        Value::Bytea(bytes) => bytes.clone(),
        Value::Text(s) => match s.strip_prefix("\\x").map(hex::decode) {
            Some(Ok(bytes)) => bytes,
            _ => s.as_bytes().to_vec(),
        },
        other => other.to_string().into_bytes(),
    };

    format!("'\\x{}'::bytea", hex::encode(bytes))
}

#[must_use]
pub fn date_literal(value: &Value) -> String {
    let date = match value {
        Value::Date(d) => Some(*d),
        Value::Timestamp(t) => Some(t.date()),
        Value::TimestampTz(t) => Some(t.date_naive()),
        Value::Integer(millis) => DateTime::from_timestamp_millis(*millis).map(|t| t.date_naive()),
        Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .ok()
            .or_else(|| parse_timestamp(s).map(|t| t.date())),
        _ => None,
    };

    match date {
        Some(d) => quote_literal(&d.format("%Y-%m-%d").to_string()),
        None => text_literal(value),
    }
}

#[must_use]
pub fn timestamp_literal(value: &Value) -> String {
    let timestamp = match value {
        Value::Timestamp(t) => Some(*t),
        Value::TimestampTz(t) => Some(t.naive_utc()),
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::Integer(millis) => DateTime::from_timestamp_millis(*millis).map(|t| t.naive_utc()),
        Value::Text(s) => parse_timestamp(s),
        _ => None,
    };

    match timestamp {
        Some(t) => quote_literal(&t.format(TIMESTAMP_FORMAT).to_string()),
        None => text_literal(value),
    }
}

#[must_use]
pub fn timestamptz_literal(value: &Value) -> String {
    let timestamp = match value {
        Value::TimestampTz(t) => Some(*t),
        Value::Timestamp(t) => Some(t.and_utc()),
        Value::Date(d) => d.and_hms_opt(0, 0, 0).map(|t| t.and_utc()),
        Value::Integer(millis) => DateTime::from_timestamp_millis(*millis),
        Value::Text(s) => parse_timestamp(s).map(|t| t.and_utc()),
        _ => None,
    };

    match timestamp {
        Some(t) => quote_literal(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        None => text_literal(value),
    }
}

/// RFC 3339 (normalized to UTC) or a naive `YYYY-MM-DD[ T]HH:MM:SS[.f]`.
fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc).naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok())
        .or_else(|| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok())
}
