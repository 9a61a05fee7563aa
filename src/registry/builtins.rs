// Built-in PostgreSQL datatypes loaded into every new registry
//
// Order matters: an entry may only extend one listed before it.

use super::literals;
use crate::core::{DatatypeOptions, FieldDescriptor};

const INT4_MIN: i64 = i32::MIN as i64;
const INT4_MAX: i64 = i32::MAX as i64;

#[must_use]
pub fn datatypes() -> Vec<(&'static str, DatatypeOptions)> {
    vec![
        (
            "json",
            DatatypeOptions::new()
                .physical_type("JSONB")
                .scalar_serializer(|value, _| literals::json_literal(value, "jsonb")),
        ),
        (
            "any",
            DatatypeOptions::extending("json")
                .physical_type("JSON")
                .scalar_serializer(|value, _| literals::json_literal(value, "json")),
        ),
        (
            "boolean",
            DatatypeOptions::new()
                .physical_type("BOOLEAN")
                .scalar_serializer(|value, _| literals::bool_literal(value)),
        ),
        (
            "integer",
            DatatypeOptions::new()
                .type_resolver(integer_type)
                .scalar_serializer(|value, _| literals::number_literal(value)),
        ),
        (
            "float",
            DatatypeOptions::new()
                .physical_type("DOUBLE PRECISION")
                .scalar_serializer(|value, _| literals::number_literal(value)),
        ),
        ("number", DatatypeOptions::extending("float")),
        (
            "decimal",
            DatatypeOptions::new()
                .physical_type("NUMERIC")
                .scalar_serializer(|value, _| literals::decimal_literal(value)),
        ),
        (
            "string",
            DatatypeOptions::new()
                .type_resolver(string_type)
                .scalar_serializer(|value, _| literals::text_literal(value)),
        ),
        ("text", DatatypeOptions::extending("string").physical_type("TEXT")),
        ("url", DatatypeOptions::extending("text")),
        (
            "uuid",
            DatatypeOptions::new()
                .physical_type("UUID")
                .scalar_serializer(|value, _| literals::uuid_literal(value)),
        ),
        (
            "date",
            DatatypeOptions::new()
                .physical_type("DATE")
                .scalar_serializer(|value, _| literals::date_literal(value)),
        ),
        (
            "timestamp",
            DatatypeOptions::new()
                .physical_type("TIMESTAMP")
                .scalar_serializer(|value, _| literals::timestamp_literal(value)),
        ),
        (
            "timestamptz",
            DatatypeOptions::new()
                .physical_type("TIMESTAMPTZ")
                .scalar_serializer(|value, _| literals::timestamptz_literal(value)),
        ),
        (
            "binary",
            DatatypeOptions::new()
                .physical_type("BYTEA")
                .scalar_serializer(|value, _| literals::bytea_literal(value)),
        ),
        (
            "enum",
            DatatypeOptions::new()
                .type_resolver(enum_type)
                .scalar_serializer(|value, _| literals::text_literal(value)),
        ),
    ]
}

/// BIGINT once the declared bounds leave the 32-bit range
fn integer_type(field: &FieldDescriptor) -> String {
    let out_of_range = field.max.is_some_and(|max| max > INT4_MAX)
        || field.min.is_some_and(|min| min < INT4_MIN);

    let sql_type = if out_of_range { "BIGINT" } else { "INTEGER" };
    sql_type.to_string()
}

fn string_type(field: &FieldDescriptor) -> String {
    match field.max {
        Some(max) if max > 0 => format!("VARCHAR({max})"),
        _ => "TEXT".to_string(),
    }
}

/// Named enum type when the field has one, else sized to the longest choice
fn enum_type(field: &FieldDescriptor) -> String {
    if let Some(name) = &field.enum_type {
        return name.clone();
    }

    match field.choices.iter().map(|choice| choice.chars().count()).max() {
        Some(longest) if longest > 0 => format!("VARCHAR({longest})"),
        _ => "TEXT".to_string(),
    }
}
