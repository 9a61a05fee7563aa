// Column rendering: field descriptor -> column definition
//
// Looks the field's logical type up in the registry, serializes its
// default and hands both to the datatype's column formatter.

use std::slice;
use tracing::trace;

use crate::core::{Datatype, DatatypeError, FieldDescriptor, Value};
use crate::registry::DatatypeRegistry;

pub struct ColumnRenderer;

impl ColumnRenderer {
    /// Render the column definition of one field
    ///
    /// Fails with:
    /// - `UnknownDatatype` when the logical type is not registered
    /// - `ArrayUnsupported` for an array field whose datatype has no array wrapper
    /// - `MissingPhysicalType` when the datatype was registered without a type
    pub fn render_column(
        registry: &DatatypeRegistry,
        field: &FieldDescriptor,
    ) -> Result<String, DatatypeError> {
        let datatype = Self::lookup(registry, field)?;
        let default = Self::serialize_with(&datatype, &field.default, field)?;

        let physical_type = datatype
            .physical_type
            .as_ref()
            .ok_or_else(|| DatatypeError::MissingPhysicalType(datatype.name.clone()))?
            .resolve(field);

        let sql_type = match (field.array, &datatype.array_wrapper) {
            (false, _) => physical_type,
            (true, Some(wrapper)) => wrapper(&physical_type),
            // serialize_with already rejected this combination
            (true, None) => return Err(DatatypeError::ArrayUnsupported(datatype.name.clone())),
        };

        let column = (datatype.column_formatter)(&field.path, &sql_type, default.as_deref());
        trace!(target: "pgr_datatypes::render", "{} -> {}", field.path, column);
        Ok(column)
    }

    /// Render every field, failing on the first one that cannot be rendered
    pub fn render_columns(
        registry: &DatatypeRegistry,
        fields: &[FieldDescriptor],
    ) -> Result<Vec<String>, DatatypeError> {
        fields
            .iter()
            .map(|field| Self::render_column(registry, field))
            .collect()
    }

    /// Serialize `value` with the datatype registered for the field's logical type
    ///
    /// Returns `None` for `Value::Null`: a null default has no DEFAULT clause.
    pub fn serialize_value(
        registry: &DatatypeRegistry,
        value: &Value,
        field: &FieldDescriptor,
    ) -> Result<Option<String>, DatatypeError> {
        let datatype = Self::lookup(registry, field)?;
        Self::serialize_with(&datatype, value, field)
    }

    /// Serialize `value` with an already resolved datatype
    pub fn serialize_with(
        datatype: &Datatype,
        value: &Value,
        field: &FieldDescriptor,
    ) -> Result<Option<String>, DatatypeError> {
        if field.array && !datatype.supports_arrays() {
            return Err(DatatypeError::ArrayUnsupported(datatype.name.clone()));
        }

        if value.is_null() {
            return Ok(None);
        }

        let literal = if field.array {
            // A lone value in an array field is a one-element array
            let values = value.as_array().unwrap_or_else(|| slice::from_ref(value));
            (datatype.array_serializer)(values, field, &datatype.scalar_serializer)
        } else {
            (datatype.scalar_serializer)(value, field)
        };

        Ok(Some(literal))
    }

    fn lookup(registry: &DatatypeRegistry, field: &FieldDescriptor) -> Result<Datatype, DatatypeError> {
        registry
            .resolve(&field.logical_type)
            .ok_or_else(|| DatatypeError::UnknownDatatype(field.logical_type.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DatatypeOptions;
    use crate::registry::RegistryDefaults;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn registry() -> DatatypeRegistry {
        let mut registry = DatatypeRegistry::empty(RegistryDefaults::default());
        registry
            .register(
                "string",
                DatatypeOptions::new()
                    .type_resolver(|field| format!("VARCHAR({})", field.max.unwrap_or(255)))
                    .scalar_serializer(|value, _| format!("'{value}'"))
                    .array_wrapper(|t| format!("{t}[]"))
                    .array_serializer(|values, field, serializer| {
                        let items: Vec<String> = values.iter().map(|v| serializer(v, field)).collect();
                        format!("{{{}}}", items.join(","))
                    })
                    .column_formatter(|name, sql_type, default| match default {
                        Some(default) => format!("{name} {sql_type} DEFAULT {default}"),
                        None => format!("{name} {sql_type}"),
                    }),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_render_scalar_column() {
        let field = FieldDescriptor::new("prefix", "string").max(19).default_value("abc");
        assert_eq!(
            ColumnRenderer::render_column(&registry(), &field).unwrap(),
            "prefix VARCHAR(19) DEFAULT 'abc'"
        );
    }

    #[test]
    fn test_render_array_column() {
        let field = FieldDescriptor::new("tags", "string")
            .array(true)
            .max(5)
            .default_value(vec!["a", "b"]);
        assert_eq!(
            ColumnRenderer::render_column(&registry(), &field).unwrap(),
            "tags VARCHAR(5)[] DEFAULT {'a','b'}"
        );
    }

    #[test]
    fn test_render_null_default_omits_clause() {
        let field = FieldDescriptor::new("prefix", "string").max(19);
        assert_eq!(
            ColumnRenderer::render_column(&registry(), &field).unwrap(),
            "prefix VARCHAR(19)"
        );
    }

    #[test]
    fn test_render_unknown_datatype() {
        let field = FieldDescriptor::new("n", "integer");
        assert_eq!(
            ColumnRenderer::render_column(&registry(), &field),
            Err(DatatypeError::UnknownDatatype("integer".to_string()))
        );
    }

    #[test]
    fn test_empty_array_goes_to_array_serializer() {
        let field = FieldDescriptor::new("tags", "string")
            .array(true)
            .default_value(Value::Array(Vec::new()));
        assert_eq!(
            ColumnRenderer::render_column(&registry(), &field).unwrap(),
            "tags VARCHAR(255)[] DEFAULT {}"
        );
    }

    #[test]
    fn test_scalar_value_in_array_field() {
        let field = FieldDescriptor::new("tags", "string").array(true);
        assert_eq!(
            ColumnRenderer::serialize_value(&registry(), &Value::from("a"), &field).unwrap(),
            Some("{'a'}".to_string())
        );
    }

    #[test]
    fn test_array_unsupported_never_calls_serializer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = registry();
        registry
            .register(
                "flag",
                DatatypeOptions::new()
                    .physical_type("BOOLEAN")
                    .without_arrays()
                    .scalar_serializer(move |_, _| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        "TRUE".to_string()
                    }),
            )
            .unwrap();

        let field = FieldDescriptor::new("flags", "flag").array(true).default_value(vec![true]);
        assert_eq!(
            ColumnRenderer::render_column(&registry, &field),
            Err(DatatypeError::ArrayUnsupported("flag".to_string()))
        );
        // Checked before the value: null defaults fail too
        assert_eq!(
            ColumnRenderer::serialize_value(&registry, &Value::Null, &field),
            Err(DatatypeError::ArrayUnsupported("flag".to_string()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_serialize_null_is_none() {
        let registry = registry();
        let scalar = FieldDescriptor::new("a", "string");
        let array = FieldDescriptor::new("a", "string").array(true);

        assert_eq!(ColumnRenderer::serialize_value(&registry, &Value::Null, &scalar).unwrap(), None);
        assert_eq!(ColumnRenderer::serialize_value(&registry, &Value::Null, &array).unwrap(), None);
    }

    #[test]
    fn test_missing_physical_type() {
        let mut registry = registry();
        registry.register("untyped", DatatypeOptions::new()).unwrap();

        let field = FieldDescriptor::new("a", "untyped");
        assert_eq!(
            ColumnRenderer::render_column(&registry, &field),
            Err(DatatypeError::MissingPhysicalType("untyped".to_string()))
        );
    }

    #[test]
    fn test_render_columns_is_all_or_nothing() {
        let registry = registry();
        let fields = vec![
            FieldDescriptor::new("a", "string"),
            FieldDescriptor::new("b", "missing"),
        ];

        assert!(ColumnRenderer::render_columns(&registry, &fields).is_err());
        assert_eq!(
            ColumnRenderer::render_columns(&registry, &fields[..1]).unwrap(),
            vec!["a VARCHAR(255)".to_string()]
        );
    }
}
