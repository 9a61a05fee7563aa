// Per-registry fallback functions
//
// Any non-extending datatype registered without its own array wrapper,
// array serializer, scalar serializer or column formatter gets the one
// held here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::literals;
use crate::core::{ArraySerializer, ArrayWrapper, ColumnFormatter, FieldDescriptor, ScalarSerializer, Value};

/// Data-only construction options (loadable from a config file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryOptions {
    /// Appended to a physical type to get its array type
    pub array_suffix: String,
    /// Render column names as quoted identifiers
    pub quote_identifiers: bool,
    /// Add NOT NULL to columns that carry a DEFAULT clause
    pub not_null_with_default: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            array_suffix: "[]".to_string(),
            quote_identifiers: false,
            not_null_with_default: false,
        }
    }
}

#[derive(Clone)]
pub struct RegistryDefaults {
    pub array_wrapper: ArrayWrapper,
    pub array_serializer: ArraySerializer,
    pub scalar_serializer: ScalarSerializer,
    pub column_formatter: ColumnFormatter,
}

impl RegistryDefaults {
    #[must_use]
    pub fn from_options(options: &RegistryOptions) -> Self {
        let suffix = options.array_suffix.clone();
        let quote_identifiers = options.quote_identifiers;
        let not_null_with_default = options.not_null_with_default;

        Self {
            array_wrapper: Arc::new(move |sql_type: &str| format!("{sql_type}{suffix}")),
            array_serializer: Arc::new(literals::array_literal),
            scalar_serializer: Arc::new(|value: &Value, _: &FieldDescriptor| literals::text_literal(value)),
            column_formatter: Arc::new(move |name: &str, sql_type: &str, default: Option<&str>| {
                literals::column_definition(name, sql_type, default, quote_identifiers, not_null_with_default)
            }),
        }
    }

    #[must_use]
    pub fn with_array_wrapper<F>(mut self, wrapper: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.array_wrapper = Arc::new(wrapper);
        self
    }

    #[must_use]
    pub fn with_array_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&[Value], &FieldDescriptor, &ScalarSerializer) -> String + Send + Sync + 'static,
    {
        self.array_serializer = Arc::new(serializer);
        self
    }

    #[must_use]
    pub fn with_scalar_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&Value, &FieldDescriptor) -> String + Send + Sync + 'static,
    {
        self.scalar_serializer = Arc::new(serializer);
        self
    }

    #[must_use]
    pub fn with_column_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&str, &str, Option<&str>) -> String + Send + Sync + 'static,
    {
        self.column_formatter = Arc::new(formatter);
        self
    }
}

impl Default for RegistryDefaults {
    fn default() -> Self {
        Self::from_options(&RegistryOptions::default())
    }
}

impl fmt::Debug for RegistryDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryDefaults").finish_non_exhaustive()
    }
}
