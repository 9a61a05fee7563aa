use serde::{Deserialize, Serialize};
use super::value::Value;

/// Schema field as seen by the registry. Never mutated by it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    /// Column name, used verbatim by the column formatter
    pub path: String,
    #[serde(rename = "type")]
    pub logical_type: String,
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub default: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// Name of a `CREATE TYPE ... AS ENUM` type backing this field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl FieldDescriptor {
    pub fn new(path: impl Into<String>, logical_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            logical_type: logical_type.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn array(mut self, array: bool) -> Self {
        self.array = array;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    #[must_use]
    pub const fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    #[must_use]
    pub const fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    #[must_use]
    pub fn enum_type(mut self, name: impl Into<String>) -> Self {
        self.enum_type = Some(name.into());
        self
    }

    #[must_use]
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }
}
