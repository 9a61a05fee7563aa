use std::fmt;
use std::sync::Arc;

use super::field::FieldDescriptor;
use super::value::Value;

/// Computes a physical type from field attributes, e.g. `VARCHAR(19)` from `max`
pub type TypeResolver = Arc<dyn Fn(&FieldDescriptor) -> String + Send + Sync>;
/// Turns a physical type into the physical type of an array of it
pub type ArrayWrapper = Arc<dyn Fn(&str) -> String + Send + Sync>;
/// Renders one value as SQL literal text
pub type ScalarSerializer = Arc<dyn Fn(&Value, &FieldDescriptor) -> String + Send + Sync>;
/// Renders a sequence of values, using the scalar serializer for elements
pub type ArraySerializer =
    Arc<dyn Fn(&[Value], &FieldDescriptor, &ScalarSerializer) -> String + Send + Sync>;
/// Builds the column definition from (name, physical type, serialized default)
pub type ColumnFormatter = Arc<dyn Fn(&str, &str, Option<&str>) -> String + Send + Sync>;

/// Physical SQL type of a datatype: fixed, or computed per field.
#[derive(Clone)]
pub enum PhysicalType {
    Literal(String),
    Computed(TypeResolver),
}

impl PhysicalType {
    pub fn literal(sql_type: impl Into<String>) -> Self {
        Self::Literal(sql_type.into())
    }

    pub fn computed<F>(resolver: F) -> Self
    where
        F: Fn(&FieldDescriptor) -> String + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(resolver))
    }

    #[must_use]
    pub fn resolve(&self, field: &FieldDescriptor) -> String {
        match self {
            Self::Literal(sql_type) => sql_type.clone(),
            Self::Computed(resolver) => resolver(field),
        }
    }
}

impl fmt::Debug for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(sql_type) => f.debug_tuple("Literal").field(sql_type).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for PhysicalType {
    fn from(sql_type: &str) -> Self {
        Self::literal(sql_type)
    }
}

impl From<String> for PhysicalType {
    fn from(sql_type: String) -> Self {
        Self::Literal(sql_type)
    }
}

/// Array capability setting of a partial descriptor.
///
/// `Inherit` leaves the current value alone (or takes the default/base one),
/// `Disabled` removes array support.
#[derive(Clone, Default)]
pub enum ArraySupport {
    #[default]
    Inherit,
    Disabled,
    Wrapper(ArrayWrapper),
}

impl fmt::Debug for ArraySupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherit => f.write_str("Inherit"),
            Self::Disabled => f.write_str("Disabled"),
            Self::Wrapper(_) => f.write_str("Wrapper(..)"),
        }
    }
}

/// Partial descriptor passed to `DatatypeRegistry::register`.
///
/// Every `None` field is "not mentioned": it is inherited, kept or defaulted
/// depending on how the entry is registered.
#[derive(Clone, Default)]
pub struct DatatypeOptions {
    pub base_type: Option<String>,
    pub physical_type: Option<PhysicalType>,
    pub array_wrapper: ArraySupport,
    pub array_serializer: Option<ArraySerializer>,
    pub scalar_serializer: Option<ScalarSerializer>,
    pub column_formatter: Option<ColumnFormatter>,
}

impl DatatypeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a datatype extending `base`
    pub fn extending(base: impl Into<String>) -> Self {
        Self {
            base_type: Some(base.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn physical_type(mut self, physical_type: impl Into<PhysicalType>) -> Self {
        self.physical_type = Some(physical_type.into());
        self
    }

    #[must_use]
    pub fn type_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&FieldDescriptor) -> String + Send + Sync + 'static,
    {
        self.physical_type = Some(PhysicalType::computed(resolver));
        self
    }

    #[must_use]
    pub fn array_wrapper<F>(mut self, wrapper: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.array_wrapper = ArraySupport::Wrapper(Arc::new(wrapper));
        self
    }

    #[must_use]
    pub fn without_arrays(mut self) -> Self {
        self.array_wrapper = ArraySupport::Disabled;
        self
    }

    #[must_use]
    pub fn array_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&[Value], &FieldDescriptor, &ScalarSerializer) -> String + Send + Sync + 'static,
    {
        self.array_serializer = Some(Arc::new(serializer));
        self
    }

    #[must_use]
    pub fn scalar_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&Value, &FieldDescriptor) -> String + Send + Sync + 'static,
    {
        self.scalar_serializer = Some(Arc::new(serializer));
        self
    }

    #[must_use]
    pub fn column_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&str, &str, Option<&str>) -> String + Send + Sync + 'static,
    {
        self.column_formatter = Some(Arc::new(formatter));
        self
    }
}

impl fmt::Debug for DatatypeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatatypeOptions")
            .field("base_type", &self.base_type)
            .field("physical_type", &self.physical_type)
            .field("array_wrapper", &self.array_wrapper)
            .field("array_serializer", &self.array_serializer.is_some())
            .field("scalar_serializer", &self.scalar_serializer.is_some())
            .field("column_formatter", &self.column_formatter.is_some())
            .finish()
    }
}

/// Fully resolved registry entry.
///
/// The serializers and the column formatter are always present. A missing
/// `physical_type` is a registration mistake surfaced by `validate()`; a
/// missing `array_wrapper` means the datatype cannot back array fields.
#[derive(Clone)]
pub struct Datatype {
    pub name: String,
    pub base_type: Option<String>,
    pub physical_type: Option<PhysicalType>,
    pub array_wrapper: Option<ArrayWrapper>,
    pub array_serializer: ArraySerializer,
    pub scalar_serializer: ScalarSerializer,
    pub column_formatter: ColumnFormatter,
}

impl Datatype {
    #[must_use]
    pub const fn supports_arrays(&self) -> bool {
        self.array_wrapper.is_some()
    }
}

impl fmt::Debug for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datatype")
            .field("name", &self.name)
            .field("base_type", &self.base_type)
            .field("physical_type", &self.physical_type)
            .field("supports_arrays", &self.supports_arrays())
            .finish_non_exhaustive()
    }
}

/// Snapshot of a resolved datatype. Registering it under a new name gives
/// an independent entry that ignores later changes to `datatype`'s source.
impl From<&Datatype> for DatatypeOptions {
    fn from(datatype: &Datatype) -> Self {
        Self {
            base_type: None,
            physical_type: datatype.physical_type.clone(),
            array_wrapper: datatype
                .array_wrapper
                .clone()
                .map_or(ArraySupport::Disabled, ArraySupport::Wrapper),
            array_serializer: Some(datatype.array_serializer.clone()),
            scalar_serializer: Some(datatype.scalar_serializer.clone()),
            column_formatter: Some(datatype.column_formatter.clone()),
        }
    }
}

/// Whether two shared functions are the same function value.
#[must_use]
pub fn same_fn<F: ?Sized>(a: &Arc<F>, b: &Arc<F>) -> bool {
    Arc::ptr_eq(a, b)
}
