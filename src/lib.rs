// pgr-datatypes - schema field -> PostgreSQL column definition mapping
// Registry of logical datatypes plus the dispatcher that renders columns

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::type_complexity)]

// Core types (values, field descriptors, datatype descriptors, errors)
pub mod core;

// Datatype registry, registry defaults and the built-in datatype table
pub mod registry;

// Column rendering and value serialization
pub mod render;

// Re-export commonly used types for convenience
pub use core::{
    ArraySupport, Datatype, DatatypeError, DatatypeOptions, FieldDescriptor, PhysicalType, Value,
};
pub use registry::{DatatypeRegistry, RegistryDefaults, RegistryOptions};
pub use render::ColumnRenderer;
