// Module declarations
pub mod error;
pub mod value;
pub mod field;
pub mod data_type;

// Re-exports for convenience
pub use error::DatatypeError;
pub use value::Value;
pub use field::FieldDescriptor;
pub use data_type::{
    same_fn, ArraySerializer, ArraySupport, ArrayWrapper, ColumnFormatter, Datatype,
    DatatypeOptions, PhysicalType, ScalarSerializer, TypeResolver,
};
