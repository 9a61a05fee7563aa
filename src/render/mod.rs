// Serialization dispatch (column definitions, default literals)
pub mod column;

pub use column::ColumnRenderer;
