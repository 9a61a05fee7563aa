use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatatypeError {
    #[error("Datatype '{name}' extends '{base}', which is not a registered datatype")]
    UnknownBaseType { name: String, base: String },
    #[error("Datatype '{0}' is unavailable, please register its definition")]
    UnknownDatatype(String),
    #[error("Datatype '{0}' does not support arrays")]
    ArrayUnsupported(String),
    #[error("Datatype '{0}' has no physical type")]
    MissingPhysicalType(String),
    #[error("Datatype '{name}' extends '{base}', which is already {depth} levels deep")]
    InheritanceTooDeep {
        name: String,
        base: String,
        depth: usize,
    },
}
