/// Errors from compiling a user schema.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The SDL fragment did not parse.
    #[error("schema parse error: {0}")]
    Parse(String),

    /// The schema declares no object types.
    #[error("schema declares no object types")]
    Empty,

    /// A definition kind the engine does not accept.
    #[error("unsupported schema construct: {0}")]
    Unsupported(String),

    /// A type name is declared twice.
    #[error("duplicate type: {0:?}")]
    DuplicateType(String),

    /// A type name collides with a builtin or root name.
    #[error("reserved type name: {0:?}")]
    ReservedType(String),

    /// A field name is declared twice on one type.
    #[error("duplicate field {field:?} on type {type_name:?}")]
    DuplicateField { type_name: String, field: String },

    /// `id` and `hash` are system fields and cannot be declared.
    #[error("reserved field {field:?} on type {type_name:?}")]
    ReservedField { type_name: String, field: String },

    /// A field references a type that is neither scalar, enum, nor object.
    #[error("unknown type {referenced:?} in field {field:?} of {type_name:?}")]
    UnknownFieldType {
        type_name: String,
        field: String,
        referenced: String,
    },

    /// An enum value is declared twice.
    #[error("duplicate value {value:?} in enum {enum_name:?}")]
    DuplicateEnumValue { enum_name: String, value: String },
}

/// Result alias for schema compilation.
pub type SchemaResult<T> = Result<T, SchemaError>;
