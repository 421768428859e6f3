use strata_codec::CodecError;
use strata_dag::DagError;
use strata_schema::SchemaError;
use strata_store::StoreError;

/// Errors from repository and transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The user schema failed to compile.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The storage backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored object failed to decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// DAG traversal failed.
    #[error(transparent)]
    Dag(#[from] DagError),

    /// The store has no `schema`/`head` keys; `init` has not run.
    #[error("repository is not initialized")]
    NotInitialized,

    /// A reserved key held bytes that do not parse.
    #[error("corrupt repository state: {0}")]
    Corrupt(String),

    /// The named collection is not a declared object type.
    #[error("unknown collection: {0:?}")]
    UnknownCollection(String),

    /// The named field is not declared on the collection's type.
    #[error("unknown field {field:?} on {collection:?}")]
    UnknownField { collection: String, field: String },

    /// A value does not conform to the declared field type.
    #[error("type mismatch in {collection:?}.{field:?}: expected {expected}, got {found}")]
    TypeMismatch {
        collection: String,
        field: String,
        expected: String,
        found: String,
    },

    /// `id` and `hash` are system fields and cannot be written.
    #[error("cannot write reserved field {0:?}")]
    ReservedField(String),

    /// A patch object is malformed (wrong operation arity or unknown op).
    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    /// A filter object is malformed or compares incompatible kinds.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// No document with this id in the collection.
    #[error("document not found: {collection:?}/{id:?}")]
    DocumentNotFound { collection: String, id: String },

    /// Both sides changed a document and the resolver refused to choose.
    #[error("merge conflict: {0}")]
    MergeConflict(String),

    /// The operation was cancelled by the host.
    #[error("operation cancelled")]
    Cancelled,
}

impl DbError {
    pub(crate) fn type_mismatch(
        collection: &str,
        field: &str,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            collection: collection.to_string(),
            field: field.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn not_found(collection: &str, id: &str) -> Self {
        Self::DocumentNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

/// Result alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
