use strata_db::DbError;

/// Errors from query execution.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The request query failed to parse or validate.
    #[error("query parse error: {0}")]
    Parse(String),

    /// No operation matched, or the choice was ambiguous.
    #[error("operation undefined: {0}")]
    OperationUndefined(String),

    /// A request construct the engine does not execute.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The `@revision` directive carried a malformed or unknown hash.
    #[error("invalid revision: {0}")]
    InvalidRevision(String),

    /// A variable was referenced but not provided.
    #[error("undefined variable: ${0}")]
    UndefinedVariable(String),

    /// A selection does not fit the schema (unknown field, missing or
    /// superfluous sub-selection, missing argument).
    #[error("invalid selection: {0}")]
    Selection(String),

    /// The database layer failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The request was cancelled by the host.
    #[error("request cancelled")]
    Cancelled,
}

/// Result alias for query execution.
pub type QueryResult<T> = Result<T, QueryError>;
