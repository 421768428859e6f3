use strata_types::Hash;

/// Errors from DAG traversal.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// A parent reference did not resolve to a stored commit.
    #[error("missing commit: {}", .0.short_hex())]
    MissingCommit(Hash),

    /// The commit source failed to load or decode a commit.
    #[error("commit read failed: {0}")]
    Read(String),
}

/// Result alias for DAG operations.
pub type DagResult<T> = Result<T, DagError>;
