/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key is not present in the store.
    #[error("key not found: {0:?}")]
    NotFound(String),

    /// The backend failed in a backend-specific way.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// I/O error from the underlying medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation was cancelled by the host.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
