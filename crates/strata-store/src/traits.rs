use crate::error::StoreResult;

/// Opaque byte key → value map consumed by the core.
///
/// Contract for implementations:
/// - `get` returns a copy of the stored bytes; `put` stores a copy of its
///   input. Neither side may alias caller memory.
/// - Keys are opaque byte strings; the store never interprets them.
/// - A missing key is `StoreError::NotFound`, never an empty value.
/// - Writes under content-hash keys are idempotent by construction (same
///   key ⇒ same bytes), so overwrites are harmless.
/// - All I/O failures are propagated, never swallowed.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Returns `true` if `key` is present.
    ///
    /// Default goes through `get`; backends with a cheaper existence probe
    /// should override.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(crate::error::StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
