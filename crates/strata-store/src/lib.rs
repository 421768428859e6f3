//! Storage boundary for strata.
//!
//! The core persists everything through the [`Storage`] trait: an opaque
//! byte key → value map. Two keys are reserved — `head` (the current head
//! commit hash, raw 32 bytes) and `schema` (the user schema source, UTF-8).
//! Every other key is the 64-character lowercase hex of a content hash.
//!
//! [`MemoryStorage`] is the bundled backend, suitable for tests and
//! embedding; persistent backends live outside the core.

pub mod error;
pub mod keys;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use keys::{object_key, HEAD_KEY, SCHEMA_KEY};
pub use memory::MemoryStorage;
pub use traits::Storage;
