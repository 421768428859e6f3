//! Foundation types for strata.
//!
//! Every other strata crate depends on this one. It defines:
//!
//! - [`Hash`] — 32-byte SHA3-256 content address; the only cross-reference
//!   between persisted entities
//! - [`Value`] — the dynamic, schema-interpreted document value
//! - [`Commit`], [`DataRoot`], [`Collection`], [`Document`] — the four
//!   persisted object kinds, unified under [`Object`]
//! - [`CancelToken`] — cooperative cancellation handle threaded through
//!   long-running operations

pub mod cancel;
pub mod error;
pub mod hash;
pub mod object;
pub mod value;

pub use cancel::CancelToken;
pub use error::TypeError;
pub use hash::Hash;
pub use object::{Collection, Commit, DataRoot, Document, Object, ObjectKind};
pub use value::Value;
