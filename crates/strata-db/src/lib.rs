//! Repository, transaction, and merge engine for strata.
//!
//! The [`Repository`] owns the two mutable facts of a database — the `head`
//! hash and the schema source — and reads or writes everything else by
//! content hash. A [`Transaction`] is a staged, schema-validated view over
//! one base commit; committing rolls staged documents up into new
//! collection roots, a new data-root, and a new commit. Concurrent lines of
//! history meet in [`Repository::merge`], a three-way merge driven by the
//! commit DAG with a pluggable [`ConflictResolver`].

pub mod error;
pub mod filter;
pub mod merge;
pub mod repository;
pub mod transaction;

pub use error::{DbError, DbResult};
pub use merge::{Conflict, ConflictResolver, Resolution, TheirsResolver};
pub use repository::Repository;
pub use transaction::{DocumentCursor, Transaction};
