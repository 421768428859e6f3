//! Embedding facade for strata.
//!
//! [`Database`] ties a repository and an executor into one handle:
//!
//! ```
//! use strata_sdk::{Database, QueryParams};
//!
//! let db = Database::in_memory("type User { name: String }").unwrap();
//! let response = db.execute(&QueryParams::new(
//!     r#"mutation { createUser(data: {name: "Bob"}) { id name } }"#,
//! ));
//! assert!(response.is_ok());
//! ```
//!
//! The facade introduces no failure modes of its own; fallible calls
//! surface [`strata_db::DbError`], re-exported here as [`Error`].

pub mod database;

pub use database::Database;

pub use strata_db::{Conflict, ConflictResolver, DbError as Error, Resolution, TheirsResolver};
pub use strata_query::{GraphQLError, QueryParams, QueryResponse};
pub use strata_store::{MemoryStorage, Storage};
pub use strata_types::{CancelToken, Hash};
