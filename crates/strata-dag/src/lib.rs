//! Commit DAG traversal for strata.
//!
//! Commits are never materialized into an in-memory graph: the DAG exists
//! only as hashes resolved on demand through the [`CommitReader`] seam.
//! Acyclicity holds by construction — a commit's hash depends on its
//! parents' content, so no commit can reference a descendant.
//!
//! Algorithms:
//!
//! - [`ParentIter`] — breadth-first walk over ancestry with hash dedup and
//!   a [`skip`](ParentIter::skip) escape hatch
//! - [`is_ancestor`] — reachability test
//! - [`merge_base`] — best common ancestor(s) of two commits
//! - [`independents`] — drop candidates that are proper ancestors of other
//!   candidates

pub mod base;
pub mod error;
pub mod iter;
pub mod reader;

#[cfg(test)]
pub(crate) mod testutil;

pub use base::{independents, is_ancestor, merge_base};
pub use error::{DagError, DagResult};
pub use iter::ParentIter;
pub use reader::CommitReader;
