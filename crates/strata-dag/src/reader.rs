use strata_types::{Commit, Hash};

use crate::error::DagResult;

/// Source of commits, resolved by hash.
///
/// Traversal never touches storage directly; the repository (or a test
/// fixture) implements this and owns decoding.
pub trait CommitReader {
    /// Load the commit identified by `hash`.
    ///
    /// A hash that does not resolve is `DagError::MissingCommit`.
    fn load_commit(&self, hash: &Hash) -> DagResult<Commit>;
}

impl<R: CommitReader + ?Sized> CommitReader for &R {
    fn load_commit(&self, hash: &Hash) -> DagResult<Commit> {
        (**self).load_commit(hash)
    }
}
