use std::collections::{HashSet, VecDeque};

use strata_types::{Commit, Hash};

use crate::error::DagResult;
use crate::reader::CommitReader;

/// Breadth-first iterator over a commit and its ancestry.
///
/// Yields `(hash, commit)` pairs starting at the seed commit itself, then
/// its parents level by level, deduplicating by hash. Ties at one level
/// break by parent insertion order.
///
/// The parents of a yielded commit are not enqueued until the *next* call
/// to [`next`](Self::next); calling [`skip`](Self::skip) in between drops
/// them, pruning that commit's ancestry from the walk (unless it is
/// reachable some other way).
pub struct ParentIter<'a, R: CommitReader + ?Sized> {
    reader: &'a R,
    frontier: VecDeque<Hash>,
    seen: HashSet<Hash>,
    pending: Vec<Hash>,
}

impl<'a, R: CommitReader + ?Sized> ParentIter<'a, R> {
    /// Start a walk at `seed`.
    pub fn new(reader: &'a R, seed: Hash) -> Self {
        let mut seen = HashSet::new();
        seen.insert(seed);
        let mut frontier = VecDeque::new();
        frontier.push_back(seed);
        Self {
            reader,
            frontier,
            seen,
            pending: Vec::new(),
        }
    }

    /// Returns `true` once the walk is exhausted.
    pub fn done(&self) -> bool {
        self.frontier.is_empty() && self.pending.iter().all(|h| self.seen.contains(h))
    }

    /// Drop the last-yielded commit's parents from the frontier.
    pub fn skip(&mut self) {
        self.pending.clear();
    }

    /// Advance the walk. `Ok(None)` when exhausted.
    pub fn next(&mut self) -> DagResult<Option<(Hash, Commit)>> {
        self.flush_pending();
        let Some(hash) = self.frontier.pop_front() else {
            return Ok(None);
        };
        let commit = self.reader.load_commit(&hash)?;
        self.pending = commit.parents.clone();
        Ok(Some((hash, commit)))
    }

    fn flush_pending(&mut self) {
        for parent in self.pending.drain(..) {
            if self.seen.insert(parent) {
                self.frontier.push_back(parent);
            }
        }
    }
}
