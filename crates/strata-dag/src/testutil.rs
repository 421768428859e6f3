//! Shared test fixture: a commit reader over a plain map.

use std::collections::HashMap;

use strata_types::{Commit, Hash};

use crate::error::{DagError, DagResult};
use crate::reader::CommitReader;

pub(crate) struct MapReader {
    commits: HashMap<Hash, Commit>,
}

impl MapReader {
    pub(crate) fn new() -> Self {
        Self {
            commits: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, hash: Hash, parents: Vec<Hash>) {
        self.commits
            .insert(hash, Commit::new(parents, Hash::zero()));
    }
}

impl CommitReader for MapReader {
    fn load_commit(&self, hash: &Hash) -> DagResult<Commit> {
        self.commits
            .get(hash)
            .cloned()
            .ok_or(DagError::MissingCommit(*hash))
    }
}

pub(crate) fn h(byte: u8) -> Hash {
    Hash::from_raw([byte; 32])
}

/// 1 ← 2 ← 3 (3 is the tip)
pub(crate) fn linear() -> MapReader {
    let mut reader = MapReader::new();
    reader.insert(h(1), vec![]);
    reader.insert(h(2), vec![h(1)]);
    reader.insert(h(3), vec![h(2)]);
    reader
}

/// Diamond: 1 ← {2, 3} ← 4
pub(crate) fn diamond() -> MapReader {
    let mut reader = MapReader::new();
    reader.insert(h(1), vec![]);
    reader.insert(h(2), vec![h(1)]);
    reader.insert(h(3), vec![h(1)]);
    reader.insert(h(4), vec![h(2), h(3)]);
    reader
}
