//! Conflict resolution for three-way merges.
//!
//! The merge driver itself lives on [`Repository::merge`]; this module
//! defines the seam it calls when both sides changed the same document
//! relative to the base.
//!
//! [`Repository::merge`]: crate::Repository::merge

use strata_types::Hash;

/// One contested document during a merge.
///
/// Each side is the document's content hash on that side, or `None` where
/// the document does not exist (never created, or deleted).
#[derive(Clone, Copy, Debug)]
pub struct Conflict<'a> {
    pub collection: &'a str,
    pub id: &'a str,
    pub base: Option<Hash>,
    pub ours: Option<Hash>,
    pub theirs: Option<Hash>,
}

/// Outcome of resolving one conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the current head's version.
    Ours,
    /// Take the incoming commit's version.
    Theirs,
    /// Refuse: the merge fails with a conflict error.
    Fail,
}

/// Chooses a side when both changed the same document differently.
///
/// Injected on the repository; the default is [`TheirsResolver`].
pub trait ConflictResolver: Send + Sync {
    fn resolve(&self, conflict: &Conflict<'_>) -> Resolution;
}

/// Default resolver: the incoming side wins. Suitable for a single client
/// replaying its own divergent work; it never fails a merge.
#[derive(Clone, Copy, Debug, Default)]
pub struct TheirsResolver;

impl ConflictResolver for TheirsResolver {
    fn resolve(&self, _conflict: &Conflict<'_>) -> Resolution {
        Resolution::Theirs
    }
}

impl<F> ConflictResolver for F
where
    F: Fn(&Conflict<'_>) -> Resolution + Send + Sync,
{
    fn resolve(&self, conflict: &Conflict<'_>) -> Resolution {
        self(conflict)
    }
}
