use std::collections::HashSet;

use tracing::debug;

use strata_types::Hash;

use crate::error::DagResult;
use crate::iter::ParentIter;
use crate::reader::CommitReader;

/// Reachability test: is `old` an ancestor of `new`?
///
/// A commit counts as its own ancestor, so `is_ancestor(x, x)` is true.
pub fn is_ancestor<R: CommitReader + ?Sized>(reader: &R, old: &Hash, new: &Hash) -> DagResult<bool> {
    let mut iter = ParentIter::new(reader, *new);
    while let Some((hash, _)) = iter.next()? {
        if hash == *old {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Best common ancestor(s) of `a` and `b`.
///
/// Fast-forward first: if `a` is reachable from `b`, the answer is `[a]`.
/// Otherwise every commit in `a`'s ancestry that also appears in `b`'s is
/// a candidate, reduced to the independent set. The result preserves the
/// order candidates were first encountered walking from `a`.
pub fn merge_base<R: CommitReader + ?Sized>(
    reader: &R,
    a: &Hash,
    b: &Hash,
) -> DagResult<Vec<Hash>> {
    // Walk b to exhaustion, collecting its full ancestor set.
    let mut reachable_from_b = HashSet::new();
    let mut iter = ParentIter::new(reader, *b);
    while let Some((hash, _)) = iter.next()? {
        if hash == *a {
            return Ok(vec![*a]);
        }
        reachable_from_b.insert(hash);
    }

    // Walk a; every hash shared with b's ancestry is a candidate. Once a
    // common commit is found its whole ancestry is common too and strictly
    // worse, so skip past it.
    let mut candidates = Vec::new();
    let mut iter = ParentIter::new(reader, *a);
    while let Some((hash, _)) = iter.next()? {
        if reachable_from_b.contains(&hash) {
            candidates.push(hash);
            iter.skip();
        }
    }

    debug!(
        a = %a.short_hex(),
        b = %b.short_hex(),
        candidates = candidates.len(),
        "merge-base candidates collected"
    );
    independents(reader, &candidates)
}

/// Reduce `candidates` to those that are not proper ancestors of another
/// candidate. Survivors keep their input order; duplicates collapse to the
/// first occurrence.
pub fn independents<R: CommitReader + ?Sized>(
    reader: &R,
    candidates: &[Hash],
) -> DagResult<Vec<Hash>> {
    let mut unique = Vec::new();
    let mut seen = HashSet::new();
    for candidate in candidates {
        if seen.insert(*candidate) {
            unique.push(*candidate);
        }
    }
    if unique.len() <= 1 {
        return Ok(unique);
    }

    let candidate_set: HashSet<Hash> = unique.iter().copied().collect();
    let mut dropped: HashSet<Hash> = HashSet::new();

    // Every candidate is walked, even ones already dropped: a dropped
    // candidate's ancestry can still contain further candidates that only
    // its own walk reaches after `skip`.
    for candidate in &unique {
        let mut iter = ParentIter::new(reader, *candidate);
        // First yield is the candidate itself; only proper ancestors count.
        iter.next()?;
        while let Some((hash, _)) = iter.next()? {
            if candidate_set.contains(&hash) {
                dropped.insert(hash);
                // Anything below this point is an ancestor of `hash` and
                // will be covered by its own walk.
                iter.skip();
            }
        }
    }

    Ok(unique
        .into_iter()
        .filter(|hash| !dropped.contains(hash))
        .collect())
}
