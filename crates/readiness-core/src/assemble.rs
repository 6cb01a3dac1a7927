//! Result assembly
//!
//! The candidate list defines the keys and their order. [`assemble`] asks for
//! one record per candidate, so the output can neither omit a candidate nor
//! introduce a key the detector did not produce.

use crate::candidate::Candidate;
use crate::stamp::{ObservedAt, Stamped};
use indexmap::IndexMap;
use serde::Serialize;

/// Final `candidate → record` mapping in detection order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultMapping<R> {
    entries: IndexMap<Candidate, Stamped<R>>,
}

impl<R> Default for ResultMapping<R> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<R> ResultMapping<R> {
    /// Empty mapping (no candidates detected)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record for a candidate name
    #[inline]
    #[must_use]
    pub fn get(&self, candidate: &str) -> Option<&Stamped<R>> {
        self.entries.get(candidate)
    }

    /// Candidates in detection order
    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.entries.keys()
    }

    /// Entries in detection order
    pub fn iter(&self) -> impl Iterator<Item = (&Candidate, &Stamped<R>)> {
        self.entries.iter()
    }

    /// Shared observation timestamp (`None` when empty)
    #[must_use]
    pub fn observed_at(&self) -> Option<&ObservedAt> {
        self.entries.values().next().map(|s| &s.observed_at)
    }

    /// Unwrap into the ordered map
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> IndexMap<Candidate, Stamped<R>> {
        self.entries
    }
}

impl<'a, R> IntoIterator for &'a ResultMapping<R> {
    type Item = (&'a Candidate, &'a Stamped<R>);
    type IntoIter = indexmap::map::Iter<'a, Candidate, Stamped<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Build the mapping with exactly one record per distinct candidate
///
/// `record_for` is called once per distinct candidate, in order. A repeated
/// candidate keeps its first position and first record.
pub fn assemble<R, F>(candidates: &[Candidate], observed_at: &ObservedAt, mut record_for: F) -> ResultMapping<R>
where
    F: FnMut(&Candidate) -> R,
{
    let mut entries = IndexMap::with_capacity(candidates.len());
    for candidate in candidates {
        if entries.contains_key(candidate) {
            continue;
        }
        let stamped = Stamped {
            record: record_for(candidate),
            observed_at: observed_at.clone(),
        };
        entries.insert(candidate.clone(), stamped);
    }
    ResultMapping { entries }
}
