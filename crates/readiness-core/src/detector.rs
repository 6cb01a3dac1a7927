//! Candidate detection
//!
//! Provides the [`CandidateExtractor`] seam and its two strategies:
//! - [`Lexicon`]: case-insensitive term matching over free text
//! - [`FixedCandidates`]: a fixed field list for schema-driven flows

use crate::candidate::Candidate;
use crate::error::LexiconError;
use indexmap::IndexSet;
use regex::Regex;

/// Candidate extraction strategy
///
/// Implementations must be pure and deterministic: the same text always
/// yields the same candidates in the same order, without duplicates.
pub trait CandidateExtractor: Send + Sync {
    /// Extract ordered, distinct candidates from text
    fn extract(&self, text: &str) -> Vec<Candidate>;
}

/// Fixed lexicon of domain terms compiled into a single matcher
///
/// Matching is case-insensitive and substring-based. At any position the
/// longest term wins and matches never overlap, so `"bioreactor"` yields
/// `bioreactor` and not `reactor`.
#[derive(Debug, Clone)]
pub struct Lexicon {
    /// Terms in the order they were supplied
    terms: Vec<String>,
    /// Terms ordered by the pattern's alternation (longest first)
    alternatives: Vec<String>,
    pattern: Regex,
}

impl Lexicon {
    /// Compile a lexicon from terms
    ///
    /// Terms are trimmed and lowercased; duplicates are dropped.
    ///
    /// # Errors
    /// Returns [`LexiconError`] when no terms are given or a term is blank.
    pub fn new<I, S>(terms: I) -> Result<Self, LexiconError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: IndexSet<String> = IndexSet::new();
        for (position, term) in terms.into_iter().enumerate() {
            let term = term.as_ref().trim().to_lowercase();
            if term.is_empty() {
                return Err(LexiconError::EmptyTerm(position));
            }
            unique.insert(term);
        }
        if unique.is_empty() {
            return Err(LexiconError::Empty);
        }

        let terms: Vec<String> = unique.into_iter().collect();
        let mut alternatives = terms.clone();
        // Stable: equal-length terms keep their supplied order
        alternatives.sort_by(|a, b| b.len().cmp(&a.len()));

        let groups = alternatives
            .iter()
            .map(|term| format!("({})", regex::escape(term)))
            .collect::<Vec<_>>()
            .join("|");
        let pattern =
            Regex::new(&format!("(?i){groups}")).map_err(|e| LexiconError::Pattern(e.to_string()))?;

        Ok(Self {
            terms,
            alternatives,
            pattern,
        })
    }

    /// Terms in supplied order
    #[inline]
    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Check whether a candidate names a lexicon term
    #[must_use]
    pub fn contains(&self, candidate: &Candidate) -> bool {
        self.terms.iter().any(|t| t == candidate.as_str())
    }

    /// Detect distinct terms in first-seen order
    #[must_use]
    pub fn detect(&self, text: &str) -> Vec<Candidate> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        for captures in self.pattern.captures_iter(text) {
            // Exactly one group participates per match; it names the canonical term
            if let Some(index) = captures.iter().skip(1).position(|g| g.is_some()) {
                seen.insert(self.alternatives[index].as_str());
            }
        }
        seen.into_iter().map(Candidate::new).collect()
    }
}

impl CandidateExtractor for Lexicon {
    fn extract(&self, text: &str) -> Vec<Candidate> {
        self.detect(text)
    }
}

/// Fixed set of candidates requested for any non-blank text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedCandidates {
    fields: Vec<Candidate>,
}

impl FixedCandidates {
    /// Create from field names (deduplicated, order kept)
    #[must_use]
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: IndexSet<Candidate> = fields.into_iter().map(Candidate::new).collect();
        Self {
            fields: unique.into_iter().collect(),
        }
    }

    /// Field candidates
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[Candidate] {
        &self.fields
    }
}

impl CandidateExtractor for FixedCandidates {
    fn extract(&self, text: &str) -> Vec<Candidate> {
        if text.trim().is_empty() {
            Vec::new()
        } else {
            self.fields.clone()
        }
    }
}
