//! Candidates and assessment requests

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A lowercase-normalized entity identifier eligible for assessment
///
/// Lexicon flows produce one per distinct matched term; fixed-field flows use
/// their field names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(String);

impl Candidate {
    /// Create a candidate, trimming and lowercasing the name
    #[inline]
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    /// Candidate name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Candidate {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Candidate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Candidate {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Source text plus the candidates detected in it
///
/// Borrowed for the duration of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentRequest<'a> {
    /// Text the candidates were detected in
    pub source_text: &'a str,
    /// Candidates in detection order, never empty when handed to a builder
    pub candidates: &'a [Candidate],
}

impl<'a> AssessmentRequest<'a> {
    /// Create request
    #[inline]
    #[must_use]
    pub fn new(source_text: &'a str, candidates: &'a [Candidate]) -> Self {
        Self {
            source_text,
            candidates,
        }
    }

    /// Candidate names joined for prompts: `"pump, sensor"`
    #[must_use]
    pub fn candidate_list(&self) -> String {
        self.candidates
            .iter()
            .map(Candidate::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
