//! Error types for the assessment pipeline
//!
//! Nothing here is fatal to a pipeline caller. These types describe:
//! - Failures of the external generative service (recovered as an empty raw result)
//! - Invalid lexicons and configuration (rejected at construction time)
//! - Illegal stage transitions inside a single invocation
//! - Invalid flow inputs (rejected before a pipeline is built)

use crate::stage::Stage;
use std::path::PathBuf;

/// Failures reported by a [`GenerativeService`](crate::service::GenerativeService)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Connection, DNS or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("service returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// The call did not complete in time
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed
        timeout_ms: u64,
    },

    /// The payload could not be parsed into the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The service is missing credentials or endpoint settings
    #[error("service not configured: {0}")]
    NotConfigured(String),
}

impl ServiceError {
    /// Check whether the failure concerns the payload rather than the transport
    #[inline]
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse(_))
    }
}

/// Lexicon construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexiconError {
    /// No terms were supplied
    #[error("lexicon has no terms")]
    Empty,

    /// A term was empty after trimming
    #[error("lexicon term at position {0} is empty")]
    EmptyTerm(usize),

    /// The compiled pattern was rejected
    #[error("lexicon pattern rejected: {0}")]
    Pattern(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("config parse error: {0}")]
    Parse(String),

    /// Environment override could not be interpreted
    #[error("invalid value for {var}: {value:?}")]
    Env {
        /// Variable name
        var: String,
        /// Rejected value
        value: String,
    },

    /// A field holds a value outside its allowed domain
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Create invalid-field error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Stage machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// Transition not permitted from the current stage
    #[error("illegal stage transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current stage
        from: Stage,
        /// Requested stage
        to: Stage,
    },
}

/// Flow input errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    /// A numeric parameter was NaN, infinite or negative
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidNumber {
        /// Parameter name
        field: &'static str,
        /// Rejected value
        value: f64,
    },
}
