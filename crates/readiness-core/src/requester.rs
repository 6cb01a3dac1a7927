//! Assessment requests
//!
//! The requester sends one bounded request per invocation and converts every
//! failure (transport, status, timeout, unparsable payload) into an empty
//! [`RawAssessment`]. It never returns an error to its caller.

use crate::candidate::AssessmentRequest;
use crate::error::ServiceError;
use crate::raw::RawAssessment;
use crate::service::{GenerationRequest, GenerativeService};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound on a single generative call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Request-building strategy
///
/// Builders must enumerate exactly the request's candidates and instruct the
/// service not to assess anything else.
pub trait RequestBuilder: Send + Sync {
    /// Build the generation request for a non-empty candidate list
    fn build(&self, request: &AssessmentRequest<'_>) -> GenerationRequest;
}

/// What happened at the service boundary during one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServiceOutcome {
    /// No candidates, so the service was never called
    NotCalled,
    /// A JSON object was recovered
    Received {
        /// Number of top-level entries in the payload
        entries: usize,
    },
    /// Transport failure, error status or timeout
    Unavailable {
        /// Failure description
        reason: String,
    },
    /// The payload could not be parsed
    Malformed {
        /// Failure description
        reason: String,
    },
}

impl ServiceOutcome {
    fn from_error(error: &ServiceError) -> Self {
        if error.is_malformed() {
            Self::Malformed {
                reason: error.to_string(),
            }
        } else {
            Self::Unavailable {
                reason: error.to_string(),
            }
        }
    }

    /// Check whether the service produced a usable payload
    #[inline]
    #[must_use]
    pub fn is_received(&self) -> bool {
        matches!(self, Self::Received { .. })
    }
}

/// Invokes the generative service with a timeout
#[derive(Clone)]
pub struct Requester {
    service: Arc<dyn GenerativeService>,
    timeout: Duration,
}

impl fmt::Debug for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requester")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Requester {
    /// Create requester with the default timeout
    #[inline]
    #[must_use]
    pub fn new(service: Arc<dyn GenerativeService>) -> Self {
        Self {
            service,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// With call timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Call the service once and recover a raw assessment
    ///
    /// Awaited exactly once per invocation; failures degrade to an empty
    /// assessment and are described by the returned [`ServiceOutcome`].
    pub async fn request(&self, generation: &GenerationRequest) -> (RawAssessment, ServiceOutcome) {
        tracing::debug!(
            candidates = generation.candidates.len(),
            prompt_bytes = generation.instruction.len() + generation.source_text.len(),
            "requesting assessment"
        );

        let text = match tokio::time::timeout(self.timeout, self.service.generate(generation)).await
        {
            Ok(Ok(text)) => text,
            Ok(Err(error)) => return degrade(&error),
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                return degrade(&ServiceError::Timeout { timeout_ms });
            }
        };

        match RawAssessment::parse(&text) {
            Ok(raw) => {
                let outcome = ServiceOutcome::Received { entries: raw.len() };
                (raw, outcome)
            }
            Err(error) => {
                tracing::info!(response_bytes = text.len(), "could not parse model output as JSON");
                degrade(&error)
            }
        }
    }
}

fn degrade(error: &ServiceError) -> (RawAssessment, ServiceOutcome) {
    tracing::warn!(%error, "generative service failed; continuing with defaults");
    (RawAssessment::empty(), ServiceOutcome::from_error(error))
}
