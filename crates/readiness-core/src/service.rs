//! Generative text service boundary
//!
//! The service is untrusted and best-effort. Whatever it returns is handed to
//! [`RawAssessment::parse`](crate::raw::RawAssessment::parse) and then
//! validated record by record; its shape is never assumed.

use crate::candidate::Candidate;
use crate::error::ServiceError;
use async_trait::async_trait;
use serde::Serialize;

/// A single request to the generative service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Instructions, including the candidate enumeration and output format
    pub instruction: String,
    /// Text under analysis
    pub source_text: String,
    /// Candidates the service is asked to assess, and nothing else
    pub candidates: Vec<Candidate>,
    /// Sampling temperature
    pub temperature: f32,
}

impl GenerationRequest {
    /// Render the full prompt sent to the model
    #[must_use]
    pub fn prompt(&self) -> String {
        format!("{}\n{}", self.instruction, self.source_text)
    }
}

/// External generative text service
///
/// Implementations perform exactly one request/response exchange per call.
/// Throttling, retry and backoff are the implementation's own business.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Generate text for the request
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError>;
}
