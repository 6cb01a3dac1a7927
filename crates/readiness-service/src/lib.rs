//! Readiness Service - HTTP generative service
//!
//! Implements [`GenerativeService`] against a Gemini-style
//! `models/{model}:generateContent` endpoint. One POST per call; no retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use readiness_core::{flows::trl_pipeline, ReadinessConfig};
//! use readiness_service::GeminiService;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ReadinessConfig::load(None)?;
//! let service = Arc::new(GeminiService::from_config(&config)?);
//! let mapping = trl_pipeline(service, &config)?.run("A pump and a valve.").await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod wire;

use async_trait::async_trait;
use readiness_core::{GenerationRequest, GenerativeService, ReadinessConfig, ServiceError};
use std::fmt;
use wire::{GenerateContentRequest, GenerateContentResponse};

/// Longest error body kept in [`ServiceError::Status`]
pub const MAX_ERROR_BODY: usize = 512;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP client for a `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiService {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl fmt::Debug for GeminiService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiService")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiService {
    /// Create service for a model
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Create service from configuration, reading the API key from the environment
    ///
    /// # Errors
    /// Returns [`ServiceError::NotConfigured`] when the key variable is unset or blank.
    pub fn from_config(config: &ReadinessConfig) -> Result<Self, ServiceError> {
        Self::from_config_with(config, |name| std::env::var(name).ok())
    }

    /// Create service from configuration with an explicit key lookup
    ///
    /// # Errors
    /// Returns [`ServiceError::NotConfigured`] when the key is missing or blank.
    pub fn from_config_with<F>(config: &ReadinessConfig, lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(&config.api_key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ServiceError::NotConfigured(format!("{} is not set", config.api_key_env)))?;
        Ok(Self::new(&config.base_url, &config.model, api_key))
    }

    /// With a preconfigured client
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Endpoint URL for the configured model
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerativeService for GeminiService {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError> {
        let body = GenerateContentRequest::text(request.prompt(), request.temperature);
        tracing::debug!(model = %self.model, candidates = request.candidates.len(), "calling generateContent");

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

        payload.text().ok_or_else(|| {
            ServiceError::MalformedResponse(format!(
                "no text in response (finish reason: {})",
                payload.finish_reason().unwrap_or("none")
            ))
        })
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
