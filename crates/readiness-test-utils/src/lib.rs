//! Testing utilities for the readiness workspace
//!
//! A scripted generative service, a frozen clock and a few fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use readiness_core::{FixedClock, GenerationRequest, GenerativeService, ReadinessConfig, ServiceError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Service answering from a queue of scripted replies
///
/// Once the queue is exhausted every call fails with a transport error,
/// unless a fallback reply was set with [`ScriptedService::always`].
#[derive(Debug, Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<String, ServiceError>>>,
    fallback: Option<Result<String, ServiceError>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedService {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, ServiceError>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Single successful reply
    pub fn reply(text: impl Into<String>) -> Self {
        Self::new([Ok(text.into())])
    }

    /// Single failure
    pub fn failing(error: ServiceError) -> Self {
        Self::new([Err(error)])
    }

    /// Same reply for every call
    pub fn always(reply: Result<String, ServiceError>) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::default()
        }
    }

    /// Sleep before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl GenerativeService for ScriptedService {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ServiceError> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().pop_front();
        next.or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(ServiceError::Transport("no scripted response".to_string())))
    }
}

/// 2025-07-22T08:04:00Z, rendered as `2025-07-22 13:34:00 IST` by default
pub fn fixed_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 22, 8, 4, 0).unwrap()
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(fixed_instant()))
}

pub const FIXED_TIMESTAMP: &str = "2025-07-22 13:34:00 IST";

pub fn test_config() -> ReadinessConfig {
    ReadinessConfig::new().with_timeout_secs(5)
}

pub const SAMPLE_DOCUMENTATION: &str = "The stirred-tank Bioreactor is fitted with a dissolved-oxygen SENSOR \
     and a peristaltic pump. A second pump feeds the harvest line.";
