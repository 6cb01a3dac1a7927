//! Readiness configuration
//!
//! Defaults, then an optional TOML file, then environment overrides, then
//! validation.

use crate::error::ConfigError;
use crate::stamp::{TimestampFormat, DEFAULT_OFFSET_MINUTES, DEFAULT_ZONE_LABEL};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`ReadinessConfig::model`]
pub const MODEL_ENV: &str = "READINESS_MODEL";
/// Environment variable overriding [`ReadinessConfig::base_url`]
pub const BASE_URL_ENV: &str = "READINESS_BASE_URL";
/// Environment variable overriding [`ReadinessConfig::timeout_secs`]
pub const TIMEOUT_ENV: &str = "READINESS_TIMEOUT_SECS";

/// Readiness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadinessConfig {
    /// Model identifier
    pub model: String,
    /// Service base URL
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Timestamp display convention
    pub timestamp: TimestampConfig,
}

/// Timestamp display settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimestampConfig {
    /// Offset east of UTC, in minutes
    pub offset_minutes: i32,
    /// Label appended to rendered timestamps
    pub label: String,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            offset_minutes: DEFAULT_OFFSET_MINUTES,
            label: DEFAULT_ZONE_LABEL.to_string(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.2,
            timeout_secs: 60,
            timestamp: TimestampConfig::default(),
        }
    }
}

impl ReadinessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// With timeout in seconds
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// With timestamp convention
    #[inline]
    #[must_use]
    pub fn with_timestamp(mut self, offset_minutes: i32, label: impl Into<String>) -> Self {
        self.timestamp = TimestampConfig {
            offset_minutes,
            label: label.into(),
        };
        self
    }

    /// Parse from TOML text (unset fields keep their defaults)
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on invalid TOML or unknown fields.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load: defaults, optional file, process environment, validation
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or parsed, an
    /// override is malformed, or the result fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Load with an explicit environment lookup
    ///
    /// # Errors
    /// Same as [`ReadinessConfig::load`].
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        tracing::debug!(model = %config.model, timeout_secs = config.timeout_secs, "configuration loaded");
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    ///
    /// # Errors
    /// Returns [`ConfigError::Env`] when a numeric override does not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(model) = present(MODEL_ENV) {
            self.model = model;
        }
        if let Some(base_url) = present(BASE_URL_ENV) {
            self.base_url = base_url;
        }
        if let Some(value) = present(TIMEOUT_ENV) {
            self.timeout_secs = value.parse().map_err(|_| ConfigError::Env {
                var: TIMEOUT_ENV.to_string(),
                value,
            })?;
        }
        Ok(())
    }

    /// Validate field domains
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("model", "must not be blank"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::invalid("base_url", "must be an http(s) URL"));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::invalid("api_key_env", "must not be blank"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid("temperature", "must be within [0, 2]"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("timeout_secs", "must be positive"));
        }
        self.timestamp_format().map(|_| ())
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Timestamp display convention
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for an out-of-range offset or blank label.
    pub fn timestamp_format(&self) -> Result<TimestampFormat, ConfigError> {
        TimestampFormat::new(self.timestamp.offset_minutes, self.timestamp.label.clone())
    }
}
