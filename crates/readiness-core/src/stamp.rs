//! Observation timestamps
//!
//! One [`ObservedAt`] is taken per invocation and shared by every record it
//! produces. The clock and display convention are injected so callers (and
//! tests) control both.

use crate::error::ConfigError;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Default display offset: +05:30
pub const DEFAULT_OFFSET_MINUTES: i32 = 330;

/// Default display label
pub const DEFAULT_ZONE_LABEL: &str = "IST";

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Fixed-offset display convention: `YYYY-MM-DD HH:MM:SS <label>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat {
    offset: FixedOffset,
    label: String,
}

impl TimestampFormat {
    /// Create format from an offset in minutes east of UTC and a zone label
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] when the offset is a day or more, or
    /// the label is blank.
    pub fn new(offset_minutes: i32, label: impl Into<String>) -> Result<Self, ConfigError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ConfigError::invalid("timestamp.label", "must not be blank"));
        }
        let offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::invalid(
                    "timestamp.offset_minutes",
                    format!("{offset_minutes} is outside (-1440, 1440)"),
                )
            })?;
        Ok(Self {
            offset,
            label: label.trim().to_string(),
        })
    }

    /// UTC with label `UTC`
    #[must_use]
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
            label: "UTC".to_string(),
        }
    }

    /// Convert an instant into an observation under this convention
    #[must_use]
    pub fn observe(&self, instant: DateTime<Utc>) -> ObservedAt {
        ObservedAt {
            instant: instant.with_timezone(&self.offset),
            label: self.label.clone(),
        }
    }

    /// Zone label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self::new(DEFAULT_OFFSET_MINUTES, DEFAULT_ZONE_LABEL).unwrap_or_else(|_| Self::utc())
    }
}

/// Observation timestamp shared by all records of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedAt {
    instant: DateTime<FixedOffset>,
    label: String,
}

impl ObservedAt {
    /// Instant in the display offset
    #[inline]
    #[must_use]
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }
}

impl fmt::Display for ObservedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.instant.format("%Y-%m-%d %H:%M:%S"), self.label)
    }
}

impl Serialize for ObservedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Takes one observation per invocation
#[derive(Clone)]
pub struct Stamper {
    clock: Arc<dyn Clock>,
    format: TimestampFormat,
}

impl fmt::Debug for Stamper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stamper")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl Default for Stamper {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), TimestampFormat::default())
    }
}

impl Stamper {
    /// Create stamper
    #[inline]
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, format: TimestampFormat) -> Self {
        Self { clock, format }
    }

    /// With clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// With display convention
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: TimestampFormat) -> Self {
        self.format = format;
        self
    }

    /// Read the clock once
    #[must_use]
    pub fn observe(&self) -> ObservedAt {
        self.format.observe(self.clock.now())
    }
}

/// Output key of the observation timestamp
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Output key for records that do not serialise as a JSON object
pub const RECORD_KEY: &str = "record";

/// A record stamped with its invocation's observation time
///
/// Serialises as the record's own fields plus `timestamp`. A record that is
/// not a JSON object (a bare number or string) is nested under `record`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<R> {
    /// The validated or defaulted record
    pub record: R,
    /// Shared observation timestamp
    pub observed_at: ObservedAt,
}

impl<R: Serialize> Serialize for Stamped<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = serde_json::to_value(&self.record).map_err(S::Error::custom)?;
        let mut map = serializer.serialize_map(None)?;
        match record {
            Value::Object(fields) => {
                for (key, value) in fields.iter().filter(|(key, _)| key.as_str() != TIMESTAMP_KEY) {
                    map.serialize_entry(key, value)?;
                }
            }
            other => map.serialize_entry(RECORD_KEY, &other)?,
        }
        map.serialize_entry(TIMESTAMP_KEY, &self.observed_at)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 22, 8, 4, 0).unwrap()
    }

    #[test]
    fn default_format_renders_ist() {
        let observed = TimestampFormat::default().observe(instant());
        assert_eq!(observed.to_string(), "2025-07-22 13:34:00 IST");
    }

    #[test]
    fn utc_format() {
        let observed = TimestampFormat::utc().observe(instant());
        assert_eq!(observed.to_string(), "2025-07-22 08:04:00 UTC");
    }

    #[test]
    fn negative_offset_crosses_midnight() {
        let format = TimestampFormat::new(-600, "HST").unwrap();
        assert_eq!(format.observe(instant()).to_string(), "2025-07-21 22:04:00 HST");
    }

    #[test]
    fn format_rejects_bad_values() {
        assert!(TimestampFormat::new(1440, "X").is_err());
        assert!(TimestampFormat::new(i32::MAX, "X").is_err());
        assert!(TimestampFormat::new(0, "  ").is_err());
    }

    #[test]
    fn stamper_uses_injected_clock() {
        let stamper = Stamper::default().with_clock(Arc::new(FixedClock(instant())));
        assert_eq!(stamper.observe(), stamper.observe());
        assert_eq!(stamper.observe().instant(), instant());
    }

    #[test]
    fn stamped_flattens_record() {
        #[derive(Debug, Clone, PartialEq, Serialize)]
        struct Score {
            trl: u8,
        }

        let stamped = Stamped {
            record: Score { trl: 4 },
            observed_at: TimestampFormat::default().observe(instant()),
        };
        assert_eq!(
            serde_json::to_value(&stamped).unwrap(),
            serde_json::json!({"trl": 4, "timestamp": "2025-07-22 13:34:00 IST"})
        );
    }

    #[test]
    fn stamped_keeps_record_field_order() {
        #[derive(Serialize)]
        struct Plan {
            objectives: &'static str,
            duration: u8,
        }

        let stamped = Stamped {
            record: Plan {
                objectives: "scale up",
                duration: 6,
            },
            observed_at: TimestampFormat::default().observe(instant()),
        };
        assert_eq!(
            serde_json::to_string(&stamped).unwrap(),
            r#"{"objectives":"scale up","duration":6,"timestamp":"2025-07-22 13:34:00 IST"}"#
        );
    }

    #[test]
    fn stamped_scalar_records_are_nested() {
        let observed_at = TimestampFormat::default().observe(instant());
        let number = Stamped {
            record: 3u8,
            observed_at: observed_at.clone(),
        };
        assert_eq!(
            serde_json::to_value(&number).unwrap(),
            serde_json::json!({"record": 3, "timestamp": "2025-07-22 13:34:00 IST"})
        );

        let missing = Stamped {
            record: Option::<String>::None,
            observed_at,
        };
        assert_eq!(
            serde_json::to_value(&missing).unwrap(),
            serde_json::json!({"record": null, "timestamp": "2025-07-22 13:34:00 IST"})
        );
    }
}
