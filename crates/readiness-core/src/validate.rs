//! Record validation and repair
//!
//! A [`RecordValidator`] is a total function from an untrusted raw entry to
//! either a typed record or a [`RepairReason`]. [`repair`] pairs it with the
//! validator's deterministic default so every candidate ends up with exactly
//! one valid record.

use crate::candidate::Candidate;
use crate::raw::RawAssessment;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::ops::RangeInclusive;

/// Per-record validation and default strategy
pub trait RecordValidator: Send + Sync {
    /// Validated record type
    ///
    /// Struct and map records are emitted with their fields beside the
    /// timestamp; any other shape is nested under a `record` key.
    type Record: Clone + fmt::Debug + Send + Sync + Serialize;

    /// Validate the raw entry for a candidate (`None` when the model omitted it)
    ///
    /// # Errors
    /// Returns the reason the entry cannot be used as-is.
    fn validate(&self, candidate: &Candidate, raw: Option<&Value>)
        -> Result<Self::Record, RepairReason>;

    /// Deterministic record substituted when validation fails
    fn default_record(&self, candidate: &Candidate) -> Self::Record;
}

/// Why a raw entry was replaced by its default
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RepairReason {
    /// The model returned nothing for the candidate
    Missing,
    /// The entry was not a JSON object where one was required
    NotAnObject,
    /// A required field was absent or null
    MissingField {
        /// Field name
        field: &'static str,
    },
    /// A field had the wrong JSON type
    WrongType {
        /// Field name
        field: &'static str,
    },
    /// A numeric field was outside its allowed range
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Offending value as rendered JSON
        value: String,
    },
    /// A text field was empty or whitespace
    Blank {
        /// Field name
        field: &'static str,
    },
    /// A value disagreed with what could be derived locally
    Inconsistent {
        /// Field name
        field: &'static str,
        /// Explanation
        detail: String,
    },
}

impl fmt::Display for RepairReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing entry"),
            Self::NotAnObject => f.write_str("entry is not an object"),
            Self::MissingField { field } => write!(f, "missing field '{field}'"),
            Self::WrongType { field } => write!(f, "wrong type for '{field}'"),
            Self::OutOfRange { field, value } => write!(f, "'{field}' out of range: {value}"),
            Self::Blank { field } => write!(f, "'{field}' is blank"),
            Self::Inconsistent { field, detail } => write!(f, "'{field}' inconsistent: {detail}"),
        }
    }
}

/// A record together with the repair applied to it, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired<R> {
    /// Final record
    pub record: R,
    /// Set when the record is the default
    pub repair: Option<RepairReason>,
}

impl<R> Repaired<R> {
    /// Check whether the default was substituted
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.repair.is_some()
    }
}

/// Validate one candidate's raw entry, substituting the default on failure
pub fn repair<V: RecordValidator + ?Sized>(
    validator: &V,
    candidate: &Candidate,
    raw: &RawAssessment,
) -> Repaired<V::Record> {
    match validator.validate(candidate, raw.get(candidate)) {
        Ok(record) => Repaired {
            record,
            repair: None,
        },
        Err(reason) => {
            tracing::debug!(%candidate, %reason, "substituting default record");
            Repaired {
                record: validator.default_record(candidate),
                repair: Some(reason),
            }
        }
    }
}

// Field helpers shared by validators

/// Require the entry to be present and a JSON object
///
/// # Errors
/// [`RepairReason::Missing`] or [`RepairReason::NotAnObject`].
pub fn require_object(raw: Option<&Value>) -> Result<&serde_json::Map<String, Value>, RepairReason> {
    match raw {
        None | Some(Value::Null) => Err(RepairReason::Missing),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(RepairReason::NotAnObject),
    }
}

/// First present, non-null field among `names`, reported under `names[0]`
#[must_use]
pub fn field<'a>(object: &'a serde_json::Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| object.get(*name))
        .find(|value| !value.is_null())
}

/// Interpret a JSON number as an integer in `range`
///
/// Integer-valued floats (`4.0`) are accepted; fractional, non-finite and
/// non-numeric values are not.
///
/// # Errors
/// [`RepairReason::MissingField`], [`RepairReason::WrongType`] or
/// [`RepairReason::OutOfRange`].
pub fn integer_in_range(
    field: &'static str,
    value: Option<&Value>,
    range: RangeInclusive<i64>,
) -> Result<i64, RepairReason> {
    let value = match value {
        None | Some(Value::Null) => return Err(RepairReason::MissingField { field }),
        Some(value) => value,
    };
    let Value::Number(number) = value else {
        return Err(RepairReason::WrongType { field });
    };

    let integer = if let Some(i) = number.as_i64() {
        Some(i)
    } else {
        number.as_f64().and_then(|f| {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            let fits = f.is_finite()
                && f.fract() == 0.0
                && f >= *range.start() as f64
                && f <= *range.end() as f64;
            #[allow(clippy::cast_possible_truncation)]
            fits.then_some(f as i64)
        })
    };

    match integer {
        Some(i) if range.contains(&i) => Ok(i),
        _ => Err(RepairReason::OutOfRange {
            field,
            value: value.to_string(),
        }),
    }
}

/// Require a string with non-whitespace content, returned unchanged
///
/// # Errors
/// [`RepairReason::MissingField`], [`RepairReason::WrongType`] or
/// [`RepairReason::Blank`].
pub fn non_blank_str<'a>(field: &'static str, value: Option<&'a Value>) -> Result<&'a str, RepairReason> {
    match value {
        None | Some(Value::Null) => Err(RepairReason::MissingField { field }),
        Some(Value::String(s)) if s.trim().is_empty() => Err(RepairReason::Blank { field }),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(RepairReason::WrongType { field }),
    }
}
