//! Grant-detail extraction
//!
//! Every field is always requested for non-blank text. Details the model
//! cannot support with the document come back as [`GrantValue::NotFound`].

use crate::candidate::{AssessmentRequest, Candidate};
use crate::config::ReadinessConfig;
use crate::detector::FixedCandidates;
use crate::error::ConfigError;
use crate::pipeline::AssessmentPipeline;
use crate::requester::RequestBuilder;
use crate::service::{GenerationRequest, GenerativeService};
use crate::validate::{non_blank_str, RecordValidator, RepairReason};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Source of the grant funding
pub const FUNDING_SOURCE: &str = "funding_source";
/// Grant identifier
pub const GRANT_ID: &str = "grant_id";
/// Total funding amount
pub const FUNDING_AMOUNT: &str = "funding_amount";
/// Grant duration
pub const DURATION: &str = "duration";
/// Institutions associated with the grant
pub const ASSOCIATED_INSTITUTIONS: &str = "associated_institutions";

/// Extracted fields in output order
pub const GRANT_FIELDS: [&str; 5] = [
    FUNDING_SOURCE,
    GRANT_ID,
    FUNDING_AMOUNT,
    DURATION,
    ASSOCIATED_INSTITUTIONS,
];

/// Typed grant detail
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GrantValue {
    /// Free-text detail
    Text(String),
    /// Monetary amount
    Amount(f64),
    /// Institution names
    List(Vec<String>),
    /// Not present in the document (serialises as `null`)
    NotFound,
}

/// One extracted grant field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantField {
    /// Field value
    pub value: GrantValue,
}

impl GrantField {
    /// Check whether the document supplied this detail
    #[inline]
    #[must_use]
    pub fn is_found(&self) -> bool {
        !matches!(self.value, GrantValue::NotFound)
    }
}

/// Prompt for grant-detail extraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrantRequestBuilder {
    temperature: f32,
}

impl Default for GrantRequestBuilder {
    fn default() -> Self {
        Self { temperature: 0.2 }
    }
}

impl RequestBuilder for GrantRequestBuilder {
    fn build(&self, request: &AssessmentRequest<'_>) -> GenerationRequest {
        let instruction = format!(
            "You are an expert at extracting grant information from documents. Analyze the \
             following text and extract these details: {}.\n\n\
             Return ONLY a valid JSON object with exactly those keys and no others:\n\
             - {FUNDING_SOURCE}: string\n\
             - {GRANT_ID}: string\n\
             - {FUNDING_AMOUNT}: number\n\
             - {DURATION}: string (e.g. \"2 years\")\n\
             - {ASSOCIATED_INSTITUTIONS}: array of strings\n\
             Use null for any detail that is not present in the text.\n\n\
             Text:",
            request.candidate_list()
        );
        GenerationRequest {
            instruction,
            source_text: request.source_text.to_string(),
            candidates: request.candidates.to_vec(),
            temperature: self.temperature,
        }
    }
}

/// Per-field type checks; anything unusable becomes `NotFound`
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantValidator;

impl RecordValidator for GrantValidator {
    type Record = GrantField;

    fn validate(&self, candidate: &Candidate, raw: Option<&Value>) -> Result<GrantField, RepairReason> {
        let value = match candidate.as_str() {
            FUNDING_AMOUNT => GrantValue::Amount(amount(raw)?),
            ASSOCIATED_INSTITUTIONS => GrantValue::List(institutions(raw)?),
            FUNDING_SOURCE => GrantValue::Text(non_blank_str(FUNDING_SOURCE, raw)?.trim().to_string()),
            GRANT_ID => GrantValue::Text(non_blank_str(GRANT_ID, raw)?.trim().to_string()),
            DURATION => GrantValue::Text(non_blank_str(DURATION, raw)?.trim().to_string()),
            _ => return Err(RepairReason::Missing),
        };
        Ok(GrantField { value })
    }

    fn default_record(&self, _candidate: &Candidate) -> GrantField {
        GrantField {
            value: GrantValue::NotFound,
        }
    }
}

/// Finite, non-negative amount; numeric strings such as `"$500,000"` are accepted
fn amount(raw: Option<&Value>) -> Result<f64, RepairReason> {
    let parsed = match raw {
        None | Some(Value::Null) => return Err(RepairReason::MissingField { field: FUNDING_AMOUNT }),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let digits: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | '_') && !c.is_whitespace())
                .collect();
            digits.parse::<f64>().ok()
        }
        Some(_) => return Err(RepairReason::WrongType { field: FUNDING_AMOUNT }),
    };
    match parsed {
        Some(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(RepairReason::OutOfRange {
            field: FUNDING_AMOUNT,
            value: raw.map(Value::to_string).unwrap_or_default(),
        }),
    }
}

/// Non-empty list of non-blank names (trimmed, order kept)
fn institutions(raw: Option<&Value>) -> Result<Vec<String>, RepairReason> {
    let field = ASSOCIATED_INSTITUTIONS;
    let items = match raw {
        None | Some(Value::Null) => return Err(RepairReason::MissingField { field }),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(RepairReason::WrongType { field }),
    };
    let names = items
        .iter()
        .map(|item| non_blank_str(field, Some(item)).map(|s| s.trim().to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    if names.is_empty() {
        return Err(RepairReason::Blank { field });
    }
    Ok(names)
}

/// Grant-detail pipeline
pub type GrantPipeline = AssessmentPipeline<FixedCandidates, GrantRequestBuilder, GrantValidator>;

/// Build the grant-detail pipeline
///
/// # Errors
/// Returns [`ConfigError`] when the timestamp settings are invalid.
pub fn grant_pipeline(
    service: Arc<dyn GenerativeService>,
    config: &ReadinessConfig,
) -> Result<GrantPipeline, ConfigError> {
    AssessmentPipeline::new(
        "grant_details",
        FixedCandidates::new(GRANT_FIELDS),
        GrantRequestBuilder {
            temperature: config.temperature,
        },
        GrantValidator,
        service,
    )
    .configured(config)
}
