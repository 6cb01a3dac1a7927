//! Technology Readiness Level breakdown
//!
//! Detects bioreactor components in technical documentation, asks the model
//! for a TRL (1-9) and justification for each, and repairs anything unusable
//! to the theoretical-stage default.

use crate::candidate::{AssessmentRequest, Candidate};
use crate::config::ReadinessConfig;
use crate::detector::Lexicon;
use crate::error::ConfigError;
use crate::pipeline::AssessmentPipeline;
use crate::requester::RequestBuilder;
use crate::service::{GenerationRequest, GenerativeService};
use crate::validate::{field, integer_in_range, non_blank_str, require_object, RecordValidator, RepairReason};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Component terms recognised in technical documentation
pub const TRL_COMPONENTS: [&str; 6] = ["bioreactor", "reactor", "sensor", "control system", "pump", "valve"];

/// Justification used whenever a component's assessment is unusable
pub const DEFAULT_JUSTIFICATION: &str = "No specific data found, defaulting to theoretical stage.";

// Infallible: TRL_COMPONENTS holds only non-blank escaped literals
// (pinned by `built_in_lexicon_compiles`)
static TRL_LEXICON: Lazy<Lexicon> =
    Lazy::new(|| Lexicon::new(TRL_COMPONENTS).expect("built-in component lexicon compiles"));

/// Built-in component lexicon
#[must_use]
pub fn trl_lexicon() -> &'static Lexicon {
    &TRL_LEXICON
}

/// Integer readiness level in `[1, 9]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TrlScore(u8);

impl TrlScore {
    /// Lowest level: basic principles observed
    pub const MIN: Self = Self(1);
    /// Highest level: proven in operational environment
    pub const MAX: Self = Self(9);

    /// Create score, rejecting values outside `[1, 9]`
    #[must_use]
    pub fn new(level: i64) -> Option<Self> {
        u8::try_from(level)
            .ok()
            .filter(|l| (Self::MIN.0..=Self::MAX.0).contains(l))
            .map(Self)
    }

    /// Numeric level
    #[inline]
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for TrlScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / 9", self.0)
    }
}

/// Validated assessment of one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrlRecord {
    /// Readiness level
    #[serde(rename = "trl")]
    pub score: TrlScore,
    /// Non-blank justification
    pub justification: String,
}

impl TrlRecord {
    /// Theoretical-stage default
    #[must_use]
    pub fn theoretical() -> Self {
        Self {
            score: TrlScore::MIN,
            justification: DEFAULT_JUSTIFICATION.to_string(),
        }
    }
}

/// Prompt for component TRL assessment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrlRequestBuilder {
    temperature: f32,
}

impl Default for TrlRequestBuilder {
    fn default() -> Self {
        Self { temperature: 0.2 }
    }
}

impl TrlRequestBuilder {
    /// With sampling temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

impl RequestBuilder for TrlRequestBuilder {
    fn build(&self, request: &AssessmentRequest<'_>) -> GenerationRequest {
        let instruction = format!(
            "You are a TRL assessment expert. Analyze the technical documentation provided and \
             assign a TRL (1-9) to each of the following components: {}.\n\n\
             Return ONLY a valid JSON object mapping the components you were asked to assess to \
             their TRL levels and justifications. Do not assess any other components.\n\n\
             Example Output Format:\n\
             {{\n  \"sensor\": {{\"trl\": 4, \"justification\": \"Lab validated\"}},\n  \
             \"pump\": {{\"trl\": 3, \"justification\": \"Proof of concept\"}}\n}}\n\n\
             Technical Documentation:",
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

/// Requires an integer `trl` (alias `score`) in `[1, 9]` and a non-blank justification
#[derive(Debug, Clone, Copy, Default)]
pub struct TrlValidator;

impl RecordValidator for TrlValidator {
    type Record = TrlRecord;

    fn validate(&self, _candidate: &Candidate, raw: Option<&Value>) -> Result<TrlRecord, RepairReason> {
        let object = require_object(raw)?;
        let level = integer_in_range("trl", field(object, &["trl", "score"]), 1..=9)?;
        let justification = non_blank_str("justification", object.get("justification"))?;

        let score = TrlScore::new(level).ok_or_else(|| RepairReason::OutOfRange {
            field: "trl",
            value: level.to_string(),
        })?;
        Ok(TrlRecord {
            score,
            justification: justification.to_string(),
        })
    }

    fn default_record(&self, _candidate: &Candidate) -> TrlRecord {
        TrlRecord::theoretical()
    }
}

/// TRL breakdown pipeline
pub type TrlPipeline = AssessmentPipeline<Lexicon, TrlRequestBuilder, TrlValidator>;

/// Build the TRL pipeline over the built-in lexicon
///
/// # Errors
/// Returns [`ConfigError`] when the timestamp settings are invalid.
pub fn trl_pipeline(
    service: Arc<dyn GenerativeService>,
    config: &ReadinessConfig,
) -> Result<TrlPipeline, ConfigError> {
    AssessmentPipeline::new(
        "trl_breakdown",
        trl_lexicon().clone(),
        TrlRequestBuilder::default().with_temperature(config.temperature),
        TrlValidator,
        service,
    )
    .configured(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(raw: Value) -> Result<TrlRecord, RepairReason> {
        TrlValidator.validate(&Candidate::new("valve"), Some(&raw))
    }

    #[test]
    fn score_bounds() {
        assert_eq!(TrlScore::new(1), Some(TrlScore::MIN));
        assert_eq!(TrlScore::new(9).map(TrlScore::get), Some(9));
        assert_eq!(TrlScore::new(0), None);
        assert_eq!(TrlScore::new(10), None);
        assert_eq!(TrlScore::new(-1), None);
        assert_eq!(TrlScore::new(300), None);
        assert_eq!(TrlScore::new(4).unwrap().to_string(), "4 / 9");
    }

    #[test]
    fn valid_entry_carried_through() {
        let record = validate(json!({"trl": 4, "justification": "Lab validated"})).unwrap();
        assert_eq!(record.score.get(), 4);
        assert_eq!(record.justification, "Lab validated");
    }

    #[test]
    fn score_alias_accepted() {
        let record = validate(json!({"score": 7, "justification": "Pilot plant"})).unwrap();
        assert_eq!(record.score.get(), 7);
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(matches!(
            validate(json!({"score": 15, "justification": "x"})),
            Err(RepairReason::OutOfRange { field: "trl", .. })
        ));
    }

    #[test]
    fn justification_required() {
        assert_eq!(
            validate(json!({"trl": 5})),
            Err(RepairReason::MissingField { field: "justification" })
        );
        assert_eq!(
            validate(json!({"trl": 5, "justification": " "})),
            Err(RepairReason::Blank { field: "justification" })
        );
    }

    #[test]
    fn wrong_shapes_rejected() {
        assert_eq!(validate(json!(4)), Err(RepairReason::NotAnObject));
        assert_eq!(
            validate(json!({"trl": "4", "justification": "x"})),
            Err(RepairReason::WrongType { field: "trl" })
        );
        assert_eq!(
            TrlValidator.validate(&Candidate::new("pump"), None),
            Err(RepairReason::Missing)
        );
    }

    #[test]
    fn prompt_enumerates_candidates_only() {
        let candidates = vec![Candidate::new("sensor"), Candidate::new("pump")];
        let request = TrlRequestBuilder::default().build(&AssessmentRequest::new("doc", &candidates));

        assert!(request.instruction.contains("components: sensor, pump."));
        assert!(request.instruction.contains("Do not assess any other components."));
        assert_eq!(request.candidates, candidates);
        assert_eq!(request.source_text, "doc");
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn record_serializes_as_dashboard_shape() {
        assert_eq!(
            serde_json::to_value(TrlRecord::theoretical()).unwrap(),
            json!({"trl": 1, "justification": DEFAULT_JUSTIFICATION})
        );
    }

    #[test]
    fn built_in_lexicon() {
        assert_eq!(trl_lexicon().terms().len(), 6);
    }

    #[test]
    fn built_in_lexicon_compiles() {
        let lexicon = Lexicon::new(TRL_COMPONENTS).unwrap();
        assert_eq!(lexicon.terms(), trl_lexicon().terms());
        for term in TRL_COMPONENTS {
            assert!(lexicon.contains(&Candidate::new(term)));
            assert_eq!(lexicon.detect(term), vec![Candidate::new(term)]);
        }
    }
}
