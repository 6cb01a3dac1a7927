//! R&D roadmap phases from lab to deployment

use crate::candidate::{AssessmentRequest, Candidate};
use crate::config::ReadinessConfig;
use crate::detector::FixedCandidates;
use crate::error::ConfigError;
use crate::pipeline::{Assessment, AssessmentPipeline};
use crate::requester::RequestBuilder;
use crate::service::{GenerationRequest, GenerativeService};
use crate::validate::{integer_in_range, non_blank_str, require_object, RecordValidator, RepairReason};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Roadmap phases in order
pub const ROADMAP_PHASES: [&str; 4] = ["lab", "pilot", "demonstration", "deployment"];

/// Objectives used when a phase plan is unusable
pub const DEFAULT_OBJECTIVES: &str = "No phase plan available; define objectives from first principles.";

/// Longest phase duration accepted, in months
pub const MAX_PHASE_MONTHS: i64 = 120;

/// Plan for one roadmap phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhasePlan {
    /// Key objectives and deliverables
    pub objectives: String,
    /// Expected duration in months
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_months: Option<u32>,
}

impl PhasePlan {
    /// Default plan
    #[must_use]
    pub fn unplanned() -> Self {
        Self {
            objectives: DEFAULT_OBJECTIVES.to_string(),
            duration_months: None,
        }
    }
}

/// Roadmap input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoadmapInput {
    /// Technical documentation
    pub technical_documentation: String,
    /// Production scale (e.g. "pilot scale")
    pub production_scale: Option<String>,
    /// Estimated cost per unit
    pub cost_per_unit: Option<String>,
    /// Estimated revenue per unit
    pub revenue_per_unit: Option<String>,
}

impl RoadmapInput {
    /// Create input from documentation
    #[must_use]
    pub fn new(technical_documentation: impl Into<String>) -> Self {
        Self {
            technical_documentation: technical_documentation.into(),
            ..Self::default()
        }
    }

    /// With production scale
    #[must_use]
    pub fn with_production_scale(mut self, scale: impl Into<String>) -> Self {
        self.production_scale = Some(scale.into());
        self
    }

    /// With unit cost and revenue
    #[must_use]
    pub fn with_unit_figures(mut self, cost: impl Into<String>, revenue: impl Into<String>) -> Self {
        self.cost_per_unit = Some(cost.into());
        self.revenue_per_unit = Some(revenue.into());
        self
    }

    /// Source text for the pipeline; empty when there is no documentation
    #[must_use]
    pub fn render(&self) -> String {
        if self.technical_documentation.trim().is_empty() {
            return String::new();
        }
        let mut text = self.technical_documentation.trim().to_string();
        let extras = [
            ("Production Scale", &self.production_scale),
            ("Cost per Unit", &self.cost_per_unit),
            ("Revenue per Unit", &self.revenue_per_unit),
        ];
        for (label, value) in extras {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                text.push_str(&format!("\n{label}: {value}"));
            }
        }
        text
    }
}

/// Prompt for per-phase roadmap planning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadmapRequestBuilder {
    temperature: f32,
}

impl Default for RoadmapRequestBuilder {
    fn default() -> Self {
        Self { temperature: 0.2 }
    }
}

impl RequestBuilder for RoadmapRequestBuilder {
    fn build(&self, request: &AssessmentRequest<'_>) -> GenerationRequest {
        let instruction = format!(
            "You are an expert in bioreactor technology and R&D planning. Based on the technical \
             documentation provided, plan each of the following roadmap phases: {}.\n\n\
             Consider the production scale, cost per unit and revenue per unit if provided.\n\
             Return ONLY a valid JSON object keyed by exactly those phases, each with \
             \"objectives\" (string) and \"durationMonths\" (integer, 1-{MAX_PHASE_MONTHS}). \
             Do not add other phases.\n\n\
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

/// Requires non-blank objectives; a duration, when given, must be 1-120 months
#[derive(Debug, Clone, Copy, Default)]
pub struct RoadmapValidator;

impl RecordValidator for RoadmapValidator {
    type Record = PhasePlan;

    fn validate(&self, _candidate: &Candidate, raw: Option<&Value>) -> Result<PhasePlan, RepairReason> {
        let object = require_object(raw)?;
        let objectives = non_blank_str("objectives", object.get("objectives"))?;
        let duration_months = match object.get("durationMonths") {
            None | Some(Value::Null) => None,
            duration => {
                let months = integer_in_range("durationMonths", duration, 1..=MAX_PHASE_MONTHS)?;
                u32::try_from(months).ok()
            }
        };
        Ok(PhasePlan {
            objectives: objectives.to_string(),
            duration_months,
        })
    }

    fn default_record(&self, _candidate: &Candidate) -> PhasePlan {
        PhasePlan::unplanned()
    }
}

/// Roadmap pipeline
pub type RoadmapPipeline = AssessmentPipeline<FixedCandidates, RoadmapRequestBuilder, RoadmapValidator>;

/// Build the roadmap pipeline
///
/// # Errors
/// Returns [`ConfigError`] when the timestamp settings are invalid.
pub fn roadmap_pipeline(
    service: Arc<dyn GenerativeService>,
    config: &ReadinessConfig,
) -> Result<RoadmapPipeline, ConfigError> {
    AssessmentPipeline::new(
        "rd_roadmap",
        FixedCandidates::new(ROADMAP_PHASES),
        RoadmapRequestBuilder {
            temperature: config.temperature,
        },
        RoadmapValidator,
        service,
    )
    .configured(config)
}

/// Run the roadmap pipeline over an input
pub async fn plan_roadmap(pipeline: &RoadmapPipeline, input: &RoadmapInput) -> Assessment<PhasePlan> {
    pipeline.run_with_report(&input.render()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(raw: Value) -> Result<PhasePlan, RepairReason> {
        RoadmapValidator.validate(&Candidate::new("pilot"), Some(&raw))
    }

    #[test]
    fn valid_phase() {
        let plan = validate(json!({"objectives": "Scale to 50 L", "durationMonths": 18})).unwrap();
        assert_eq!(plan.duration_months, Some(18));
        assert_eq!(
            serde_json::to_value(plan).unwrap(),
            json!({"objectives": "Scale to 50 L", "durationMonths": 18})
        );
    }

    #[test]
    fn duration_optional_but_bounded() {
        assert_eq!(validate(json!({"objectives": "x"})).unwrap().duration_months, None);
        assert!(validate(json!({"objectives": "x", "durationMonths": 0})).is_err());
        assert!(validate(json!({"objectives": "x", "durationMonths": 500})).is_err());
        assert!(validate(json!({"objectives": "x", "durationMonths": "soon"})).is_err());
    }

    #[test]
    fn objectives_required() {
        assert!(validate(json!({"durationMonths": 6})).is_err());
        assert_eq!(
            serde_json::to_value(PhasePlan::unplanned()).unwrap(),
            json!({"objectives": DEFAULT_OBJECTIVES})
        );
    }

    #[test]
    fn render_appends_present_context() {
        let input = RoadmapInput::new(" Stirred-tank bioreactor. ")
            .with_production_scale("pilot scale")
            .with_unit_figures("12", " ");
        assert_eq!(
            input.render(),
            "Stirred-tank bioreactor.\nProduction Scale: pilot scale\nCost per Unit: 12"
        );
    }

    #[test]
    fn render_blank_documentation_is_empty() {
        let input = RoadmapInput::new("  ").with_production_scale("industrial");
        assert!(input.render().is_empty());
    }
}
