//! Generic assessment pipeline
//!
//! One loop shared by every structured flow:
//!
//! ```text
//! text → extractor → candidates ─(empty)→ DoneEmpty
//!                        │
//!                        └→ builder → requester → RawAssessment
//!                                                     │
//!                            validator/default ←──────┘
//!                                   │
//!                         stamper (once) → assemble → ResultMapping
//! ```
//!
//! The pipeline is parameterized by a [`CandidateExtractor`], a
//! [`RequestBuilder`] and a [`RecordValidator`]; everything else is shared.

use crate::assemble::{assemble, ResultMapping};
use crate::candidate::AssessmentRequest;
use crate::config::ReadinessConfig;
use crate::detector::CandidateExtractor;
use crate::error::ConfigError;
use crate::requester::{RequestBuilder, Requester, ServiceOutcome};
use crate::service::GenerativeService;
use crate::stage::{Stage, StageTracker};
use crate::stamp::{Clock, Stamper, TimestampFormat};
use crate::validate::{repair, RecordValidator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use ulid::Ulid;

/// Unique invocation identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InvocationId(pub Ulid);

impl InvocationId {
    /// Generate new invocation ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary of one invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentReport {
    /// Invocation identifier
    pub invocation: InvocationId,
    /// Flow name
    pub flow: &'static str,
    /// Stages visited, `Idle` first
    pub stages: Vec<Stage>,
    /// Candidates detected
    pub candidates: usize,
    /// Records replaced by their default
    pub defaulted: usize,
    /// Service boundary outcome
    pub service: ServiceOutcome,
}

impl AssessmentReport {
    /// Terminal stage reached
    #[must_use]
    pub fn terminal(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Idle)
    }
}

/// Mapping plus report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment<R> {
    /// Final records
    pub mapping: ResultMapping<R>,
    /// Invocation summary
    pub report: AssessmentReport,
}

/// Detect → request → validate/repair → stamp → assemble
pub struct AssessmentPipeline<E, B, V> {
    flow: &'static str,
    extractor: E,
    builder: B,
    validator: V,
    requester: Requester,
    stamper: Stamper,
}

impl<E, B, V> fmt::Debug for AssessmentPipeline<E, B, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssessmentPipeline")
            .field("flow", &self.flow)
            .field("requester", &self.requester)
            .field("stamper", &self.stamper)
            .finish_non_exhaustive()
    }
}

impl<E, B, V> AssessmentPipeline<E, B, V>
where
    E: CandidateExtractor,
    B: RequestBuilder,
    V: RecordValidator,
{
    /// Create pipeline with the default timeout, wall clock and display convention
    #[must_use]
    pub fn new(
        flow: &'static str,
        extractor: E,
        builder: B,
        validator: V,
        service: Arc<dyn GenerativeService>,
    ) -> Self {
        Self {
            flow,
            extractor,
            builder,
            validator,
            requester: Requester::new(service),
            stamper: Stamper::default(),
        }
    }

    /// Apply timeout and timestamp settings from configuration
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the timestamp settings are invalid.
    pub fn configured(mut self, config: &ReadinessConfig) -> Result<Self, ConfigError> {
        self.requester = self.requester.with_timeout(config.request_timeout());
        self.stamper = self.stamper.with_format(config.timestamp_format()?);
        Ok(self)
    }

    /// With service call timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.requester = self.requester.with_timeout(timeout);
        self
    }

    /// With clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.stamper = self.stamper.with_clock(clock);
        self
    }

    /// With timestamp display convention
    #[inline]
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.stamper = self.stamper.with_format(format);
        self
    }

    /// Flow name
    #[inline]
    #[must_use]
    pub fn flow(&self) -> &'static str {
        self.flow
    }

    /// Run and return the mapping only
    pub async fn run(&self, text: &str) -> ResultMapping<V::Record> {
        self.run_with_report(text).await.mapping
    }

    /// Run and return the mapping with its report
    ///
    /// Never fails: service and validation failures are repaired with
    /// defaults, and an input with no candidates yields an empty mapping
    /// without calling the service.
    pub async fn run_with_report(&self, text: &str) -> Assessment<V::Record> {
        let invocation = InvocationId::new();
        let span = tracing::info_span!("assessment", flow = self.flow, %invocation);
        self.execute(invocation, text).instrument(span).await
    }

    async fn execute(&self, invocation: InvocationId, text: &str) -> Assessment<V::Record> {
        let mut stages = StageTracker::new();

        enter(&mut stages, Stage::Detecting);
        let candidates = self.extractor.extract(text);
        tracing::info!(candidates = candidates.len(), text_bytes = text.len(), "detection complete");

        if candidates.is_empty() {
            enter(&mut stages, Stage::DoneEmpty);
            return Assessment {
                mapping: ResultMapping::empty(),
                report: AssessmentReport {
                    invocation,
                    flow: self.flow,
                    stages: stages.into_path(),
                    candidates: 0,
                    defaulted: 0,
                    service: ServiceOutcome::NotCalled,
                },
            };
        }

        enter(&mut stages, Stage::Requesting);
        let generation = self.builder.build(&AssessmentRequest::new(text, &candidates));
        let (raw, service) = self.requester.request(&generation).await;

        enter(&mut stages, Stage::Validating);
        let observed_at = self.stamper.observe();
        let mut defaulted = 0;
        let mapping = assemble(&candidates, &observed_at, |candidate| {
            let repaired = repair(&self.validator, candidate, &raw);
            if repaired.is_default() {
                defaulted += 1;
            }
            repaired.record
        });

        let ignored = raw
            .keys()
            .filter(|key| mapping.get(key).is_none())
            .count();
        if ignored > 0 {
            tracing::debug!(ignored, "dropping entries for keys that were not requested");
        }

        enter(&mut stages, Stage::Done);
        tracing::info!(records = mapping.len(), defaulted, "assessment complete");

        Assessment {
            report: AssessmentReport {
                invocation,
                flow: self.flow,
                stages: stages.into_path(),
                candidates: mapping.len(),
                defaulted,
                service,
            },
            mapping,
        }
    }
}

fn enter(stages: &mut StageTracker, stage: Stage) {
    if let Err(error) = stages.advance(stage) {
        tracing::error!(%error, "stage machine violated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use crate::detector::Lexicon;
    use crate::error::ServiceError;
    use crate::service::{GenerationRequest, MockGenerativeService};
    use crate::stamp::FixedClock;
    use crate::validate::RepairReason;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    struct EchoBuilder;

    impl RequestBuilder for EchoBuilder {
        fn build(&self, request: &AssessmentRequest<'_>) -> GenerationRequest {
            GenerationRequest {
                instruction: request.candidate_list(),
                source_text: request.source_text.to_string(),
                candidates: request.candidates.to_vec(),
                temperature: 0.0,
            }
        }
    }

    /// Accepts any string entry
    struct TextValidator;

    impl RecordValidator for TextValidator {
        type Record = String;

        fn validate(&self, _: &Candidate, raw: Option<&Value>) -> Result<String, RepairReason> {
            raw.and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(RepairReason::Missing)
        }

        fn default_record(&self, _: &Candidate) -> String {
            "default".to_string()
        }
    }

    fn pipeline(mock: MockGenerativeService) -> AssessmentPipeline<Lexicon, EchoBuilder, TextValidator> {
        AssessmentPipeline::new(
            "test",
            Lexicon::new(["pump", "valve"]).unwrap(),
            EchoBuilder,
            TextValidator,
            Arc::new(mock),
        )
        .with_clock(Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 7, 22, 8, 4, 0).unwrap())))
    }

    #[tokio::test]
    async fn empty_detection_skips_service() {
        let mut mock = MockGenerativeService::new();
        mock.expect_generate().times(0);

        let assessment = pipeline(mock).run_with_report("nothing relevant").await;
        assert!(assessment.mapping.is_empty());
        assert_eq!(assessment.report.terminal(), Stage::DoneEmpty);
        assert_eq!(assessment.report.service, ServiceOutcome::NotCalled);
    }

    #[tokio::test]
    async fn request_names_detected_candidates() {
        let mut mock = MockGenerativeService::new();
        mock.expect_generate()
            .withf(|req| req.instruction == "valve, pump")
            .times(1)
            .returning(|_| Ok(r#"{"valve": "ok"}"#.to_string()));

        let assessment = pipeline(mock).run_with_report("valve then pump").await;
        assert_eq!(assessment.mapping.get("valve").unwrap().record, "ok");
        assert_eq!(assessment.mapping.get("pump").unwrap().record, "default");
        assert_eq!(assessment.report.defaulted, 1);
        assert_eq!(
            assessment.report.stages,
            vec![Stage::Idle, Stage::Detecting, Stage::Requesting, Stage::Validating, Stage::Done]
        );
    }

    #[tokio::test]
    async fn service_failure_yields_complete_defaults() {
        let mut mock = MockGenerativeService::new();
        mock.expect_generate()
            .returning(|_| Err(ServiceError::Status { status: 500, body: String::new() }));

        let assessment = pipeline(mock).run_with_report("pump valve").await;
        assert_eq!(assessment.mapping.len(), 2);
        assert_eq!(assessment.report.defaulted, 2);
        assert_eq!(assessment.report.terminal(), Stage::Done);
        assert!(matches!(assessment.report.service, ServiceOutcome::Unavailable { .. }));
    }

    #[tokio::test]
    async fn extra_keys_are_dropped() {
        let mut mock = MockGenerativeService::new();
        mock.expect_generate()
            .returning(|_| Ok(r#"{"pump": "ok", "turbine": "ok"}"#.to_string()));

        let mapping = pipeline(mock).run("pump").await;
        assert_eq!(mapping.len(), 1);
        assert!(mapping.get("turbine").is_none());
    }

    #[test]
    fn invocation_ids_are_unique() {
        assert_ne!(InvocationId::new(), InvocationId::new());
    }

    #[test]
    fn configured_applies_timeout() {
        let config = ReadinessConfig::new().with_timeout_secs(7);
        let pipeline = pipeline(MockGenerativeService::new()).configured(&config).unwrap();
        assert!(format!("{pipeline:?}").contains("7s"));
        assert_eq!(pipeline.flow(), "test");
    }
}
