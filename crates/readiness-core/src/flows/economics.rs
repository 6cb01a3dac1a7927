//! Unit-economics simulation
//!
//! The model is asked for unit cost, ROI and payback period, but each figure
//! can be derived from the inputs. A model figure is kept only when it is
//! well formatted and agrees with the local computation; anything else falls
//! back to the computed figure.

use crate::candidate::{AssessmentRequest, Candidate};
use crate::config::ReadinessConfig;
use crate::detector::FixedCandidates;
use crate::error::{ConfigError, InputError};
use crate::pipeline::{Assessment, AssessmentPipeline};
use crate::requester::RequestBuilder;
use crate::service::{GenerationRequest, GenerativeService};
use crate::stamp::{Clock, SystemClock, TimestampFormat};
use crate::validate::{RecordValidator, RepairReason};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Unit cost key
pub const UNIT_COST: &str = "unit_cost";
/// Return-on-investment key
pub const ROI: &str = "roi";
/// Payback-period key
pub const PAYBACK_PERIOD: &str = "payback_period";

/// Figures in output order
pub const ECONOMIC_METRICS: [&str; 3] = [UNIT_COST, ROI, PAYBACK_PERIOD];

/// Largest accepted disagreement between model and local figures
pub const AGREEMENT_TOLERANCE: f64 = 0.01;

/// Display text for an undefined figure
pub const NOT_APPLICABLE: &str = "n/a";

/// Economic figure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Cost per unit
    UnitCost,
    /// `(revenue - cost) / cost * 100`
    Roi,
    /// Investment over annual return, in years
    PaybackPeriod,
}

impl Metric {
    /// Look up by output key
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            UNIT_COST => Some(Self::UnitCost),
            ROI => Some(Self::Roi),
            PAYBACK_PERIOD => Some(Self::PaybackPeriod),
            _ => None,
        }
    }

    /// Output key
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::UnitCost => UNIT_COST,
            Self::Roi => ROI,
            Self::PaybackPeriod => PAYBACK_PERIOD,
        }
    }

    fn render(self, value: Option<f64>) -> String {
        match (self, value) {
            (_, None) => NOT_APPLICABLE.to_string(),
            (Self::UnitCost, Some(v)) => format!("{v:.2}"),
            (Self::Roi, Some(v)) => format!("{v:.2}%"),
            (Self::PaybackPeriod, Some(v)) => format!("{v:.2} years"),
        }
    }

    /// Parse a model value: a bare number, or a string in this metric's format
    fn parse(self, raw: &Value) -> Result<Option<f64>, RepairReason> {
        let field = self.key();
        let text = match raw {
            Value::Number(n) => {
                return n
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .map(Some)
                    .ok_or(RepairReason::WrongType { field })
            }
            Value::String(s) => s.trim(),
            _ => return Err(RepairReason::WrongType { field }),
        };
        if text.eq_ignore_ascii_case(NOT_APPLICABLE) {
            return Ok(None);
        }
        let number = match self {
            Self::UnitCost => text.trim_start_matches('$'),
            Self::Roi => text.strip_suffix('%').unwrap_or(text),
            Self::PaybackPeriod => text
                .strip_suffix("years")
                .or_else(|| text.strip_suffix("year"))
                .unwrap_or(text),
        };
        number
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| RepairReason::Inconsistent {
                field,
                detail: format!("unrecognised format {text:?}"),
            })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Where a figure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureSource {
    /// Accepted from the model
    Model,
    /// Derived from the inputs
    Computed,
}

/// One economic figure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomicFigure {
    /// Numeric value; `None` when undefined
    pub value: Option<f64>,
    /// Rendered value (`"50.00%"`, `"2.00 years"`, `"n/a"`)
    pub display: String,
    /// Origin of the figure
    pub source: FigureSource,
}

/// Simulation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EconomicsInput {
    production_scale: f64,
    cost_per_unit: f64,
    revenue_per_unit: f64,
}

impl EconomicsInput {
    /// Create input; every parameter must be finite and non-negative
    ///
    /// # Errors
    /// Returns [`InputError::InvalidNumber`] for the first offending parameter.
    pub fn new(production_scale: f64, cost_per_unit: f64, revenue_per_unit: f64) -> Result<Self, InputError> {
        for (field, value) in [
            ("production_scale", production_scale),
            ("cost_per_unit", cost_per_unit),
            ("revenue_per_unit", revenue_per_unit),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(InputError::InvalidNumber { field, value });
            }
        }
        Ok(Self {
            production_scale,
            cost_per_unit,
            revenue_per_unit,
        })
    }

    /// Production scale in units
    #[inline]
    #[must_use]
    pub fn production_scale(&self) -> f64 {
        self.production_scale
    }

    /// Total investment: cost per unit times scale
    #[must_use]
    pub fn investment(&self) -> f64 {
        self.cost_per_unit * self.production_scale
    }

    /// Annual return: margin per unit times scale
    #[must_use]
    pub fn annual_return(&self) -> f64 {
        (self.revenue_per_unit - self.cost_per_unit) * self.production_scale
    }

    /// Locally computed value of a metric; `None` when undefined or not finite
    #[must_use]
    pub fn compute(&self, metric: Metric) -> Option<f64> {
        let value = match metric {
            Metric::UnitCost => Some(self.cost_per_unit),
            Metric::Roi => (self.cost_per_unit > 0.0)
                .then(|| (self.revenue_per_unit - self.cost_per_unit) / self.cost_per_unit * 100.0),
            Metric::PaybackPeriod => {
                let annual = self.annual_return();
                (annual > 0.0).then(|| self.investment() / annual)
            }
        };
        value.filter(|v| v.is_finite())
    }

    /// Locally computed figure
    #[must_use]
    pub fn figure(&self, metric: Metric) -> EconomicFigure {
        let value = self.compute(metric);
        EconomicFigure {
            value,
            display: metric.render(value),
            source: FigureSource::Computed,
        }
    }

    /// Parameter block sent as source text
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "Production Scale: {}\nCost Per Unit: {}\nRevenue Per Unit: {}",
            self.production_scale, self.cost_per_unit, self.revenue_per_unit
        )
    }
}

/// Prompt for the financial calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EconomicsRequestBuilder {
    temperature: f32,
}

impl Default for EconomicsRequestBuilder {
    fn default() -> Self {
        Self { temperature: 0.2 }
    }
}

impl RequestBuilder for EconomicsRequestBuilder {
    fn build(&self, request: &AssessmentRequest<'_>) -> GenerationRequest {
        let instruction = format!(
            "You are a financial analyst. Based on the provided scale parameters, calculate: {}.\n\n\
             - The unit cost is the same as the input cost per unit.\n\
             - ROI is ((Revenue - Cost) / Cost) * 100.\n\
             - Total investment is cost per unit * production scale.\n\
             - Annual return is (revenue per unit - cost per unit) * production scale.\n\
             - Payback period is total investment / annual return.\n\n\
             Return ONLY a JSON object with {UNIT_COST} as a number, {ROI} as a percentage string \
             with two decimals (e.g. \"50.00%\") and {PAYBACK_PERIOD} as a string with two decimals \
             followed by \" years\" (e.g. \"2.00 years\").\n\n\
             Parameters:",
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

/// Cross-checks model figures against the locally computed ones
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EconomicsValidator {
    input: EconomicsInput,
}

impl EconomicsValidator {
    /// Create validator for one set of parameters
    #[must_use]
    pub fn new(input: EconomicsInput) -> Self {
        Self { input }
    }
}

impl RecordValidator for EconomicsValidator {
    type Record = EconomicFigure;

    fn validate(&self, candidate: &Candidate, raw: Option<&Value>) -> Result<EconomicFigure, RepairReason> {
        let metric = Metric::from_key(candidate.as_str()).ok_or(RepairReason::Missing)?;
        let field = metric.key();
        let raw = match raw {
            None | Some(Value::Null) => return Err(RepairReason::Missing),
            Some(raw) => raw,
        };
        let claimed = metric.parse(raw)?;
        let expected = self.input.compute(metric);

        match (claimed, expected) {
            (Some(claimed), Some(expected)) if (claimed - expected).abs() <= AGREEMENT_TOLERANCE => {
                Ok(EconomicFigure {
                    value: Some(claimed),
                    display: metric.render(Some(claimed)),
                    source: FigureSource::Model,
                })
            }
            (None, None) => Ok(EconomicFigure {
                value: None,
                display: NOT_APPLICABLE.to_string(),
                source: FigureSource::Model,
            }),
            _ => Err(RepairReason::Inconsistent {
                field,
                detail: format!("model gave {raw}, expected {}", metric.render(expected)),
            }),
        }
    }

    fn default_record(&self, candidate: &Candidate) -> EconomicFigure {
        match Metric::from_key(candidate.as_str()) {
            Some(metric) => self.input.figure(metric),
            None => EconomicFigure {
                value: None,
                display: NOT_APPLICABLE.to_string(),
                source: FigureSource::Computed,
            },
        }
    }
}

/// Unit-economics pipeline for one set of parameters
pub type EconomicsPipeline = AssessmentPipeline<FixedCandidates, EconomicsRequestBuilder, EconomicsValidator>;

/// Builds an [`EconomicsPipeline`] per simulation
///
/// The validator depends on the parameters, so each call to
/// [`simulate`](Self::simulate) assembles a fresh pipeline sharing the
/// service, clock and settings held here.
pub struct EconomicsFlow {
    service: Arc<dyn GenerativeService>,
    clock: Arc<dyn Clock>,
    format: TimestampFormat,
    timeout: Duration,
    temperature: f32,
}

impl fmt::Debug for EconomicsFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EconomicsFlow")
            .field("format", &self.format)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl EconomicsFlow {
    /// Create flow from configuration
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the timestamp settings are invalid.
    pub fn new(service: Arc<dyn GenerativeService>, config: &ReadinessConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            service,
            clock: Arc::new(SystemClock),
            format: config.timestamp_format()?,
            timeout: config.request_timeout(),
            temperature: config.temperature,
        })
    }

    /// With clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Pipeline for one set of parameters
    #[must_use]
    pub fn pipeline(&self, input: EconomicsInput) -> EconomicsPipeline {
        AssessmentPipeline::new(
            "unit_economics",
            FixedCandidates::new(ECONOMIC_METRICS),
            EconomicsRequestBuilder {
                temperature: self.temperature,
            },
            EconomicsValidator::new(input),
            Arc::clone(&self.service),
        )
        .with_timeout(self.timeout)
        .with_timestamp_format(self.format.clone())
        .with_clock(Arc::clone(&self.clock))
    }

    /// Run a simulation
    pub async fn simulate(&self, input: EconomicsInput) -> Assessment<EconomicFigure> {
        self.pipeline(input).run_with_report(&input.render()).await
    }
}
