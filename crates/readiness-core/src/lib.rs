//! Readiness Core - structured assessments over an untrusted model
//!
//! Every flow runs the same pipeline:
//! - Detect candidates in the input text (lexicon or fixed fields)
//! - Ask the generative service for exactly those candidates
//! - Validate each raw entry, repairing anything unusable with a default
//! - Stamp all records with one observation timestamp
//! - Assemble one record per candidate, in detection order
//!
//! # Example
//!
//! ```rust,ignore
//! use readiness_core::prelude::*;
//!
//! # async fn example(service: std::sync::Arc<dyn GenerativeService>) -> Result<(), ConfigError> {
//! let pipeline = trl_pipeline(service, &ReadinessConfig::default())?;
//! let mapping = pipeline.run("The bioreactor uses a pH sensor.").await;
//!
//! for (component, record) in &mapping {
//!     println!("{component}: {}", record.record.score);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod assemble;
pub mod candidate;
pub mod config;
pub mod detector;
pub mod error;
pub mod flows;
pub mod pipeline;
pub mod raw;
pub mod requester;
pub mod service;
pub mod stage;
pub mod stamp;
pub mod validate;

// Re-exports for convenience
pub use assemble::{assemble, ResultMapping};
pub use candidate::{AssessmentRequest, Candidate};
pub use config::{ReadinessConfig, TimestampConfig};
pub use detector::{CandidateExtractor, FixedCandidates, Lexicon};
pub use error::{ConfigError, InputError, LexiconError, ServiceError, StageError};
pub use pipeline::{Assessment, AssessmentPipeline, AssessmentReport, InvocationId};
pub use raw::RawAssessment;
pub use requester::{RequestBuilder, Requester, ServiceOutcome};
pub use service::{GenerationRequest, GenerativeService};
pub use stage::{allowed_transitions, validate_transition, Stage, StageTracker};
pub use stamp::{Clock, FixedClock, ObservedAt, Stamped, Stamper, SystemClock, TimestampFormat};
pub use validate::{repair, RecordValidator, RepairReason, Repaired};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running assessment flows
    pub use crate::flows::{
        grant_pipeline, plan_roadmap, roadmap_pipeline, trl_pipeline, EconomicsFlow, EconomicsInput, RoadmapInput,
    };
    pub use crate::{
        Assessment, AssessmentPipeline, Clock, ConfigError, GenerativeService, ReadinessConfig, ResultMapping,
        ServiceError, Stage,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
