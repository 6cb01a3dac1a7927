//! Concrete assessment flows
//!
//! Each flow supplies its own candidates, prompt and record schema to the
//! shared [`AssessmentPipeline`](crate::pipeline::AssessmentPipeline).

pub mod economics;
pub mod grant;
pub mod roadmap;
pub mod trl;

pub use economics::{
    EconomicFigure, EconomicsFlow, EconomicsInput, EconomicsPipeline, FigureSource, Metric, ECONOMIC_METRICS,
};
pub use grant::{grant_pipeline, GrantField, GrantPipeline, GrantValue, GRANT_FIELDS};
pub use roadmap::{plan_roadmap, roadmap_pipeline, PhasePlan, RoadmapInput, RoadmapPipeline, ROADMAP_PHASES};
pub use trl::{trl_lexicon, trl_pipeline, TrlPipeline, TrlRecord, TrlScore, TRL_COMPONENTS};
