//! Pulse Engine: KPI Insights & Briefings
//!
//! Scheduled, per-tenant analytical pipeline over business-metric time
//! series, producing a ranked, length-bounded digest of findings.
//!
//! ## Architecture
//!
//! - **Anomaly Detector**: three-tier ensemble (robust z-score, cached
//!   seasonal forecast, isolation forest) behind a common capability
//! - **Trend Analyzer**: multi-timescale trends with significance testing
//! - **Correlation Engine**: lagged-causality dependency graph, root-cause
//!   tracing, multi-KPI pattern matching
//! - **Recommendation Engine**: rules → scenarios → bounded enrichment,
//!   learned prioritization with feedback calibration
//! - **Content Selector**: scored, constraint-satisfying briefing assembly

pub mod briefing;
pub mod config;
pub mod correlate;
pub mod deliver;
pub mod detect;
pub mod error;
pub mod pipeline;
pub mod recommend;
pub mod stats;
pub mod storage;
pub mod trend;
pub mod types;

// Re-export the engine configuration and rule tables
pub use config::{EngineConfig, RuleTables};

// Re-export commonly used types
pub use types::{
    Anomaly, Briefing, BriefingKind, ContentItem, CorrelationEdge, KpiGraph, KpiSeries,
    PatternMatch, Recommendation, RootCause, Severity, TenantSnapshot, Trend,
};

// Re-export the pipeline surface
pub use pipeline::{PipelineCoordinator, RunReport, TenantInputs, TenantRunResult};

// Re-export collaborator capabilities
pub use deliver::Deliver;
pub use recommend::Enrichment;

// Re-export storage
pub use error::{EngineError, StoreError};
pub use storage::EngineStore;
