//! Engine Configuration Module
//!
//! Provides the engine configuration and the versioned rule/pattern tables,
//! loaded from TOML files. Everything is loaded once at run start into
//! immutable values and passed explicitly through the pipeline stages — no
//! ambient global state — so runs are reproducible and every stage is
//! independently testable with injected configurations.
//!
//! ## Loading Order
//!
//! 1. `PULSE_CONFIG` environment variable (path to TOML file)
//! 2. `engine_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Rule and pattern tables load the same way from `PULSE_RULES` /
//! `rules.toml`, with built-in tables as the fallback. A malformed table
//! entry is skipped with a warning; it never fails the run.

mod engine_config;
mod rules;

pub use engine_config::{
    BriefingConfig, CalibrationConfig, ContentWeights, CorrelationConfig, DetectionConfig,
    EngagementConfig, EngineConfig, EnrichmentConfig, IsolationConfig, PerTypeCaps,
    PriorityWeights, RecommendConfig, SeasonalConfig, SeverityBuckets, StaticThreshold,
    TierWeights, TrendConfig,
};
pub use rules::{BusinessRule, ComparisonOp, PatternCondition, PatternDef, RuleTables};
