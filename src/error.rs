//! Engine error taxonomy
//!
//! Errors degrade, they do not abort: data-quality problems reduce
//! confidence, model-fit failures fall back to simpler tiers, external
//! service failures fall back to templates, and a malformed rule skips only
//! itself. Failures are isolated per KPI / per recommendation — the pipeline
//! coordinator records them in the run report and keeps going.

use thiserror::Error;

/// Top-level error taxonomy for the insights engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or stale series data. The affected KPI continues with
    /// reduced confidence; values are never fabricated beyond the bounded
    /// fill.
    #[error("data quality problem for {kpi}: {reason}")]
    DataQuality { kpi: String, reason: String },

    /// Insufficient history or a numerical failure while fitting the
    /// seasonal model. Detection falls back to the simpler tiers.
    #[error("model fit failed for {kpi}: {reason}")]
    ModelFit { kpi: String, reason: String },

    /// Enrichment call failed or timed out. The unenriched candidate is
    /// kept; logged, never fatal.
    #[error("external service failure: {0}")]
    ExternalService(String),

    /// A malformed rule or pattern definition. That single entry is
    /// skipped; the run continues.
    #[error("configuration problem: {0}")]
    Configuration(String),

    /// Engine state store failure.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Errors from the sled-backed engine store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store not opened")]
    NotOpened,

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("schema version mismatch: found v{0}, expected v{1}")]
    SchemaMismatch(u32, u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
