//! Stage (c): optional enrichment behind an injected capability
//!
//! Only the top-K ranked candidates are enriched, under a per-run call
//! budget and a per-call timeout. Failure, timeout or cancellation leaves
//! the deterministic template candidate untouched — enrichment can only
//! improve a recommendation, never lose one, and a stalled call never
//! aborts the rest of the run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::EnrichmentConfig;
use crate::error::EngineError;
use crate::types::{Recommendation, RecommendationSource};

// ============================================================================
// Capability
// ============================================================================

/// Context handed to the enrichment backend alongside the candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichContext {
    /// Short summaries of this run's signals (anomalies, trends, causes).
    pub signals: Vec<String>,
}

/// Text produced by the enrichment backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedText {
    pub description: String,
    #[serde(default)]
    pub extra_actions: Vec<String>,
}

/// Injected text-generation capability. Implementations must be cheap to
/// call concurrently; the engine enforces budget and timeout.
#[async_trait]
pub trait Enrichment: Send + Sync {
    async fn enrich(
        &self,
        candidate: &Recommendation,
        context: &EnrichContext,
    ) -> Result<EnrichedText, EngineError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

// ============================================================================
// HTTP backend
// ============================================================================

/// Enrichment over a remote text-generation HTTP service.
pub struct HttpEnrichment {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct EnrichRequest<'a> {
    title: &'a str,
    description: &'a str,
    category: String,
    action_items: &'a [String],
    signals: &'a [String],
}

impl HttpEnrichment {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Enrichment for HttpEnrichment {
    async fn enrich(
        &self,
        candidate: &Recommendation,
        context: &EnrichContext,
    ) -> Result<EnrichedText, EngineError> {
        let request = EnrichRequest {
            title: &candidate.title,
            description: &candidate.description,
            category: candidate.category.to_string(),
            action_items: &candidate.action_items,
            signals: &context.signals,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::ExternalService(format!("enrichment request: {e}")))?;
        if !response.status().is_success() {
            return Err(EngineError::ExternalService(format!(
                "enrichment service returned {}",
                response.status()
            )));
        }
        response
            .json::<EnrichedText>()
            .await
            .map_err(|e| EngineError::ExternalService(format!("enrichment decode: {e}")))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Enrich the top-K candidates in place. Candidates must already be ranked
/// (best first). Returns the number of successful enrichments.
pub async fn enrich_top_k(
    candidates: &mut [Recommendation],
    backend: &dyn Enrichment,
    context: &EnrichContext,
    cfg: &EnrichmentConfig,
    cancel: &CancellationToken,
) -> usize {
    let timeout = Duration::from_millis(cfg.timeout_ms);
    let limit = cfg.top_k.min(cfg.budget_per_run);
    let mut enriched = 0usize;

    for candidate in candidates.iter_mut().take(limit) {
        if cancel.is_cancelled() {
            debug!("Enrichment cancelled — remaining candidates keep template output");
            break;
        }

        let outcome = tokio::select! {
            () = cancel.cancelled() => {
                debug!(id = %candidate.id, "Enrichment call cancelled mid-flight");
                break;
            }
            result = tokio::time::timeout(timeout, backend.enrich(candidate, context)) => result,
        };

        match outcome {
            Ok(Ok(text)) => {
                candidate.description = text.description;
                candidate
                    .action_items
                    .extend(text.extra_actions.into_iter().take(3));
                candidate.source = RecommendationSource::Enriched;
                enriched += 1;
            }
            Ok(Err(e)) => {
                warn!(backend = backend.name(), id = %candidate.id, error = %e, "Enrichment failed — keeping template candidate");
            }
            Err(_) => {
                warn!(backend = backend.name(), id = %candidate.id, timeout_ms = cfg.timeout_ms, "Enrichment timed out — keeping template candidate");
            }
        }
    }
    enriched
}

// ============================================================================
// Test fakes
// ============================================================================

/// Deterministic fake returning a canned expansion.
pub struct FixedEnrichment;

#[async_trait]
impl Enrichment for FixedEnrichment {
    async fn enrich(
        &self,
        candidate: &Recommendation,
        _context: &EnrichContext,
    ) -> Result<EnrichedText, EngineError> {
        Ok(EnrichedText {
            description: format!("{} — expanded rationale.", candidate.description),
            extra_actions: vec!["Review with the team".to_string()],
        })
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Fake that always fails, for fallback tests.
pub struct FailingEnrichment;

#[async_trait]
impl Enrichment for FailingEnrichment {
    async fn enrich(
        &self,
        _candidate: &Recommendation,
        _context: &EnrichContext,
    ) -> Result<EnrichedText, EngineError> {
        Err(EngineError::ExternalService("backend down".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Fake that never completes, for timeout tests.
pub struct HangingEnrichment;

#[async_trait]
impl Enrichment for HangingEnrichment {
    async fn enrich(
        &self,
        _candidate: &Recommendation,
        _context: &EnrichContext,
    ) -> Result<EnrichedText, EngineError> {
        std::future::pending().await
    }

    fn name(&self) -> &'static str {
        "hanging"
    }
}
