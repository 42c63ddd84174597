//! Recommendation Engine - three-stage pipeline with learned prioritization
//!
//! ## Stages
//!
//! 1. **`rules`**: deterministic business-rule evaluation — always runs,
//!    high fixed confidence, template-filled output.
//! 2. **`scenarios`**: pattern-matched candidates at moderate confidence.
//! 3. **`enrich`**: top-K candidates expanded through the injected
//!    enrichment capability; failures fall back to the template output.
//!
//! Candidates are ranked by the weighted priority formula with a
//! per-category diversity cap, then truncated. A critical-severity
//! cooldown suppresses repeats of the same rule inside the configured
//! window so the digest is not spammed by a persistent condition.
//! Feedback flows back through [`calibration`] as bounded adjustments.

pub mod calibration;
pub mod enrich;
pub mod ranking;
pub mod rules;
pub mod scenarios;

pub use calibration::CalibrationStat;
pub use enrich::{EnrichContext, Enrichment, FixedEnrichment, HttpEnrichment};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{RecommendConfig, RuleTables};
use crate::correlate::CorrelationReport;
use crate::types::{Anomaly, Recommendation, Severity, TenantSnapshot, Trend};

// ============================================================================
// Critical cooldown
// ============================================================================

/// Last critical-fire timestamps per origin id. Persisted per tenant so the
/// cooldown survives across scheduled runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CooldownTracker {
    last_critical: HashMap<String, DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn should_suppress(&self, origin_id: &str, now: DateTime<Utc>, hours: i64) -> bool {
        self.last_critical
            .get(origin_id)
            .is_some_and(|last| now - *last < Duration::hours(hours))
    }

    pub fn record(&mut self, origin_id: &str, now: DateTime<Utc>) {
        self.last_critical.insert(origin_id.to_string(), now);
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Inputs gathered by the pipeline for the recommendation stage.
pub struct RecommendInputs<'a> {
    pub snapshot: &'a TenantSnapshot,
    pub anomalies: &'a [Anomaly],
    pub trends: &'a [Trend],
    pub correlation: &'a CorrelationReport,
    /// Bounded calibration adjustments per origin id.
    pub calibration: &'a HashMap<String, f64>,
}

pub struct RecommendationEngine<'a> {
    cfg: &'a RecommendConfig,
    tables: &'a RuleTables,
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(cfg: &'a RecommendConfig, tables: &'a RuleTables) -> Self {
        Self { cfg, tables }
    }

    /// Run the full three-stage pipeline. The enrichment backend is
    /// optional; without one, stage (c) is a no-op and every candidate
    /// keeps its deterministic template text.
    pub async fn recommend(
        &self,
        inputs: RecommendInputs<'_>,
        cooldown: &mut CooldownTracker,
        enrichment: Option<&dyn Enrichment>,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
    ) -> Vec<Recommendation> {
        // Stage (a): deterministic rules
        let mut candidates = rules::evaluate(
            self.tables,
            inputs.snapshot,
            inputs.anomalies,
            self.cfg,
            inputs.calibration,
        );

        // Stage (b): scenario patterns
        candidates.extend(scenarios::from_patterns(
            &inputs.snapshot.tenant_id,
            &inputs.correlation.pattern_matches,
            &self.tables.patterns,
            &inputs.correlation.root_causes,
            self.cfg,
            inputs.calibration,
        ));

        // Critical cooldown: suppress a repeat of the same critical origin
        // inside the window, then record the survivors
        candidates.retain(|rec| {
            let critical = severity_of(rec) == Severity::Critical;
            if critical
                && cooldown.should_suppress(
                    &rec.origin_id,
                    now,
                    self.cfg.critical_cooldown_hours,
                )
            {
                debug!(origin = %rec.origin_id, "Critical recommendation suppressed by cooldown");
                return false;
            }
            true
        });

        let mut ranked = ranking::rank(candidates, self.cfg);

        for rec in &ranked {
            if severity_of(rec) == Severity::Critical {
                cooldown.record(&rec.origin_id, now);
            }
        }

        // Stage (c): bounded enrichment of the top of the ranking
        if let Some(backend) = enrichment {
            let context = EnrichContext {
                signals: signal_summaries(&inputs),
            };
            let enriched = enrich::enrich_top_k(
                &mut ranked,
                backend,
                &context,
                &self.cfg.enrichment,
                cancel,
            )
            .await;
            if enriched > 0 {
                info!(enriched, "Enrichment expanded top candidates");
            }
        }

        ranked
    }
}

/// A recommendation's effective severity for cooldown purposes: urgency
/// back-mapped onto the bucket the rule/pattern declared.
fn severity_of(rec: &Recommendation) -> Severity {
    if rec.urgency >= 0.9 {
        Severity::Critical
    } else if rec.urgency >= 0.7 {
        Severity::High
    } else if rec.urgency >= 0.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Short textual summaries of the run's signals for the enrichment prompt,
/// most severe anomalies first.
fn signal_summaries(inputs: &RecommendInputs<'_>) -> Vec<String> {
    let mut signals = Vec::new();
    let mut anomalies: Vec<&Anomaly> = inputs.anomalies.iter().collect();
    anomalies.sort_by_key(|a| a.severity.rank());
    for anomaly in anomalies {
        signals.push(anomaly.explanation.clone());
    }
    for trend in inputs.trends.iter().filter(|t| t.significant) {
        signals.push(format!(
            "{} {} {:+.1}% {}",
            trend.kpi_name,
            trend.timeframe,
            trend.magnitude * 100.0,
            match trend.direction {
                crate::types::TrendDirection::Up => "up",
                crate::types::TrendDirection::Down => "down",
                crate::types::TrendDirection::Flat => "flat",
                crate::types::TrendDirection::Volatile => "volatile",
            }
        ));
    }
    for cause in &inputs.correlation.root_causes {
        signals.push(cause.explanation.clone());
    }
    signals.truncate(12);
    signals
}
