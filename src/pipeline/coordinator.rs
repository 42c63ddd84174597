//! Pipeline coordinator: serialized stages per tenant, tenants in parallel
//!
//! One KPI's failure never blocks the others: detection errors degrade that
//! KPI, add a data-quality note and move on. A briefing is always produced,
//! possibly with fewer sections and explicit notes, rather than failing the
//! run. All adaptive state (seasonal models, calibration, engagement,
//! cooldowns) lives in the engine store keyed by tenant.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::briefing::{self, BriefingInputs};
use crate::config::{EngineConfig, RuleTables};
use crate::correlate::{CorrelationEngine, CorrelationReport};
use crate::deliver::Deliver;
use crate::detect::{DetectContext, DetectorEnsemble};
use crate::error::EngineError;
use crate::recommend::{Enrichment, RecommendInputs, RecommendationEngine};
use crate::storage::EngineStore;
use crate::trend::TrendAnalyzer;
use crate::types::{
    ActivityFeeds, Anomaly, Briefing, BriefingKind, FounderProfile, Recommendation,
    TenantSnapshot, Timeframe, Trend,
};

// ============================================================================
// Inputs / outputs
// ============================================================================

/// Everything the engine consumes for one tenant run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TenantInputs {
    pub snapshot: TenantSnapshot,
    #[serde(default)]
    pub feeds: ActivityFeeds,
    #[serde(default)]
    pub profile: FounderProfile,
    #[serde(default)]
    pub kind: BriefingKind,
}

/// Per-run summary for logging and observability.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunReport {
    pub tenant_id: String,
    pub run_index: u64,
    pub anomalies: usize,
    pub trends: usize,
    pub edges: usize,
    pub root_causes: usize,
    pub patterns_matched: usize,
    pub recommendations: usize,
    pub briefing_items: usize,
    /// KPIs skipped or degraded by data-quality / model-fit failures.
    pub degraded_kpis: Vec<String>,
    pub notes: Vec<String>,
    pub elapsed_ms: u64,
}

/// Full output of one tenant run.
pub struct TenantRunResult {
    pub report: RunReport,
    pub briefing: Briefing,
    pub anomalies: Vec<Anomaly>,
    pub trends: Vec<Trend>,
    pub correlation: CorrelationReport,
    pub recommendations: Vec<Recommendation>,
}

// ============================================================================
// Coordinator
// ============================================================================

/// Owns the immutable run configuration and the shared collaborators.
pub struct PipelineCoordinator {
    config: EngineConfig,
    tables: Arc<RuleTables>,
    store: EngineStore,
    enrichment: Option<Arc<dyn Enrichment>>,
    delivery: Arc<dyn Deliver>,
}

impl PipelineCoordinator {
    pub fn new(
        config: EngineConfig,
        tables: Arc<RuleTables>,
        store: EngineStore,
        enrichment: Option<Arc<dyn Enrichment>>,
        delivery: Arc<dyn Deliver>,
    ) -> Self {
        Self {
            config,
            tables,
            store,
            enrichment,
            delivery,
        }
    }

    /// Run every tenant concurrently; stages inside each tenant stay
    /// strictly serialized. Panics or store failures in one tenant never
    /// affect the others.
    pub async fn run_all(
        self: &Arc<Self>,
        tenants: Vec<TenantInputs>,
        run_index: u64,
        cancel: &CancellationToken,
    ) -> Vec<RunReport> {
        let mut set = JoinSet::new();
        for inputs in tenants {
            let coordinator = Arc::clone(self);
            let cancel = cancel.child_token();
            set.spawn(async move {
                coordinator
                    .run_tenant(inputs, run_index, &cancel)
                    .await
                    .map(|r| r.report)
            });
        }

        let mut reports = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(e)) => error!(error = %e, "Tenant run failed"),
                Err(e) => error!(error = %e, "Tenant task panicked"),
            }
        }
        reports.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        reports
    }

    /// The serialized per-tenant pipeline.
    pub async fn run_tenant(
        &self,
        inputs: TenantInputs,
        run_index: u64,
        cancel: &CancellationToken,
    ) -> Result<TenantRunResult, EngineError> {
        let started = Instant::now();
        let tenant_id = inputs.snapshot.tenant_id.clone();
        let now = Utc::now();
        let mut degraded_kpis = Vec::new();
        let mut notes = Vec::new();

        // Sensitivity profile scales the detection surface for this tenant
        let config = self.config.clone().with_sensitivity(inputs.profile.sensitivity);

        // Stage 1: anomaly detection, isolated per KPI
        let ensemble = DetectorEnsemble::new(&config.detection);
        let ctx = DetectContext {
            tenant_id: &tenant_id,
            run_index,
            cache: &self.store,
        };
        let mut anomalies: Vec<Anomaly> = Vec::new();
        for series in &inputs.snapshot.series {
            match ensemble.detect(series, &ctx) {
                Ok(Some(anomaly)) => anomalies.push(anomaly),
                Ok(None) => {}
                Err(e) => {
                    warn!(tenant = %tenant_id, kpi = %series.kpi_name, error = %e, "Detection degraded for KPI");
                    degraded_kpis.push(series.kpi_name.clone());
                    notes.push(format!("{}: {e}", series.kpi_name));
                }
            }
        }

        // Stage 2: multi-timescale trends (full recompute, no mutation)
        let analyzer = TrendAnalyzer::new(&config.trend);
        let mut trends: Vec<Trend> = Vec::new();
        for series in &inputs.snapshot.series {
            for timeframe in [Timeframe::WoW, Timeframe::MoM, Timeframe::QoQ, Timeframe::YoY] {
                trends.push(analyzer.analyze(series, timeframe));
            }
        }
        let wow_trends: Vec<Trend> = trends
            .iter()
            .filter(|t| t.timeframe == Timeframe::WoW)
            .cloned()
            .collect();

        // Stage 3: correlation graph, root causes, patterns, joint pass
        let correlation = CorrelationEngine::new(&config.correlation, &config.detection.isolation)
            .analyze(&inputs.snapshot, &anomalies, &wow_trends, &self.tables.patterns);

        // Stage 4: recommendations with calibration, cooldown, enrichment
        let calibration = self.store.calibration_adjustments(&tenant_id)?;
        let mut cooldown = self.store.load_cooldown(&tenant_id)?;
        let engine = RecommendationEngine::new(&config.recommend, self.tables.as_ref());
        let recommendations = engine
            .recommend(
                RecommendInputs {
                    snapshot: &inputs.snapshot,
                    anomalies: &anomalies,
                    trends: &trends,
                    correlation: &correlation,
                    calibration: &calibration,
                },
                &mut cooldown,
                self.enrichment.as_deref(),
                cancel,
                now,
            )
            .await;
        self.store.save_cooldown(&tenant_id, &cooldown)?;

        // Stage 5: content selection
        let engagement = self.store.load_engagement(&tenant_id)?;
        let briefing = briefing::assemble(
            &config.briefing,
            BriefingInputs {
                tenant_id: &tenant_id,
                kind: inputs.kind,
                anomalies: &anomalies,
                trends: &trends,
                root_causes: &correlation.root_causes,
                recommendations: &recommendations,
                feeds: &inputs.feeds,
                profile: &inputs.profile,
                engagement: &engagement,
                data_quality_notes: notes.clone(),
            },
            now,
        );

        // Stage 6: delivery (non-fatal) and engagement bookkeeping
        if let Err(e) = self.delivery.deliver(&briefing).await {
            warn!(tenant = %tenant_id, sink = self.delivery.name(), error = %e, "Delivery failed — briefing kept in run output");
            notes.push(format!("delivery failed: {e}"));
        }
        let mut engagement = engagement;
        for section in &briefing.sections {
            for item in &section.items {
                engagement.record(item.content_type, false);
            }
        }
        self.store.save_engagement(&tenant_id, &engagement)?;
        self.store.flush()?;

        let report = RunReport {
            tenant_id: tenant_id.clone(),
            run_index,
            anomalies: anomalies.len(),
            trends: trends.len(),
            edges: correlation.graph.edges.len(),
            root_causes: correlation.root_causes.len(),
            patterns_matched: correlation
                .pattern_matches
                .iter()
                .filter(|m| m.matched)
                .count(),
            recommendations: recommendations.len(),
            briefing_items: briefing.total_items(),
            degraded_kpis,
            notes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            tenant = %tenant_id,
            run = run_index,
            anomalies = report.anomalies,
            edges = report.edges,
            recommendations = report.recommendations,
            briefing_items = report.briefing_items,
            degraded = report.degraded_kpis.len(),
            elapsed_ms = report.elapsed_ms,
            "Tenant run complete"
        );

        Ok(TenantRunResult {
            report,
            briefing,
            anomalies,
            trends,
            correlation,
            recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deliver::CollectingDelivery;
    use crate::types::{KpiPoint, KpiSeries, SamplingFrequency};
    use chrono::TimeZone;

    fn daily_series(name: &str, values: &[f64]) -> KpiSeries {
        let mut s = KpiSeries::new(name, SamplingFrequency::Daily);
        for (i, &v) in values.iter().enumerate() {
            s.points.push(KpiPoint {
                timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 86_400, 0).unwrap(),
                value: v,
            });
        }
        s
    }

    fn coordinator(delivery: Arc<dyn Deliver>) -> Arc<PipelineCoordinator> {
        Arc::new(PipelineCoordinator::new(
            EngineConfig::default(),
            Arc::new(RuleTables::builtin()),
            EngineStore::temporary().unwrap(),
            None,
            delivery,
        ))
    }

    fn growth_tenant(id: &str) -> TenantInputs {
        let mut snapshot = TenantSnapshot::new(id);
        let mrr: Vec<f64> = (0..90)
            .map(|i| 1000.0 * (1.0_f64 + 0.02 / 30.0).powi(i) + (i % 7) as f64 * 5.0)
            .collect();
        snapshot.series.push(daily_series("mrr", &mrr));
        snapshot
            .series
            .push(daily_series("runway_months", &vec![4.5; 90]));
        TenantInputs {
            snapshot,
            feeds: ActivityFeeds::default(),
            profile: FounderProfile::default(),
            kind: BriefingKind::StartOfPeriod,
        }
    }

    #[tokio::test]
    async fn run_produces_briefing_and_report() {
        let sink = Arc::new(CollectingDelivery::default());
        let coordinator = coordinator(sink.clone());
        let result = coordinator
            .run_tenant(growth_tenant("t1"), 0, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.report.tenant_id, "t1");
        // Runway rule fires from the constant 4.5-month series
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.origin_id == "runway_below_6mo"));
        assert!(result.briefing.total_items() > 0);
        assert_eq!(sink.briefings.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn degraded_kpi_does_not_block_others() {
        let sink = Arc::new(CollectingDelivery::default());
        let coordinator = coordinator(sink);
        let mut inputs = growth_tenant("t1");
        // A 2-point series fails detection but must not sink the run
        inputs
            .snapshot
            .series
            .push(daily_series("broken", &[1.0, 2.0]));

        let result = coordinator
            .run_tenant(inputs, 0, &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.report.degraded_kpis.contains(&"broken".to_string()));
        assert!(!result.report.notes.is_empty());
        assert!(result.briefing.data_quality_notes.iter().any(|n| n.contains("broken")));
        // The healthy series still produced output
        assert!(result.report.recommendations > 0);
    }

    #[tokio::test]
    async fn tenants_run_in_parallel_and_all_report() {
        let sink = Arc::new(CollectingDelivery::default());
        let coordinator = coordinator(sink.clone());
        let tenants = vec![growth_tenant("alpha"), growth_tenant("beta"), growth_tenant("gamma")];
        let reports = coordinator
            .run_all(tenants, 0, &CancellationToken::new())
            .await;
        assert_eq!(reports.len(), 3);
        let ids: Vec<&str> = reports.iter().map(|r| r.tenant_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta", "gamma"]);
        assert_eq!(sink.briefings.lock().unwrap().len(), 3);
    }
}
