//! Stage (a): deterministic business-rule evaluation
//!
//! Every rule in the versioned table is evaluated every run against the
//! latest value of its KPI. A firing rule always produces a candidate at
//! high fixed confidence with a template-filled description — no amount of
//! other signal suppresses a business-critical condition.

use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{BusinessRule, RecommendConfig, RuleTables};
use crate::types::{
    Anomaly, Recommendation, RecommendationSource, RecommendationStatus, Severity,
    TenantSnapshot,
};

/// Evaluate all rules. `calibration` maps origin ids to bounded confidence
/// adjustments learned from feedback.
pub fn evaluate(
    tables: &RuleTables,
    snapshot: &TenantSnapshot,
    anomalies: &[Anomaly],
    cfg: &RecommendConfig,
    calibration: &HashMap<String, f64>,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for rule in &tables.rules {
        let Some(series) = snapshot.get(&rule.kpi) else {
            debug!(rule = %rule.id, kpi = %rule.kpi, "Rule KPI absent from snapshot");
            continue;
        };
        let Some(last) = series.last() else {
            continue;
        };

        if !rule.op.evaluate(last.value, rule.threshold) {
            continue;
        }

        let (mut urgency, impact) = severity_components(rule.severity);
        // An active anomaly on the same KPI sharpens urgency
        if anomalies.iter().any(|a| a.kpi_name == rule.kpi) {
            urgency = (urgency + 0.1).min(1.0);
        }

        let adjustment = calibration.get(&rule.id).copied().unwrap_or(0.0);
        let confidence = (cfg.rule_confidence + adjustment).clamp(0.0, 1.0);

        info!(
            tenant = %snapshot.tenant_id,
            rule = %rule.id,
            kpi = %rule.kpi,
            value = last.value,
            threshold = rule.threshold,
            "Business rule fired"
        );

        out.push(Recommendation {
            id: Uuid::new_v4(),
            tenant_id: snapshot.tenant_id.clone(),
            category: rule.category,
            title: rule.title.clone(),
            description: fill_template(&rule.description_template, rule, last.value),
            action_items: rule.action_items.clone(),
            priority_score: 0.0, // assigned by ranking
            urgency,
            impact,
            feasibility: 0.7,
            confidence,
            source: RecommendationSource::Rule,
            status: RecommendationStatus::Pending,
            origin_id: rule.id.clone(),
            created_at: Utc::now(),
        });
    }

    out
}

/// Urgency/impact baselines per rule severity.
fn severity_components(severity: Severity) -> (f64, f64) {
    match severity {
        Severity::Critical => (1.0, 0.95),
        Severity::High => (0.8, 0.8),
        Severity::Medium => (0.6, 0.6),
        Severity::Low => (0.35, 0.45),
    }
}

/// Fill `{kpi}`, `{value}` and `{threshold}` placeholders.
fn fill_template(template: &str, rule: &BusinessRule, value: f64) -> String {
    template
        .replace("{kpi}", &rule.kpi)
        .replace("{value}", &format_number(value))
        .replace("{threshold}", &format_number(rule.threshold))
}

/// Trim trailing zeros so "6.0" renders as "6" but "4.5" stays "4.5".
fn format_number(v: f64) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KpiPoint, KpiSeries, SamplingFrequency};
    use chrono::TimeZone;

    fn snapshot_with(kpi: &str, value: f64) -> TenantSnapshot {
        let mut snap = TenantSnapshot::new("t1");
        let mut s = KpiSeries::new(kpi, SamplingFrequency::Daily);
        s.points.push(KpiPoint {
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            value,
        });
        snap.series.push(s);
        snap
    }

    #[test]
    fn runway_rule_always_fires_below_threshold() {
        let tables = RuleTables::builtin();
        let snap = snapshot_with("runway_months", 4.5);
        let recs = evaluate(&tables, &snap, &[], &RecommendConfig::default(), &HashMap::new());
        let runway = recs
            .iter()
            .find(|r| r.origin_id == "runway_below_6mo")
            .expect("runway rule fires at 4.5 months");
        assert_eq!(runway.urgency, 1.0);
        assert_eq!(runway.source, RecommendationSource::Rule);
        assert!(runway.description.contains("4.5"));
        assert!(runway.description.contains('6'));
        assert_eq!(runway.confidence, 0.9);
    }

    #[test]
    fn rule_does_not_fire_above_threshold() {
        let tables = RuleTables::builtin();
        let snap = snapshot_with("runway_months", 9.0);
        let recs = evaluate(&tables, &snap, &[], &RecommendConfig::default(), &HashMap::new());
        assert!(recs.iter().all(|r| r.origin_id != "runway_below_6mo"));
    }

    #[test]
    fn missing_kpi_is_skipped_quietly() {
        let tables = RuleTables::builtin();
        let snap = snapshot_with("unrelated", 1.0);
        let recs = evaluate(&tables, &snap, &[], &RecommendConfig::default(), &HashMap::new());
        assert!(recs.is_empty());
    }

    #[test]
    fn calibration_adjusts_confidence_clamped() {
        let tables = RuleTables::builtin();
        let snap = snapshot_with("runway_months", 4.5);
        let mut calibration = HashMap::new();
        calibration.insert("runway_below_6mo".to_string(), -0.2);
        let recs = evaluate(&tables, &snap, &[], &RecommendConfig::default(), &calibration);
        let runway = recs.iter().find(|r| r.origin_id == "runway_below_6mo").unwrap();
        assert!((runway.confidence - 0.7).abs() < 1e-9);

        calibration.insert("runway_below_6mo".to_string(), 5.0);
        let recs = evaluate(&tables, &snap, &[], &RecommendConfig::default(), &calibration);
        let runway = recs.iter().find(|r| r.origin_id == "runway_below_6mo").unwrap();
        assert_eq!(runway.confidence, 1.0);
    }

    #[test]
    fn template_number_formatting() {
        assert_eq!(format_number(6.0), "6");
        assert_eq!(format_number(4.5), "4.5");
        assert_eq!(format_number(0.08), "0.08");
    }
}
