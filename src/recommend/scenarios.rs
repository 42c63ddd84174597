//! Stage (b): scenario candidates from pattern matches
//!
//! Matched multi-KPI patterns (stalled growth, efficient growth, pre-churn
//! signals) become moderate-confidence candidates. Confidence scales with
//! the matched-condition fraction and the calibration adjustment learned
//! for that pattern.

use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::config::{PatternDef, RecommendConfig};
use crate::types::{
    PatternMatch, Recommendation, RecommendationSource, RecommendationStatus, RootCause,
    Severity,
};

/// Build candidates from this run's pattern matches.
pub fn from_patterns(
    tenant_id: &str,
    matches: &[PatternMatch],
    patterns: &[PatternDef],
    root_causes: &[RootCause],
    cfg: &RecommendConfig,
    calibration: &HashMap<String, f64>,
) -> Vec<Recommendation> {
    let by_name: HashMap<&str, &PatternDef> =
        patterns.iter().map(|p| (p.name.as_str(), p)).collect();

    let mut out = Vec::new();
    for m in matches.iter().filter(|m| m.matched) {
        let Some(def) = by_name.get(m.pattern_name.as_str()) else {
            debug!(pattern = %m.pattern_name, "Match without a table definition — skipped");
            continue;
        };

        let adjustment = calibration.get(&def.name).copied().unwrap_or(0.0);
        let confidence = (cfg.pattern_confidence * m.fraction + adjustment).clamp(0.0, 1.0);

        let (urgency, impact) = match def.severity {
            Severity::Critical => (0.9, 0.9),
            Severity::High => (0.75, 0.8),
            Severity::Medium => (0.55, 0.6),
            Severity::Low => (0.3, 0.5),
        };

        // Root causes touching the pattern's KPIs add explanatory context
        let mut description = def.description_template.clone();
        let related: Vec<&RootCause> = root_causes
            .iter()
            .filter(|rc| def.conditions.iter().any(|c| c.kpi == rc.anomaly_kpi))
            .collect();
        if let Some(rc) = related.first() {
            description.push_str(&format!(
                " Likely driver: {} (lag {} periods, r={:+.2}).",
                rc.cause_kpi, rc.lag, rc.correlation
            ));
        }

        out.push(Recommendation {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            category: def.category,
            title: def.title.clone(),
            description,
            action_items: def.action_items.clone(),
            priority_score: 0.0,
            urgency,
            impact,
            feasibility: 0.6,
            confidence,
            source: RecommendationSource::Pattern,
            status: RecommendationStatus::Pending,
            origin_id: def.name.clone(),
            created_at: Utc::now(),
        });
    }
    out
}
