//! Priority scoring, diversity capping and deterministic ordering
//!
//! priority = 100 * (w_u*urgency + w_i*impact + w_f*feasibility +
//! w_c*confidence). Default weights 0.35/0.30/0.15/0.20 — independent from
//! the content-selection formula by design. Ties break on higher
//! confidence, then id, so identical inputs always rank identically.

use crate::config::{PriorityWeights, RecommendConfig};
use crate::types::Recommendation;
use std::collections::HashMap;

/// The weighted priority formula. Monotonic non-decreasing in every
/// component; clamped to [0, 100].
pub fn priority_score(
    weights: &PriorityWeights,
    urgency: f64,
    impact: f64,
    feasibility: f64,
    confidence: f64,
) -> f64 {
    let raw = weights.urgency * urgency
        + weights.impact * impact
        + weights.feasibility * feasibility
        + weights.confidence * confidence;
    (raw * 100.0).clamp(0.0, 100.0)
}

/// Score, sort, apply the per-category diversity cap, and truncate to the
/// final cap. Returns candidates best-first.
pub fn rank(mut candidates: Vec<Recommendation>, cfg: &RecommendConfig) -> Vec<Recommendation> {
    for rec in &mut candidates {
        rec.priority_score = priority_score(
            &cfg.weights,
            rec.urgency,
            rec.impact,
            rec.feasibility,
            rec.confidence,
        );
    }

    candidates.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.id.cmp(&b.id))
    });

    // Diversity cap before final truncation
    let mut per_category: HashMap<_, usize> = HashMap::new();
    let mut selected = Vec::with_capacity(cfg.max_recommendations);
    for rec in candidates {
        let count = per_category.entry(rec.category).or_insert(0);
        if *count >= cfg.per_category_cap {
            continue;
        }
        *count += 1;
        selected.push(rec);
        if selected.len() >= cfg.max_recommendations {
            break;
        }
    }
    selected
}
