//! Founder feedback persistence
//!
//! Stores feedback records in the "feedback" tree keyed by
//! `tenant:recommendation_id`. The origin id is denormalized from the
//! recommendation so per-rule statistics never need a join. Recording
//! feedback also drives the calibration update in the same call, keeping
//! the two stores consistent.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::CalibrationConfig;
use crate::error::StoreError;
use crate::types::{FeedbackAction, RecommendationFeedback};

use super::{scoped_key, EngineStore, FEEDBACK_TREE};

/// Per-origin aggregate over recorded feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginFeedbackStats {
    pub origin_id: String,
    pub total: usize,
    pub accepted: usize,
    pub dismissed: usize,
    pub ignored: usize,
    /// accepted / (accepted + dismissed); `None` with no rated feedback.
    pub acceptance_rate: Option<f64>,
}

impl EngineStore {
    /// Persist a feedback record and apply its calibration update.
    /// Last write wins if the same recommendation is re-rated.
    pub fn record_feedback(
        &self,
        feedback: &RecommendationFeedback,
        calibration_cfg: &CalibrationConfig,
    ) -> Result<(), StoreError> {
        let tree = self.tree(FEEDBACK_TREE)?;
        let key = scoped_key(&feedback.tenant_id, &feedback.recommendation_id.to_string());
        tree.insert(key, serde_json::to_vec(feedback)?)?;

        self.apply_calibration_feedback(
            &feedback.tenant_id,
            &feedback.origin_id,
            feedback.action,
            calibration_cfg,
        )?;
        Ok(())
    }

    /// All feedback for a tenant, oldest key order.
    pub fn load_feedback(&self, tenant: &str) -> Vec<RecommendationFeedback> {
        let Ok(tree) = self.tree(FEEDBACK_TREE) else {
            return Vec::new();
        };
        let prefix = format!("{tenant}:");
        tree.scan_prefix(prefix.as_bytes())
            .filter_map(|item| {
                let (_, value) = item.ok()?;
                match serde_json::from_slice(&value) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(tenant, error = %e, "Skipping corrupt feedback record");
                        None
                    }
                }
            })
            .collect()
    }

    /// Aggregate feedback per origin id for a tenant.
    pub fn feedback_stats(&self, tenant: &str) -> Vec<OriginFeedbackStats> {
        let mut by_origin: std::collections::BTreeMap<String, OriginFeedbackStats> =
            std::collections::BTreeMap::new();
        for record in self.load_feedback(tenant) {
            let stats = by_origin
                .entry(record.origin_id.clone())
                .or_insert_with(|| OriginFeedbackStats {
                    origin_id: record.origin_id.clone(),
                    total: 0,
                    accepted: 0,
                    dismissed: 0,
                    ignored: 0,
                    acceptance_rate: None,
                });
            stats.total += 1;
            match record.action {
                FeedbackAction::Accepted => stats.accepted += 1,
                FeedbackAction::Dismissed => stats.dismissed += 1,
                FeedbackAction::Ignored => stats.ignored += 1,
            }
        }
        let mut out: Vec<OriginFeedbackStats> = by_origin.into_values().collect();
        for stats in &mut out {
            let rated = stats.accepted + stats.dismissed;
            if rated > 0 {
                stats.acceptance_rate = Some(stats.accepted as f64 / rated as f64);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn feedback(tenant: &str, origin: &str, action: FeedbackAction) -> RecommendationFeedback {
        RecommendationFeedback {
            recommendation_id: Uuid::new_v4(),
            tenant_id: tenant.to_string(),
            origin_id: origin.to_string(),
            action,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn record_and_load() {
        let store = EngineStore::temporary().unwrap();
        let cfg = CalibrationConfig::default();
        store
            .record_feedback(&feedback("t1", "rule_a", FeedbackAction::Accepted), &cfg)
            .unwrap();
        store
            .record_feedback(&feedback("t1", "rule_a", FeedbackAction::Dismissed), &cfg)
            .unwrap();
        store
            .record_feedback(&feedback("t2", "rule_a", FeedbackAction::Accepted), &cfg)
            .unwrap();

        assert_eq!(store.load_feedback("t1").len(), 2);
        assert_eq!(store.load_feedback("t2").len(), 1);
    }

    #[test]
    fn stats_aggregate_per_origin() {
        let store = EngineStore::temporary().unwrap();
        let cfg = CalibrationConfig::default();
        for action in [
            FeedbackAction::Accepted,
            FeedbackAction::Accepted,
            FeedbackAction::Dismissed,
            FeedbackAction::Ignored,
        ] {
            store
                .record_feedback(&feedback("t1", "rule_a", action), &cfg)
                .unwrap();
        }
        let stats = store.feedback_stats("t1");
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total, 4);
        assert_eq!(stats[0].accepted, 2);
        // 2 / (2 + 1)
        assert!((stats[0].acceptance_rate.unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn feedback_drives_calibration() {
        let store = EngineStore::temporary().unwrap();
        let cfg = CalibrationConfig::default();
        store
            .record_feedback(&feedback("t1", "rule_a", FeedbackAction::Dismissed), &cfg)
            .unwrap();
        let adjustments = store.calibration_adjustments("t1").unwrap();
        assert!((adjustments["rule_a"] + cfg.step).abs() < 1e-12);
    }
}
