//! Adaptive state accessors: calibration, engagement, cooldowns, and the
//! seasonal model cache
//!
//! Everything is keyed by tenant (and KPI or origin id where applicable).
//! Reads tolerate corrupt values by skipping them with a warning; writes
//! are last-write-wins.

use std::collections::HashMap;
use tracing::warn;

use crate::briefing::EngagementHistory;
use crate::config::CalibrationConfig;
use crate::detect::{SeasonalCache, SeasonalModel};
use crate::error::StoreError;
use crate::recommend::{CalibrationStat, CooldownTracker};
use crate::types::FeedbackAction;

use super::{scoped_key, EngineStore, CALIBRATION_TREE, COOLDOWN_TREE, ENGAGEMENT_TREE, SEASONAL_TREE};

impl EngineStore {
    // ------------------------------------------------------------------
    // Calibration
    // ------------------------------------------------------------------

    /// Apply one feedback event to the (tenant, origin) calibration stat.
    pub fn apply_calibration_feedback(
        &self,
        tenant: &str,
        origin_id: &str,
        action: FeedbackAction,
        cfg: &CalibrationConfig,
    ) -> Result<CalibrationStat, StoreError> {
        let tree = self.tree(CALIBRATION_TREE)?;
        let key = scoped_key(tenant, origin_id);
        let mut stat = match tree.get(&key)? {
            Some(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(tenant, origin_id, error = %e, "Corrupt calibration stat — resetting");
                CalibrationStat::new(origin_id)
            }),
            None => CalibrationStat::new(origin_id),
        };
        stat.apply(action, cfg);
        tree.insert(key, serde_json::to_vec(&stat)?)?;
        Ok(stat)
    }

    /// All calibration adjustments for a tenant, keyed by origin id.
    pub fn calibration_adjustments(&self, tenant: &str) -> Result<HashMap<String, f64>, StoreError> {
        let tree = self.tree(CALIBRATION_TREE)?;
        let prefix = format!("{tenant}:");
        let mut out = HashMap::new();
        for item in tree.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            match serde_json::from_slice::<CalibrationStat>(&value) {
                Ok(stat) => {
                    out.insert(stat.origin_id.clone(), stat.adjustment);
                }
                Err(e) => warn!(tenant, error = %e, "Skipping corrupt calibration value"),
            }
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Engagement
    // ------------------------------------------------------------------

    pub fn load_engagement(&self, tenant: &str) -> Result<EngagementHistory, StoreError> {
        let tree = self.tree(ENGAGEMENT_TREE)?;
        match tree.get(tenant.as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(tenant, error = %e, "Corrupt engagement history — starting fresh");
                EngagementHistory::default()
            })),
            None => Ok(EngagementHistory::default()),
        }
    }

    pub fn save_engagement(
        &self,
        tenant: &str,
        history: &EngagementHistory,
    ) -> Result<(), StoreError> {
        let tree = self.tree(ENGAGEMENT_TREE)?;
        tree.insert(tenant.as_bytes(), serde_json::to_vec(history)?)?;
        Ok(())
    }

    /// Founder engaged with a delivered content item: feeds the bounded
    /// personalization factor for that content type.
    pub fn record_item_engagement(
        &self,
        tenant: &str,
        content_type: crate::types::ContentType,
    ) -> Result<(), StoreError> {
        let mut history = self.load_engagement(tenant)?;
        history.mark_engaged(content_type);
        self.save_engagement(tenant, &history)
    }

    // ------------------------------------------------------------------
    // Critical cooldowns
    // ------------------------------------------------------------------

    pub fn load_cooldown(&self, tenant: &str) -> Result<CooldownTracker, StoreError> {
        let tree = self.tree(COOLDOWN_TREE)?;
        match tree.get(tenant.as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(tenant, error = %e, "Corrupt cooldown state — starting fresh");
                CooldownTracker::default()
            })),
            None => Ok(CooldownTracker::default()),
        }
    }

    pub fn save_cooldown(&self, tenant: &str, tracker: &CooldownTracker) -> Result<(), StoreError> {
        let tree = self.tree(COOLDOWN_TREE)?;
        tree.insert(tenant.as_bytes(), serde_json::to_vec(tracker)?)?;
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Seasonal model cache
// ----------------------------------------------------------------------

impl SeasonalCache for EngineStore {
    fn get_model(&self, tenant: &str, kpi: &str) -> Option<SeasonalModel> {
        let tree = self.tree(SEASONAL_TREE).ok()?;
        let bytes = tree.get(scoped_key(tenant, kpi)).ok()??;
        match serde_json::from_slice(&bytes) {
            Ok(model) => Some(model),
            Err(e) => {
                warn!(tenant, kpi, error = %e, "Corrupt cached seasonal model — refitting");
                None
            }
        }
    }

    fn put_model(&self, tenant: &str, kpi: &str, model: &SeasonalModel) {
        let Ok(tree) = self.tree(SEASONAL_TREE) else {
            return;
        };
        match serde_json::to_vec(model) {
            Ok(bytes) => {
                if let Err(e) = tree.insert(scoped_key(tenant, kpi), bytes) {
                    warn!(tenant, kpi, error = %e, "Failed to cache seasonal model");
                }
            }
            Err(e) => warn!(tenant, kpi, error = %e, "Failed to serialize seasonal model"),
        }
    }
}
