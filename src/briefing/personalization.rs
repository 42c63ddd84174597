//! Engagement-based personalization
//!
//! Per-(tenant, content type) engagement history multiplies content scores
//! by a bounded factor. Until enough history accumulates the factor stays
//! neutral, so new tenants get the unpersonalized ranking.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::EngagementConfig;
use crate::types::ContentType;

/// Counters for one content type.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EngagementStat {
    /// Items of this type shown in delivered briefings.
    pub shown: u32,
    /// Items the founder engaged with (opened, acted on).
    pub engaged: u32,
}

/// Per-tenant engagement history across content types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementHistory {
    stats: HashMap<ContentType, EngagementStat>,
}

impl EngagementHistory {
    /// Bounded multiplier for a content type. Neutral (1.0) below the
    /// minimum history; otherwise linear in the engagement rate between
    /// the configured bounds.
    pub fn factor(&self, content_type: ContentType, cfg: &EngagementConfig) -> f64 {
        let Some(stat) = self.stats.get(&content_type) else {
            return 1.0;
        };
        if (stat.shown as usize) < cfg.min_history || stat.shown == 0 {
            return 1.0;
        }
        let rate = f64::from(stat.engaged) / f64::from(stat.shown);
        (cfg.min_factor + rate * (cfg.max_factor - cfg.min_factor))
            .clamp(cfg.min_factor, cfg.max_factor)
    }

    /// Record a delivered item and whether it was engaged with.
    pub fn record(&mut self, content_type: ContentType, engaged: bool) {
        let stat = self.stats.entry(content_type).or_default();
        stat.shown += 1;
        if engaged {
            stat.engaged += 1;
        }
    }

    /// Mark an already-delivered item as engaged (founder opened or acted
    /// on it). Engagement never exceeds the shown count.
    pub fn mark_engaged(&mut self, content_type: ContentType) {
        let stat = self.stats.entry(content_type).or_default();
        if stat.engaged < stat.shown {
            stat.engaged += 1;
        }
    }

    pub fn stat(&self, content_type: ContentType) -> EngagementStat {
        self.stats.get(&content_type).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EngagementConfig {
        EngagementConfig::default()
    }

    #[test]
    fn neutral_without_history() {
        let history = EngagementHistory::default();
        assert_eq!(history.factor(ContentType::Task, &cfg()), 1.0);
    }

    #[test]
    fn neutral_below_min_history() {
        let mut history = EngagementHistory::default();
        for _ in 0..3 {
            history.record(ContentType::Task, true);
        }
        assert_eq!(history.factor(ContentType::Task, &cfg()), 1.0);
    }

    #[test]
    fn engaged_type_boosted_ignored_type_damped() {
        let cfg = cfg();
        let mut history = EngagementHistory::default();
        for _ in 0..10 {
            history.record(ContentType::Task, true);
            history.record(ContentType::Message, false);
        }
        assert!((history.factor(ContentType::Task, &cfg) - cfg.max_factor).abs() < 1e-9);
        assert!((history.factor(ContentType::Message, &cfg) - cfg.min_factor).abs() < 1e-9);
    }

    #[test]
    fn engagement_never_exceeds_shown() {
        let mut history = EngagementHistory::default();
        history.record(ContentType::Task, false);
        history.mark_engaged(ContentType::Task);
        history.mark_engaged(ContentType::Task);
        let stat = history.stat(ContentType::Task);
        assert_eq!(stat.shown, 1);
        assert_eq!(stat.engaged, 1);
    }

    #[test]
    fn factor_always_bounded() {
        let cfg = cfg();
        let mut history = EngagementHistory::default();
        for _ in 0..100 {
            history.record(ContentType::Anomaly, true);
        }
        let f = history.factor(ContentType::Anomaly, &cfg);
        assert!(f >= cfg.min_factor && f <= cfg.max_factor);
    }

    #[test]
    fn history_serde_roundtrip() {
        let mut history = EngagementHistory::default();
        history.record(ContentType::Task, true);
        history.record(ContentType::Meeting, false);
        let json = serde_json::to_string(&history).unwrap();
        let decoded: EngagementHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.stat(ContentType::Task).engaged, 1);
        assert_eq!(decoded.stat(ContentType::Meeting).shown, 1);
    }
}
