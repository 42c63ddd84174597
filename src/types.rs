//! Shared data structures for the KPI insights & briefings pipeline
//!
//! This module defines the core types flowing between the pipeline stages:
//! - KPI series and tenant snapshots (read-only inputs)
//! - Anomaly records (detector ensemble output)
//! - Trend records (multi-timescale trend analysis output)
//! - Correlation graph, root causes and pattern matches
//! - Recommendations with their status state machine
//! - Content items and the assembled Briefing
//! - Activity feeds (tasks, meetings, messages) and the founder profile
//!
//! Every derived entity carries a bounded confidence or score and a
//! traceable source method so downstream ranking is always well-defined.

use serde::{Deserialize, Serialize};

pub mod anomaly;
pub mod briefing;
pub mod correlation;
pub mod feeds;
pub mod recommendation;
pub mod series;
pub mod trend;

pub use anomaly::{Anomaly, AnomalyDirection, DetectionMethod, TierScore};
pub use briefing::{
    Briefing, BriefingKind, BriefingSection, ContentItem, ContentType, SectionContent,
};
pub use correlation::{
    Attribution, CorrelationEdge, JointAnomaly, KpiGraph, KpiNode, PatternMatch, RootCause,
};
pub use feeds::{
    ActivityFeeds, AttendeeRole, CompanyStage, FounderProfile, MeetingItem, MessageItem,
    SenderRole, SensitivityProfile, TaskItem,
};
pub use recommendation::{
    FeedbackAction, Recommendation, RecommendationCategory, RecommendationFeedback,
    RecommendationSource, RecommendationStatus,
};
pub use series::{KpiPoint, KpiSeries, SamplingFrequency, TenantSnapshot};
pub use trend::{Acceleration, EffectSize, Timeframe, Trend, TrendDirection};

// ============================================================================
// Severity
// ============================================================================

/// Severity bucket shared by anomalies and rule-based recommendations.
///
/// Ordered from most to least severe; `rank()` gives a numeric ordering
/// (lower = more severe) for sorting and cooldown logic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Numeric rank for ordering (0 = most severe).
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    /// Baseline urgency contribution in [0, 1] used by content scoring.
    pub fn urgency_weight(self) -> f64 {
        match self {
            Severity::Critical => 1.0,
            Severity::High => 0.8,
            Severity::Medium => 0.55,
            Severity::Low => 0.3,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
        }
    }
}
