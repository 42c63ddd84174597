//! Recommendation types: category, source, status state machine, feedback
//!
//! Recommendations are created by the recommendation engine; only their
//! status is mutated afterwards, and only through `try_transition`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Category / Source
// ============================================================================

/// Business category of a recommendation, used for diversity capping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Financial,
    Growth,
    Retention,
    Efficiency,
    Product,
    Team,
}

impl std::fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationCategory::Financial => write!(f, "financial"),
            RecommendationCategory::Growth => write!(f, "growth"),
            RecommendationCategory::Retention => write!(f, "retention"),
            RecommendationCategory::Efficiency => write!(f, "efficiency"),
            RecommendationCategory::Product => write!(f, "product"),
            RecommendationCategory::Team => write!(f, "team"),
        }
    }
}

/// Which pipeline stage produced the recommendation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Deterministic business rule from the versioned rule table.
    Rule,
    /// Historical scenario / pattern match.
    Pattern,
    /// Candidate whose rationale was expanded by the enrichment capability.
    Enriched,
}

// ============================================================================
// Status state machine
// ============================================================================

/// Lifecycle status. `Pending` is the only creation state; every other
/// state is terminal except `Scheduled`, which may still expire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    #[default]
    Pending,
    Accepted,
    Scheduled,
    Dismissed,
    Expired,
}

impl RecommendationStatus {
    /// Whether the state machine permits `self -> next`.
    pub fn can_transition(self, next: RecommendationStatus) -> bool {
        use RecommendationStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Scheduled)
                | (Pending, Dismissed)
                | (Pending, Expired)
                | (Scheduled, Accepted)
                | (Scheduled, Expired)
        )
    }
}

// ============================================================================
// Recommendation record
// ============================================================================

/// A ranked, actionable recommendation for a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub tenant_id: String,
    pub category: RecommendationCategory,
    pub title: String,
    pub description: String,
    pub action_items: Vec<String>,
    /// Weighted priority in [0, 100].
    pub priority_score: f64,
    /// Urgency component in [0, 1].
    pub urgency: f64,
    /// Impact component in [0, 1].
    pub impact: f64,
    /// Feasibility component in [0, 1].
    pub feasibility: f64,
    /// Calibrated confidence in [0, 1].
    pub confidence: f64,
    pub source: RecommendationSource,
    pub status: RecommendationStatus,
    /// Rule or pattern id that produced this candidate, for calibration.
    pub origin_id: String,
    pub created_at: DateTime<Utc>,
}

impl Recommendation {
    /// Apply a status transition, rejecting moves the state machine does
    /// not allow.
    pub fn try_transition(&mut self, next: RecommendationStatus) -> Result<(), String> {
        if self.status.can_transition(next) {
            self.status = next;
            Ok(())
        } else {
            Err(format!(
                "invalid recommendation transition {:?} -> {:?}",
                self.status, next
            ))
        }
    }
}

// ============================================================================
// Feedback
// ============================================================================

/// Founder action on a delivered recommendation or content item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Accepted,
    Dismissed,
    Ignored,
}

/// A feedback record linking a founder action to a recommendation.
///
/// `origin_id` is denormalized from the recommendation so calibration can
/// aggregate per rule/pattern without a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationFeedback {
    pub recommendation_id: Uuid,
    pub tenant_id: String,
    pub origin_id: String,
    pub action: FeedbackAction,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_recommendation(status: RecommendationStatus) -> Recommendation {
        Recommendation {
            id: Uuid::new_v4(),
            tenant_id: "t1".to_string(),
            category: RecommendationCategory::Financial,
            title: "Extend runway".to_string(),
            description: String::new(),
            action_items: vec![],
            priority_score: 90.0,
            urgency: 0.9,
            impact: 0.9,
            feasibility: 0.8,
            confidence: 0.9,
            source: RecommendationSource::Rule,
            status,
            origin_id: "runway_below_6mo".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pending_can_reach_all_states() {
        for next in [
            RecommendationStatus::Accepted,
            RecommendationStatus::Scheduled,
            RecommendationStatus::Dismissed,
            RecommendationStatus::Expired,
        ] {
            let mut r = make_recommendation(RecommendationStatus::Pending);
            assert!(r.try_transition(next).is_ok());
            assert_eq!(r.status, next);
        }
    }

    #[test]
    fn terminal_states_reject_transitions() {
        let mut r = make_recommendation(RecommendationStatus::Dismissed);
        assert!(r.try_transition(RecommendationStatus::Accepted).is_err());
        assert_eq!(r.status, RecommendationStatus::Dismissed);
    }

    #[test]
    fn scheduled_can_expire() {
        let mut r = make_recommendation(RecommendationStatus::Scheduled);
        assert!(r.try_transition(RecommendationStatus::Expired).is_ok());
    }

    #[test]
    fn recommendation_serde_roundtrip() {
        let r = make_recommendation(RecommendationStatus::Pending);
        let json = serde_json::to_string(&r).unwrap();
        let decoded: Recommendation = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.id, r.id);
        assert_eq!(decoded.priority_score, r.priority_score);
        assert_eq!(decoded.origin_id, r.origin_id);
    }
}
