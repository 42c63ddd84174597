//! Activity feed types: tasks, meetings, messages, and the founder profile
//!
//! All feeds are consumed read-only; the content selector scores them into
//! briefing candidates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Tasks
// ============================================================================

/// A task from the external task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub due: Option<DateTime<Utc>>,
    /// Priority 1 (highest) .. 5 (lowest).
    pub priority: u8,
    /// True when other tasks depend on this one.
    pub blocking: bool,
}

// ============================================================================
// Meetings
// ============================================================================

/// Attendee role classes, used for meeting urgency boosts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeRole {
    Investor,
    Customer,
    Executive,
    Team,
    External,
}

impl AttendeeRole {
    /// Urgency boost contribution for this attendee class.
    pub fn boost(self) -> f64 {
        match self {
            AttendeeRole::Investor => 0.25,
            AttendeeRole::Customer => 0.2,
            AttendeeRole::Executive => 0.15,
            AttendeeRole::External => 0.05,
            AttendeeRole::Team => 0.0,
        }
    }
}

/// A calendar entry from the meeting feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingItem {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub attendee_roles: Vec<AttendeeRole>,
    /// Free-text agenda/description scanned for keyword boosts.
    #[serde(default)]
    pub description: String,
}

// ============================================================================
// Messages
// ============================================================================

/// Sender role classes, used for message importance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Investor,
    Customer,
    Executive,
    Team,
    Unknown,
}

impl SenderRole {
    /// Sender-importance base in [0, 1].
    pub fn importance(self) -> f64 {
        match self {
            SenderRole::Investor => 0.9,
            SenderRole::Customer => 0.8,
            SenderRole::Executive => 0.7,
            SenderRole::Team => 0.5,
            SenderRole::Unknown => 0.3,
        }
    }
}

/// A message from the communication feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageItem {
    pub id: String,
    pub sender: String,
    pub sender_role: SenderRole,
    pub preview: String,
    pub unread: bool,
    pub received_at: DateTime<Utc>,
}

// ============================================================================
// Founder profile
// ============================================================================

/// Company stage, used by scenario matching and relevance scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStage {
    PreSeed,
    #[default]
    Seed,
    SeriesA,
    Growth,
}

/// Alert-sensitivity preference. Presets scale detection thresholds and
/// selection caps; `Custom` defers entirely to explicit config values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityProfile {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
    Custom,
}

impl SensitivityProfile {
    /// Multiplier applied to detection thresholds. Conservative raises the
    /// bar (fewer alerts); aggressive lowers it.
    pub fn threshold_scale(self) -> f64 {
        match self {
            SensitivityProfile::Conservative => 1.25,
            SensitivityProfile::Balanced => 1.0,
            SensitivityProfile::Aggressive => 0.8,
            SensitivityProfile::Custom => 1.0,
        }
    }
}

/// The founder's preferences, consumed read-only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FounderProfile {
    /// Focus areas matched against KPI names and content titles
    /// (e.g. "growth", "retention", "fundraising").
    pub focus_areas: Vec<String>,
    pub stage: CompanyStage,
    pub sensitivity: SensitivityProfile,
}

// ============================================================================
// Combined feeds
// ============================================================================

/// All activity feeds for one tenant run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityFeeds {
    #[serde(default)]
    pub tasks: Vec<TaskItem>,
    #[serde(default)]
    pub meetings: Vec<MeetingItem>,
    #[serde(default)]
    pub messages: Vec<MessageItem>,
}

impl Default for TaskItem {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            due: None,
            priority: 3,
            blocking: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitivity_scales_ordered() {
        assert!(
            SensitivityProfile::Conservative.threshold_scale()
                > SensitivityProfile::Balanced.threshold_scale()
        );
        assert!(
            SensitivityProfile::Aggressive.threshold_scale()
                < SensitivityProfile::Balanced.threshold_scale()
        );
    }

    #[test]
    fn feeds_deserialize_with_missing_fields() {
        let feeds: ActivityFeeds = serde_json::from_str("{}").unwrap();
        assert!(feeds.tasks.is_empty());
        assert!(feeds.meetings.is_empty());
        assert!(feeds.messages.is_empty());
    }
}
