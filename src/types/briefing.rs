//! Briefing types: content items, sections, and the assembled digest
//!
//! A briefing is immutable once delivered except for read/engagement flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Content classification
// ============================================================================

/// Type of a candidate content item. Per-type caps and urgency sub-scoring
/// key off this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Task,
    Anomaly,
    Meeting,
    Message,
    Insight,
    Decision,
    KpiSnapshot,
}

impl ContentType {
    /// Forward-looking types get the start-of-period boost; retrospective
    /// types get the end-of-period boost.
    pub fn is_forward_looking(self) -> bool {
        matches!(
            self,
            ContentType::Task | ContentType::Meeting | ContentType::Decision
        )
    }

    /// Section this type lands in by default.
    pub fn default_section(self) -> BriefingSection {
        match self {
            ContentType::Task => BriefingSection::Priorities,
            ContentType::Anomaly | ContentType::KpiSnapshot => BriefingSection::Metrics,
            ContentType::Meeting => BriefingSection::Schedule,
            ContentType::Message => BriefingSection::Communications,
            ContentType::Insight | ContentType::Decision => BriefingSection::Insights,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Task => write!(f, "task"),
            ContentType::Anomaly => write!(f, "anomaly"),
            ContentType::Meeting => write!(f, "meeting"),
            ContentType::Message => write!(f, "message"),
            ContentType::Insight => write!(f, "insight"),
            ContentType::Decision => write!(f, "decision"),
            ContentType::KpiSnapshot => write!(f, "kpi_snapshot"),
        }
    }
}

/// Sections of the assembled briefing, in render order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BriefingSection {
    Priorities,
    Metrics,
    Schedule,
    Communications,
    Insights,
    Recommendations,
}

impl BriefingSection {
    pub const ALL: [BriefingSection; 6] = [
        BriefingSection::Priorities,
        BriefingSection::Metrics,
        BriefingSection::Schedule,
        BriefingSection::Communications,
        BriefingSection::Insights,
        BriefingSection::Recommendations,
    ];

    /// Mandatory sections keep a minimum item count through read-time
    /// trimming whenever qualifying content exists.
    pub fn is_mandatory(self) -> bool {
        matches!(
            self,
            BriefingSection::Priorities | BriefingSection::Metrics
        )
    }
}

/// Start- vs end-of-period digest. Drives the briefing-kind multiplier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BriefingKind {
    #[default]
    StartOfPeriod,
    EndOfPeriod,
}

// ============================================================================
// Content item
// ============================================================================

/// A scored candidate item for briefing selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub content_type: ContentType,
    pub section: BriefingSection,
    pub title: String,
    pub body: String,
    /// Urgency component in [0, 1] (type-specific sub-scoring).
    pub urgency: f64,
    /// Impact component in [0, 1].
    pub impact: f64,
    /// Relevance to the founder's focus areas, in [0, 1].
    pub relevance: f64,
    /// Freshness decay in [0, 1].
    pub freshness: f64,
    /// Actionability in [0, 1].
    pub actionability: f64,
    /// Final weighted score after multipliers; bounded to [0, 100].
    pub score: f64,
    /// Tie-break confidence in [0, 1] (higher wins at equal score).
    pub confidence: f64,
    /// Id of the upstream record (task id, anomaly kpi+ts, ...).
    pub source_ref: String,
}

impl ContentItem {
    /// Word count of title + body, for read-time estimation.
    pub fn word_count(&self) -> usize {
        self.title.split_whitespace().count() + self.body.split_whitespace().count()
    }
}

// ============================================================================
// Briefing
// ============================================================================

/// Items selected into one section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionContent {
    pub section: BriefingSection,
    pub items: Vec<ContentItem>,
}

/// The assembled, length-bounded digest for one tenant run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Briefing {
    pub tenant_id: String,
    pub kind: BriefingKind,
    pub generated_at: DateTime<Utc>,
    /// Non-empty sections in render order.
    pub sections: Vec<SectionContent>,
    /// Estimated read time in seconds (word count / reading speed).
    pub estimated_read_secs: u32,
    /// Explicit notes when sections were degraded by data-quality issues.
    pub data_quality_notes: Vec<String>,
    /// Engagement flags — the only fields mutable after delivery.
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub engaged_item_ids: Vec<Uuid>,
}

impl Briefing {
    pub fn total_items(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn section(&self, section: BriefingSection) -> Option<&SectionContent> {
        self.sections.iter().find(|s| s.section == section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sections_cover_all_types() {
        for ct in [
            ContentType::Task,
            ContentType::Anomaly,
            ContentType::Meeting,
            ContentType::Message,
            ContentType::Insight,
            ContentType::Decision,
            ContentType::KpiSnapshot,
        ] {
            // Every type maps into one of the render-order sections
            assert!(BriefingSection::ALL.contains(&ct.default_section()));
        }
    }

    #[test]
    fn word_count_counts_title_and_body() {
        let item = ContentItem {
            id: Uuid::new_v4(),
            content_type: ContentType::Insight,
            section: BriefingSection::Insights,
            title: "Churn is accelerating".to_string(),
            body: "Weekly churn rose for three consecutive weeks".to_string(),
            urgency: 0.5,
            impact: 0.5,
            relevance: 0.5,
            freshness: 0.5,
            actionability: 0.5,
            score: 50.0,
            confidence: 0.5,
            source_ref: "churn_rate".to_string(),
        };
        assert_eq!(item.word_count(), 10);
    }

    #[test]
    fn briefing_serde_roundtrip() {
        let b = Briefing {
            tenant_id: "t1".to_string(),
            kind: BriefingKind::StartOfPeriod,
            generated_at: Utc::now(),
            sections: vec![SectionContent {
                section: BriefingSection::Priorities,
                items: vec![],
            }],
            estimated_read_secs: 120,
            data_quality_notes: vec!["mrr series stale".to_string()],
            read: false,
            engaged_item_ids: vec![],
        };
        let json = serde_json::to_string(&b).unwrap();
        let decoded: Briefing = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.tenant_id, "t1");
        assert_eq!(decoded.estimated_read_secs, 120);
        assert_eq!(decoded.data_quality_notes.len(), 1);
    }
}
