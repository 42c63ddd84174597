//! Content Selector - scored, constraint-satisfying briefing assembly
//!
//! ## Architecture
//!
//! - **`scoring`**: candidate building with type-specific urgency
//! - **`selection`**: caps, diversity, read-time trimming
//! - **`personalization`**: bounded engagement multipliers
//!
//! A briefing is always produced: when upstream stages degraded (missing
//! KPIs, detection failures), the affected sections shrink and an explicit
//! data-quality note is attached instead of failing the run.

pub mod personalization;
pub mod scoring;
pub mod selection;

pub use personalization::{EngagementHistory, EngagementStat};
pub use scoring::ContentScorer;
pub use selection::{select, Selection};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::BriefingConfig;
use crate::types::{
    ActivityFeeds, Anomaly, Briefing, BriefingKind, FounderProfile, Recommendation, RootCause,
    Trend,
};

/// Inputs the pipeline hands to the content selector.
pub struct BriefingInputs<'a> {
    pub tenant_id: &'a str,
    pub kind: BriefingKind,
    pub anomalies: &'a [Anomaly],
    pub trends: &'a [Trend],
    pub root_causes: &'a [RootCause],
    pub recommendations: &'a [Recommendation],
    pub feeds: &'a ActivityFeeds,
    pub profile: &'a FounderProfile,
    pub engagement: &'a EngagementHistory,
    /// Notes accumulated by upstream stages (degraded KPIs etc.).
    pub data_quality_notes: Vec<String>,
}

/// Assemble the digest for one tenant run.
pub fn assemble(cfg: &BriefingConfig, inputs: BriefingInputs<'_>, now: DateTime<Utc>) -> Briefing {
    let scorer = ContentScorer::new(cfg, inputs.profile, inputs.engagement, inputs.kind, now);
    let candidates = scorer.build_candidates(
        inputs.anomalies,
        inputs.trends,
        inputs.root_causes,
        inputs.recommendations,
        inputs.feeds,
    );
    let candidate_count = candidates.len();

    let selection = select(candidates, cfg);

    info!(
        tenant = inputs.tenant_id,
        candidates = candidate_count,
        selected = selection.sections.iter().map(|s| s.items.len()).sum::<usize>(),
        trimmed = selection.trimmed,
        read_secs = selection.estimated_read_secs,
        "Briefing assembled"
    );

    Briefing {
        tenant_id: inputs.tenant_id.to_string(),
        kind: inputs.kind,
        generated_at: now,
        sections: selection.sections,
        estimated_read_secs: selection.estimated_read_secs,
        data_quality_notes: inputs.data_quality_notes,
        read: false,
        engaged_item_ids: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SenderRole, TaskItem};
    use chrono::Duration;

    fn base_inputs<'a>(
        feeds: &'a ActivityFeeds,
        profile: &'a FounderProfile,
        engagement: &'a EngagementHistory,
    ) -> BriefingInputs<'a> {
        BriefingInputs {
            tenant_id: "t1",
            kind: BriefingKind::StartOfPeriod,
            anomalies: &[],
            trends: &[],
            root_causes: &[],
            recommendations: &[],
            feeds,
            profile,
            engagement,
            data_quality_notes: Vec::new(),
        }
    }

    #[test]
    fn briefing_produced_with_empty_inputs() {
        let feeds = ActivityFeeds::default();
        let profile = FounderProfile::default();
        let engagement = EngagementHistory::default();
        let briefing = assemble(
            &BriefingConfig::default(),
            base_inputs(&feeds, &profile, &engagement),
            Utc::now(),
        );
        assert_eq!(briefing.tenant_id, "t1");
        assert_eq!(briefing.total_items(), 0);
    }

    #[test]
    fn data_quality_notes_carried_through() {
        let feeds = ActivityFeeds::default();
        let profile = FounderProfile::default();
        let engagement = EngagementHistory::default();
        let mut inputs = base_inputs(&feeds, &profile, &engagement);
        inputs.data_quality_notes = vec!["mrr: gap of 9 missing points".to_string()];
        let briefing = assemble(&BriefingConfig::default(), inputs, Utc::now());
        assert_eq!(briefing.data_quality_notes.len(), 1);
    }

    #[test]
    fn tasks_and_messages_land_in_their_sections() {
        let now = Utc::now();
        let feeds = ActivityFeeds {
            tasks: vec![TaskItem {
                id: "task1".to_string(),
                title: "Prepare board deck".to_string(),
                due: Some(now + Duration::hours(20)),
                priority: 1,
                blocking: true,
            }],
            meetings: vec![],
            messages: vec![crate::types::MessageItem {
                id: "msg1".to_string(),
                sender: "Lead investor".to_string(),
                sender_role: SenderRole::Investor,
                preview: "Term sheet question".to_string(),
                unread: true,
                received_at: now,
            }],
        };
        let profile = FounderProfile::default();
        let engagement = EngagementHistory::default();
        let briefing = assemble(
            &BriefingConfig::default(),
            base_inputs(&feeds, &profile, &engagement),
            now,
        );
        assert!(briefing
            .section(crate::types::BriefingSection::Priorities)
            .is_some());
        assert!(briefing
            .section(crate::types::BriefingSection::Communications)
            .is_some());
        assert_eq!(briefing.total_items(), 2);
        assert!(briefing.estimated_read_secs > 0);
    }
}
