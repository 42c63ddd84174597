//! Candidate building and content scoring
//!
//! Every candidate (task, anomaly, meeting, message, insight, decision,
//! KPI snapshot) gets the same weighted formula over urgency, impact,
//! relevance, freshness and actionability — but urgency sub-scoring is
//! type-specific: due-time buckets for tasks, severity plus acceleration
//! for anomalies, time-until with keyword/attendee boosts for meetings,
//! sender importance with keyword boosts for messages. A briefing-kind
//! multiplier favors forward-looking content at the start of a period and
//! retrospective content at its end, and the bounded engagement factor
//! personalizes the result.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::BriefingConfig;
use crate::types::{
    Acceleration, ActivityFeeds, Anomaly, BriefingKind, ContentItem, ContentType,
    FounderProfile, MeetingItem, MessageItem, Recommendation, RootCause, TaskItem, Trend,
};

use super::personalization::EngagementHistory;

/// Builds and scores briefing candidates for one tenant run.
pub struct ContentScorer<'a> {
    cfg: &'a BriefingConfig,
    profile: &'a FounderProfile,
    engagement: &'a EngagementHistory,
    kind: BriefingKind,
    now: DateTime<Utc>,
}

impl<'a> ContentScorer<'a> {
    pub fn new(
        cfg: &'a BriefingConfig,
        profile: &'a FounderProfile,
        engagement: &'a EngagementHistory,
        kind: BriefingKind,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            cfg,
            profile,
            engagement,
            kind,
            now,
        }
    }

    /// Score all candidates from the run's signals and feeds.
    pub fn build_candidates(
        &self,
        anomalies: &[Anomaly],
        trends: &[Trend],
        root_causes: &[RootCause],
        recommendations: &[Recommendation],
        feeds: &ActivityFeeds,
    ) -> Vec<ContentItem> {
        let mut items = Vec::new();

        for task in &feeds.tasks {
            items.push(self.score_task(task));
        }
        for anomaly in anomalies {
            items.push(self.score_anomaly(anomaly, trends, root_causes));
        }
        for meeting in &feeds.meetings {
            items.push(self.score_meeting(meeting));
        }
        for message in &feeds.messages {
            items.push(self.score_message(message));
        }
        for rec in recommendations {
            items.push(self.score_recommendation(rec));
        }
        for trend in trends.iter().filter(|t| t.significant && !t.indeterminate) {
            items.push(self.score_kpi_snapshot(trend));
        }
        for cause in root_causes {
            items.push(self.score_insight(cause));
        }

        items
    }

    // ------------------------------------------------------------------
    // Shared formula
    // ------------------------------------------------------------------

    fn finalize(
        &self,
        content_type: ContentType,
        title: String,
        body: String,
        source_ref: String,
        urgency: f64,
        impact: f64,
        relevance: f64,
        freshness: f64,
        actionability: f64,
        confidence: f64,
    ) -> ContentItem {
        let w = &self.cfg.weights;
        let base = w.urgency * urgency
            + w.impact * impact
            + w.relevance * relevance
            + w.freshness * freshness
            + w.actionability * actionability;

        let kind_mult = self.kind_multiplier(content_type);
        let engagement_mult = self.engagement.factor(content_type, &self.cfg.engagement);
        let score = (base * 100.0 * kind_mult * engagement_mult).clamp(0.0, 100.0);

        ContentItem {
            id: Uuid::new_v4(),
            content_type,
            section: content_type.default_section(),
            title,
            body,
            urgency,
            impact,
            relevance,
            freshness,
            actionability,
            score,
            confidence,
            source_ref,
        }
    }

    /// Start-of-period digests favor forward-looking content; end-of-period
    /// digests favor retrospective content.
    fn kind_multiplier(&self, content_type: ContentType) -> f64 {
        let forward = content_type.is_forward_looking();
        match self.kind {
            BriefingKind::StartOfPeriod if forward => self.cfg.kind_multiplier,
            BriefingKind::EndOfPeriod if !forward => self.cfg.kind_multiplier,
            _ => 1.0,
        }
    }

    /// Relevance against the founder's focus areas.
    fn relevance_of(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        if self
            .profile
            .focus_areas
            .iter()
            .any(|area| lower.contains(&area.to_lowercase()))
        {
            0.9
        } else {
            0.5
        }
    }

    /// Age-bucketed freshness decay.
    fn freshness_of(&self, when: DateTime<Utc>) -> f64 {
        let age_hours = (self.now - when).num_hours();
        if age_hours <= 24 {
            1.0
        } else if age_hours <= 72 {
            0.7
        } else if age_hours <= 168 {
            0.5
        } else {
            0.3
        }
    }

    fn keyword_hit(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.cfg
            .urgency_keywords
            .iter()
            .any(|k| lower.contains(k.as_str()))
    }

    // ------------------------------------------------------------------
    // Type-specific scoring
    // ------------------------------------------------------------------

    fn score_task(&self, task: &TaskItem) -> ContentItem {
        // Due-time buckets
        let mut urgency: f64 = match task.due {
            Some(due) if due <= self.now => 1.0,
            Some(due) => {
                let hours = (due - self.now).num_hours();
                if hours <= 24 {
                    0.9
                } else if hours <= 48 {
                    0.75
                } else if hours <= 168 {
                    0.5
                } else {
                    0.3
                }
            }
            None => 0.3,
        };
        if task.blocking {
            urgency = (urgency + 0.1).min(1.0);
        }

        let impact = match task.priority {
            1 => 0.9,
            2 => 0.75,
            3 => 0.6,
            4 => 0.45,
            _ => 0.3,
        };

        self.finalize(
            ContentType::Task,
            task.title.clone(),
            match task.due {
                Some(due) => format!("Due {}", due.format("%b %d")),
                None => "No due date".to_string(),
            },
            task.id.clone(),
            urgency,
            impact,
            self.relevance_of(&task.title),
            1.0, // tasks are always current
            0.9,
            0.8,
        )
    }

    fn score_anomaly(
        &self,
        anomaly: &Anomaly,
        trends: &[Trend],
        root_causes: &[RootCause],
    ) -> ContentItem {
        // Severity plus acceleration: a worsening anomaly is more urgent
        let mut urgency = anomaly.severity.urgency_weight();
        let accelerating = trends.iter().any(|t| {
            t.kpi_name == anomaly.kpi_name && t.acceleration == Acceleration::Accelerating
        });
        if accelerating {
            urgency = (urgency + 0.1).min(1.0);
        }

        let cause = root_causes.iter().find(|c| c.anomaly_kpi == anomaly.kpi_name);
        let mut body = anomaly.explanation.clone();
        if let Some(cause) = cause {
            body.push_str(&format!(" {}", cause.explanation));
        }

        self.finalize(
            ContentType::Anomaly,
            format!("{} anomaly: {}", anomaly.severity, anomaly.kpi_name),
            body,
            format!("{}@{}", anomaly.kpi_name, anomaly.timestamp.timestamp()),
            urgency,
            anomaly.weighted_score().clamp(0.3, 1.0),
            self.relevance_of(&anomaly.kpi_name),
            self.freshness_of(anomaly.timestamp),
            if cause.is_some() { 0.7 } else { 0.5 },
            anomaly.confidence,
        )
    }

    fn score_meeting(&self, meeting: &MeetingItem) -> ContentItem {
        let hours_until = (meeting.start - self.now).num_hours();
        let mut urgency = if hours_until < 0 {
            0.2 // already happened
        } else if hours_until <= 2 {
            0.9
        } else if hours_until <= 24 {
            0.7
        } else if hours_until <= 72 {
            0.5
        } else {
            0.3
        };
        for role in &meeting.attendee_roles {
            urgency += role.boost();
        }
        if self.keyword_hit(&meeting.description) || self.keyword_hit(&meeting.title) {
            urgency += 0.15;
        }
        let urgency = urgency.min(1.0);

        self.finalize(
            ContentType::Meeting,
            meeting.title.clone(),
            format!("Starts {}", meeting.start.format("%b %d %H:%M")),
            meeting.id.clone(),
            urgency,
            0.6,
            self.relevance_of(&format!("{} {}", meeting.title, meeting.description)),
            1.0,
            0.6,
            0.8,
        )
    }

    fn score_message(&self, message: &MessageItem) -> ContentItem {
        let mut urgency = message.sender_role.importance();
        if self.keyword_hit(&message.preview) {
            urgency += 0.2;
        }
        if message.unread {
            urgency += 0.1;
        }
        let urgency = urgency.min(1.0);

        self.finalize(
            ContentType::Message,
            format!("Message from {}", message.sender),
            message.preview.clone(),
            message.id.clone(),
            urgency,
            0.5,
            self.relevance_of(&message.preview),
            self.freshness_of(message.received_at),
            0.5,
            0.7,
        )
    }

    fn score_recommendation(&self, rec: &Recommendation) -> ContentItem {
        let mut item = self.finalize(
            ContentType::Decision,
            rec.title.clone(),
            rec.description.clone(),
            rec.id.to_string(),
            rec.urgency,
            rec.impact,
            self.relevance_of(&format!("{} {}", rec.title, rec.category)),
            1.0,
            0.85,
            rec.confidence,
        );
        item.section = crate::types::BriefingSection::Recommendations;
        item
    }

    fn score_kpi_snapshot(&self, trend: &Trend) -> ContentItem {
        let urgency = match trend.direction {
            crate::types::TrendDirection::Down => 0.6,
            crate::types::TrendDirection::Volatile => 0.5,
            _ => 0.4,
        };
        self.finalize(
            ContentType::KpiSnapshot,
            format!("{} {}: {:+.1}%", trend.kpi_name, trend.timeframe, trend.magnitude * 100.0),
            format!(
                "p={:.3}, effect size {:?}, {:?}",
                trend.p_value, trend.effect_size, trend.acceleration
            ),
            format!("{}:{}", trend.kpi_name, trend.timeframe),
            urgency,
            0.5,
            self.relevance_of(&trend.kpi_name),
            1.0,
            0.3,
            1.0 - trend.p_value.min(1.0),
        )
    }

    fn score_insight(&self, cause: &RootCause) -> ContentItem {
        self.finalize(
            ContentType::Insight,
            format!("{} is driving {}", cause.cause_kpi, cause.anomaly_kpi),
            cause.explanation.clone(),
            format!("{}->{}", cause.cause_kpi, cause.anomaly_kpi),
            0.55,
            0.7,
            self.relevance_of(&cause.anomaly_kpi),
            1.0,
            0.55,
            cause.confidence,
        )
    }
}
