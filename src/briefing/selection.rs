//! Constraint-satisfying selection
//!
//! Sort by score, enforce per-type and total caps plus section diversity,
//! then iteratively drop the lowest-scoring droppable item until the
//! estimated read time fits the target window. Mandatory sections never
//! fall below their minimum while qualifying content exists. Ties break on
//! confidence, then id, so selection is deterministic.

use std::collections::HashMap;
use tracing::debug;

use crate::config::BriefingConfig;
use crate::types::{BriefingSection, ContentItem, ContentType, SectionContent};

/// Outcome of the selection pass.
#[derive(Debug, Clone)]
pub struct Selection {
    pub sections: Vec<SectionContent>,
    pub estimated_read_secs: u32,
    /// Candidates dropped by the read-time trim (count, for the report).
    pub trimmed: usize,
}

/// Select items under all constraints.
pub fn select(mut candidates: Vec<ContentItem>, cfg: &BriefingConfig) -> Selection {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(a.id.cmp(&b.id))
    });

    // Pass 1: caps
    let mut picked: Vec<ContentItem> = Vec::new();
    let mut per_type: HashMap<ContentType, usize> = HashMap::new();
    let mut per_section: HashMap<BriefingSection, usize> = HashMap::new();

    for item in candidates {
        if picked.len() >= cfg.total_cap {
            break;
        }
        let type_count = per_type.entry(item.content_type).or_insert(0);
        if *type_count >= type_cap(cfg, item.content_type) {
            continue;
        }
        let section_count = per_section.entry(item.section).or_insert(0);
        if *section_count >= cfg.per_section_cap {
            continue;
        }
        *type_count += 1;
        *section_count += 1;
        picked.push(item);
    }

    // Pass 2: read-time trim, lowest score first, respecting mandatory floors
    let mut trimmed = 0usize;
    while read_secs(&picked, cfg) > cfg.read_time_target_secs && !picked.is_empty() {
        let Some(victim) = pick_victim(&picked, cfg) else {
            // Only mandatory-floor items remain
            break;
        };
        debug!(title = %picked[victim].title, "Trimmed for read time");
        picked.remove(victim);
        trimmed += 1;
    }

    let estimated_read_secs = read_secs(&picked, cfg);

    // Group into render-order sections
    let sections = BriefingSection::ALL
        .iter()
        .filter_map(|&section| {
            let items: Vec<ContentItem> = picked
                .iter()
                .filter(|i| i.section == section)
                .cloned()
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(SectionContent { section, items })
            }
        })
        .collect();

    Selection {
        sections,
        estimated_read_secs,
        trimmed,
    }
}

fn type_cap(cfg: &BriefingConfig, content_type: ContentType) -> usize {
    let caps = &cfg.per_type_caps;
    match content_type {
        ContentType::Task => caps.task,
        ContentType::Anomaly => caps.anomaly,
        ContentType::Meeting => caps.meeting,
        ContentType::Message => caps.message,
        ContentType::Insight => caps.insight,
        ContentType::Decision => caps.decision,
        ContentType::KpiSnapshot => caps.kpi_snapshot,
    }
}

/// Word count / reading speed, in whole seconds.
fn read_secs(items: &[ContentItem], cfg: &BriefingConfig) -> u32 {
    let words: usize = items.iter().map(ContentItem::word_count).sum();
    ((words as f64 / f64::from(cfg.reading_wpm)) * 60.0).ceil() as u32
}

/// Index of the lowest-scoring item that can still be dropped: an item in a
/// non-mandatory section, or in a mandatory section above its floor.
fn pick_victim(picked: &[ContentItem], cfg: &BriefingConfig) -> Option<usize> {
    let mut section_counts: HashMap<BriefingSection, usize> = HashMap::new();
    for item in picked {
        *section_counts.entry(item.section).or_insert(0) += 1;
    }

    picked
        .iter()
        .enumerate()
        .filter(|(_, item)| {
            let count = section_counts.get(&item.section).copied().unwrap_or(0);
            !item.section.is_mandatory() || count > cfg.min_mandatory_items
        })
        .min_by(|(_, a), (_, b)| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
                .then(b.id.cmp(&a.id))
        })
        .map(|(i, _)| i)
}
