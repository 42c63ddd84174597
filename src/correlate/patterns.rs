//! Multi-KPI directional pattern matching
//!
//! Evaluates the named patterns from the versioned pattern table against
//! the current period's trend directions. A pattern matches when the
//! fraction of satisfied conditions reaches the configured threshold; a
//! condition on a KPI with no trend this run counts as unsatisfied.

use std::collections::HashMap;

use crate::config::PatternDef;
use crate::types::{PatternMatch, Trend, TrendDirection};

/// Evaluate every pattern against the run's trends.
///
/// `trends` should hold one trend per KPI for the pattern timeframe
/// (conventionally WoW — the "current period"). Indeterminate trends never
/// satisfy a condition.
pub fn evaluate(
    patterns: &[PatternDef],
    trends: &[Trend],
    match_fraction: f64,
) -> Vec<PatternMatch> {
    let by_kpi: HashMap<&str, &Trend> = trends
        .iter()
        .map(|t| (t.kpi_name.as_str(), t))
        .collect();

    patterns
        .iter()
        .map(|pattern| {
            let total = pattern.conditions.len();
            let met = pattern
                .conditions
                .iter()
                .filter(|cond| {
                    by_kpi
                        .get(cond.kpi.as_str())
                        .is_some_and(|t| !t.indeterminate && condition_holds(t.direction, cond.direction))
                })
                .count();
            let fraction = if total == 0 { 0.0 } else { met as f64 / total as f64 };
            PatternMatch {
                pattern_name: pattern.name.clone(),
                fraction,
                matched: total > 0 && fraction >= match_fraction,
                conditions_total: total,
                conditions_met: met,
            }
        })
        .collect()
}

/// A Flat expectation tolerates an insignificant drift in either
/// direction; Up/Down/Volatile must match exactly.
fn condition_holds(actual: TrendDirection, expected: TrendDirection) -> bool {
    actual == expected
}
