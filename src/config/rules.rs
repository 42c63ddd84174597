//! Versioned rule and pattern tables
//!
//! Business-critical rule conditions and named multi-KPI scenario patterns
//! live in a versioned TOML document, loaded immutably at run start. Each
//! entry is parsed independently: a malformed rule or pattern is skipped
//! with a warning and never fails the run or its neighbors.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::{RecommendationCategory, Severity, TrendDirection};

// ============================================================================
// Business rules
// ============================================================================

/// Comparison operator for a rule condition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    pub fn evaluate(self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOp::Lt => value < threshold,
            ComparisonOp::Le => value <= threshold,
            ComparisonOp::Gt => value > threshold,
            ComparisonOp::Ge => value >= threshold,
        }
    }
}

/// A deterministic business-critical rule, evaluated every run against the
/// latest value of its KPI.
///
/// Templates may reference `{kpi}`, `{value}` and `{threshold}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRule {
    pub id: String,
    pub kpi: String,
    pub op: ComparisonOp,
    pub threshold: f64,
    pub severity: Severity,
    pub category: RecommendationCategory,
    pub title: String,
    pub description_template: String,
    #[serde(default)]
    pub action_items: Vec<String>,
}

impl BusinessRule {
    fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("rule id must not be empty".to_string());
        }
        if self.kpi.is_empty() {
            return Err(format!("rule {}: kpi must not be empty", self.id));
        }
        if !self.threshold.is_finite() {
            return Err(format!("rule {}: threshold must be finite", self.id));
        }
        Ok(())
    }
}

// ============================================================================
// Scenario patterns
// ============================================================================

/// One directional condition of a multi-KPI pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCondition {
    pub kpi: String,
    pub direction: TrendDirection,
}

/// A named multi-KPI directional pattern (e.g. growth efficiency, churn
/// crisis) matched against the current period's trend directions, plus the
/// recommendation payload emitted when it matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDef {
    pub name: String,
    pub conditions: Vec<PatternCondition>,
    pub severity: Severity,
    pub category: RecommendationCategory,
    pub title: String,
    pub description_template: String,
    #[serde(default)]
    pub action_items: Vec<String>,
}

impl PatternDef {
    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("pattern name must not be empty".to_string());
        }
        if self.conditions.is_empty() {
            return Err(format!("pattern {}: needs at least one condition", self.name));
        }
        Ok(())
    }
}

// ============================================================================
// Table loading
// ============================================================================

/// The versioned rule and pattern tables for a run. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTables {
    pub version: u32,
    pub rules: Vec<BusinessRule>,
    pub patterns: Vec<PatternDef>,
}

/// Raw document shape: entries kept as TOML values so each can be parsed
/// (and skipped) independently.
#[derive(Debug, Deserialize)]
struct RawTables {
    version: u32,
    #[serde(default)]
    rules: Vec<toml::Value>,
    #[serde(default)]
    patterns: Vec<toml::Value>,
}

impl RuleTables {
    /// Load using the standard search order: `$PULSE_RULES`, `./rules.toml`,
    /// built-in tables.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("PULSE_RULES") {
            let p = PathBuf::from(&path);
            match Self::load_from_file(&p) {
                Ok(tables) => {
                    info!(path = %p.display(), version = tables.version, "Loaded rule tables from PULSE_RULES");
                    return tables;
                }
                Err(e) => {
                    warn!(path = %p.display(), error = %e, "Failed to load rules from PULSE_RULES, falling back");
                }
            }
        }

        let local = PathBuf::from("rules.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(tables) => {
                    info!(version = tables.version, "Loaded rule tables from ./rules.toml");
                    return tables;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./rules.toml, using built-in tables");
                }
            }
        }

        Self::builtin()
    }

    /// Parse a TOML document, skipping malformed entries individually.
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
        Self::parse(&contents)
    }

    /// Parse rule tables from a TOML string. Document-level failures are
    /// errors; entry-level failures are skipped with a warning.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let raw: RawTables = toml::from_str(contents).map_err(|e| e.to_string())?;

        let mut rules = Vec::new();
        for (i, value) in raw.rules.into_iter().enumerate() {
            match value.try_into::<BusinessRule>().map_err(|e| e.to_string()) {
                Ok(rule) => match rule.validate() {
                    Ok(()) => rules.push(rule),
                    Err(e) => warn!(index = i, error = %e, "Skipping invalid rule"),
                },
                Err(e) => warn!(index = i, error = %e, "Skipping malformed rule entry"),
            }
        }

        let mut patterns = Vec::new();
        for (i, value) in raw.patterns.into_iter().enumerate() {
            match value.try_into::<PatternDef>().map_err(|e| e.to_string()) {
                Ok(pattern) => match pattern.validate() {
                    Ok(()) => patterns.push(pattern),
                    Err(e) => warn!(index = i, error = %e, "Skipping invalid pattern"),
                },
                Err(e) => warn!(index = i, error = %e, "Skipping malformed pattern entry"),
            }
        }

        Ok(Self {
            version: raw.version,
            rules,
            patterns,
        })
    }

    /// Built-in default tables, used when no rules file is present.
    pub fn builtin() -> Self {
        info!("Using built-in rule tables");
        Self {
            version: 1,
            rules: vec![
                BusinessRule {
                    id: "runway_below_6mo".to_string(),
                    kpi: "runway_months".to_string(),
                    op: ComparisonOp::Lt,
                    threshold: 6.0,
                    severity: Severity::Critical,
                    category: RecommendationCategory::Financial,
                    title: "Runway below 6 months".to_string(),
                    description_template:
                        "Runway is {value} months, below the {threshold}-month floor. \
                         Start fundraising or cut burn now."
                            .to_string(),
                    action_items: vec![
                        "Model 3 burn-reduction scenarios".to_string(),
                        "Open conversations with existing investors".to_string(),
                    ],
                },
                BusinessRule {
                    id: "ltv_cac_below_1".to_string(),
                    kpi: "ltv_cac_ratio".to_string(),
                    op: ComparisonOp::Lt,
                    threshold: 1.0,
                    severity: Severity::High,
                    category: RecommendationCategory::Efficiency,
                    title: "Unit economics under water".to_string(),
                    description_template:
                        "{kpi} is {value}, below {threshold}: each new customer loses money. \
                         Revisit pricing and acquisition spend."
                            .to_string(),
                    action_items: vec![
                        "Break down CAC by channel".to_string(),
                        "Test a pricing change on new cohorts".to_string(),
                    ],
                },
                BusinessRule {
                    id: "churn_above_8pct".to_string(),
                    kpi: "churn_rate".to_string(),
                    op: ComparisonOp::Gt,
                    threshold: 0.08,
                    severity: Severity::High,
                    category: RecommendationCategory::Retention,
                    title: "Monthly churn above 8%".to_string(),
                    description_template:
                        "{kpi} is {value}, above the {threshold} alert line. \
                         Talk to churned customers this week."
                            .to_string(),
                    action_items: vec!["Run 5 churned-customer interviews".to_string()],
                },
            ],
            patterns: vec![
                PatternDef {
                    name: "churn_crisis".to_string(),
                    conditions: vec![
                        PatternCondition {
                            kpi: "churn_rate".to_string(),
                            direction: TrendDirection::Up,
                        },
                        PatternCondition {
                            kpi: "active_users".to_string(),
                            direction: TrendDirection::Down,
                        },
                        PatternCondition {
                            kpi: "nps".to_string(),
                            direction: TrendDirection::Down,
                        },
                    ],
                    severity: Severity::Critical,
                    category: RecommendationCategory::Retention,
                    title: "Churn crisis pattern".to_string(),
                    description_template:
                        "Churn rising while active users and NPS fall — the classic pre-churn \
                         spiral. Retention needs to be the top priority this period."
                            .to_string(),
                    action_items: vec![
                        "Stand up a churn war room".to_string(),
                        "Ship the top retention fix from support tickets".to_string(),
                    ],
                },
                PatternDef {
                    name: "efficient_growth".to_string(),
                    conditions: vec![
                        PatternCondition {
                            kpi: "mrr".to_string(),
                            direction: TrendDirection::Up,
                        },
                        PatternCondition {
                            kpi: "burn_rate".to_string(),
                            direction: TrendDirection::Flat,
                        },
                    ],
                    severity: Severity::Low,
                    category: RecommendationCategory::Growth,
                    title: "Efficient growth".to_string(),
                    description_template:
                        "Revenue is compounding while burn stays flat. Consider leaning into \
                         the working channel before the window closes."
                            .to_string(),
                    action_items: vec!["Double budget on the best-performing channel".to_string()],
                },
                PatternDef {
                    name: "stalled_growth".to_string(),
                    conditions: vec![
                        PatternCondition {
                            kpi: "mrr".to_string(),
                            direction: TrendDirection::Flat,
                        },
                        PatternCondition {
                            kpi: "new_signups".to_string(),
                            direction: TrendDirection::Down,
                        },
                    ],
                    severity: Severity::Medium,
                    category: RecommendationCategory::Growth,
                    title: "Growth is stalling".to_string(),
                    description_template:
                        "Top-of-funnel is shrinking while revenue has gone flat. \
                         Acquisition experiments are overdue."
                            .to_string(),
                    action_items: vec!["Pick 2 acquisition experiments for this sprint".to_string()],
                },
            ],
        }
    }
}
