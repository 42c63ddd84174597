//! KPI series types: KpiPoint, KpiSeries, SamplingFrequency, TenantSnapshot
//!
//! Series are owned by external ingestion and read-only to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Sampling Frequency
// ============================================================================

/// Sampling frequency of a KPI series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SamplingFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl SamplingFrequency {
    /// Number of points in one seasonal cycle.
    ///
    /// Daily series carry a weekly cycle (day-of-week effects); weekly
    /// series a rough monthly cycle; monthly series a yearly cycle.
    pub fn season_length(self) -> usize {
        match self {
            SamplingFrequency::Daily => 7,
            SamplingFrequency::Weekly => 4,
            SamplingFrequency::Monthly => 12,
        }
    }

    /// Points per comparison window for a given timeframe window in days.
    pub fn points_per_days(self, days: usize) -> usize {
        match self {
            SamplingFrequency::Daily => days,
            SamplingFrequency::Weekly => days.div_ceil(7),
            SamplingFrequency::Monthly => days.div_ceil(30),
        }
    }

    /// Nominal spacing between points in days.
    pub fn interval_days(self) -> i64 {
        match self {
            SamplingFrequency::Daily => 1,
            SamplingFrequency::Weekly => 7,
            SamplingFrequency::Monthly => 30,
        }
    }
}

impl std::fmt::Display for SamplingFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplingFrequency::Daily => write!(f, "daily"),
            SamplingFrequency::Weekly => write!(f, "weekly"),
            SamplingFrequency::Monthly => write!(f, "monthly"),
        }
    }
}

// ============================================================================
// KPI Series
// ============================================================================

/// A single observation in a KPI series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct KpiPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// An ordered, timestamped KPI time series for one tenant metric.
///
/// Owned by external ingestion; the engine never mutates it. Points are
/// expected oldest-first — `is_ordered()` validates this at stage entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiSeries {
    /// Canonical KPI name (e.g. "mrr", "active_users", "churn_rate").
    pub kpi_name: String,
    /// Sampling frequency of the points.
    pub frequency: SamplingFrequency,
    /// Observations, oldest first.
    pub points: Vec<KpiPoint>,
}

impl KpiSeries {
    pub fn new(kpi_name: impl Into<String>, frequency: SamplingFrequency) -> Self {
        Self {
            kpi_name: kpi_name.into(),
            frequency,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Raw values, oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Most recent observation.
    pub fn last(&self) -> Option<&KpiPoint> {
        self.points.last()
    }

    /// The trailing `n` values (fewer if the series is shorter).
    pub fn tail_values(&self, n: usize) -> Vec<f64> {
        let start = self.points.len().saturating_sub(n);
        self.points[start..].iter().map(|p| p.value).collect()
    }

    /// Whether timestamps are strictly non-decreasing.
    pub fn is_ordered(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    }

    /// Largest gap between consecutive points, in multiples of the nominal
    /// sampling interval. 1.0 means perfectly regular.
    pub fn max_gap_intervals(&self) -> f64 {
        let interval_secs = (self.frequency.interval_days() * 86_400) as f64;
        self.points
            .windows(2)
            .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds() as f64 / interval_secs)
            .fold(1.0_f64, f64::max)
    }
}

// ============================================================================
// Tenant Snapshot
// ============================================================================

/// All KPI series for a tenant at run start — the cross-KPI view consumed
/// by the correlation engine and the multivariate detector tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSnapshot {
    pub tenant_id: String,
    pub series: Vec<KpiSeries>,
}

impl TenantSnapshot {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            series: Vec::new(),
        }
    }

    /// Look up a series by KPI name.
    pub fn get(&self, kpi_name: &str) -> Option<&KpiSeries> {
        self.series.iter().find(|s| s.kpi_name == kpi_name)
    }

    /// KPI names in snapshot order.
    pub fn kpi_names(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.kpi_name.as_str()).collect()
    }
}
