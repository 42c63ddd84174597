//! Synthetic tenant generator and detection backtest
//!
//! Generates seeded synthetic KPI datasets for three company profiles
//! (steady growth, churn crisis, efficient growth), optionally injects
//! known anomalies, runs the full pipeline against a temporary store and
//! reports detection recall / false positives against the ground truth.
//!
//! ```bash
//! synthetic --tenants 20 --seed 7
//! synthetic --tenants 5 --write-dir tenants   # emit tenant JSON files
//! ```

use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulse_engine::deliver::LogDelivery;
use pulse_engine::types::{
    ActivityFeeds, BriefingKind, FounderProfile, KpiPoint, KpiSeries, SamplingFrequency,
    TenantSnapshot,
};
use pulse_engine::{
    EngineConfig, EngineStore, PipelineCoordinator, RuleTables, TenantInputs,
};

#[derive(Parser, Debug)]
#[command(name = "synthetic", about = "Synthetic tenant generator / detection backtest")]
struct Args {
    /// Number of synthetic tenants
    #[arg(long, default_value_t = 10)]
    tenants: usize,

    /// Days of history per KPI
    #[arg(long, default_value_t = 120)]
    days: usize,

    /// RNG seed (fixed seed = reproducible dataset)
    #[arg(long, default_value_t = 47)]
    seed: u64,

    /// Fraction of tenants given an injected last-day anomaly
    #[arg(long, default_value_t = 0.5)]
    anomaly_fraction: f64,

    /// Write tenant JSON files here instead of running the backtest
    #[arg(long)]
    write_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum Profile {
    SteadyGrowth,
    ChurnCrisis,
    EfficientGrowth,
}

impl Profile {
    fn pick(rng: &mut StdRng) -> Self {
        match rng.gen_range(0..3) {
            0 => Profile::SteadyGrowth,
            1 => Profile::ChurnCrisis,
            _ => Profile::EfficientGrowth,
        }
    }
}

/// One generated tenant plus its injected ground truth.
struct GeneratedTenant {
    inputs: TenantInputs,
    /// KPIs with an injected final-day anomaly.
    injected: Vec<String>,
}

fn generate_tenant(id: usize, days: usize, inject: bool, rng: &mut StdRng) -> GeneratedTenant {
    let profile = Profile::pick(rng);
    let start = Utc
        .timestamp_opt(1_700_000_000, 0)
        .single()
        .unwrap_or_else(Utc::now)
        - Duration::days(days as i64);

    let weekly = [1.0, 1.01, 1.03, 1.04, 1.02, 0.95, 0.92];
    // Normal::new only fails on a negative sigma; fall back to noiseless
    let noise = Normal::new(0.0, 0.01).ok();

    let mut make_series = |name: &str, base: f64, daily_growth: f64, noise_scale: f64| {
        let mut series = KpiSeries::new(name, SamplingFrequency::Daily);
        for day in 0..days {
            let trend = base * (1.0 + daily_growth).powi(day as i32);
            let seasonal = weekly[day % 7];
            let eps = 1.0 + noise.map_or(0.0, |n| n.sample(&mut *rng)) * noise_scale;
            series.points.push(KpiPoint {
                timestamp: start + Duration::days(day as i64),
                value: (trend * seasonal * eps).max(0.0),
            });
        }
        series
    };

    let (mrr_growth, churn_base, churn_growth, burn_growth) = match profile {
        Profile::SteadyGrowth => (0.02 / 30.0, 0.04, 0.0, 0.01 / 30.0),
        Profile::ChurnCrisis => (-0.01 / 30.0, 0.06, 0.03 / 30.0, 0.01 / 30.0),
        Profile::EfficientGrowth => (0.05 / 30.0, 0.03, -0.005 / 30.0, 0.0),
    };

    let mut snapshot = TenantSnapshot::new(format!("tenant-{id:03}"));
    snapshot.series.push(make_series("mrr", 10_000.0, mrr_growth, 1.0));
    snapshot.series.push(make_series("active_users", 1_500.0, mrr_growth * 0.8, 1.5));
    snapshot.series.push(make_series("churn_rate", churn_base, churn_growth, 2.0));
    snapshot.series.push(make_series("burn_rate", 50_000.0, burn_growth, 0.8));
    snapshot.series.push(make_series("new_signups", 80.0, mrr_growth * 1.2, 3.0));
    snapshot.series.push(make_series(
        "runway_months",
        match profile {
            Profile::ChurnCrisis => 5.0,
            _ => 14.0,
        },
        -0.2 / 30.0,
        0.5,
    ));

    // Inject a known single-day anomaly on one KPI
    let mut injected = Vec::new();
    if inject {
        let target = rng.gen_range(0..3usize);
        let series = &mut snapshot.series[target];
        let kpi = series.kpi_name.clone();
        if let Some(last) = series.points.last_mut() {
            let factor = if rng.gen_bool(0.5) { 0.55 } else { 1.8 };
            last.value *= factor;
            injected.push(kpi);
        }
    }

    GeneratedTenant {
        inputs: TenantInputs {
            snapshot,
            feeds: ActivityFeeds::default(),
            profile: FounderProfile::default(),
            kind: BriefingKind::StartOfPeriod,
        },
        injected,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let generated: Vec<GeneratedTenant> = (0..args.tenants)
        .map(|i| {
            let inject = (i as f64 + 0.5) / args.tenants as f64 <= args.anomaly_fraction;
            generate_tenant(i, args.days, inject, &mut rng)
        })
        .collect();

    if let Some(dir) = &args.write_dir {
        std::fs::create_dir_all(dir)?;
        for tenant in &generated {
            let path = dir.join(format!("{}.json", tenant.inputs.snapshot.tenant_id));
            std::fs::write(&path, serde_json::to_vec_pretty(&tenant.inputs)?)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        info!(count = generated.len(), dir = %dir.display(), "Tenant files written");
        return Ok(());
    }

    // Backtest against ground truth
    let coordinator = Arc::new(PipelineCoordinator::new(
        EngineConfig::default(),
        Arc::new(RuleTables::builtin()),
        EngineStore::temporary().context("opening temporary store")?,
        None,
        Arc::new(LogDelivery),
    ));

    let cancel = CancellationToken::new();
    let mut true_positives = 0usize;
    let mut false_negatives = 0usize;
    let mut false_positives = 0usize;
    let mut total_injected = 0usize;

    for tenant in &generated {
        let result = coordinator
            .run_tenant(tenant.inputs.clone(), 0, &cancel)
            .await
            .context("tenant run")?;

        total_injected += tenant.injected.len();
        for kpi in &tenant.injected {
            if result.anomalies.iter().any(|a| &a.kpi_name == kpi) {
                true_positives += 1;
            } else {
                false_negatives += 1;
            }
        }
        false_positives += result
            .anomalies
            .iter()
            .filter(|a| !tenant.injected.contains(&a.kpi_name))
            .count();
    }

    let recall = if total_injected > 0 {
        true_positives as f64 / total_injected as f64
    } else {
        1.0
    };
    info!(
        tenants = generated.len(),
        injected = total_injected,
        true_positives,
        false_negatives,
        false_positives,
        recall = format!("{:.2}", recall),
        "Backtest complete"
    );

    Ok(())
}
