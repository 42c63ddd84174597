//! pulse-engine - KPI Insights & Briefings Engine
//!
//! Batch/cron-driven analytical pipeline: reads per-tenant KPI snapshots
//! and activity feeds from JSON files, runs the five analytical stages and
//! delivers a briefing per tenant.
//!
//! # Usage
//!
//! ```bash
//! # Single run over all tenants in ./tenants
//! pulse-engine --tenants-dir tenants
//!
//! # Scheduled mode, every 6 hours, writing briefings to a JSONL file
//! pulse-engine --tenants-dir tenants --interval-secs 21600 --out briefings.jsonl
//! ```
//!
//! # Environment Variables
//!
//! - `PULSE_CONFIG`: path to the engine TOML config
//! - `PULSE_RULES`: path to the rule/pattern tables TOML
//! - `RUST_LOG`: logging filter (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pulse_engine::deliver::{Deliver, JsonLinesDelivery, LogDelivery};
use pulse_engine::recommend::{Enrichment, HttpEnrichment};
use pulse_engine::{
    EngineConfig, EngineStore, PipelineCoordinator, RuleTables, TenantInputs,
};

#[derive(Parser, Debug)]
#[command(name = "pulse-engine", about = "KPI Insights & Briefings Engine")]
struct Args {
    /// Directory of per-tenant JSON input files
    #[arg(long, default_value = "tenants")]
    tenants_dir: PathBuf,

    /// Engine state database path
    #[arg(long, default_value = "data/engine_store")]
    store_path: PathBuf,

    /// Append delivered briefings to this JSONL file (logs only if unset)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Run on a fixed interval in seconds; 0 runs once and exits
    #[arg(long, default_value_t = 0)]
    interval_secs: u64,

    /// Optional enrichment service endpoint
    #[arg(long, env = "PULSE_ENRICH_ENDPOINT")]
    enrich_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = EngineConfig::load();
    let tables = Arc::new(RuleTables::load());
    let store = EngineStore::open(&args.store_path)
        .with_context(|| format!("opening engine store at {}", args.store_path.display()))?;

    let delivery: Arc<dyn Deliver> = match &args.out {
        Some(path) => Arc::new(JsonLinesDelivery::new(path)),
        None => Arc::new(LogDelivery),
    };
    let enrichment: Option<Arc<dyn Enrichment>> = args
        .enrich_endpoint
        .as_ref()
        .map(|endpoint| Arc::new(HttpEnrichment::new(endpoint.clone())) as Arc<dyn Enrichment>);
    if enrichment.is_some() {
        info!("Enrichment backend configured");
    }

    let coordinator = Arc::new(PipelineCoordinator::new(
        config,
        tables,
        store.clone(),
        enrichment,
        delivery,
    ));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                cancel.cancel();
            }
        });
    }

    loop {
        let tenants = load_tenants(&args.tenants_dir)?;
        if tenants.is_empty() {
            warn!(dir = %args.tenants_dir.display(), "No tenant input files found");
        } else {
            let run_index = store.next_run_index().context("advancing run counter")?;
            let reports = coordinator.run_all(tenants, run_index, &cancel).await;
            info!(
                run = run_index,
                tenants = reports.len(),
                anomalies = reports.iter().map(|r| r.anomalies).sum::<usize>(),
                recommendations = reports.iter().map(|r| r.recommendations).sum::<usize>(),
                "Run complete"
            );
        }

        if args.interval_secs == 0 || cancel.is_cancelled() {
            break;
        }
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(std::time::Duration::from_secs(args.interval_secs)) => {}
        }
    }

    Ok(())
}

/// Load every `*.json` tenant file in the directory. A malformed file is
/// skipped with an error log; it never blocks the other tenants.
fn load_tenants(dir: &PathBuf) -> Result<Vec<TenantInputs>> {
    let mut tenants = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading tenants dir {}", dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match std::fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str::<TenantInputs>(&s).map_err(Into::into))
        {
            Ok(inputs) => tenants.push(inputs),
            Err(e) => error!(file = %path.display(), error = %e, "Skipping malformed tenant file"),
        }
    }
    tenants.sort_by(|a, b| a.snapshot.tenant_id.cmp(&b.snapshot.tenant_id));
    Ok(tenants)
}
