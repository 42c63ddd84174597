//! Delivery collaborator
//!
//! The engine is channel-agnostic: it hands finished briefings to a
//! `Deliver` implementation and moves on. Delivery failures are logged and
//! surfaced in the run report but never fail the run — the briefing is
//! already persisted in the run output by then.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::EngineError;
use crate::types::Briefing;

/// Channel-agnostic delivery capability.
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, briefing: &Briefing) -> Result<(), EngineError>;

    fn name(&self) -> &'static str;
}

/// Appends briefings as JSON lines to a file.
pub struct JsonLinesDelivery {
    path: PathBuf,
}

impl JsonLinesDelivery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Deliver for JsonLinesDelivery {
    async fn deliver(&self, briefing: &Briefing) -> Result<(), EngineError> {
        let mut line = serde_json::to_vec(briefing)
            .map_err(|e| EngineError::ExternalService(format!("serialize briefing: {e}")))?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| EngineError::ExternalService(format!("open {}: {e}", self.path.display())))?;
        file.write_all(&line)
            .await
            .map_err(|e| EngineError::ExternalService(format!("write briefing: {e}")))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

/// Logs a one-line summary — the default sink for local runs.
pub struct LogDelivery;

#[async_trait]
impl Deliver for LogDelivery {
    async fn deliver(&self, briefing: &Briefing) -> Result<(), EngineError> {
        info!(
            tenant = %briefing.tenant_id,
            items = briefing.total_items(),
            read_secs = briefing.estimated_read_secs,
            notes = briefing.data_quality_notes.len(),
            "Briefing delivered"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Collects briefings in memory for tests.
#[derive(Default)]
pub struct CollectingDelivery {
    pub briefings: std::sync::Mutex<Vec<Briefing>>,
}

#[async_trait]
impl Deliver for CollectingDelivery {
    async fn deliver(&self, briefing: &Briefing) -> Result<(), EngineError> {
        self.briefings
            .lock()
            .map_err(|_| EngineError::ExternalService("collector poisoned".to_string()))?
            .push(briefing.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collect"
    }
}
