//! Engine state persistence
//!
//! A sled database with one named tree per concern: feedback records,
//! calibration statistics, engagement history, cached seasonal models and
//! critical cooldowns. All values are JSON; corrupt values are skipped with
//! a warning rather than trusted. The store is passed explicitly through
//! the pipeline — no global tree handles — and every key is prefixed by
//! tenant, so no state is shared across tenants.
//!
//! A schema version lives in the meta tree; on mismatch the adaptive state
//! is cleared and rebuilt rather than reinterpreted.

pub mod feedback;
pub mod state;

use std::path::Path;
use tracing::{info, warn};

use crate::error::StoreError;

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 1;

const META_TREE: &str = "meta";
const SCHEMA_KEY: &[u8] = b"schema_version";

pub(crate) const FEEDBACK_TREE: &str = "feedback";
pub(crate) const CALIBRATION_TREE: &str = "calibration";
pub(crate) const ENGAGEMENT_TREE: &str = "engagement";
pub(crate) const SEASONAL_TREE: &str = "seasonal_models";
pub(crate) const COOLDOWN_TREE: &str = "cooldown";

/// Handle over the engine's adaptive/learned state.
#[derive(Clone)]
pub struct EngineStore {
    db: sled::Db,
}

impl EngineStore {
    /// Open (or create) the store at `path`, clearing adaptive state on a
    /// schema version mismatch.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let store = Self { db };
        store.check_schema()?;
        Ok(store)
    }

    /// In-memory store for tests and one-shot runs.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        let store = Self { db };
        store.check_schema()?;
        Ok(store)
    }

    fn check_schema(&self) -> Result<(), StoreError> {
        let meta = self.db.open_tree(META_TREE)?;
        match meta.get(SCHEMA_KEY)? {
            Some(bytes) => {
                let found = serde_json::from_slice::<u32>(&bytes).unwrap_or(0);
                if found != SCHEMA_VERSION {
                    warn!(
                        found,
                        expected = SCHEMA_VERSION,
                        "Engine store schema mismatch — clearing adaptive state"
                    );
                    for name in [
                        FEEDBACK_TREE,
                        CALIBRATION_TREE,
                        ENGAGEMENT_TREE,
                        SEASONAL_TREE,
                        COOLDOWN_TREE,
                    ] {
                        self.db.open_tree(name)?.clear()?;
                    }
                    meta.insert(SCHEMA_KEY, serde_json::to_vec(&SCHEMA_VERSION)?)?;
                }
            }
            None => {
                meta.insert(SCHEMA_KEY, serde_json::to_vec(&SCHEMA_VERSION)?)?;
                info!(version = SCHEMA_VERSION, "Engine store initialized");
            }
        }
        Ok(())
    }

    pub(crate) fn tree(&self, name: &str) -> Result<sled::Tree, StoreError> {
        Ok(self.db.open_tree(name)?)
    }

    /// Flush to disk. Called at the end of each run.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Monotonic run counter, persisted so seasonal-model staleness
    /// survives process restarts.
    pub fn next_run_index(&self) -> Result<u64, StoreError> {
        let meta = self.tree(META_TREE)?;
        let next = match meta.get(b"run_index")? {
            Some(bytes) => serde_json::from_slice::<u64>(&bytes).unwrap_or(0) + 1,
            None => 0,
        };
        meta.insert(b"run_index", serde_json::to_vec(&next)?)?;
        Ok(next)
    }
}

/// Composite key helper: `tenant:suffix`.
pub(crate) fn scoped_key(tenant: &str, suffix: &str) -> Vec<u8> {
    format!("{tenant}:{suffix}").into_bytes()
}
