//! Hot-reload orchestrator: load the catalog, rebuild the semantic index,
//! swap the shared state, all or nothing.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{json, Map};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::catalog::{load_catalog, CatalogError};
use crate::observability::log_system_event;
use crate::routing::{MatchError, SemanticIndex, SemanticMatcher};
use crate::state::{RouterState, SharedRouterState};

#[derive(Error, Debug)]
pub enum ReloadError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("failed to rebuild semantic index: {0}")]
    Index(#[from] MatchError),
}

/// Result of a reload trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The new catalog and index are live.
    Reloaded {
        reload_count: u64,
        agent_count: usize,
    },
    /// Another reload was already running; this trigger was a no-op.
    InFlight,
}

/// Serializes reloads and swaps the `(Catalog, SemanticIndex)` pair
/// atomically. A failed reload leaves the previous state untouched.
pub struct ConfigReloader {
    state: SharedRouterState,
    matcher: SemanticMatcher,
    config_path: PathBuf,
    reload_lock: Mutex<()>,
    reload_count: AtomicU64,
}

impl ConfigReloader {
    pub fn new(
        state: SharedRouterState,
        matcher: SemanticMatcher,
        config_path: impl Into<PathBuf>,
    ) -> ConfigReloader {
        ConfigReloader {
            state,
            matcher,
            config_path: config_path.into(),
            reload_lock: Mutex::new(()),
            reload_count: AtomicU64::new(0),
        }
    }

    /// Number of successful reloads since startup.
    pub fn reload_count(&self) -> u64 {
        self.reload_count.load(Ordering::SeqCst)
    }

    /// Reloads the catalog and index. Concurrent triggers are no-ops (the
    /// next filesystem event catches any missed change); failures abort
    /// with the previous state intact and are audit-logged.
    pub async fn reload(&self) -> Result<ReloadOutcome, ReloadError> {
        let Ok(_guard) = self.reload_lock.try_lock() else {
            tracing::info!("config reload already in progress, skipping");
            return Ok(ReloadOutcome::InFlight);
        };

        tracing::info!("reloading agent configuration...");
        let mut fields = Map::new();
        fields.insert("config_path".into(), json!(self.config_path.display().to_string()));
        log_system_event("config_reload_started", fields);

        let catalog = match load_catalog(&self.config_path) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!("failed to load new configuration: {}", e);
                self.log_failure("load_error", &e.to_string());
                return Err(e.into());
            }
        };

        let index = match SemanticIndex::build(self.matcher.embedder(), &catalog).await {
            Ok(index) => index,
            Err(e) => {
                tracing::error!("failed to rebuild semantic index: {}", e);
                self.log_failure("index_build_error", &e.to_string());
                return Err(e.into());
            }
        };

        let agent_count = catalog.agents.len();
        let agent_ids: Vec<String> = catalog.agents.iter().map(|a| a.id.clone()).collect();
        self.state
            .store(Some(Arc::new(RouterState { catalog, index })));
        let reload_count = self.reload_count.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            "configuration reloaded successfully (reload #{}): {} agents",
            reload_count,
            agent_count
        );
        let mut fields = Map::new();
        fields.insert("reload_count".into(), json!(reload_count));
        fields.insert("agent_count".into(), json!(agent_count));
        fields.insert("agent_ids".into(), json!(agent_ids));
        log_system_event("config_reload_success", fields);

        Ok(ReloadOutcome::Reloaded {
            reload_count,
            agent_count,
        })
    }

    fn log_failure(&self, reason: &str, error: &str) {
        let mut fields = Map::new();
        fields.insert("reason".into(), json!(reason));
        fields.insert("error".into(), json!(error.chars().take(200).collect::<String>()));
        log_system_event("config_reload_failed", fields);
    }
}
