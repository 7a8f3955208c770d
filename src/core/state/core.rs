// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared server-wide state.

use super::stats::StatsState;
use crate::config::Config;
use crate::core::commitgate::{reconcile_sync_standbys_defined, CommitGate};
use crate::core::errors::CommitGateError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::{filter::EnvFilter, reload};

/// The central struct holding all shared, server-wide state.
/// This struct is wrapped in an `Arc` and passed to nearly every task and
/// connection handler, providing a single source of truth for the server's
/// configuration and dynamic state.
#[derive(Debug)]
pub struct ServerState {
    /// The server's runtime configuration, wrapped in a Mutex to allow for
    /// dynamic changes via a config reload.
    pub config: Arc<Mutex<Config>>,
    /// The synchronous-replication commit gate: holds committing sessions
    /// until a qualifying standby acknowledges their commit LSN.
    pub commit_gate: Arc<CommitGate>,
    /// A handle to the logging filter, allowing for dynamic log level
    /// changes at runtime.
    pub log_reload_handle: Option<Arc<reload::Handle<EnvFilter, tracing_subscriber::Registry>>>,
    /// Server-wide statistics, including commit-gate wait outcomes.
    pub stats: StatsState,
}

impl ServerState {
    /// Initializes the entire server state from the given configuration.
    pub fn initialize(
        config: Config,
        log_reload_handle: Option<Arc<reload::Handle<EnvFilter, tracing_subscriber::Registry>>>,
    ) -> Result<Arc<Self>, CommitGateError> {
        let commit_gate = Arc::new(CommitGate::new(config.max_wal_senders));

        let names = config.synchronous_standby_names.clone();
        reconcile_sync_standbys_defined(&commit_gate, &names);

        Ok(Arc::new(Self {
            config: Arc::new(Mutex::new(config)),
            commit_gate,
            log_reload_handle,
            stats: StatsState::new(),
        }))
    }

    /// Re-reads `synchronous_standby_names` from `raw` and reconciles the
    /// commit gate against it, returning the number of waiters drained by
    /// the change (nonzero only when the new list is empty).
    pub async fn reload_standby_names(&self, raw: &str) -> Result<usize, CommitGateError> {
        let names = crate::config::Config::reparse_standby_names(raw)
            .map_err(|e| CommitGateError::ConfigSyntax(e.to_string()))?;
        let drained = reconcile_sync_standbys_defined(&self.commit_gate, &names);

        let mut config = self.config.lock().await;
        config.synchronous_standby_names = names;
        Ok(drained)
    }
}
