// src/core/state/stats.rs

//! Contains state definitions and logic for server statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Holds all state and logic related to server-wide statistics and monitoring.
#[derive(Debug)]
pub struct StatsState {
    /// The total number of connections accepted by the server since startup.
    total_connections: AtomicU64,
    /// The total number of commands processed by the server since startup.
    total_commands: AtomicU64,
    /// Commits that entered the commit gate and were released by an
    /// acknowledgment (did not take a fast path).
    commits_acknowledged: AtomicU64,
    /// Commits that took a fast path out of the gate (no sync standbys
    /// defined, or the position was already released).
    commits_fast_pathed: AtomicU64,
    /// Commits whose wait for replication acknowledgment was abandoned due
    /// to session termination or supervisor death. The local commit stood;
    /// only the replication wait was cut short.
    commits_terminated: AtomicU64,
}

impl Default for StatsState {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsState {
    /// Creates a new `StatsState` with initialized counters.
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            total_commands: AtomicU64::new(0),
            commits_acknowledged: AtomicU64::new(0),
            commits_fast_pathed: AtomicU64::new(0),
            commits_terminated: AtomicU64::new(0),
        }
    }

    /// Atomically increments the total number of connections received.
    pub fn increment_total_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the total number of connections received.
    pub fn get_total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    /// Atomically increments the total number of commands processed.
    pub fn increment_total_commands(&self) {
        self.total_commands.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the total number of commands processed.
    pub fn get_total_commands(&self) -> u64 {
        self.total_commands.load(Ordering::Relaxed)
    }

    pub fn record_commit_wait_outcome(&self, outcome: crate::core::commitgate::WaitOutcome) {
        use crate::core::commitgate::WaitOutcome;
        match outcome {
            WaitOutcome::AlreadySatisfied => {
                self.commits_fast_pathed.fetch_add(1, Ordering::Relaxed);
            }
            WaitOutcome::Acknowledged => {
                self.commits_acknowledged.fetch_add(1, Ordering::Relaxed);
            }
            WaitOutcome::Terminated => {
                self.commits_terminated.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn commits_acknowledged(&self) -> u64 {
        self.commits_acknowledged.load(Ordering::Relaxed)
    }

    pub fn commits_fast_pathed(&self) -> u64 {
        self.commits_fast_pathed.load(Ordering::Relaxed)
    }

    pub fn commits_terminated(&self) -> u64 {
        self.commits_terminated.load(Ordering::Relaxed)
    }
}
