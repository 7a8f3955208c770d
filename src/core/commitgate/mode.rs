// src/core/commitgate/mode.rs

//! Mode Selector & Priority: translates the user-visible commit-durability
//! setting into an internal wait mode, and a sender's configured identifier
//! into its priority.

use serde::{Deserialize, Serialize};

/// The durability setting a session asks `synchronous_commit` for.
///
/// This is the external, user-visible configuration value. `assign_commit_mode`
/// maps it onto the internal [`WaitMode`] used by the queueing machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynchronousCommit {
    RemoteWrite,
    RemoteFlush,
    Off,
    Local,
}

impl Default for SynchronousCommit {
    fn default() -> Self {
        SynchronousCommit::RemoteFlush
    }
}

/// The internal wait mode a session blocks on. `NoWait` is a fast-path
/// sentinel with no backing queue; `Write` and `Flush` each own one queue
/// in the [`super::control::CommitGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitMode {
    NoWait,
    Write,
    Flush,
}

/// The number of modes that own a wait queue (`Write`, `Flush`). `NoWait`
/// is a sentinel and is not counted.
pub const NUM_MODES: usize = 2;

impl WaitMode {
    /// The array index into `CommitGate::queues`/`released_lsn` for this mode.
    /// Returns `None` for `NoWait`, which has no queue.
    pub fn index(self) -> Option<usize> {
        match self {
            WaitMode::NoWait => None,
            WaitMode::Write => Some(0),
            WaitMode::Flush => Some(1),
        }
    }

    pub fn from_index(i: usize) -> WaitMode {
        match i {
            0 => WaitMode::Write,
            1 => WaitMode::Flush,
            _ => panic!("wait mode index out of range: {i}"),
        }
    }
}

/// Maps `{RemoteWrite -> Write, RemoteFlush -> Flush, else -> NoWait}`.
///
/// Applied whenever `synchronous_commit` is (re)configured; the resulting
/// `WaitMode` is visible to the *next* `wait_for_lsn` call, not any call
/// already in flight.
pub fn assign_commit_mode(new: SynchronousCommit) -> WaitMode {
    match new {
        SynchronousCommit::RemoteWrite => WaitMode::Write,
        SynchronousCommit::RemoteFlush => WaitMode::Flush,
        SynchronousCommit::Off | SynchronousCommit::Local => WaitMode::NoWait,
    }
}

/// Returns a sender's priority from its position (1-based) in the configured
/// synchronous standby name list, or `0` ("not a candidate") if the name
/// isn't listed.
///
/// A degenerate deployment with at most one candidate sender may instead
/// assign a constant positive priority to any listed name; this crate
/// implements the general "position in list" form, per the spec's design
/// note that treats it as the intended behavior.
pub fn get_standby_priority(names: &[String], standby_name: &str) -> u32 {
    names
        .iter()
        .position(|n| n == standby_name)
        .map(|pos| (pos + 1) as u32)
        .unwrap_or(0)
}

/// Syntactically parses a comma-separated identifier list. Does not assign
/// priorities — callers at config-load time cannot yet know sender identity.
///
/// Rejects an empty identifier between commas (e.g. `"a,,b"`) and bare
/// whitespace entries, but otherwise accepts any non-empty trimmed token.
pub fn validate_names(raw: &str) -> Result<Vec<String>, crate::core::errors::CommitGateError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for (i, part) in trimmed.split(',').enumerate() {
        let name = part.trim();
        if name.is_empty() {
            return Err(crate::core::errors::CommitGateError::ConfigSyntax(format!(
                "empty standby name at position {} in '{}'",
                i + 1,
                raw
            )));
        }
        names.push(name.to_string());
    }
    Ok(names)
}
