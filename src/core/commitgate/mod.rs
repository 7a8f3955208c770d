// src/core/commitgate/mod.rs

//! Synchronous-replication commit gate: holds committing sessions until a
//! qualifying standby has acknowledged their commit LSN.
//!
//! Module layout mirrors the protocol's own decomposition:
//! - [`lsn`] — the log-sequence-number type waits and acknowledgments are
//!   measured in.
//! - [`mode`] — the user-visible durability setting and its mapping onto
//!   an internal wait mode, plus standby priority assignment.
//! - [`slot`] — one record per waiting session.
//! - [`queue`] — the ordered per-mode collection of waiting slots.
//! - [`sender`] — one descriptor per streaming-replication sender.
//! - [`control`] — the control block tying queues, senders, and the
//!   released-LSN high-water marks together under one lock.
//! - [`gate`] — the session-side entry point (`wait_for_lsn`) and its
//!   cancellation/cleanup counterparts.
//! - [`releaser`] — the sender-side priority election and wake pass.
//! - [`watcher`] — config-change reconciliation.

pub mod control;
pub mod gate;
pub mod lsn;
pub mod mode;
pub mod queue;
pub mod releaser;
pub mod sender;
pub mod slot;
pub mod watcher;

pub use control::{CommitGate, EnterOutcome, DEFAULT_MAX_SENDERS};
pub use gate::{cancel_wait, cleanup_at_exit, wait_for_lsn, WaitOutcome, WaitSignals};
pub use lsn::Lsn;
pub use mode::{assign_commit_mode, get_standby_priority, validate_names, SynchronousCommit, WaitMode};
pub use releaser::release_waiters;
pub use sender::{SenderDescriptor, SenderState};
pub use slot::{SlotId, SlotState, WaitSlot};
pub use watcher::reconcile_sync_standbys_defined;
