// src/core/commitgate/gate.rs

//! The session-side half of the commit-gate protocol: the entry point a
//! committing session calls, and its cancellation/cleanup counterparts.
//!
//! There is deliberately no timeout here (see spec §5, "Cancellation/timeout":
//! "There is no timeout"). A wait ends only via acknowledgment, termination,
//! or the supervisor dying; query cancellation is observed but ignored.

use super::control::{CommitGate, EnterOutcome};
use super::lsn::Lsn;
use super::mode::WaitMode;
use super::slot::{SlotState, WaitSlot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// The session-process-facing signals `wait_for_lsn`'s sleep loop reacts to
/// on every iteration. One instance per session; shared with whatever task
/// observes termination requests, cancellation requests, and supervisor
/// liveness for that session.
#[derive(Debug, Default)]
pub struct WaitSignals {
    /// Fires when the session has been asked to terminate mid-wait.
    pub terminate: tokio::sync::Notify,
    /// Fires when the supervising process is believed to have died; treated
    /// identically to `terminate` (spec §7, SupervisorDead).
    pub supervisor_down: tokio::sync::Notify,
    /// Set by a signal handler equivalent when a query-cancellation request
    /// arrives. Observed and cleared by the loop, which only logs a warning
    /// — canceling after local commit risks cluster inconsistency (spec §9).
    pub cancel_pending: AtomicBool,
}

impl WaitSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_cancel(&self) {
        self.cancel_pending.store(true, Ordering::Relaxed);
    }
}

/// Why a [`wait_for_lsn`] call returned without (or with) the LSN being
/// acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The wait mode was `NoWait`, the coordinator's streaming scan found no
    /// candidate, or the position was already released: the caller need not
    /// have slept.
    AlreadySatisfied,
    /// A qualifying standby acknowledged the position.
    Acknowledged,
    /// The session was asked to terminate, or the supervisor died, while
    /// waiting. The local commit stands; only replication acknowledgment was
    /// abandoned.
    Terminated,
}

/// Blocks the calling task until `commit_lsn` is acknowledged under `mode`,
/// or until termination/supervisor death cuts the wait short.
///
/// `is_coordinator` gates two different fast paths (spec §4.2 steps 3 and
/// 5): a coordinator skips the `sync_standbys_defined` check entirely and
/// instead scans for any sender that looks effectively streaming; a
/// non-coordinator takes the ordinary `sync_standbys_defined`/`released_lsn`
/// fast path.
pub async fn wait_for_lsn(
    gate: &CommitGate,
    slot: &Arc<WaitSlot>,
    mode: WaitMode,
    commit_lsn: Lsn,
    is_coordinator: bool,
    signals: &WaitSignals,
) -> WaitOutcome {
    let Some(_idx) = mode.index() else {
        return WaitOutcome::AlreadySatisfied;
    };
    if !commit_lsn.is_valid() {
        return WaitOutcome::AlreadySatisfied;
    }

    debug_assert_eq!(
        slot.state(),
        SlotState::NotWaiting,
        "wait_for_lsn called with an already-linked slot; the commit-gate protocol is not reentrant"
    );

    if is_coordinator && no_sender_effectively_streaming(gate) {
        return WaitOutcome::AlreadySatisfied;
    }

    match gate.enter_wait(slot, mode, commit_lsn, is_coordinator) {
        EnterOutcome::FastPathReleased => return WaitOutcome::AlreadySatisfied,
        EnterOutcome::Enqueued => {}
    }

    let outcome = loop {
        tokio::select! {
            _ = slot.latch.notified() => {}
            _ = signals.terminate.notified() => {
                warn!(
                    slot = slot.id,
                    "canceling the wait for synchronous replication; the transaction has already committed locally, but might not have been replicated"
                );
                cancel_wait(gate, slot);
                break WaitOutcome::Terminated;
            }
            _ = signals.supervisor_down.notified() => {
                cancel_wait(gate, slot);
                break WaitOutcome::Terminated;
            }
        }

        if slot.state() == SlotState::WaitComplete {
            break WaitOutcome::Acknowledged;
        }

        if signals.cancel_pending.swap(false, Ordering::Relaxed) {
            warn!(
                slot = slot.id,
                "ignoring query cancellation while waiting for synchronous replication acknowledgment"
            );
        }
        // Spurious wakeup (e.g. a different mode's release cycle) with the
        // slot still linked: loop and sleep again.
    };

    if outcome == WaitOutcome::Acknowledged {
        slot.set_state(SlotState::NotWaiting);
        slot.set_wait_lsn(Lsn::INVALID);
    }

    outcome
}

/// Spec §4.2 step 3: a coordinator's fast path skips `sync_standbys_defined`
/// entirely and instead checks whether any sender looks close enough to
/// streaming that a wait is pointless to even register.
fn no_sender_effectively_streaming(gate: &CommitGate) -> bool {
    !gate.senders().iter().any(|s| s.is_effectively_streaming())
}

/// Detaches `slot` from whichever queue it may be linked into, without
/// regard to its current state. Safe to call on an unlinked slot (P8).
///
/// Used both for voluntary cancellation and, via [`cleanup_at_exit`], for
/// abnormal session exit.
pub fn cancel_wait(gate: &CommitGate, slot: &Arc<WaitSlot>) {
    gate.dequeue(slot);
}

/// Identical to [`cancel_wait`]; kept as a distinct name so call sites that
/// run on session teardown read the same as the protocol they implement.
pub fn cleanup_at_exit(gate: &CommitGate, slot: &Arc<WaitSlot>) {
    gate.dequeue(slot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commitgate::control::DEFAULT_MAX_SENDERS;
    use crate::core::commitgate::sender::SenderState;

    #[tokio::test]
    async fn no_sync_standbys_returns_immediately() {
        let gate = CommitGate::new(DEFAULT_MAX_SENDERS);
        let slot = WaitSlot::new(gate.new_slot_id());
        let signals = WaitSignals::new();
        let outcome = wait_for_lsn(&gate, &slot, WaitMode::Flush, Lsn(0x100), false, &signals).await;
        assert_eq!(outcome, WaitOutcome::AlreadySatisfied);
    }

    #[tokio::test]
    async fn coordinator_with_no_streaming_sender_skips_enqueue() {
        let gate = CommitGate::new(DEFAULT_MAX_SENDERS);
        gate.set_sync_standbys_defined(true);
        let slot = WaitSlot::new(gate.new_slot_id());
        let signals = WaitSignals::new();
        let outcome = wait_for_lsn(&gate, &slot, WaitMode::Flush, Lsn(0x100), true, &signals).await;
        assert_eq!(outcome, WaitOutcome::AlreadySatisfied);
        assert_eq!(gate.queue_len(WaitMode::Flush), 0);
    }

    #[tokio::test]
    async fn coordinator_with_streaming_sender_enqueues_and_waits() {
        let gate = Arc::new(CommitGate::new(DEFAULT_MAX_SENDERS));
        gate.set_sync_standbys_defined(true);
        let s0 = &gate.senders()[0];
        s0.accept(1);
        s0.set_state(SenderState::Streaming);

        let slot = WaitSlot::new(gate.new_slot_id());
        let signals = Arc::new(WaitSignals::new());

        let gate2 = gate.clone();
        let waiter = tokio::spawn({
            let slot = slot.clone();
            let signals = signals.clone();
            async move {
                wait_for_lsn(&gate2, &slot, WaitMode::Flush, Lsn(0x500), true, &signals).await
            }
        });

        tokio::task::yield_now().await;
        assert_eq!(gate.queue_len(WaitMode::Flush), 1);
        gate.advance_and_wake(WaitMode::Flush, Lsn(0x600));

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, WaitOutcome::Acknowledged);
    }

    #[tokio::test]
    async fn acknowledgment_wakes_the_waiter() {
        let gate = Arc::new(CommitGate::new(DEFAULT_MAX_SENDERS));
        gate.set_sync_standbys_defined(true);
        let slot = WaitSlot::new(gate.new_slot_id());
        let signals = Arc::new(WaitSignals::new());

        let gate2 = gate.clone();
        let waiter = tokio::spawn({
            let slot = slot.clone();
            let signals = signals.clone();
            async move {
                wait_for_lsn(&gate2, &slot, WaitMode::Write, Lsn(0x500), false, &signals).await
            }
        });

        tokio::task::yield_now().await;
        gate.advance_and_wake(WaitMode::Write, Lsn(0x600));

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, WaitOutcome::Acknowledged);
        assert_eq!(slot.state(), SlotState::NotWaiting);
    }

    #[tokio::test]
    async fn termination_detaches_the_slot() {
        let gate = Arc::new(CommitGate::new(DEFAULT_MAX_SENDERS));
        gate.set_sync_standbys_defined(true);
        let slot = WaitSlot::new(gate.new_slot_id());
        let signals = Arc::new(WaitSignals::new());

        let gate2 = gate.clone();
        let waiter = tokio::spawn({
            let slot = slot.clone();
            let signals = signals.clone();
            async move {
                wait_for_lsn(&gate2, &slot, WaitMode::Write, Lsn(0x500), false, &signals).await
            }
        });

        tokio::task::yield_now().await;
        signals.terminate.notify_one();

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, WaitOutcome::Terminated);
        assert_eq!(slot.state(), SlotState::NotWaiting);
        assert_eq!(gate.queue_len(WaitMode::Write), 0);
    }

    #[tokio::test]
    async fn supervisor_death_terminates_the_wait() {
        let gate = Arc::new(CommitGate::new(DEFAULT_MAX_SENDERS));
        gate.set_sync_standbys_defined(true);
        let slot = WaitSlot::new(gate.new_slot_id());
        let signals = Arc::new(WaitSignals::new());

        let gate2 = gate.clone();
        let waiter = tokio::spawn({
            let slot = slot.clone();
            let signals = signals.clone();
            async move {
                wait_for_lsn(&gate2, &slot, WaitMode::Flush, Lsn(0x10), false, &signals).await
            }
        });

        tokio::task::yield_now().await;
        signals.supervisor_down.notify_one();

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, WaitOutcome::Terminated);
    }

    #[tokio::test]
    async fn cancellation_is_ignored_and_wait_continues() {
        let gate = Arc::new(CommitGate::new(DEFAULT_MAX_SENDERS));
        gate.set_sync_standbys_defined(true);
        let slot = WaitSlot::new(gate.new_slot_id());
        let signals = Arc::new(WaitSignals::new());

        let gate2 = gate.clone();
        let waiter = tokio::spawn({
            let slot = slot.clone();
            let signals = signals.clone();
            async move {
                wait_for_lsn(&gate2, &slot, WaitMode::Flush, Lsn(0x500), false, &signals).await
            }
        });

        tokio::task::yield_now().await;
        signals.request_cancel();
        // Cancellation alone does not wake the sleep; the wait only
        // observes cancel_pending after its next wakeup. Drive one with the
        // real acknowledgment.
        gate.advance_and_wake(WaitMode::Flush, Lsn(0x600));

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, WaitOutcome::Acknowledged);
    }
}
