// src/core/commitgate/control.rs

//! The process-wide control block: the queues, the released-LSN
//! high-water marks, the sender array, and the `sync_standbys_defined`
//! flag, all behind one readers/writer lock.

use super::lsn::Lsn;
use super::mode::{WaitMode, NUM_MODES};
use super::queue::WaitQueue;
use super::sender::SenderDescriptor;
use super::slot::{SlotId, SlotState, WaitSlot};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Default size of the sender array, mirroring a conservative
/// `max_wal_senders` default.
pub const DEFAULT_MAX_SENDERS: usize = 10;

struct Inner {
    queues: [WaitQueue; NUM_MODES],
    released_lsn: [Lsn; NUM_MODES],
    sync_standbys_defined: bool,
    /// Slots currently linked into one of `queues`. A slot is present here
    /// iff its state is `Waiting` — the in-process analogue of I1.
    registry: HashMap<SlotId, Arc<WaitSlot>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            queues: [WaitQueue::new(), WaitQueue::new()],
            released_lsn: [Lsn::INVALID; NUM_MODES],
            sync_standbys_defined: false,
            registry: HashMap::new(),
        }
    }

    #[cfg(debug_assertions)]
    fn assert_ordered_all(&self) {
        for q in &self.queues {
            q.assert_ordered();
        }
    }
}

/// Outcome of [`CommitGate::enter_wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    /// A fast path fired (no sync standbys defined, or the LSN is already
    /// released); the caller must not sleep.
    FastPathReleased,
    /// The slot was enqueued; the caller must sleep on its latch.
    Enqueued,
}

/// The shared control block. One instance per process, held behind an `Arc`
/// by every session task and sender task.
pub struct CommitGate {
    inner: RwLock<Inner>,
    senders: Vec<Arc<SenderDescriptor>>,
    next_slot_id: AtomicU64,
}

impl CommitGate {
    pub fn new(max_senders: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
            senders: (0..max_senders).map(SenderDescriptor::unused).map(Arc::new).collect(),
            next_slot_id: AtomicU64::new(1),
        }
    }

    pub fn senders(&self) -> &[Arc<SenderDescriptor>] {
        &self.senders
    }

    /// Allocates a fresh [`SlotId`] for a new session's [`WaitSlot`].
    pub fn new_slot_id(&self) -> SlotId {
        self.next_slot_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn released_lsn(&self, mode: WaitMode) -> Lsn {
        let Some(idx) = mode.index() else {
            return Lsn::INVALID;
        };
        self.inner.read().released_lsn[idx]
    }

    pub fn sync_standbys_defined(&self) -> bool {
        self.inner.read().sync_standbys_defined
    }

    /// Steps 4-6 of the commit-gate protocol, as one atomic critical
    /// section: assert detached, check the late-acknowledgment fast path,
    /// and otherwise enqueue.
    pub fn enter_wait(
        &self,
        slot: &Arc<WaitSlot>,
        mode: WaitMode,
        commit_lsn: Lsn,
        is_coordinator: bool,
    ) -> EnterOutcome {
        let idx = mode
            .index()
            .expect("enter_wait called with WaitMode::NoWait");
        let mut inner = self.inner.write();
        debug_assert_eq!(slot.state(), SlotState::NotWaiting, "slot must be detached");
        debug_assert!(!inner.queues[idx].is_linked(slot.id));

        let no_standbys = !is_coordinator && !inner.sync_standbys_defined;
        if no_standbys || commit_lsn <= inner.released_lsn[idx] {
            return EnterOutcome::FastPathReleased;
        }

        slot.set_wait_lsn(commit_lsn);
        slot.set_state(SlotState::Waiting);
        inner.queues[idx].insert(slot.id, commit_lsn);
        inner.registry.insert(slot.id, slot.clone());
        #[cfg(debug_assertions)]
        inner.assert_ordered_all();
        EnterOutcome::Enqueued
    }

    /// Unconditional dequeue: used by both `cancel_wait` (self-cancellation
    /// mid-wait) and `cleanup_at_exit` (abnormal session termination).
    /// Safe to call on an already-detached slot (P8).
    pub fn dequeue(&self, slot: &Arc<WaitSlot>) {
        let mut inner = self.inner.write();
        for q in inner.queues.iter_mut() {
            q.remove(slot.id);
        }
        inner.registry.remove(&slot.id);
        slot.set_state(SlotState::NotWaiting);
        slot.set_wait_lsn(Lsn::INVALID);
    }

    /// If `new_position` advances `released_lsn[mode]`, stores it and wakes
    /// every slot whose `wait_lsn` is now covered. Returns the number woken.
    ///
    /// Ordering matches the spec: the water-mark store happens before any
    /// slot's state store, which happens before its latch is signaled —
    /// all three under the same write-lock critical section here, so a
    /// concurrent reader either sees none of it (hasn't taken the lock yet)
    /// or all of it (has).
    pub fn advance_and_wake(&self, mode: WaitMode, new_position: Lsn) -> usize {
        let idx = mode
            .index()
            .expect("advance_and_wake called with WaitMode::NoWait");
        let mut inner = self.inner.write();
        if new_position <= inner.released_lsn[idx] {
            return 0;
        }
        inner.released_lsn[idx] = new_position;
        let high_water = inner.released_lsn[idx];
        let woken = inner.queues[idx].scan_and_wake(false, high_water, &mut inner.registry);
        #[cfg(debug_assertions)]
        inner.assert_ordered_all();
        debug!(mode = ?mode, high_water = %high_water, woken, "advanced released_lsn and woke waiters");
        woken
    }

    /// Sets `sync_standbys_defined`. When transitioning to `false`, drains
    /// every queue *before* storing the new value, so no waiter that
    /// observes the flag under this same lock can find itself re-enqueued
    /// into a queue that's about to be declared empty.
    pub fn set_sync_standbys_defined(&self, desired: bool) -> usize {
        let mut inner = self.inner.write();
        if inner.sync_standbys_defined == desired {
            return 0;
        }
        let mut drained = 0;
        if !desired {
            for q in inner.queues.iter_mut() {
                drained += q.scan_and_wake(true, Lsn::INVALID, &mut inner.registry);
            }
        }
        inner.sync_standbys_defined = desired;
        drained
    }

    /// The current number of waiting slots for `mode`. Useful for
    /// diagnostics and test assertions; not required by the protocol
    /// itself.
    pub fn queue_len(&self, mode: WaitMode) -> usize {
        let idx = mode.index().expect("NoWait has no queue");
        self.inner.read().queues[idx].len()
    }
}
