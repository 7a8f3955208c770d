// src/core/commitgate/slot.rs

//! One record per potentially-waiting session: the wait LSN, lifecycle
//! state, and the wake primitive the releaser signals.

use super::lsn::Lsn;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Uniquely identifies a [`WaitSlot`] for the lifetime of a session.
pub type SlotId = u64;

/// `WaitSlot.state`'s lifecycle:
///
/// ```text
/// NotWaiting --enqueue--> Waiting --(releaser: scan_and_wake)--> WaitComplete --session resets--> NotWaiting
///                               \--(self: cancel_wait)--------> NotWaiting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    NotWaiting = 0,
    Waiting = 1,
    WaitComplete = 2,
}

impl SlotState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SlotState::NotWaiting,
            1 => SlotState::Waiting,
            2 => SlotState::WaitComplete,
            _ => unreachable!("invalid SlotState discriminant {v}"),
        }
    }
}

/// A single session's wait record.
///
/// In the original process-per-connection design this lives in shared
/// memory for the session's lifetime and is read by other processes without
/// holding the control-block lock. Here it plays the same role inside one
/// process: it's held behind an `Arc` so the releaser (a different Tokio
/// task) can observe and mutate it independent of the waiting task's stack.
///
/// `state` is an atomic rather than a plain field specifically to preserve
/// the spec's ordering requirement (§5 "Ordering"): the releaser's store to
/// `state` must become visible to the waiter together with the `released_lsn`
/// store that precedes it and the `Notify::notify_one()` that follows it.
/// `Release`/`Acquire` ordering on this atomic gives that happens-before
/// edge directly, which is why the unlocked fast-read-then-locked-re-read
/// dance from the original (needed only on architectures whose ordinary
/// loads/stores give no such guarantee) collapses to a single `Acquire` load
/// here: [`super::gate::wait_for_lsn`] reads `state()` once, unlocked, after
/// each wakeup, and that load alone is sufficient — no second, lock-guarded
/// read is needed or taken.
#[derive(Debug)]
pub struct WaitSlot {
    pub id: SlotId,
    /// The commit position this session needs replicated. Only meaningful
    /// while `state != NotWaiting`.
    wait_lsn: AtomicU64,
    state: AtomicU8,
    /// Signaled by the releaser after the state transition and dequeue;
    /// the session sleeps on this.
    pub latch: Notify,
}

impl WaitSlot {
    pub fn new(id: SlotId) -> Arc<Self> {
        Arc::new(Self {
            id,
            wait_lsn: AtomicU64::new(Lsn::INVALID.0),
            state: AtomicU8::new(SlotState::NotWaiting as u8),
            latch: Notify::new(),
        })
    }

    pub fn wait_lsn(&self) -> Lsn {
        Lsn(self.wait_lsn.load(Ordering::Acquire))
    }

    pub fn set_wait_lsn(&self, lsn: Lsn) {
        self.wait_lsn.store(lsn.0, Ordering::Release);
    }

    pub fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: SlotState) {
        self.state.store(state as u8, Ordering::Release);
    }
}
