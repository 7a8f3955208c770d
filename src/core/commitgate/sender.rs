// src/core/commitgate/sender.rs

//! One descriptor per streaming-replication sender: the subset of its
//! lifecycle and acknowledged positions the commit gate needs to decide
//! who may release waiters.

use super::lsn::Lsn;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Sender relevance subset of the full transport FSM. Release is active
/// only in `Streaming` and `Stopping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    Startup,
    Backup,
    Catchup,
    Streaming,
    Stopping,
    Exiting,
}

/// The fields the spec requires to be read together, consistently, by a
/// process other than the sender's own — protected by one `mutex`
/// (stand-in for the original's per-sender spinlock) so a reader never
/// observes e.g. a `write` LSN paired with a stale `state`.
#[derive(Debug, Clone)]
struct Volatile {
    pid: u32,
    state: SenderState,
    write: Lsn,
    flush: Lsn,
    caughtup_within_range: bool,
    /// The `application_name` this sender's connection registered, matched
    /// against `synchronous_standby_names` to assign priority. `None`
    /// until the transport reports it (same window the original leaves
    /// priority at 0 in).
    name: Option<String>,
}

/// One entry in the fixed-size sender array. `sync_standby_priority` is
/// deliberately *not* under `mutex`: the spec places it under the control
/// block's `lock` instead, alongside the queues and `released_lsn`, because
/// priority assignment is driven by configuration reconciliation rather
/// than per-acknowledgment transport updates. Callers must hold
/// [`super::control::CommitGate`]'s write lock before calling
/// [`SenderDescriptor::set_priority`].
#[derive(Debug)]
pub struct SenderDescriptor {
    pub index: usize,
    volatile: Mutex<Volatile>,
    priority: AtomicU32,
    /// Set by [`super::releaser::release_waiters`] when this sender was
    /// eligible but another sender held a higher priority; cleared (with a
    /// one-time log) the next time this sender is actually elected.
    announce_next_takeover: AtomicBool,
}

impl SenderDescriptor {
    pub fn unused(index: usize) -> Self {
        Self {
            index,
            volatile: Mutex::new(Volatile {
                pid: 0,
                state: SenderState::Startup,
                write: Lsn::INVALID,
                flush: Lsn::INVALID,
                caughtup_within_range: false,
                name: None,
            }),
            priority: AtomicU32::new(0),
            announce_next_takeover: AtomicBool::new(false),
        }
    }

    pub fn is_unused(&self) -> bool {
        self.volatile.lock().pid == 0
    }

    /// Called by the transport on accept.
    pub fn accept(&self, pid: u32) {
        let mut v = self.volatile.lock();
        v.pid = pid;
        v.state = SenderState::Startup;
        v.write = Lsn::INVALID;
        v.flush = Lsn::INVALID;
        v.caughtup_within_range = false;
        v.name = None;
        self.announce_next_takeover.store(false, Ordering::Relaxed);
    }

    /// Called by the transport on sender exit: zeroes `pid`. Priority
    /// effects are picked up at the next release cycle, not here, matching
    /// the spec's "downgrades priority effects at next release cycle".
    pub fn retire(&self) {
        let mut v = self.volatile.lock();
        v.pid = 0;
        v.state = SenderState::Exiting;
        self.announce_next_takeover.store(false, Ordering::Relaxed);
    }

    pub fn set_state(&self, state: SenderState) {
        self.volatile.lock().state = state;
    }

    pub fn report_positions(&self, write: Lsn, flush: Lsn) {
        let mut v = self.volatile.lock();
        v.write = write;
        v.flush = flush;
    }

    pub fn set_caughtup_within_range(&self, v: bool) {
        self.volatile.lock().caughtup_within_range = v;
    }

    pub fn set_name(&self, name: Option<String>) {
        self.volatile.lock().name = name;
    }

    pub fn name(&self) -> Option<String> {
        self.volatile.lock().name.clone()
    }

    pub fn pid(&self) -> u32 {
        self.volatile.lock().pid
    }

    pub fn state(&self) -> SenderState {
        self.volatile.lock().state
    }

    pub fn write(&self) -> Lsn {
        self.volatile.lock().write
    }

    pub fn flush(&self) -> Lsn {
        self.volatile.lock().flush
    }

    pub fn caughtup_within_range(&self) -> bool {
        self.volatile.lock().caughtup_within_range
    }

    pub fn priority(&self) -> u32 {
        self.priority.load(Ordering::Acquire)
    }

    /// Caller must hold the control block's write lock (see struct docs).
    pub fn set_priority(&self, priority: u32) {
        self.priority.store(priority, Ordering::Release);
    }

    /// A snapshot of the position this sender reports for `mode`, or `None`
    /// for `NoWait` (which has no backing position).
    pub fn position_for(&self, mode: super::mode::WaitMode) -> Option<Lsn> {
        let v = self.volatile.lock();
        match mode {
            super::mode::WaitMode::Write => Some(v.write),
            super::mode::WaitMode::Flush => Some(v.flush),
            super::mode::WaitMode::NoWait => None,
        }
    }

    /// True if this sender is streaming, or close enough per the transport's
    /// own signal — the condition the no-sync-standby-defined fast path
    /// (spec §4.2 step 3) scans for.
    pub fn is_effectively_streaming(&self) -> bool {
        let v = self.volatile.lock();
        v.pid != 0
            && (v.state == SenderState::Streaming
                || (v.state == SenderState::Catchup && v.caughtup_within_range))
    }

    /// True if this sender is a release-eligible candidate: present,
    /// in `Streaming`/`Stopping`, has a positive priority, and a valid flush
    /// position. Used by [`super::releaser::release_waiters`]'s election.
    pub fn is_release_eligible(&self) -> bool {
        let v = self.volatile.lock();
        v.pid != 0
            && matches!(v.state, SenderState::Streaming | SenderState::Stopping)
            && self.priority() > 0
            && v.flush.is_valid()
    }

    /// Marks that this sender was eligible but not elected on its last
    /// `release_waiters` call, so a takeover can be logged once it is.
    pub fn set_announce_next_takeover(&self, value: bool) {
        self.announce_next_takeover.store(value, Ordering::Relaxed);
    }

    /// Clears and returns the pending-takeover-announcement flag.
    pub fn take_announce_next_takeover(&self) -> bool {
        self.announce_next_takeover.swap(false, Ordering::Relaxed)
    }
}
