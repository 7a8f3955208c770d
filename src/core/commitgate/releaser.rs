// src/core/commitgate/releaser.rs

//! Sender-side priority election and release: called whenever a sender
//! reports new write/flush positions, to decide whether any waiter can now
//! be woken.

use super::control::CommitGate;
use super::mode::WaitMode;
use super::sender::SenderDescriptor;
use std::sync::Arc;
use tracing::{debug, info};

/// Called by `caller` after its transport records new standby-acknowledged
/// positions. Gates immediately, without taking the control lock, if
/// `caller` itself isn't a release candidate. Otherwise elects the
/// highest-priority eligible sender across the whole array; if that's not
/// `caller`, records a pending takeover announcement and returns without
/// advancing anything. If `caller` *is* elected, advances `released_lsn`
/// for each mode to `caller`'s reported position and wakes qualifying
/// waiters, then logs the takeover if one was pending.
///
/// Priority is recomputed on every call rather than cached: the spec
/// requires a dropped or demoted highest-priority sender to hand off to
/// the next-ranked one on the very next acknowledgment, not on some
/// later reconciliation pass. A sender with `priority() == 0` is never a
/// candidate (it isn't named in `synchronous_standby_names`).
///
/// Ties in priority are broken by ascending array index, matching
/// insertion order of `synchronous_standby_names` for same-priority
/// entries (which can only arise under a quorum-style name list; this
/// crate only implements the single-priority-list form, so ties in
/// practice mean "same name repeated", which the caller should avoid).
pub fn release_waiters(gate: &CommitGate, caller: &Arc<SenderDescriptor>) -> usize {
    if !caller.is_release_eligible() {
        return 0;
    }

    let elected = elect_priority_sender(gate.senders());
    let we_are_elected = elected.as_ref().is_some_and(|s| Arc::ptr_eq(s, caller));
    if !we_are_elected {
        caller.set_announce_next_takeover(true);
        return 0;
    }

    let mut total = 0;
    for mode in [WaitMode::Write, WaitMode::Flush] {
        if let Some(position) = caller.position_for(mode) {
            let woken = gate.advance_and_wake(mode, position);
            if woken > 0 {
                debug!(
                    sender_index = caller.index,
                    ?mode,
                    position = %position,
                    woken,
                    "released waiters via elected sender"
                );
            }
            total += woken;
        }
    }

    if caller.take_announce_next_takeover() {
        info!(sender_index = caller.index, "sender elected as synchronous standby");
    }

    total
}

/// Scans the sender array for the release-eligible candidate with the
/// highest priority (lowest positive number wins, matching the spec's
/// "1 is highest" convention), breaking ties by array index.
fn elect_priority_sender(senders: &[Arc<SenderDescriptor>]) -> Option<Arc<SenderDescriptor>> {
    senders
        .iter()
        .filter(|s| s.is_release_eligible())
        .min_by_key(|s| (s.priority(), s.index))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commitgate::control::DEFAULT_MAX_SENDERS;
    use crate::core::commitgate::lsn::Lsn;
    use crate::core::commitgate::sender::SenderState;
    use crate::core::commitgate::slot::{SlotState, WaitSlot};

    #[test]
    fn elects_lowest_priority_number_among_eligible() {
        let gate = CommitGate::new(DEFAULT_MAX_SENDERS);
        gate.set_sync_standbys_defined(true);

        let s0 = &gate.senders()[0];
        s0.accept(100);
        s0.set_state(SenderState::Streaming);
        s0.set_priority(2);
        s0.report_positions(Lsn(0x100), Lsn(0x100));

        let s1 = &gate.senders()[1];
        s1.accept(101);
        s1.set_state(SenderState::Streaming);
        s1.set_priority(1);
        s1.report_positions(Lsn(0x200), Lsn(0x200));

        let elected = elect_priority_sender(gate.senders()).unwrap();
        assert_eq!(elected.index, 1);
    }

    #[test]
    fn priority_zero_senders_are_never_candidates() {
        let gate = CommitGate::new(DEFAULT_MAX_SENDERS);
        let s0 = &gate.senders()[0];
        s0.accept(100);
        s0.set_state(SenderState::Streaming);
        s0.report_positions(Lsn(0x100), Lsn(0x100));
        assert!(elect_priority_sender(gate.senders()).is_none());
    }

    #[test]
    fn release_waiters_wakes_waiters_at_or_below_elected_position() {
        let gate = CommitGate::new(DEFAULT_MAX_SENDERS);
        gate.set_sync_standbys_defined(true);
        let slot = WaitSlot::new(gate.new_slot_id());
        gate.enter_wait(&slot, WaitMode::Flush, Lsn(0x150), false);

        let s0 = &gate.senders()[0];
        s0.accept(100);
        s0.set_state(SenderState::Streaming);
        s0.set_priority(1);
        s0.report_positions(Lsn(0x200), Lsn(0x200));

        let woken = release_waiters(&gate, s0);
        assert_eq!(woken, 1);
        assert_eq!(slot.state(), SlotState::WaitComplete);
    }

    #[test]
    fn non_elected_caller_gates_without_advancing() {
        let gate = CommitGate::new(DEFAULT_MAX_SENDERS);
        gate.set_sync_standbys_defined(true);
        let slot = WaitSlot::new(gate.new_slot_id());
        gate.enter_wait(&slot, WaitMode::Write, Lsn(0x150), false);

        let s0 = &gate.senders()[0];
        s0.accept(100);
        s0.set_state(SenderState::Streaming);
        s0.set_priority(1);
        s0.report_positions(Lsn(0x050), Lsn(0x050));

        let s1 = &gate.senders()[1];
        s1.accept(101);
        s1.set_state(SenderState::Streaming);
        s1.set_priority(2);
        s1.report_positions(Lsn(0x200), Lsn(0x200));

        // s1 is eligible but s0 (priority 1) is elected instead; s1's call
        // gates without advancing anything, and records a pending takeover.
        assert_eq!(release_waiters(&gate, s1), 0);
        assert_eq!(slot.state(), SlotState::Waiting);
        assert!(s1.take_announce_next_takeover());
    }

    #[test]
    fn drop_of_highest_priority_sender_hands_off_on_next_call() {
        let gate = CommitGate::new(DEFAULT_MAX_SENDERS);
        gate.set_sync_standbys_defined(true);
        let slot = WaitSlot::new(gate.new_slot_id());
        gate.enter_wait(&slot, WaitMode::Write, Lsn(0x150), false);

        let s0 = &gate.senders()[0];
        s0.accept(100);
        s0.set_state(SenderState::Streaming);
        s0.set_priority(1);
        s0.report_positions(Lsn(0x050), Lsn(0x050));

        let s1 = &gate.senders()[1];
        s1.accept(101);
        s1.set_state(SenderState::Streaming);
        s1.set_priority(2);
        s1.report_positions(Lsn(0x200), Lsn(0x200));

        // s0 is elected (priority 1) but hasn't caught up; its own call
        // releases nothing.
        assert_eq!(release_waiters(&gate, s0), 0);
        assert_eq!(slot.state(), SlotState::Waiting);

        // s0 drops out; s1 is now elected on its own next call.
        s0.retire();
        let woken = release_waiters(&gate, s1);
        assert_eq!(woken, 1);
        assert_eq!(slot.state(), SlotState::WaitComplete);
    }
}
