// src/core/commitgate/watcher.rs

//! Config-change reconciliation: recomputes each sender's priority from
//! `synchronous_standby_names` and updates the control block's
//! `sync_standbys_defined` flag, waking drained waiters as needed.

use super::control::CommitGate;
use super::mode::get_standby_priority;
use tracing::info;

/// Called after `synchronous_standby_names` is reloaded (or on sender
/// identity change — accept/retire). Recomputes every sender's priority
/// from the new name list, then updates `sync_standbys_defined` to match
/// whether the list is non-empty.
///
/// Per the spec's ordering requirement, priorities are written before the
/// flag transition: a waiter released by this call's drain (list emptied)
/// never observes a stale nonzero priority on a sender that the new list
/// no longer names, and a waiter that newly qualifies (list populated)
/// never races a reader that sees the flag flip before the priority is in
/// place. Returns the number of waiters drained by a transition to
/// `false`.
pub fn reconcile_sync_standbys_defined(gate: &CommitGate, names: &[String]) -> usize {
    for sender in gate.senders() {
        if sender.is_unused() {
            continue;
        }
        let priority = sender
            .name()
            .map(|n| get_standby_priority(names, &n))
            .unwrap_or(0);
        sender.set_priority(priority);
    }

    let defined = !names.is_empty();
    let drained = gate.set_sync_standbys_defined(defined);
    if drained > 0 {
        info!(drained, "synchronous_standby_names cleared; drained waiters");
    }
    drained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commitgate::control::DEFAULT_MAX_SENDERS;
    use crate::core::commitgate::lsn::Lsn;
    use crate::core::commitgate::mode::WaitMode;
    use crate::core::commitgate::sender::SenderState;
    use crate::core::commitgate::slot::{SlotState, WaitSlot};

    #[test]
    fn reconcile_assigns_priorities_by_name_position() {
        let gate = CommitGate::new(DEFAULT_MAX_SENDERS);
        let s0 = &gate.senders()[0];
        s0.accept(1);
        s0.set_name(Some("replica-b".to_string()));
        let s1 = &gate.senders()[1];
        s1.accept(2);
        s1.set_name(Some("replica-a".to_string()));

        let names = vec!["replica-a".to_string(), "replica-b".to_string()];
        reconcile_sync_standbys_defined(&gate, &names);

        assert_eq!(s0.priority(), 2);
        assert_eq!(s1.priority(), 1);
        assert!(gate.sync_standbys_defined());
    }

    #[test]
    fn reconcile_to_empty_list_drains_and_clears_flag() {
        let gate = CommitGate::new(DEFAULT_MAX_SENDERS);
        gate.set_sync_standbys_defined(true);
        let slot = WaitSlot::new(gate.new_slot_id());
        gate.enter_wait(&slot, WaitMode::Write, Lsn(0x10), false);

        let drained = reconcile_sync_standbys_defined(&gate, &[]);
        assert_eq!(drained, 1);
        assert_eq!(slot.state(), SlotState::WaitComplete);
        assert!(!gate.sync_standbys_defined());
    }

    #[test]
    fn unnamed_sender_gets_zero_priority() {
        let gate = CommitGate::new(DEFAULT_MAX_SENDERS);
        let s0 = &gate.senders()[0];
        s0.accept(1);
        s0.set_state(SenderState::Streaming);
        s0.set_name(Some("stranger".to_string()));

        reconcile_sync_standbys_defined(&gate, &["known".to_string()]);
        assert_eq!(s0.priority(), 0);
    }
}
