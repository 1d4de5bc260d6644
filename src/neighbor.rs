// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The neighbor finite-state machine is owned by the wider routing suite
//! (out of scope here); this module only defines the shape the session
//! core needs to gate incoming messages and to drive shutdown, matching
//! `nbr_fsm`/`NBR_STA_*`/`NBR_EVT_*` in the original.

use std::net::IpAddr;

use crate::wire::message::MessageType;

/// Neighbor states relevant to session-message gating (RFC 5036 §2.5.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NbrState {
    /// No Hello has been exchanged yet; a pending TCP connection may exist.
    Present,
    /// TCP connected, waiting for/validating the peer's Initialization.
    Initial,
    /// Local Initialization sent, waiting for the peer's.
    OpenSent,
    /// Both Initializations exchanged, waiting for the first Keepalive.
    OpenRec,
    /// Session established; all message types are legal.
    Operational,
}

/// Events fed into the neighbor FSM by the session core. The FSM body
/// itself lives outside this crate; only the event vocabulary is needed
/// here (spec.md §2/§6: `MATCH_ADJ`, `PDU_RCVD`, `CLOSE_SESSION`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NbrEvent {
    /// A pending connection was promoted to an attached session
    /// (`NBR_EVT_MATCH_ADJ` in the original).
    MatchAdj,
    PduRcvd,
    CloseSession,
}

/// Whether a message type is legal to receive in a given neighbor state.
/// Reproduces the gate in the original's `session_read`, evaluated before
/// any message is dispatched to its handler.
pub fn message_legal_in_state(state: NbrState, msg_type: MessageType) -> bool {
    match msg_type {
        MessageType::Notification => true,
        MessageType::Initialization => {
            matches!(state, NbrState::Initial | NbrState::OpenSent)
        },
        MessageType::Keepalive => {
            !matches!(state, NbrState::Initial | NbrState::OpenSent)
        },
        _ => matches!(state, NbrState::Operational),
    }
}

/// Opaque handle identifying a neighbor inside the owning [`NeighborTable`].
/// The session core only ever stores/compares this id; it never reaches
/// into neighbor internals directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NeighborId(pub u32);

/// The external seam onto the routing suite's neighbor table and FSM.
/// Everything the session core needs from "the rest of LDP" is expressed
/// through this trait so it can be built, tested, and reasoned about in
/// isolation (spec.md §6).
pub trait NeighborTable {
    /// Looks up (or, on first Hello, creates) the neighbor reachable at
    /// `addr`, analogous to `nbr_find_addr`.
    fn find_by_addr(&self, addr: IpAddr) -> Option<NeighborId>;

    fn state(&self, id: NeighborId) -> Option<NbrState>;

    /// Whether this end is "active" (initiates the TCP connect) for the
    /// given neighbor, per the tie-breaking rule on LSR-ID comparison
    /// (`nbr_session_active_role`).
    fn session_active_role(&self, id: NeighborId) -> bool;

    /// Feeds an event into the neighbor FSM; errors propagate as
    /// `anyhow::Error` since FSM transition failures are a programming
    /// error in the owning suite, not a wire-level concern here.
    fn fsm(&self, id: NeighborId, event: NbrEvent) -> anyhow::Result<()>;

    /// GTSM (generalized TTL security mechanism) policy hook; `Ok(true)`
    /// accepts the connection. Left to the routing suite to implement.
    fn gtsm_check(&self, id: NeighborId, ttl: u8) -> bool {
        let _ = (id, ttl);
        true
    }
}

/// A [`NeighborTable`] that knows no neighbors. Used by the binary as a
/// placeholder until the wider routing suite wires in the real neighbor
/// table and FSM; every accepted connection is parked pending a Hello.
#[derive(Default)]
pub struct NullNeighborTable;

impl NeighborTable for NullNeighborTable {
    fn find_by_addr(&self, _addr: IpAddr) -> Option<NeighborId> {
        None
    }

    fn state(&self, _id: NeighborId) -> Option<NbrState> {
        None
    }

    fn session_active_role(&self, _id: NeighborId) -> bool {
        false
    }

    fn fsm(&self, _id: NeighborId, _event: NbrEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
pub mod test_double {
    use std::{collections::HashMap, net::IpAddr, sync::Mutex};

    use super::{NbrEvent, NbrState, NeighborId, NeighborTable};

    /// A minimal in-memory [`NeighborTable`] used only by this crate's own
    /// tests to exercise the session core without the rest of the routing
    /// suite.
    #[derive(Default)]
    pub struct MockNeighborTable {
        by_addr: Mutex<HashMap<IpAddr, NeighborId>>,
        states: Mutex<HashMap<NeighborId, NbrState>>,
        events: Mutex<Vec<(NeighborId, NbrEvent)>>,
        gtsm_failures: Mutex<std::collections::HashSet<NeighborId>>,
    }

    impl MockNeighborTable {
        pub fn insert(&self, addr: IpAddr, id: NeighborId, state: NbrState) {
            self.by_addr.lock().expect("lock").insert(addr, id);
            self.states.lock().expect("lock").insert(id, state);
        }

        pub fn set_state(&self, id: NeighborId, state: NbrState) {
            self.states.lock().expect("lock").insert(id, state);
        }

        pub fn events(&self) -> Vec<(NeighborId, NbrEvent)> {
            self.events.lock().expect("lock").clone()
        }

        /// Makes [`NeighborTable::gtsm_check`] return `false` for `id`.
        pub fn fail_gtsm(&self, id: NeighborId) {
            self.gtsm_failures.lock().expect("lock").insert(id);
        }
    }

    impl NeighborTable for MockNeighborTable {
        fn find_by_addr(&self, addr: IpAddr) -> Option<NeighborId> {
            self.by_addr.lock().expect("lock").get(&addr).copied()
        }

        fn state(&self, id: NeighborId) -> Option<NbrState> {
            self.states.lock().expect("lock").get(&id).copied()
        }

        fn session_active_role(&self, id: NeighborId) -> bool {
            id.0.is_multiple_of(2)
        }

        fn fsm(&self, id: NeighborId, event: NbrEvent) -> anyhow::Result<()> {
            self.events.lock().expect("lock").push((id, event));
            Ok(())
        }

        fn gtsm_check(&self, id: NeighborId, _ttl: u8) -> bool {
            !self.gtsm_failures.lock().expect("lock").contains(&id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_only_legal_before_openrec() {
        assert!(message_legal_in_state(NbrState::Initial, MessageType::Initialization));
        assert!(message_legal_in_state(NbrState::OpenSent, MessageType::Initialization));
        assert!(!message_legal_in_state(NbrState::OpenRec, MessageType::Initialization));
        assert!(!message_legal_in_state(NbrState::Operational, MessageType::Initialization));
    }

    #[test]
    fn keepalive_illegal_before_open_exchange_completes() {
        assert!(!message_legal_in_state(NbrState::Initial, MessageType::Keepalive));
        assert!(!message_legal_in_state(NbrState::OpenSent, MessageType::Keepalive));
        assert!(message_legal_in_state(NbrState::OpenRec, MessageType::Keepalive));
        assert!(message_legal_in_state(NbrState::Operational, MessageType::Keepalive));
    }

    #[test]
    fn notification_always_legal() {
        for state in [
            NbrState::Present,
            NbrState::Initial,
            NbrState::OpenSent,
            NbrState::OpenRec,
            NbrState::Operational,
        ] {
            assert!(message_legal_in_state(state, MessageType::Notification));
        }
    }

    #[test]
    fn other_messages_require_operational() {
        assert!(!message_legal_in_state(NbrState::OpenRec, MessageType::LabelMapping));
        assert!(message_legal_in_state(NbrState::Operational, MessageType::LabelMapping));
    }
}
