// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-PDU dispatch: version/length/identity checks, the state-gated
//! message legality table, per-type counters, and the shutdown path.
//! Mirrors `session_read`'s main loop and `session_shutdown`.

use std::{collections::HashMap, net::Ipv4Addr};

use tracing::debug;

use crate::{
    error::ShutdownStatus,
    handlers::{HandlerOutcome, MessageHandlers},
    neighbor::{NbrEvent, NbrState, NeighborId, NeighborTable, message_legal_in_state},
    session::connection::TcpConnection,
    wire::{message::MessageType, pdu::Pdu},
};

/// Per-neighbor message counters (`nbr->stats` in the original), keyed by
/// the raw wire type code so `Unknown` types are counted individually too.
#[derive(Default, Debug)]
pub struct MsgCounters {
    per_type: HashMap<u16, u64>,
    pub unknown_msg: u64,
}

impl MsgCounters {
    pub fn record(&mut self, msg_type: MessageType) {
        *self.per_type.entry(msg_type.code()).or_insert(0) += 1;
    }

    pub fn count_for(&self, msg_type: MessageType) -> u64 {
        self.per_type.get(&msg_type.code()).copied().unwrap_or(0)
    }
}

/// What the caller should do after [`dispatch_pdu`] returns.
#[derive(Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// All messages in the PDU were legal and handled (or ignored as
    /// forgivable-unknown); keep reading.
    Continue,
    /// A fatal condition was hit; the session must be shut down with the
    /// given status. No further message in this (or any later) PDU is
    /// dispatched once this is returned.
    Shutdown(ShutdownStatus),
}

/// Validates and dispatches every message in one PDU for a single
/// neighbor. Stops at the first fatal condition, matching the original's
/// "free(buf); return" early exits — everything already handled before
/// the fault stays handled, nothing after it runs.
#[allow(clippy::too_many_arguments)]
pub fn dispatch_pdu<T: NeighborTable, H: MessageHandlers>(
    pdu: &Pdu,
    nbr: NeighborId,
    expected_lsr_id: Ipv4Addr,
    max_pdu_len: u16,
    neighbors: &T,
    handlers: &mut H,
    counters: &mut MsgCounters,
    conn: &mut TcpConnection,
) -> DispatchOutcome {
    let pdu_len = pdu.header.length.get();
    if !(crate::wire::header::HDR_MIN_LEN + crate::wire::header::MSG_HDR_SIZE..=max_pdu_len)
        .contains(&pdu_len)
    {
        return DispatchOutcome::Shutdown(ShutdownStatus::BadPduLen);
    }
    if pdu.header.lsr_id_addr() != expected_lsr_id || pdu.header.label_space.get() != 0 {
        return DispatchOutcome::Shutdown(ShutdownStatus::BadLdpId);
    }

    let state = match neighbors.state(nbr) {
        Some(s) => s,
        None => return DispatchOutcome::Shutdown(ShutdownStatus::InternalError),
    };

    if neighbors.fsm(nbr, NbrEvent::PduRcvd).is_err() {
        return DispatchOutcome::Shutdown(ShutdownStatus::InternalError);
    }

    for msg in &pdu.messages {
        let msg_type = msg.msg_type();

        if !message_legal_in_state(state, msg_type) {
            return DispatchOutcome::Shutdown(ShutdownStatus::Shutdown);
        }

        if let MessageType::Unknown(code) = msg_type {
            counters.unknown_msg += 1;
            if !msg.header.u_bit() {
                debug!(msg_type = code, "unknown ldp message, sending notification");
                conn.send_notification(ShutdownStatus::UnknownMsg, msg.header.msg_id.get(), code);
            }
            continue;
        }

        let outcome = match msg_type {
            MessageType::Notification => handlers.recv_notification(nbr, &msg.header, &msg.body),
            MessageType::Initialization => handlers.recv_init(nbr, &msg.header, &msg.body),
            MessageType::Keepalive => handlers.recv_keepalive(nbr, &msg.header, &msg.body),
            MessageType::Capability => handlers.recv_capability(nbr, &msg.header, &msg.body),
            MessageType::Address | MessageType::AddressWithdraw => {
                handlers.recv_address(nbr, &msg.header, &msg.body)
            },
            MessageType::LabelMapping
            | MessageType::LabelRequest
            | MessageType::LabelWithdraw
            | MessageType::LabelRelease
            | MessageType::LabelAbortRequest => {
                handlers.recv_labelmessage(nbr, &msg.header, &msg.body)
            },
            MessageType::Hello => handlers.recv_hello(nbr, &msg.header, &msg.body),
            MessageType::Unknown(_) => unreachable!("handled above"),
        };

        if outcome == HandlerOutcome::Abort {
            return DispatchOutcome::Shutdown(ShutdownStatus::InternalError);
        }
        counters.record(msg_type);
    }

    DispatchOutcome::Continue
}

/// Tears a session down per `session_shutdown`'s state-dependent switch:
/// `PRESENT` has no session to close and sends nothing; `INITIAL`/
/// `OPENREC`/`OPENSENT` send a notification, bump `session_attempts`, and
/// close; `OPERATIONAL` sends a notification and closes without bumping
/// the attempts counter (the session did establish).
#[allow(clippy::too_many_arguments)]
pub fn shutdown_for_state<T: NeighborTable>(
    neighbors: &T,
    nbr: NeighborId,
    state: NbrState,
    status: ShutdownStatus,
    msg_id: u32,
    msg_type: u16,
    conn: &mut TcpConnection,
    session_attempts: &mut u32,
) -> anyhow::Result<()> {
    match state {
        NbrState::Present => Ok(()),
        NbrState::Initial | NbrState::OpenRec | NbrState::OpenSent => {
            conn.send_notification(status, msg_id, msg_type);
            *session_attempts = session_attempts.wrapping_add(1);
            neighbors.fsm(nbr, NbrEvent::CloseSession)
        },
        NbrState::Operational => {
            conn.send_notification(status, msg_id, msg_type);
            neighbors.fsm(nbr, NbrEvent::CloseSession)
        },
    }
}
