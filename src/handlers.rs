// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Message-handler seam (spec.md §6). Handler *bodies* (TLV parsing, label
//! bookkeeping, address-table updates) belong to the wider routing suite;
//! this crate only needs somewhere to hand a decoded message off to, and a
//! way to learn whether the session must be torn down afterwards.

use std::net::{IpAddr, Ipv4Addr};

use bytes::Bytes;

use crate::{cfg::enums::AddressFamily, neighbor::NeighborId, wire::header::MsgHeader};

/// Result of handing a message to its handler, mirroring the `ret == -1`
/// "parser failed, giving up" convention in the original's `session_read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Ok,
    Abort,
}

/// One method per message type named in spec.md §6. Default bodies return
/// [`HandlerOutcome::Ok`] and do nothing, so a caller only needs to
/// override the handlers it cares about.
pub trait MessageHandlers {
    fn recv_hello(&mut self, nbr: NeighborId, header: &MsgHeader, body: &Bytes) -> HandlerOutcome {
        let _ = (nbr, header, body);
        HandlerOutcome::Ok
    }

    fn recv_init(&mut self, nbr: NeighborId, header: &MsgHeader, body: &Bytes) -> HandlerOutcome {
        let _ = (nbr, header, body);
        HandlerOutcome::Ok
    }

    fn recv_keepalive(
        &mut self,
        nbr: NeighborId,
        header: &MsgHeader,
        body: &Bytes,
    ) -> HandlerOutcome {
        let _ = (nbr, header, body);
        HandlerOutcome::Ok
    }

    fn recv_capability(
        &mut self,
        nbr: NeighborId,
        header: &MsgHeader,
        body: &Bytes,
    ) -> HandlerOutcome {
        let _ = (nbr, header, body);
        HandlerOutcome::Ok
    }

    fn recv_address(
        &mut self,
        nbr: NeighborId,
        header: &MsgHeader,
        body: &Bytes,
    ) -> HandlerOutcome {
        let _ = (nbr, header, body);
        HandlerOutcome::Ok
    }

    fn recv_labelmessage(
        &mut self,
        nbr: NeighborId,
        header: &MsgHeader,
        body: &Bytes,
    ) -> HandlerOutcome {
        let _ = (nbr, header, body);
        HandlerOutcome::Ok
    }

    fn recv_notification(
        &mut self,
        nbr: NeighborId,
        header: &MsgHeader,
        body: &Bytes,
    ) -> HandlerOutcome {
        let _ = (nbr, header, body);
        HandlerOutcome::Ok
    }

    /// Hands off a validated Hello datagram from the discovery receiver
    /// (spec.md §4.4: `recv_hello(lsr_id, msg_header, af, src, iface,
    /// multicast, payload, payload_len)`). No [`NeighborId`] exists yet at
    /// this point — finding or creating one for `lsr_id`/`src` is the
    /// routing suite's job, not the discovery receiver's.
    #[allow(clippy::too_many_arguments)]
    fn recv_hello_discovery(
        &mut self,
        lsr_id: Ipv4Addr,
        header: &MsgHeader,
        af: AddressFamily,
        src: IpAddr,
        ifindex: u32,
        multicast: bool,
        payload: &Bytes,
    ) -> HandlerOutcome {
        let _ = (lsr_id, header, af, src, ifindex, multicast, payload);
        HandlerOutcome::Ok
    }
}

/// A handler set that records nothing and always succeeds. Used by this
/// crate's own tests, and as the binary's placeholder until the wider
/// routing suite supplies a real [`MessageHandlers`] implementation.
#[derive(Default)]
pub struct NoopHandlers;

impl MessageHandlers for NoopHandlers {}
