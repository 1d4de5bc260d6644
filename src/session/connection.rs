// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::SocketAddr;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::{io::AsyncReadExt, net::TcpStream};
use tracing::{debug, warn};

use crate::{
    error::ShutdownStatus,
    io::{ReadBuffer, TakeResult, WriteBuffer},
    neighbor::NeighborId,
    wire::{
        header::{MSG_HDR_DEAD_LEN, MsgHeader},
        message::MessageType,
        pdu::Pdu,
    },
};

/// One TCP connection carrying (or about to carry, or having carried) an
/// LDP session. `neighbor` is `None` for a connection detached from any
/// neighbor — e.g. one kept alive only long enough to deliver a
/// "No Hello" notification (`tcp_new(fd, NULL)` in the original).
pub struct TcpConnection {
    stream: TcpStream,
    pub local_addr: Option<SocketAddr>,
    pub peer_addr: Option<SocketAddr>,
    pub neighbor: Option<NeighborId>,
    pub rbuf: ReadBuffer,
    pub wbuf: WriteBuffer,
}

impl TcpConnection {
    pub fn new(stream: TcpStream, neighbor: Option<NeighborId>, read_buf_capacity: usize) -> Self {
        let local_addr = stream.local_addr().ok();
        let peer_addr = stream.peer_addr().ok();
        if local_addr.is_none() {
            warn!("getsockname failed for new tcp connection");
        }
        if peer_addr.is_none() {
            warn!("getpeername failed for new tcp connection");
        }
        TcpConnection {
            stream,
            local_addr,
            peer_addr,
            neighbor,
            rbuf: ReadBuffer::new(read_buf_capacity),
            wbuf: WriteBuffer::new(),
        }
    }

    /// Reads whatever is available into the read buffer and drains as
    /// many complete PDUs as it can hold, mirroring `session_read`'s single
    /// `read()` followed by a `session_get_pdu` loop.
    pub async fn read_pdus(&mut self) -> Result<Vec<Pdu>> {
        let mut scratch = vec![0_u8; self.rbuf.spare_capacity().max(1)];
        let n = self
            .stream
            .read(&mut scratch)
            .await
            .context("tcp connection read error")?;
        if n == 0 {
            anyhow::bail!("peer closed the connection");
        }
        self.rbuf.extend(&scratch[..n]);

        let mut pdus = Vec::new();
        loop {
            match self.rbuf.try_take_pdu(u16::MAX) {
                TakeResult::NotYet => break,
                TakeResult::Pdu(pdu) => pdus.push(pdu),
                TakeResult::Error(e) => {
                    debug!(error = %e, "malformed pdu on wire");
                    return Err(e.into());
                },
            }
        }
        Ok(pdus)
    }

    pub fn enqueue(&mut self, pdu: Bytes) {
        self.wbuf.enqueue(pdu);
    }

    pub async fn flush(&mut self) -> Result<bool> {
        self.wbuf.flush(&mut self.stream).await.context("tcp connection write error")
    }

    /// Builds and enqueues a Notification message carrying `status`
    /// (`send_notification` in the original). The Status TLV body itself
    /// is out of scope; only enough of the message is built to identify
    /// it on the wire and let the peer reject/retry accordingly.
    pub fn send_notification(&mut self, status: ShutdownStatus, msg_id: u32, rejected_type: u16) {
        let mut pdu = Pdu::new([0, 0, 0, 0], 0);
        let mut header = MsgHeader::new(MessageType::Notification.code(), msg_id.wrapping_add(1));
        let body_len = 4_u16; // status-code TLV placeholder length
        header.set_length(body_len + MSG_HDR_DEAD_LEN);
        let mut body = bytes::BytesMut::with_capacity(body_len as usize);
        body.extend_from_slice(&status.wire_value().to_be_bytes());
        let _ = rejected_type;
        pdu.messages.push(crate::wire::pdu::Message { header, body: body.freeze() });
        self.wbuf.enqueue(pdu.encode().freeze());
    }
}
