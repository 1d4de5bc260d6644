// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::{Buf, BytesMut};

use crate::{error::DecodeError, wire::pdu::Pdu};

/// Outcome of [`ReadBuffer::try_take_pdu`].
#[derive(Debug)]
pub enum TakeResult {
    /// Fewer bytes are buffered than the next PDU needs.
    NotYet,
    /// A complete, validated PDU was extracted and the consumed bytes were
    /// dropped from the front of the buffer.
    Pdu(Pdu),
    /// The buffered bytes could never form a legal PDU.
    Error(DecodeError),
}

/// Per-connection inbound scratch buffer (`struct ibuf_read` in the
/// original). Bytes read off the socket accumulate here; `try_take_pdu`
/// extracts one complete PDU at a time and compacts the remainder to the
/// front, mirroring `session_get_pdu`'s `memmove`.
pub struct ReadBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl ReadBuffer {
    pub fn new(capacity: usize) -> Self {
        ReadBuffer {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Spare room available for the next `read(2)` call.
    pub fn spare_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.buf.len())
    }

    /// Appends freshly-read bytes. Callers must not exceed
    /// [`ReadBuffer::spare_capacity`].
    pub fn extend(&mut self, data: &[u8]) {
        debug_assert!(data.len() <= self.spare_capacity());
        self.buf.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Tries to extract one complete PDU from the front of the buffer.
    pub fn try_take_pdu(&mut self, max_pdu_len: u16) -> TakeResult {
        let size = match Pdu::probe_size(&self.buf, max_pdu_len) {
            Ok(Some(size)) => size,
            Ok(None) => return TakeResult::NotYet,
            Err(e) => return TakeResult::Error(e),
        };

        let pdu = match Pdu::decode(&self.buf[..size]) {
            Ok(pdu) => pdu,
            Err(e) => return TakeResult::Error(e),
        };
        self.buf.advance(size);
        TakeResult::Pdu(pdu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{header::MsgHeader, message::MessageType, pdu::Message};

    fn one_pdu() -> BytesMut {
        let mut pdu = Pdu::new([10, 0, 0, 1], 0);
        pdu.messages.push(Message {
            header: MsgHeader::new(MessageType::Keepalive.code(), 1),
            body: bytes::Bytes::new(),
        });
        pdu.encode()
    }

    #[test]
    fn returns_not_yet_on_partial_pdu() {
        let mut rb = ReadBuffer::new(4096);
        let pdu = one_pdu();
        rb.extend(&pdu[..pdu.len() - 1]);
        assert!(matches!(rb.try_take_pdu(4096), TakeResult::NotYet));
    }

    #[test]
    fn extracts_pdu_and_compacts_remainder() {
        let mut rb = ReadBuffer::new(4096);
        let first = one_pdu();
        let second = one_pdu();
        rb.extend(&first);
        rb.extend(&second);

        match rb.try_take_pdu(4096) {
            TakeResult::Pdu(pdu) => assert_eq!(pdu.messages.len(), 1),
            other => panic!("expected Pdu, got {other:?}"),
        }
        assert_eq!(rb.len(), second.len());

        match rb.try_take_pdu(4096) {
            TakeResult::Pdu(pdu) => assert_eq!(pdu.messages.len(), 1),
            other => panic!("expected Pdu, got {other:?}"),
        }
        assert!(rb.is_empty());
    }

    #[test]
    fn reports_decode_errors() {
        let mut rb = ReadBuffer::new(4096);
        let mut pdu = one_pdu();
        pdu[0] = 0xff;
        rb.extend(&pdu);
        assert!(matches!(rb.try_take_pdu(4096), TakeResult::Error(_)));
    }
}
