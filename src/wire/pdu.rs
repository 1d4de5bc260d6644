// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::{Buf, BufMut, Bytes, BytesMut};
use zerocopy::{FromBytes, IntoBytes};

use crate::{
    error::DecodeError,
    wire::{
        header::{
            HDR_DEAD_LEN, HDR_MIN_LEN, HDR_SIZE, LDP_VERSION, MSG_HDR_DEAD_LEN,
            MSG_HDR_SIZE, MsgHeader, PduHeader,
        },
        message::MessageType,
    },
};

/// One LDP message: header plus its still-opaque body. Parsing TLVs out of
/// `body` is a handler concern, not this codec's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MsgHeader,
    pub body: Bytes,
}

impl Message {
    pub fn msg_type(&self) -> MessageType {
        MessageType::from_code(self.header.type_code())
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(self.header.as_bytes());
        buf.put_slice(&self.body);
    }
}

/// A decoded LDP PDU: header plus zero or more messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub header: PduHeader,
    pub messages: Vec<Message>,
}

impl Pdu {
    pub fn new(lsr_id: [u8; 4], label_space: u16) -> Self {
        Pdu {
            header: PduHeader::new(lsr_id, label_space),
            messages: Vec::new(),
        }
    }

    /// Determines whether `data` holds a complete PDU and, if so, its total
    /// size in bytes (header + messages). Mirrors the original's
    /// `session_get_pdu` length bookkeeping: the header is validated enough
    /// to trust its `length` field, but message bodies are not parsed yet.
    pub fn probe_size(data: &[u8], max_pdu_len: u16) -> Result<Option<usize>, DecodeError> {
        if data.len() < HDR_SIZE as usize + MSG_HDR_SIZE as usize {
            return Ok(None);
        }
        let hdr = PduHeader::read_from_bytes(&data[..HDR_SIZE as usize])
            .map_err(|_| DecodeError::ShortBuffer { have: data.len(), need: HDR_SIZE as usize })?;
        if hdr.version.get() != LDP_VERSION {
            return Err(DecodeError::BadVersion(hdr.version.get()));
        }
        let pdu_len = hdr.length.get();
        if pdu_len < HDR_MIN_LEN + MSG_HDR_SIZE || pdu_len > max_pdu_len {
            return Err(DecodeError::BadPduLength(pdu_len));
        }
        let total = pdu_len as usize + HDR_DEAD_LEN as usize;
        if data.len() < total {
            return Ok(None);
        }
        Ok(Some(total))
    }

    /// Decodes a buffer already known (via [`Pdu::probe_size`]) to hold
    /// exactly one complete PDU.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = Bytes::copy_from_slice(data);
        let hdr_bytes = buf.split_to(HDR_SIZE as usize);
        let header = PduHeader::read_from_bytes(&hdr_bytes)
            .map_err(|_| DecodeError::ShortBuffer { have: hdr_bytes.len(), need: HDR_SIZE as usize })?;

        let mut remaining = header.length.get() - HDR_MIN_LEN;
        let mut messages = Vec::new();
        while remaining >= MSG_HDR_SIZE {
            if buf.remaining() < MSG_HDR_SIZE as usize {
                return Err(DecodeError::BadMessageLength(remaining));
            }
            let msg_hdr_bytes = buf.copy_to_bytes(MSG_HDR_SIZE as usize);
            let msg_header = MsgHeader::read_from_bytes(&msg_hdr_bytes)
                .map_err(|_| DecodeError::ShortBuffer { have: msg_hdr_bytes.len(), need: MSG_HDR_SIZE as usize })?;
            let body_len = msg_header.msg_length.get().saturating_sub(MSG_HDR_DEAD_LEN);
            if buf.remaining() < body_len as usize {
                return Err(DecodeError::BadMessageLength(msg_header.msg_length.get()));
            }
            let body = buf.copy_to_bytes(body_len as usize);

            remaining = remaining.saturating_sub(MSG_HDR_SIZE + body_len);
            messages.push(Message { header: msg_header, body });
        }
        if remaining != 0 || buf.has_remaining() {
            return Err(DecodeError::BadPduLength(header.length.get()));
        }

        Ok(Pdu { header, messages })
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_slice(self.header.as_bytes());
        for msg in &self.messages {
            msg.encode(&mut buf);
        }
        let pdu_len = buf.len() as u16 - HDR_DEAD_LEN;
        buf[2..4].copy_from_slice(&pdu_len.to_be_bytes());
        buf
    }
}
