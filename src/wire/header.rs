// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use zerocopy::{BigEndian, FromBytes, Immutable, IntoBytes, KnownLayout, U16, U32};

/// LDP protocol version this implementation speaks (RFC 5036 §3.5.3).
pub const LDP_VERSION: u16 = 1;

/// Size in bytes of the PDU header, dead-prefix included.
pub const HDR_SIZE: u16 = 10;
/// Minimum legal value of the PDU header's `length` field: LDP Identifier
/// (6 bytes) + label space, i.e. everything after the length field itself
/// when no message follows.
pub const HDR_MIN_LEN: u16 = 6;
/// Bytes that precede the length field and are therefore never counted by
/// it: `version` + `length` themselves.
pub const HDR_DEAD_LEN: u16 = 4;
/// Default/initial maximum PDU size before Init negotiation raises it
/// (RFC 5036 §3.5.3).
pub const MAX_PDU_LEN: u16 = 4096;

/// Size in bytes of a message header, dead-prefix included.
pub const MSG_HDR_SIZE: u16 = 8;
/// Bytes that precede a message's length field: `type` + `length`.
pub const MSG_HDR_DEAD_LEN: u16 = 4;

/// The fixed-layout PDU header (RFC 5036 §3.5.3):
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Version                      |         PDU Length            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         LSR Id                                |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            Label Space                                        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PduHeader {
    pub version: U16<BigEndian>,
    pub length: U16<BigEndian>,
    pub lsr_id: [u8; 4],
    pub label_space: U16<BigEndian>,
}

impl PduHeader {
    pub fn new(lsr_id: [u8; 4], label_space: u16) -> Self {
        PduHeader {
            version: U16::new(LDP_VERSION),
            length: U16::new(0),
            lsr_id,
            label_space: U16::new(label_space),
        }
    }

    pub fn set_length(&mut self, length: u16) {
        self.length.set(length);
    }

    pub fn lsr_id_addr(&self) -> std::net::Ipv4Addr {
        std::net::Ipv4Addr::from(self.lsr_id)
    }
}

/// The fixed-layout message header (RFC 5036 §3.5.4). The high bit of
/// `msg_type` is the unknown-message-type-forgiveness (U) bit, not part of
/// the type code itself.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct MsgHeader {
    pub msg_type: U16<BigEndian>,
    pub msg_length: U16<BigEndian>,
    pub msg_id: U32<BigEndian>,
}

impl MsgHeader {
    /// Bit 15 of the message type field.
    pub const U_BIT: u16 = 0x8000;

    pub fn new(msg_type: u16, msg_id: u32) -> Self {
        MsgHeader {
            msg_type: U16::new(msg_type),
            msg_length: U16::new(0),
            msg_id: U32::new(msg_id),
        }
    }

    pub fn set_length(&mut self, length: u16) {
        self.msg_length.set(length);
    }

    pub fn type_code(&self) -> u16 {
        self.msg_type.get() & !Self::U_BIT
    }

    pub fn u_bit(&self) -> bool {
        self.msg_type.get() & Self::U_BIT != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdu_header_round_trips_through_bytes() {
        let mut hdr = PduHeader::new([10, 0, 0, 1], 0);
        hdr.set_length(42);
        let bytes = zerocopy::IntoBytes::as_bytes(&hdr);
        assert_eq!(bytes.len(), HDR_SIZE as usize);
        let back = PduHeader::read_from_bytes(bytes).expect("valid layout");
        assert_eq!(back.length.get(), 42);
        assert_eq!(back.lsr_id_addr(), std::net::Ipv4Addr::new(10, 0, 0, 1));
    }

    #[test]
    fn message_header_splits_type_and_u_bit() {
        let hdr = MsgHeader {
            msg_type: U16::new(0x0100 | MsgHeader::U_BIT),
            msg_length: U16::new(4),
            msg_id: U32::new(7),
        };
        assert!(hdr.u_bit());
        assert_eq!(hdr.type_code(), 0x0100);
    }
}
