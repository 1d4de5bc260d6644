// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Message type codes (RFC 5036 §3.5.4, RFC 7552 for the IPv6-related ones
//! that ride on the same messages). Bodies of these messages are out of
//! scope here; only enough is known about each type to route it to the
//! right handler and state-gate check.

/// LDP message type codes. Unknown codes with the U bit set must be
/// forwarded (per RFC 5036 §3.5.4) rather than rejected; codes without a
/// variant here fall back to `MessageType::Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Notification,
    Hello,
    Initialization,
    Keepalive,
    Address,
    AddressWithdraw,
    LabelMapping,
    LabelRequest,
    LabelWithdraw,
    LabelRelease,
    LabelAbortRequest,
    Capability,
    Unknown(u16),
}

impl MessageType {
    pub fn from_code(code: u16) -> Self {
        match code {
            0x0001 => MessageType::Notification,
            0x0100 => MessageType::Hello,
            0x0200 => MessageType::Initialization,
            0x0201 => MessageType::Keepalive,
            0x0202 => MessageType::Capability,
            0x0300 => MessageType::Address,
            0x0301 => MessageType::AddressWithdraw,
            0x0400 => MessageType::LabelMapping,
            0x0401 => MessageType::LabelRequest,
            0x0402 => MessageType::LabelWithdraw,
            0x0403 => MessageType::LabelRelease,
            0x0404 => MessageType::LabelAbortRequest,
            other => MessageType::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            MessageType::Notification => 0x0001,
            MessageType::Hello => 0x0100,
            MessageType::Initialization => 0x0200,
            MessageType::Keepalive => 0x0201,
            MessageType::Capability => 0x0202,
            MessageType::Address => 0x0300,
            MessageType::AddressWithdraw => 0x0301,
            MessageType::LabelMapping => 0x0400,
            MessageType::LabelRequest => 0x0401,
            MessageType::LabelWithdraw => 0x0402,
            MessageType::LabelRelease => 0x0403,
            MessageType::LabelAbortRequest => 0x0404,
            MessageType::Unknown(code) => code,
        }
    }

    /// Whether this message type must be seen before any other on a fresh
    /// session (RFC 5036 §2.5.2: the first message after TCP connect must
    /// be Initialization).
    pub fn is_initialization(self) -> bool {
        matches!(self, MessageType::Initialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_codes() {
        for mt in [
            MessageType::Notification,
            MessageType::Hello,
            MessageType::Initialization,
            MessageType::Keepalive,
            MessageType::Capability,
            MessageType::LabelMapping,
        ] {
            assert_eq!(MessageType::from_code(mt.code()), mt);
        }
    }

    #[test]
    fn unrecognized_code_is_unknown() {
        assert_eq!(MessageType::from_code(0x0999), MessageType::Unknown(0x0999));
    }
}
