//! Wire codec: PDU/message framing per RFC 5036 §3.5 and RFC 7552.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod header;
pub mod message;
pub mod pdu;

pub use header::{MsgHeader, PduHeader, HDR_SIZE, MAX_PDU_LEN, MSG_HDR_SIZE};
pub use message::MessageType;
pub use pdu::{Message, Pdu};
