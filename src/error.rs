// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire-decode errors and the LDP Notification status codes used to shut
//! down a session (RFC 5036 §3.5.2.1).

use thiserror::Error;

/// Failures that can occur while parsing bytes off the wire, before any
/// protocol-level (session) check can even run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer holds {have} bytes, need at least {need}")]
    ShortBuffer { have: usize, need: usize },
    #[error("unsupported LDP version {0}")]
    BadVersion(u16),
    #[error("PDU length {0} is out of the legal [6, max] range")]
    BadPduLength(u16),
    #[error("message length {0} is shorter than the mandatory parameters")]
    BadMessageLength(u16),
}

/// RFC 5036 §3.5.2.1 status codes, reproduced from the original
/// implementation's header constants. Used both as the `StatusCode` TLV
/// value of a Notification message and as the reason recorded when a
/// session is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ShutdownStatus {
    Success = 0x0000_0000,
    BadLdpId = 0x0000_0001,
    BadProtoVer = 0x0000_0002,
    BadPduLen = 0x0000_0003,
    UnknownMsg = 0x0000_0004,
    BadMsgLen = 0x0000_0005,
    UnknownTlv = 0x0000_0006,
    BadTlvLen = 0x0000_0007,
    MalformedTlvValue = 0x0000_0008,
    HoldTimerExpired = 0x0000_0009,
    Shutdown = 0x0000_000a,
    LoopDetected = 0x0000_000b,
    UnknownFec = 0x0000_000c,
    NoRoute = 0x0000_000d,
    NoLabelResources = 0x0000_000e,
    LabelResourcesAvailable = 0x0000_000f,
    NoHello = 0x0000_0010,
    ParamAdvertisementMode = 0x0000_0011,
    ParamMaxPduLen = 0x0000_0012,
    ParamLabelRange = 0x0000_0013,
    KeepaliveTimerExpired = 0x0000_0014,
    LabelRequestAborted = 0x0000_0015,
    MissingMsgParams = 0x0000_0016,
    UnsupportedAddressFamily = 0x0000_0017,
    BadKeepaliveTime = 0x0000_0018,
    InternalError = 0x0000_0019,
}

impl ShutdownStatus {
    /// The high bit of a Status TLV's status code marks it "fatal": the
    /// receiver must close the session rather than merely note the error.
    pub const FATAL_BIT: u32 = 0x8000_0000;

    pub fn is_fatal(self) -> bool {
        !matches!(self, ShutdownStatus::Success)
    }

    pub fn wire_value(self) -> u32 {
        if self.is_fatal() {
            self as u32 | Self::FATAL_BIT
        } else {
            self as u32
        }
    }
}

impl From<DecodeError> for ShutdownStatus {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::ShortBuffer { .. } => ShutdownStatus::BadPduLen,
            DecodeError::BadVersion(_) => ShutdownStatus::BadProtoVer,
            DecodeError::BadPduLength(_) => ShutdownStatus::BadPduLen,
            DecodeError::BadMessageLength(_) => ShutdownStatus::BadMsgLen,
        }
    }
}
