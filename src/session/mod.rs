//! TCP session machinery: accept, per-connection buffering, and the
//! per-PDU dispatch/shutdown path.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod acceptor;
pub mod connection;
pub mod dispatcher;
pub mod pending;

pub use acceptor::{AcceptOutcome, Acceptor};
pub use connection::TcpConnection;
pub use dispatcher::{DispatchOutcome, MsgCounters};
pub use pending::PendingConnTable;
