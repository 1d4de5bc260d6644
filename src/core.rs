// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The single-threaded, single-owner context described in Design Note §9:
//! bundles the message-id generator (a file-scope `static` in the
//! original) and the pending-connection table so both live behind one
//! `&mut` borrow instead of globals or interior mutability.

use tokio_util::sync::CancellationToken;

use crate::session::PendingConnTable;

pub struct Core {
    msg_id: u32,
    pub pending: PendingConnTable,
    /// Cancelled to unwind the accept/discovery select loop on shutdown,
    /// the way `tokio_util::sync::CancellationToken` gates the read loops
    /// in the wider suite's client side.
    pub shutdown: CancellationToken,
    /// Count of sessions that failed before reaching `OPERATIONAL`
    /// (`leconf->stats.session_attempts` in the original), bumped by
    /// [`crate::session::dispatcher::shutdown_for_state`].
    pub session_attempts: u32,
}

impl Core {
    pub fn new() -> Self {
        Core {
            msg_id: 0,
            pending: PendingConnTable::new(),
            shutdown: CancellationToken::new(),
            session_attempts: 0,
        }
    }

    /// Next message id (`gen_msg_hdr`'s `++msgcnt`). Wraps on overflow
    /// rather than panicking: message ids are advisory correlation
    /// numbers, not a safety invariant.
    pub fn next_msg_id(&mut self) -> u32 {
        self.msg_id = self.msg_id.wrapping_add(1);
        self.msg_id
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msg_ids_increase_monotonically() {
        let mut core = Core::new();
        assert_eq!(core.next_msg_id(), 1);
        assert_eq!(core.next_msg_id(), 2);
        assert_eq!(core.next_msg_id(), 3);
    }
}
