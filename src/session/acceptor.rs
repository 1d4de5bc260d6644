// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! TCP session acceptor: disposes of every freshly-accepted connection
//! according to whether a neighbor is already known for its source
//! address, mirroring `session_accept`/`session_accept_nbr`.

use std::{net::IpAddr, time::Duration};

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::{
    error::ShutdownStatus,
    neighbor::{NbrEvent, NbrState, NeighborTable},
    session::{connection::TcpConnection, pending::PendingConnTable},
};

/// What the acceptor decided to do with a freshly-accepted connection.
pub enum AcceptOutcome {
    /// Handed off to an existing, passively-waiting neighbor; the
    /// connection is retained for the caller to register as that
    /// neighbor's session transport.
    Attached(TcpConnection),
    /// No neighbor is known yet for this address; parked pending a Hello.
    Parked,
    /// Rejected and closed (duplicate pending, active-role peer, GTSM
    /// failure, or a neighbor that already owns a session).
    Rejected(&'static str),
}

/// True if `accept()` failed for a reason that means "we're out of file
/// descriptors", the only case that should pause the listener.
pub fn is_fd_exhaustion(err: &std::io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::ENFILE) | Some(libc::EMFILE)
    )
}

/// Disposes of one newly-accepted TCP connection.
pub async fn accept_one<T: NeighborTable>(
    stream: TcpStream,
    peer: IpAddr,
    neighbors: &T,
    pending: &mut PendingConnTable,
    pending_conn_timeout: Duration,
    read_buf_capacity: usize,
) -> AcceptOutcome {
    let _ = stream.set_nodelay(true);

    let Some(id) = neighbors.find_by_addr(peer) else {
        if pending.contains(&peer) {
            debug!(%peer, "second pending connection attempt, dropping");
            return AcceptOutcome::Rejected("duplicate pending connection");
        }
        pending.insert(peer, stream, pending_conn_timeout);
        return AcceptOutcome::Parked;
    };

    if neighbors.session_active_role(id) {
        debug!(%peer, "active-role neighbor opened a passive connection, rejecting");
        return AcceptOutcome::Rejected("active role protection");
    }

    match neighbors.state(id) {
        Some(NbrState::Present) => {
            let ttl = stream.ttl().unwrap_or(255).min(u32::from(u8::MAX)) as u8;
            if !neighbors.gtsm_check(id, ttl) {
                debug!(%peer, ttl, "gtsm check rejected newly accepted connection");
                return AcceptOutcome::Rejected("gtsm check failed");
            }
            if let Err(e) = neighbors.fsm(id, NbrEvent::MatchAdj) {
                warn!(error = %e, "neighbor fsm rejected newly accepted connection");
                return AcceptOutcome::Rejected("fsm rejected connection");
            }
            let conn = TcpConnection::new(stream, Some(id), read_buf_capacity);
            AcceptOutcome::Attached(conn)
        },
        _ => {
            debug!(%peer, "rejecting additional transport connection");
            AcceptOutcome::Rejected("neighbor already has a session")
        },
    }
}

/// Wraps a [`TcpListener`], tracking whether `accept()` has been paused
/// due to file-descriptor exhaustion (`accept_pause`/`accept_unpause`).
pub struct Acceptor {
    listener: TcpListener,
    paused: bool,
}

impl Acceptor {
    pub fn new(listener: TcpListener) -> Self {
        Acceptor { listener, paused: false }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    /// Accepts the next connection, pausing internally on fd exhaustion.
    /// Never resolves while paused; callers must call [`Acceptor::unpause`]
    /// (when a connection elsewhere closes) to make progress again.
    pub async fn accept(&mut self) -> Option<(TcpStream, IpAddr)> {
        if self.paused {
            std::future::pending::<()>().await;
            return None;
        }
        match self.listener.accept().await {
            Ok((stream, addr)) => Some((stream, addr.ip())),
            Err(e) if is_fd_exhaustion(&e) => {
                warn!("out of file descriptors, pausing accept");
                self.paused = true;
                None
            },
            Err(e) => {
                debug!(error = %e, "accept error");
                None
            },
        }
    }
}

/// Sends the RFC 5036-mandated "No Hello" notification to a connection
/// that timed out in the pending table, then lets the caller drop it
/// (`pending_conn_timeout` -> `tcp_new(fd, NULL)` + `send_notification`).
pub async fn notify_no_hello(stream: TcpStream, read_buf_capacity: usize) {
    let mut conn = TcpConnection::new(stream, None, read_buf_capacity);
    conn.send_notification(ShutdownStatus::NoHello, 0, 0);
    if let Err(e) = conn.flush().await {
        debug!(error = %e, "failed flushing no-hello notification");
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::neighbor::{NeighborId, test_double::MockNeighborTable};

    async fn connect_pair() -> (TcpStream, IpAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let client = TcpStream::connect(addr);
        let (accept, _client) = tokio::join!(listener.accept(), client);
        let (stream, _peer) = accept.expect("accept");
        (stream, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)))
    }

    #[tokio::test]
    async fn unknown_peer_is_parked() {
        let (stream, peer) = connect_pair().await;
        let neighbors = MockNeighborTable::default();
        let mut pending = PendingConnTable::new();

        let outcome = accept_one(
            stream,
            peer,
            &neighbors,
            &mut pending,
            Duration::from_secs(5),
            4096,
        )
        .await;
        assert!(matches!(outcome, AcceptOutcome::Parked));
        assert!(pending.contains(&peer));
    }

    #[tokio::test]
    async fn second_connection_from_same_unknown_peer_is_rejected() {
        let (stream1, peer) = connect_pair().await;
        let (stream2, _) = connect_pair().await;
        let neighbors = MockNeighborTable::default();
        let mut pending = PendingConnTable::new();

        accept_one(stream1, peer, &neighbors, &mut pending, Duration::from_secs(5), 4096).await;
        let outcome = accept_one(
            stream2,
            peer,
            &neighbors,
            &mut pending,
            Duration::from_secs(5),
            4096,
        )
        .await;
        assert!(matches!(outcome, AcceptOutcome::Rejected("duplicate pending connection")));
    }

    #[tokio::test]
    async fn active_role_neighbor_is_rejected() {
        let (stream, peer) = connect_pair().await;
        let neighbors = MockNeighborTable::default();
        let id = NeighborId(2); // even id => active role per MockNeighborTable
        neighbors.insert(peer, id, NbrState::Present);
        let mut pending = PendingConnTable::new();

        let outcome = accept_one(stream, peer, &neighbors, &mut pending, Duration::from_secs(5), 4096).await;
        assert!(matches!(outcome, AcceptOutcome::Rejected("active role protection")));
    }

    #[tokio::test]
    async fn passive_role_present_neighbor_is_attached() {
        let (stream, peer) = connect_pair().await;
        let neighbors = MockNeighborTable::default();
        let id = NeighborId(3); // odd id => passive role
        neighbors.insert(peer, id, NbrState::Present);
        let mut pending = PendingConnTable::new();

        let outcome = accept_one(stream, peer, &neighbors, &mut pending, Duration::from_secs(5), 4096).await;
        assert!(matches!(outcome, AcceptOutcome::Attached(_)));
        assert_eq!(neighbors.events(), vec![(id, NbrEvent::MatchAdj)]);
    }

    #[tokio::test]
    async fn gtsm_check_failure_rejects_connection() {
        let (stream, peer) = connect_pair().await;
        let neighbors = MockNeighborTable::default();
        let id = NeighborId(3);
        neighbors.insert(peer, id, NbrState::Present);
        neighbors.fail_gtsm(id);
        let mut pending = PendingConnTable::new();

        let outcome = accept_one(stream, peer, &neighbors, &mut pending, Duration::from_secs(5), 4096).await;
        assert!(matches!(outcome, AcceptOutcome::Rejected("gtsm check failed")));
        assert!(neighbors.events().is_empty());
    }

    #[tokio::test]
    async fn neighbor_with_existing_session_is_rejected() {
        let (stream, peer) = connect_pair().await;
        let neighbors = MockNeighborTable::default();
        let id = NeighborId(3);
        neighbors.insert(peer, id, NbrState::Operational);
        let mut pending = PendingConnTable::new();

        let outcome = accept_one(stream, peer, &neighbors, &mut pending, Duration::from_secs(5), 4096).await;
        assert!(matches!(outcome, AcceptOutcome::Rejected("neighbor already has a session")));
    }
}
