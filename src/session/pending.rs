// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Connections accepted before any neighbor (Hello adjacency) is known for
//! their source address. RFC 5036 would have us close them immediately
//! with a "No Hello" Notification, but doing so trips the remote peer's
//! exponential backoff; instead we park the connection for
//! `PENDING_CONN_TIMEOUT` and give the Hello a chance to arrive first
//! (`pending_conn_new`/`pending_conn_timeout` in the original).

use std::{collections::HashMap, net::IpAddr, time::Duration};

use tokio::{net::TcpStream, time::Instant};

struct PendingEntry {
    stream: TcpStream,
    deadline: Instant,
}

/// At most one pending connection is kept per source address
/// (`pending_conn_find` closes a second attempt outright).
#[derive(Default)]
pub struct PendingConnTable {
    by_addr: HashMap<IpAddr, PendingEntry>,
}

impl PendingConnTable {
    pub fn new() -> Self {
        PendingConnTable { by_addr: HashMap::new() }
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.by_addr.contains_key(addr)
    }

    /// Registers a newly-accepted connection as pending. Returns `false`
    /// (and does not store anything) if one was already pending for this
    /// address, mirroring `pending_conn_find` returning non-NULL.
    pub fn insert(&mut self, addr: IpAddr, stream: TcpStream, timeout: Duration) -> bool {
        if self.by_addr.contains_key(&addr) {
            return false;
        }
        self.by_addr.insert(
            addr,
            PendingEntry { stream, deadline: Instant::now() + timeout },
        );
        true
    }

    /// Removes and returns a pending connection, e.g. because a Hello just
    /// resolved the neighbor for this address (`pending_conn_del`).
    pub fn remove(&mut self, addr: &IpAddr) -> Option<TcpStream> {
        self.by_addr.remove(addr).map(|e| e.stream)
    }

    pub fn is_empty(&self) -> bool {
        self.by_addr.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    /// Waits for the next pending connection to time out and removes it,
    /// returning its address and socket so the caller can send the
    /// "No Hello" notification and close it. Never resolves if the table
    /// is empty; callers select! this against other readiness sources.
    pub async fn next_expired(&mut self) -> (IpAddr, TcpStream) {
        loop {
            let next = self
                .by_addr
                .iter()
                .min_by_key(|(_, e)| e.deadline)
                .map(|(addr, e)| (*addr, e.deadline));
            match next {
                None => std::future::pending::<()>().await,
                Some((addr, deadline)) => {
                    tokio::time::sleep_until(deadline).await;
                    if let Some(entry) = self.by_addr.get(&addr)
                        && entry.deadline <= Instant::now()
                    {
                        let entry = self.by_addr.remove(&addr).expect("just checked");
                        return (addr, entry.stream);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn dummy_pair() -> (TcpStream, TcpStream) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let connect = TcpStream::connect(addr);
        let (accept, connect) = tokio::join!(listener.accept(), connect);
        (accept.expect("accept").0, connect.expect("connect"))
    }

    #[tokio::test]
    async fn rejects_second_pending_for_same_address() {
        let mut table = PendingConnTable::new();
        let addr: IpAddr = "10.0.0.1".parse().expect("addr");
        let (s1, _c1) = dummy_pair().await;
        let (s2, _c2) = dummy_pair().await;

        assert!(table.insert(addr, s1, Duration::from_secs(5)));
        assert!(!table.insert(addr, s2, Duration::from_secs(5)));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn expires_after_timeout() {
        let mut table = PendingConnTable::new();
        let addr: IpAddr = "10.0.0.2".parse().expect("addr");
        let (s1, _c1) = dummy_pair().await;
        table.insert(addr, s1, Duration::from_millis(20));

        let (expired_addr, _stream) = table.next_expired().await;
        assert_eq!(expired_addr, addr);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn remove_takes_connection_back_out() {
        let mut table = PendingConnTable::new();
        let addr: IpAddr = "10.0.0.3".parse().expect("addr");
        let (s1, _c1) = dummy_pair().await;
        table.insert(addr, s1, Duration::from_secs(5));

        assert!(table.remove(&addr).is_some());
        assert!(table.is_empty());
    }
}
