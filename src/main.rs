// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use futures_util::future::select_all;
use ldp_session_core::{
    cfg::{cli::resolve_config_path, config::Config, enums::AddressFamily, logger::init_logger},
    core::Core,
    discovery::{DiscoverySocket, process_datagram},
    handlers::{MessageHandlers, NoopHandlers},
    neighbor::NullNeighborTable,
    session::{AcceptOutcome, Acceptor, acceptor::{accept_one, notify_no_hello}},
};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Polls every bound discovery socket at once, since `tokio::select!`'s arms
/// are fixed at compile time and can't iterate a runtime-sized `Vec`.
async fn recv_any(sockets: &[DiscoverySocket]) -> (usize, std::io::Result<ldp_session_core::discovery::DiscoveryPacket>) {
    let futures = sockets.iter().map(|s| Box::pin(s.recv()));
    let (result, index, _remaining) = select_all(futures).await;
    (index, result)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_logger("config/logger.yaml").context("failed to init logger")?;

    let cfg = resolve_config_path("config/ldpd.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let listener = TcpListener::bind(("0.0.0.0", cfg.session.listen_port))
        .await
        .context("failed to bind session listener")?;
    let mut acceptor = Acceptor::new(listener);

    let mut discovery_sockets = Vec::new();
    for iface in &cfg.discovery.interfaces {
        if iface.enabled_for(AddressFamily::Ipv4) {
            let sock = DiscoverySocket::bind_v4(cfg.discovery.hello_port)
                .with_context(|| format!("failed to bind ipv4 discovery socket on {}", iface.name))?;
            discovery_sockets.push(sock);
        }
        if iface.enabled_for(AddressFamily::Ipv6) {
            let sock = DiscoverySocket::bind_v6(cfg.discovery.hello_port)
                .with_context(|| format!("failed to bind ipv6 discovery socket on {}", iface.name))?;
            discovery_sockets.push(sock);
        }
    }

    let neighbors = NullNeighborTable;
    let mut handlers = NoopHandlers;
    let mut core = Core::new();

    info!("ldp session core listening on port {}", cfg.session.listen_port);

    loop {
        tokio::select! {
            _ = core.shutdown.cancelled() => {
                info!("shutdown requested, stopping accept/discovery loop");
                break;
            },
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c, shutting down");
                core.shutdown.cancel();
            },
            accepted = acceptor.accept() => {
                if let Some((stream, peer)) = accepted {
                    let outcome = accept_one(
                        stream,
                        peer,
                        &neighbors,
                        &mut core.pending,
                        cfg.session.pending_conn_timeout,
                        cfg.runtime.ibuf_read_size,
                    ).await;
                    match outcome {
                        // Handing the attached connection to a live session registry is the
                        // wider routing suite's job; this binary has none wired in yet.
                        AcceptOutcome::Attached(_conn) => info!(%peer, "session attached"),
                        AcceptOutcome::Parked => info!(%peer, "connection parked pending hello"),
                        AcceptOutcome::Rejected(reason) => warn!(%peer, reason, "connection rejected"),
                    }
                }
            },
            (addr, stream) = core.pending.next_expired() => {
                info!(%addr, "pending connection timed out, sending no-hello notification");
                notify_no_hello(stream, cfg.runtime.ibuf_read_size).await;
            },
            (index, received) = recv_any(&discovery_sockets), if !discovery_sockets.is_empty() => {
                match received {
                    Ok(pkt) => {
                        let af = discovery_sockets[index].af();
                        match process_datagram(&pkt, af, &cfg.discovery) {
                            Ok(hello) => {
                                handlers.recv_hello_discovery(
                                    hello.lsr_id,
                                    &hello.header,
                                    hello.af,
                                    hello.src,
                                    hello.ifindex,
                                    hello.multicast,
                                    &hello.payload,
                                );
                            },
                            Err(reason) => debug!(?reason, src = %pkt.src, "dropping discovery datagram"),
                        }
                    },
                    Err(e) => warn!(error = %e, "discovery socket read failed"),
                }
            },
        }
    }

    Ok(())
}
