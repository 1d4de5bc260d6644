// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! UDP Hello discovery receiver (RFC 5036 §2.4, RFC 7552 §5.1). Recovers
//! the arriving interface via `IP_PKTINFO`/`IPV6_PKTINFO` ancillary data
//! the way `disc_recv_packet` uses `cmsg`, and enforces the IPv6
//! link-local-source requirement for discovery Hellos.

use std::{
    io::{IoSlice, IoSliceMut},
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    os::fd::{AsRawFd, RawFd},
};

use bytes::Bytes;
use nix::sys::socket::{
    ControlMessageOwned, MsgFlags, SockaddrIn, SockaddrIn6, recvmsg, sendmsg, setsockopt, sockopt,
};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::unix::AsyncFd;
use tracing::{debug, warn};
use zerocopy::FromBytes;

use crate::{
    cfg::{config::DiscoveryConfig, enums::AddressFamily},
    wire::{
        header::{HDR_SIZE, LDP_VERSION, MAX_PDU_LEN, MSG_HDR_DEAD_LEN, MSG_HDR_SIZE, MsgHeader, PduHeader},
        message::MessageType,
    },
};

/// One received discovery datagram, with the local address/interface it
/// actually arrived on, and the destination address it was sent to,
/// recovered from ancillary data rather than trusted from the bind
/// address (`disc_recv_packet`).
#[derive(Debug, Clone)]
pub struct DiscoveryPacket {
    pub src: SocketAddr,
    pub dst_ifindex: u32,
    pub dst: Option<IpAddr>,
    pub data: Vec<u8>,
}

/// A bound, non-blocking UDP discovery socket for one address family.
pub struct DiscoverySocket {
    af: AddressFamily,
    io: AsyncFd<std::net::UdpSocket>,
}

impl DiscoverySocket {
    pub fn af(&self) -> AddressFamily {
        self.af
    }

    pub fn bind_v4(port: u16) -> std::io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, port).into();
        socket.bind(&addr.into())?;
        setsockopt(&socket, sockopt::Ipv4PacketInfo, &true)
            .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;

        Ok(DiscoverySocket { af: AddressFamily::Ipv4, io: AsyncFd::new(socket.into())? })
    }

    pub fn bind_v6(port: u16) -> std::io::Result<Self> {
        let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_only_v6(true)?;
        socket.set_nonblocking(true)?;
        let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();
        socket.bind(&addr.into())?;
        setsockopt(&socket, sockopt::Ipv6RecvPacketInfo, &true)
            .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;

        Ok(DiscoverySocket { af: AddressFamily::Ipv6, io: AsyncFd::new(socket.into())? })
    }

    pub fn join_multicast_v4(&self, group: Ipv4Addr, iface: Ipv4Addr) -> std::io::Result<()> {
        let socket = Socket::from(self.io.get_ref().try_clone()?);
        let res = socket.join_multicast_v4(&group, &iface);
        std::mem::forget(socket);
        res
    }

    pub fn join_multicast_v6(&self, group: Ipv6Addr, ifindex: u32) -> std::io::Result<()> {
        let socket = Socket::from(self.io.get_ref().try_clone()?);
        let res = socket.join_multicast_v6(&group, ifindex);
        std::mem::forget(socket);
        res
    }

    /// Receives one discovery datagram, recovering the arriving ifindex
    /// from `IP_PKTINFO`/`IPV6_PKTINFO`. Mirrors `disc_recv_packet`'s
    /// `recvmsg` + cmsg walk, minus the `MSG_MCAST`/`bad_addr` checks that
    /// belong to the wider discovery FSM rather than this socket wrapper.
    pub async fn recv(&self) -> std::io::Result<DiscoveryPacket> {
        loop {
            let mut guard = self.io.readable().await?;
            let result = guard.try_io(|inner| self.recv_once(inner.get_ref().as_raw_fd()));
            match result {
                Ok(Ok(pkt)) => return Ok(pkt),
                Ok(Err(e)) => return Err(e),
                Err(_would_block) => continue,
            }
        }
    }

    fn recv_once(&self, fd: RawFd) -> std::io::Result<DiscoveryPacket> {
        let mut buf = [0_u8; 4096];
        let mut iov = [IoSliceMut::new(&mut buf)];
        let mut cmsg_buf = nix::cmsg_space!(libc::in_pktinfo, libc::in6_pktinfo);

        let (src, dst_ifindex, dst, n) = match self.af {
            AddressFamily::Ipv4 => {
                let msg = recvmsg::<SockaddrIn>(fd, &mut iov, Some(&mut cmsg_buf), MsgFlags::empty())
                    .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
                let src = msg
                    .address
                    .map(|a| SocketAddr::from(std::net::SocketAddrV4::from(a)))
                    .ok_or_else(|| {
                        std::io::Error::new(std::io::ErrorKind::InvalidData, "recvmsg returned no source address")
                    })?;
                let (ifindex, dst) = extract_pktinfo(msg.cmsgs().ok());
                (src, ifindex, dst, msg.bytes)
            },
            AddressFamily::Ipv6 => {
                let msg = recvmsg::<SockaddrIn6>(fd, &mut iov, Some(&mut cmsg_buf), MsgFlags::empty())
                    .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
                let src = msg
                    .address
                    .map(|a| SocketAddr::from(std::net::SocketAddrV6::from(a)))
                    .ok_or_else(|| {
                        std::io::Error::new(std::io::ErrorKind::InvalidData, "recvmsg returned no source address")
                    })?;
                let (ifindex, dst) = extract_pktinfo(msg.cmsgs().ok());
                (src, ifindex, dst, msg.bytes)
            },
        };

        if dst_ifindex == 0 {
            warn!("discovery datagram arrived without packet-info ancillary data");
        }

        Ok(DiscoveryPacket { src, dst_ifindex, dst, data: buf[..n].to_vec() })
    }

    /// Sends a datagram out of a specific interface, matching the
    /// original's per-interface multicast send (`send_packet`).
    pub fn send_to(&self, data: &[u8], dst: SocketAddr) -> std::io::Result<usize> {
        let iov = [IoSlice::new(data)];
        let fd = self.io.get_ref().as_raw_fd();
        let sent = match dst {
            SocketAddr::V4(v4) => {
                let sockaddr = SockaddrIn::from(v4);
                sendmsg::<SockaddrIn>(fd, &iov, &[], MsgFlags::empty(), Some(&sockaddr))
            },
            SocketAddr::V6(v6) => {
                let sockaddr = SockaddrIn6::from(v6);
                sendmsg::<SockaddrIn6>(fd, &iov, &[], MsgFlags::empty(), Some(&sockaddr))
            },
        }
        .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
        Ok(sent)
    }
}

/// Recovers the arriving ifindex and the datagram's destination address
/// from `IP_PKTINFO`/`IPV6_PKTINFO` ancillary data (`getsockopt_ifindex`).
/// The destination address is what lets the caller tell a multicast Hello
/// apart from a directed unicast one.
fn extract_pktinfo(cmsgs: Option<impl Iterator<Item = ControlMessageOwned>>) -> (u32, Option<IpAddr>) {
    let Some(cmsgs) = cmsgs else { return (0, None) };
    for cmsg in cmsgs {
        match cmsg {
            ControlMessageOwned::Ipv4PacketInfo(info) => {
                return (info.ipi_ifindex as u32, Some(IpAddr::V4(Ipv4Addr::from(info.ipi_addr.s_addr.to_ne_bytes()))));
            },
            ControlMessageOwned::Ipv6PacketInfo(info) => {
                return (info.ipi6_ifindex, Some(IpAddr::V6(Ipv6Addr::from(info.ipi6_addr.s6_addr))));
            },
            other => debug!(?other, "ignoring unrelated ancillary message"),
        }
    }
    (0, None)
}

/// RFC 7552 §5.1: an IPv6 Hello must originate from a link-local address.
pub fn is_valid_hello_source(af: AddressFamily, addr: IpAddr) -> bool {
    match (af, addr) {
        (AddressFamily::Ipv4, IpAddr::V4(_)) => true,
        (AddressFamily::Ipv6, IpAddr::V6(v6)) => {
            (v6.segments()[0] & 0xffc0) == 0xfe80
        },
        _ => false,
    }
}

/// `bad_addr(af, src)`: a source a Hello can never legitimately arrive
/// from (spec.md §4.4 step 1).
pub fn is_bad_source(addr: IpAddr) -> bool {
    if addr.is_loopback() || addr.is_unspecified() {
        return true;
    }
    match addr {
        IpAddr::V4(v4) => v4.is_multicast(),
        IpAddr::V6(v6) => v6.is_multicast(),
    }
}

fn is_multicast_addr(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_multicast(),
        IpAddr::V6(v6) => v6.is_multicast(),
    }
}

/// A validated Hello datagram, ready to hand off to
/// [`crate::handlers::MessageHandlers::recv_hello_discovery`].
#[derive(Debug, Clone)]
pub struct HelloDatagram {
    pub lsr_id: Ipv4Addr,
    pub header: MsgHeader,
    pub af: AddressFamily,
    pub src: IpAddr,
    pub ifindex: u32,
    pub multicast: bool,
    pub payload: Bytes,
}

/// Why a discovery datagram was dropped (spec.md §4.4: "silently drops" /
/// "drops silently with a debug log, never feeds back to the peer").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryDrop {
    BadSource,
    NoMatchingInterface,
    AddressFamilyDisabled,
    NonLinkLocalMulticastSource,
    BadDatagramLen,
    BadVersion,
    BadLabelSpace,
    BadPduLen,
    BadMsgLen,
    NotHello,
}

/// Validates one received datagram against the full spec.md §4.4 chain
/// and, if it survives, extracts the Hello message ready for hand-off.
/// Mirrors `disc_recv_packet`'s checks in the original.
pub fn process_datagram(
    pkt: &DiscoveryPacket,
    af: AddressFamily,
    cfg: &DiscoveryConfig,
) -> Result<HelloDatagram, DiscoveryDrop> {
    let src = pkt.src.ip();
    if is_bad_source(src) {
        return Err(DiscoveryDrop::BadSource);
    }

    let multicast = pkt.dst.map(is_multicast_addr).unwrap_or(false);
    if multicast {
        let iface = cfg
            .interfaces
            .iter()
            .find(|i| i.ifindex == pkt.dst_ifindex)
            .ok_or(DiscoveryDrop::NoMatchingInterface)?;
        if !iface.enabled_for(af) {
            return Err(DiscoveryDrop::AddressFamilyDisabled);
        }
        if af == AddressFamily::Ipv6 && !is_valid_hello_source(af, src) {
            return Err(DiscoveryDrop::NonLinkLocalMulticastSource);
        }
    }

    let data = &pkt.data[..];
    let datagram_len = data.len();
    if datagram_len < HDR_SIZE as usize + MSG_HDR_SIZE as usize || datagram_len > MAX_PDU_LEN as usize {
        return Err(DiscoveryDrop::BadDatagramLen);
    }

    let hdr = PduHeader::read_from_bytes(&data[..HDR_SIZE as usize])
        .map_err(|_| DiscoveryDrop::BadDatagramLen)?;
    if hdr.version.get() != LDP_VERSION {
        return Err(DiscoveryDrop::BadVersion);
    }
    if hdr.label_space.get() != 0 {
        return Err(DiscoveryDrop::BadLabelSpace);
    }

    let pdu_len = hdr.length.get();
    let max_pdu_len = (datagram_len as u16).saturating_sub(4);
    if pdu_len < MSG_HDR_SIZE + 2 || pdu_len > max_pdu_len {
        return Err(DiscoveryDrop::BadPduLen);
    }

    let msg_start = HDR_SIZE as usize;
    let msg_end = msg_start + MSG_HDR_SIZE as usize;
    if data.len() < msg_end {
        return Err(DiscoveryDrop::BadMsgLen);
    }
    let msg_hdr = MsgHeader::read_from_bytes(&data[msg_start..msg_end])
        .map_err(|_| DiscoveryDrop::BadMsgLen)?;
    let msg_len = msg_hdr.msg_length.get();
    if msg_len < 6 || msg_len > pdu_len.saturating_sub(4) {
        return Err(DiscoveryDrop::BadMsgLen);
    }
    if msg_hdr.type_code() != MessageType::Hello.code() {
        return Err(DiscoveryDrop::NotHello);
    }

    let payload_len = (msg_len - MSG_HDR_DEAD_LEN) as usize;
    let payload_end = (msg_end + payload_len).min(data.len());
    let payload = Bytes::copy_from_slice(&data[msg_end..payload_end]);

    Ok(HelloDatagram {
        lsr_id: hdr.lsr_id_addr(),
        header: msg_hdr,
        af,
        src,
        ifindex: pkt.dst_ifindex,
        multicast,
        payload,
    })
}
