// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Common routines for integration tests.

// This type of pedantry is more trouble than it's worth here.
#![allow(dead_code)]

pub mod pcap;

// Let's make our lives easier and pub use a bunch of stuff.
pub use knock::engine::HookRegistry;
pub use knock::engine::HookTable;
pub use knock::engine::Ipv4Frame;
pub use knock::engine::Knocker;
pub use knock::engine::PacketHook;
pub use knock::engine::PacketMeta;
pub use knock::engine::PacketView;
pub use knock::engine::TcpFlags;
pub use knock::engine::Verdict;
pub use knock::provider::LogLevel;
pub use knock::provider::LogProvider;
pub use knock::provider::Providers;
pub use knock::time::ManualClock;
pub use knock_api::Direction::*;
pub use knock_api::HIDE_PORT;
pub use knock_api::KPORT_1;
pub use knock_api::KPORT_2;
pub use knock_api::KPORT_3;
pub use knock_api::KnockCfg;
pub use knock_api::Protocol;

use knock::engine::checksum::Checksum;
use knock::engine::checksum::HeaderChecksum;
use knock::engine::ip4::IPV4_HDR_SZ;
use knock::engine::ip4::Ipv4Hdr;
use knock::engine::tcp::TCP_HDR_SZ;
use knock::engine::tcp::TcpHdr;
use knock::engine::udp::UDP_HDR_SZ;
use knock::engine::udp::UdpHdr;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::Mutex;
use zerocopy::IntoBytes;
use zerocopy::network_endian::U16;
use zerocopy::network_endian::U32;

pub const CLIENT_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
pub const SERVER_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const CLIENT_PORT: u16 = 40000;

/// An arbitrary starting time, far from the initial knock slots.
pub const T0: i64 = 1_700_000_000;

/// A [`LogProvider`] which keeps every message for later inspection.
#[derive(Clone, Default)]
pub struct CaptureLog {
    msgs: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl CaptureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages logged so far, oldest first.
    pub fn msgs(&self) -> Vec<(LogLevel, String)> {
        self.msgs.lock().unwrap().clone()
    }

    /// The messages logged at `level`.
    pub fn at(&self, level: LogLevel) -> Vec<String> {
        self.msgs()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.msgs().iter().any(|(_, m)| m.contains(needle))
    }
}

impl LogProvider for CaptureLog {
    fn log(&self, level: LogLevel, msg: &str) {
        self.msgs.lock().unwrap().push((level, msg.to_string()));
    }
}

/// A knocker on the default configuration, driven by the returned
/// clock, logging into the returned capture.
pub fn knocker(now: i64) -> (Knocker, Arc<ManualClock>, CaptureLog) {
    let clock = Arc::new(ManualClock::new(now));
    let log = CaptureLog::new();
    let providers = Providers {
        log: Box::new(log.clone()),
        clock: Box::new(clock.clone()),
    };
    let k = Knocker::new(KnockCfg::default(), providers).unwrap();
    (k, clock, log)
}

/// A SYN from the client to `dport` on the server.
pub fn syn(dport: u16) -> PacketMeta {
    PacketMeta::tcp(CLIENT_PORT, dport, TcpFlags::SYN)
}

/// A SYN-ACK from the server's protected port back to the client.
pub fn syn_ack() -> PacketMeta {
    PacketMeta::tcp(HIDE_PORT, CLIENT_PORT, TcpFlags::SYN | TcpFlags::ACK)
}

fn ipv4_hdr(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    proto: Protocol,
    ulp_len: usize,
) -> Ipv4Hdr {
    let mut ip = Ipv4Hdr {
        ver_hdr_len: 0x45,
        dscp_ecn: 0,
        total_len: U16::new((IPV4_HDR_SZ + ulp_len) as u16),
        ident: U16::new(1),
        frag_off: U16::new(0x4000),
        ttl: 64,
        proto: u8::from(proto),
        csum: [0; 2],
        src: src.octets(),
        dst: dst.octets(),
    };
    ip.csum = HeaderChecksum::from(Checksum::compute(ip.as_bytes())).bytes();
    ip
}

// The ULP checksum covers a pseudo-header of addresses, protocol and
// ULP length ahead of the ULP bytes themselves.
fn ulp_csum(ip: &Ipv4Hdr, ulp: &[u8]) -> [u8; 2] {
    let mut csum = Checksum::compute(&ip.src);
    csum.add_bytes(&ip.dst);
    csum.add_bytes(&[0, ip.proto]);
    csum.add_bytes(&(ulp.len() as u16).to_be_bytes());
    csum.add_bytes(ulp);
    HeaderChecksum::from(csum).bytes()
}

/// Build an IPv4/TCP datagram with valid checksums and no payload.
pub fn tcp_frame(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    sport: u16,
    dport: u16,
    flags: TcpFlags,
) -> Vec<u8> {
    let ip = ipv4_hdr(src, dst, Protocol::TCP, TCP_HDR_SZ);
    let mut tcp = TcpHdr {
        src_port: U16::new(sport),
        dst_port: U16::new(dport),
        seq: U32::new(1),
        ack: U32::new(0),
        offset: ((TCP_HDR_SZ / 4) as u8) << 4,
        flags: flags.bits(),
        window: U16::new(0xFFFF),
        csum: [0; 2],
        urg: U16::new(0),
    };
    tcp.csum = ulp_csum(&ip, tcp.as_bytes());

    let mut frame = ip.as_bytes().to_vec();
    frame.extend_from_slice(tcp.as_bytes());
    frame
}

/// Build an IPv4/UDP datagram carrying `payload`.
pub fn udp_frame(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    sport: u16,
    dport: u16,
    payload: &[u8],
) -> Vec<u8> {
    let ulp_len = UDP_HDR_SZ + payload.len();
    let ip = ipv4_hdr(src, dst, Protocol::UDP, ulp_len);
    let mut udp = UdpHdr {
        src_port: U16::new(sport),
        dst_port: U16::new(dport),
        len: U16::new(ulp_len as u16),
        csum: [0; 2],
    };
    let mut ulp = udp.as_bytes().to_vec();
    ulp.extend_from_slice(payload);
    udp.csum = ulp_csum(&ip, &ulp);

    let mut frame = ip.as_bytes().to_vec();
    frame.extend_from_slice(udp.as_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Verify the IPv4 header checksum and, for TCP, the segment checksum.
pub fn csums_valid(frame: &[u8]) -> bool {
    let ip_ok = Checksum::compute(&frame[..IPV4_HDR_SZ]).finalize() == 0xFFFF;
    if frame[9] != u8::from(Protocol::TCP) {
        return ip_ok;
    }

    let ulp = &frame[IPV4_HDR_SZ..];
    let mut csum = Checksum::compute(&frame[12..20]);
    csum.add_bytes(&[0, frame[9]]);
    csum.add_bytes(&(ulp.len() as u16).to_be_bytes());
    csum.add_bytes(ulp);
    ip_ok && csum.finalize() == 0xFFFF
}
