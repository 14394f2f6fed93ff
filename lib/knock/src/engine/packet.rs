// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The view of a packet handed to a hook.
//!
//! The hooks only ever look at the IP protocol and the ULP ports, and
//! only ever change the TCP flags. [`PacketView`] is that much of a
//! packet and nothing more. A view is borrowed for the duration of a
//! single hook invocation.
//!
//! Two views are provided. [`PacketMeta`] is for interception layers
//! which have already decoded the headers. [`Ipv4Frame`] sits directly
//! atop the bytes of an IPv4 datagram and writes flag changes back into
//! them, keeping the TCP checksum correct.

use super::checksum;
use super::ip4::IPV4_HDR_SZ;
use super::ip4::IPV4_VERSION;
use super::ip4::Ipv4Hdr;
use super::tcp::TCP_FLAGS_OFFSET;
use super::tcp::TCP_HDR_SZ;
use super::tcp::TcpFlags;
use super::tcp::TcpHdr;
use super::udp::UDP_HDR_SZ;
use super::udp::UdpHdr;
use core::fmt;
use core::fmt::Display;
use knock_api::Protocol;
use std::net::Ipv4Addr;
use zerocopy::FromBytes;

/// The fields of a packet visible to a hook.
pub trait PacketView {
    fn protocol(&self) -> Protocol;

    /// The ULP source port, or zero if there is no ULP header with
    /// ports in this packet.
    fn src_port(&self) -> u16;

    /// The ULP destination port, or zero if there is no ULP header with
    /// ports in this packet.
    fn dst_port(&self) -> u16;

    /// The TCP flags, or empty if there is no TCP header.
    fn tcp_flags(&self) -> TcpFlags;

    /// Replace the TCP flags. Has no effect without a TCP header.
    fn set_tcp_flags(&mut self, flags: TcpFlags);
}

/// Already-decoded packet fields.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PacketMeta {
    pub proto: Protocol,
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: TcpFlags,
}

impl PacketMeta {
    pub fn tcp(src_port: u16, dst_port: u16, flags: TcpFlags) -> Self {
        Self { proto: Protocol::TCP, src_port, dst_port, flags }
    }

    pub fn udp(src_port: u16, dst_port: u16) -> Self {
        Self {
            proto: Protocol::UDP,
            src_port,
            dst_port,
            flags: TcpFlags::empty(),
        }
    }
}

impl PacketView for PacketMeta {
    fn protocol(&self) -> Protocol {
        self.proto
    }

    fn src_port(&self) -> u16 {
        self.src_port
    }

    fn dst_port(&self) -> u16 {
        self.dst_port
    }

    fn tcp_flags(&self) -> TcpFlags {
        self.flags
    }

    fn set_tcp_flags(&mut self, flags: TcpFlags) {
        if self.proto == Protocol::TCP {
            self.flags = flags;
        }
    }
}

impl Display for PacketMeta {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} [{}]",
            self.proto, self.src_port, self.dst_port, self.flags
        )
    }
}

/// A frame could not be decoded.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("truncated {layer} header: need {need} bytes, have {have}")]
    Truncated { layer: &'static str, need: usize, have: usize },

    #[error("not an IPv4 datagram: version {0}")]
    NotIpv4(u8),

    #[error("bad IPv4 header length: {0}")]
    BadHdrLen(usize),
}

/// A [`PacketView`] directly over the bytes of an IPv4 datagram.
///
/// The IPv4 header and, for TCP and UDP, the fixed portion of the ULP
/// header are validated at construction; after that every accessor is
/// infallible.
///
/// A fragment other than the first has no ULP header. Its ports read as
/// zero, it has no TCP flags, and its bytes are never written.
#[derive(Debug)]
pub struct Ipv4Frame<'a> {
    buf: &'a mut [u8],
    ulp_off: usize,
    has_ulp_hdr: bool,
    proto: Protocol,
    src: Ipv4Addr,
    dst: Ipv4Addr,
    src_port: u16,
    dst_port: u16,
}

impl<'a> Ipv4Frame<'a> {
    pub fn parse(buf: &'a mut [u8]) -> Result<Self, FrameError> {
        let have = buf.len();
        let (ip, _) = Ipv4Hdr::ref_from_prefix(&buf[..]).map_err(|_| {
            FrameError::Truncated { layer: "IPv4", need: IPV4_HDR_SZ, have }
        })?;

        if ip.version() != IPV4_VERSION {
            return Err(FrameError::NotIpv4(ip.version()));
        }

        let ulp_off = ip.hdr_len();
        if ulp_off < IPV4_HDR_SZ {
            return Err(FrameError::BadHdrLen(ulp_off));
        }

        if ulp_off > have {
            return Err(FrameError::Truncated {
                layer: "IPv4",
                need: ulp_off,
                have,
            });
        }

        let proto = ip.protocol();
        let src = ip.src();
        let dst = ip.dst();
        let has_ulp_hdr = ip.frag_offset() == 0;
        let ulp = &buf[ulp_off..];

        let (src_port, dst_port) = match proto {
            _ if !has_ulp_hdr => (0, 0),

            Protocol::TCP => {
                let (tcp, _) = TcpHdr::ref_from_prefix(ulp).map_err(|_| {
                    FrameError::Truncated {
                        layer: "TCP",
                        need: ulp_off + TCP_HDR_SZ,
                        have,
                    }
                })?;
                (tcp.src_port.get(), tcp.dst_port.get())
            }

            Protocol::UDP => {
                let (udp, _) = UdpHdr::ref_from_prefix(ulp).map_err(|_| {
                    FrameError::Truncated {
                        layer: "UDP",
                        need: ulp_off + UDP_HDR_SZ,
                        have,
                    }
                })?;
                (udp.src_port.get(), udp.dst_port.get())
            }

            _ => (0, 0),
        };

        Ok(Self {
            buf,
            ulp_off,
            has_ulp_hdr,
            proto,
            src,
            dst,
            src_port,
            dst_port,
        })
    }

    pub fn src(&self) -> Ipv4Addr {
        self.src
    }

    pub fn dst(&self) -> Ipv4Addr {
        self.dst
    }

    fn tcp_hdr_mut(&mut self) -> Option<&mut TcpHdr> {
        if self.proto != Protocol::TCP || !self.has_ulp_hdr {
            return None;
        }

        // Length was checked in `parse()`.
        TcpHdr::mut_from_prefix(&mut self.buf[self.ulp_off..])
            .ok()
            .map(|(tcp, _)| tcp)
    }
}

impl PacketView for Ipv4Frame<'_> {
    fn protocol(&self) -> Protocol {
        self.proto
    }

    fn src_port(&self) -> u16 {
        self.src_port
    }

    fn dst_port(&self) -> u16 {
        self.dst_port
    }

    fn tcp_flags(&self) -> TcpFlags {
        match self.proto {
            Protocol::TCP if self.has_ulp_hdr => TcpFlags::from_bits_retain(
                self.buf[self.ulp_off + TCP_FLAGS_OFFSET],
            ),
            _ => TcpFlags::empty(),
        }
    }

    fn set_tcp_flags(&mut self, flags: TcpFlags) {
        let Some(tcp) = self.tcp_hdr_mut() else {
            return;
        };

        let old = tcp.offset_flags_word();
        tcp.flags = flags.bits();
        let new = tcp.offset_flags_word();
        tcp.csum = checksum::update_word(tcp.csum, old, new);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::checksum::Checksum;
    use crate::engine::checksum::HeaderChecksum;

    // 10.0.0.2:40000 -> 10.0.0.1:111, SYN, no payload.
    fn syn_bytes() -> Vec<u8> {
        let mut ip = vec![
            0x45, 0x00, 0x00, 0x28, 0x00, 0x01, 0x40, 0x00, 0x40, 0x06,
            0x00, 0x00, 0x0a, 0x00, 0x00, 0x02, 0x0a, 0x00, 0x00, 0x01,
        ];
        let tcp = [
            0x9c, 0x40, 0x00, 0x6f, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00,
            0x00, 0x00, 0x50, 0x02, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00,
        ];
        ip.extend_from_slice(&tcp);
        ip
    }

    const TCP_CSUM: core::ops::Range<usize> =
        IPV4_HDR_SZ + 16..IPV4_HDR_SZ + 18;

    // Checksum over the pseudo-header and segment, with the checksum
    // field as found in `frame`.
    fn tcp_csum(frame: &[u8]) -> [u8; 2] {
        let tcp = &frame[IPV4_HDR_SZ..];
        let mut csum = Checksum::compute(&frame[12..20]);
        csum.add_bytes(&[0, 6]);
        csum.add_bytes(&(tcp.len() as u16).to_be_bytes());
        csum.add_bytes(tcp);
        HeaderChecksum::from(csum).bytes()
    }

    #[test]
    fn parse_tcp() {
        let mut bytes = syn_bytes();
        let frame = Ipv4Frame::parse(&mut bytes).unwrap();
        assert_eq!(frame.protocol(), Protocol::TCP);
        assert_eq!(frame.src(), Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(frame.dst(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(frame.src_port(), 40000);
        assert_eq!(frame.dst_port(), 111);
        assert_eq!(frame.tcp_flags(), TcpFlags::SYN);
    }

    #[test]
    fn set_flags_keeps_csum_valid() {
        let mut bytes = syn_bytes();
        let csum = tcp_csum(&bytes);
        bytes[TCP_CSUM].copy_from_slice(&csum);

        let mut frame = Ipv4Frame::parse(&mut bytes).unwrap();
        frame.set_tcp_flags(TcpFlags::SYN | TcpFlags::RST);
        assert_eq!(frame.tcp_flags(), TcpFlags::SYN | TcpFlags::RST);

        // The incremental update must match a full recompute.
        let mut zeroed = bytes.clone();
        zeroed[TCP_CSUM].copy_from_slice(&[0, 0]);
        assert_eq!(bytes[TCP_CSUM], tcp_csum(&zeroed));
    }

    #[test]
    fn non_tcp_flags_untouched() {
        let mut bytes = syn_bytes();
        bytes[9] = 17;
        let before = bytes.clone();
        let mut frame = Ipv4Frame::parse(&mut bytes).unwrap();
        assert_eq!(frame.protocol(), Protocol::UDP);
        assert_eq!(frame.tcp_flags(), TcpFlags::empty());
        frame.set_tcp_flags(TcpFlags::RST);
        assert_eq!(bytes, before);
    }

    #[test]
    fn bad_frames() {
        let mut short = vec![0x45; 10];
        assert_eq!(
            Ipv4Frame::parse(&mut short).unwrap_err(),
            FrameError::Truncated { layer: "IPv4", need: 20, have: 10 }
        );

        let mut v6 = syn_bytes();
        v6[0] = 0x65;
        assert_eq!(
            Ipv4Frame::parse(&mut v6).unwrap_err(),
            FrameError::NotIpv4(6)
        );

        let mut bad_ihl = syn_bytes();
        bad_ihl[0] = 0x44;
        assert_eq!(
            Ipv4Frame::parse(&mut bad_ihl).unwrap_err(),
            FrameError::BadHdrLen(16)
        );

        let mut short_tcp = syn_bytes();
        short_tcp.truncate(30);
        assert_eq!(
            Ipv4Frame::parse(&mut short_tcp).unwrap_err(),
            FrameError::Truncated { layer: "TCP", need: 40, have: 30 }
        );
    }

    #[test]
    fn later_fragment_has_no_ulp() {
        // A reply SYN-ACK from port 111 whose payload bytes, in a later
        // fragment, happen to look like that same header.
        let mut bytes = syn_bytes();
        bytes[IPV4_HDR_SZ..IPV4_HDR_SZ + 4]
            .copy_from_slice(&[0x00, 0x6f, 0x9c, 0x40]);
        bytes[IPV4_HDR_SZ + TCP_FLAGS_OFFSET] = 0x12;
        bytes[6..8].copy_from_slice(&185u16.to_be_bytes());
        let before = bytes.clone();

        let mut frame = Ipv4Frame::parse(&mut bytes).unwrap();
        assert_eq!(frame.protocol(), Protocol::TCP);
        assert_eq!((frame.src_port(), frame.dst_port()), (0, 0));
        assert_eq!(frame.tcp_flags(), TcpFlags::empty());
        frame.set_tcp_flags(TcpFlags::RST);
        assert_eq!(bytes, before);

        // The first fragment (MF set, offset zero) still has its header.
        let mut first = syn_bytes();
        first[6..8].copy_from_slice(&0x2000u16.to_be_bytes());
        let frame = Ipv4Frame::parse(&mut first).unwrap();
        assert_eq!(frame.dst_port(), 111);
        assert_eq!(frame.tcp_flags(), TcpFlags::SYN);
    }

    #[test]
    fn meta_view() {
        let mut udp = PacketMeta::udp(53, 111);
        udp.set_tcp_flags(TcpFlags::RST);
        assert_eq!(udp.tcp_flags(), TcpFlags::empty());

        let mut tcp =
            PacketMeta::tcp(111, 40000, TcpFlags::SYN | TcpFlags::ACK);
        tcp.set_tcp_flags(TcpFlags::SYN | TcpFlags::RST);
        assert_eq!(tcp.tcp_flags(), TcpFlags::SYN | TcpFlags::RST);
        assert_eq!(tcp.to_string(), "TCP 111 -> 40000 [SYN|RST]");
    }
}
