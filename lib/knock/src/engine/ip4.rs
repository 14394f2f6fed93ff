// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! IPv4 headers.

use knock_api::Protocol;
use std::net::Ipv4Addr;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::network_endian::U16;

pub const IPV4_HDR_SZ: usize = core::mem::size_of::<Ipv4Hdr>();
pub const IPV4_VERSION: u8 = 4;

/// The fragment offset bits of the flags/offset field.
pub const IPV4_FRAG_OFF_MASK: u16 = 0x1FFF;

/// The fixed portion of an IPv4 header. Options, if any, follow it.
#[derive(
    Clone, Copy, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
#[repr(C)]
pub struct Ipv4Hdr {
    pub ver_hdr_len: u8,
    pub dscp_ecn: u8,
    pub total_len: U16,
    pub ident: U16,
    pub frag_off: U16,
    pub ttl: u8,
    pub proto: u8,
    pub csum: [u8; 2],
    pub src: [u8; 4],
    pub dst: [u8; 4],
}

impl Ipv4Hdr {
    pub fn version(&self) -> u8 {
        self.ver_hdr_len >> 4
    }

    /// The header length in bytes, options included.
    pub fn hdr_len(&self) -> usize {
        usize::from(self.ver_hdr_len & 0x0F) * 4
    }

    /// The fragment offset, in units of 8 bytes. Only the first
    /// fragment of a datagram, at offset zero, carries the ULP header.
    pub fn frag_offset(&self) -> u16 {
        self.frag_off.get() & IPV4_FRAG_OFF_MASK
    }

    pub fn protocol(&self) -> Protocol {
        Protocol::from(self.proto)
    }

    pub fn src(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.src)
    }

    pub fn dst(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.dst)
    }
}
