// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! TCP headers.

use bitflags::bitflags;
use core::fmt;
use core::fmt::Display;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::network_endian::U16;
use zerocopy::network_endian::U32;

pub const TCP_HDR_SZ: usize = core::mem::size_of::<TcpHdr>();

/// Byte offset of the flags within the TCP header.
pub const TCP_FLAGS_OFFSET: usize = 13;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct TcpFlags: u8 {
        const FIN = 0x01;
        const SYN = 0x02;
        const RST = 0x04;
        const PSH = 0x08;
        const ACK = 0x10;
        const URG = 0x20;
        const ECE = 0x40;
        const CWR = 0x80;
    }
}

impl Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }

        for (i, (name, _)) in self.iter_names().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            write!(f, "{name}")?;
        }

        Ok(())
    }
}

/// The fixed portion of a TCP header. Options, if any, follow it.
#[derive(
    Clone, Copy, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
#[repr(C)]
pub struct TcpHdr {
    pub src_port: U16,
    pub dst_port: U16,
    pub seq: U32,
    pub ack: U32,
    pub offset: u8,
    pub flags: u8,
    pub window: U16,
    pub csum: [u8; 2],
    pub urg: U16,
}

impl TcpHdr {
    pub fn flags(&self) -> TcpFlags {
        TcpFlags::from_bits_retain(self.flags)
    }

    /// The 16-bit word holding the data offset and the flags, as it
    /// is laid out on the wire.
    pub fn offset_flags_word(&self) -> [u8; 2] {
        [self.offset, self.flags]
    }
}
