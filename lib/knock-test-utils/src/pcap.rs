// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Routines for building packet capture files.

use pcap_parser::Linktype;
use pcap_parser::ToVec;
use pcap_parser::pcap::LegacyPcapBlock;
use pcap_parser::pcap::PcapHeader;
use std::io::Write;

/// The EtherType of IPv4.
const ETHERTYPE_IPV4: [u8; 2] = [0x08, 0x00];

/// Build a packet capture from a series of packets.
///
/// Packets are given as IPv4 datagrams. With [`Linktype::ETHERNET`] each
/// is wrapped in an Ethernet II frame with fixed addresses.
pub struct PcapBuilder<W: Write> {
    out: W,
    linktype: Linktype,
}

impl PcapBuilder<Vec<u8>> {
    /// Create a new pcap builder which captures into memory.
    pub fn in_memory(linktype: Linktype) -> Self {
        Self::new(Vec::new(), linktype)
    }
}

impl<W: Write> PcapBuilder<W> {
    /// Create a new pcap builder, writing all captures to `out`.
    pub fn new(mut out: W, linktype: Linktype) -> Self {
        let mut hdr = PcapHeader {
            magic_number: 0xa1b2c3d4,
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen: 1500,
            network: linktype,
        };

        out.write_all(&hdr.to_vec().unwrap()).unwrap();

        Self { out, linktype }
    }

    /// Add a datagram captured at `ts_sec` to the capture.
    pub fn add_pkt(&mut self, ts_sec: u32, ip: &[u8]) {
        let mut bytes = Vec::with_capacity(ip.len() + 14);
        if self.linktype == Linktype::ETHERNET {
            bytes.extend_from_slice(&[0xA8, 0x40, 0x25, 0x00, 0x00, 0x01]);
            bytes.extend_from_slice(&[0xA8, 0x40, 0x25, 0x00, 0x00, 0x02]);
            bytes.extend_from_slice(&ETHERTYPE_IPV4);
        }
        bytes.extend_from_slice(ip);

        let mut block = LegacyPcapBlock {
            ts_sec,
            ts_usec: 0,
            caplen: bytes.len() as u32,
            origlen: bytes.len() as u32,
            data: &bytes,
        };

        self.out.write_all(&block.to_vec().unwrap()).unwrap();
    }

    /// Finish the capture, returning the writer.
    pub fn finish(mut self) -> W {
        self.out.flush().unwrap();
        self.out
    }
}
