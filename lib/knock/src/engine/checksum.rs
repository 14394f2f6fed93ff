// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The internet checksum.
//!
//! Rewriting TCP flags on an outbound segment invalidates its checksum.
//! Rather than summing the whole segment again (which would need the
//! pseudo-header as well), the header checksum is updated incrementally
//! from the old and new bytes of the rewritten word, per RFC 1624.
//!
//! The checksum is a sequence of two bytes, not a logical integer, so
//! no byte-order conversion is ever performed on it. Pairs of bytes are
//! summed as native 16-bit values and the result is stored back the
//! same way, which keeps everything in network order (RFC 1071 §1.B).
//!
//! # Relevant RFCs
//!
//! * 1071 Computing the Internet Checksum
//!
//! * 1624 Computation of the Internet Checksum via Incremental Update

/// The checksum as it is stored in a network header: the one's
/// complement of a one's complement sum.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeaderChecksum {
    inner: [u8; 2],
}

impl HeaderChecksum {
    pub fn bytes(&self) -> [u8; 2] {
        self.inner
    }

    /// Wrap the checksum bytes taken from a header.
    pub fn wrap(hc: [u8; 2]) -> Self {
        Self { inner: hc }
    }
}

impl From<Checksum> for HeaderChecksum {
    fn from(mut csum: Checksum) -> HeaderChecksum {
        Self { inner: (!csum.finalize()).to_ne_bytes() }
    }
}

/// A rolling one's complement sum, with carries deferred until
/// [`Checksum::finalize`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Checksum {
    inner: u32,
}

impl Checksum {
    /// Start a sum over `bytes`.
    pub fn compute(bytes: &[u8]) -> Self {
        Self { inner: csum_add(0, bytes) }
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.inner = csum_add(self.inner, bytes);
    }

    /// Remove `bytes` from the sum by adding their complement.
    pub fn sub_bytes(&mut self, bytes: &[u8]) {
        self.inner = csum_sub(self.inner, bytes);
    }

    /// Fold the carries and return the 16-bit sum.
    pub fn finalize(&mut self) -> u16 {
        while (self.inner >> 16) != 0 {
            self.inner = (self.inner >> 16) + (self.inner & 0xFFFF);
        }

        (self.inner & 0xFFFF) as u16
    }
}

impl From<HeaderChecksum> for Checksum {
    fn from(hc: HeaderChecksum) -> Self {
        Self { inner: (!u16::from_ne_bytes(hc.bytes())) as u32 }
    }
}

/// Update the header checksum `hc` for a 16-bit word of the covered
/// data changing from `old` to `new`.
pub fn update_word(hc: [u8; 2], old: [u8; 2], new: [u8; 2]) -> [u8; 2] {
    let mut csum = Checksum::from(HeaderChecksum::wrap(hc));
    csum.sub_bytes(&old);
    csum.add_bytes(&new);
    HeaderChecksum::from(csum).bytes()
}

fn csum_add(mut csum: u32, bytes: &[u8]) -> u32 {
    let mut chunks = bytes.chunks_exact(2);

    for pair in &mut chunks {
        csum += u16::from_ne_bytes([pair[0], pair[1]]) as u32;
    }

    // An odd trailing byte is padded with zero on the right.
    if let [last] = chunks.remainder() {
        csum += u16::from_ne_bytes([*last, 0]) as u32;
    }

    csum
}

fn csum_sub(mut csum: u32, bytes: &[u8]) -> u32 {
    let mut chunks = bytes.chunks_exact(2);

    for pair in &mut chunks {
        csum += (!u16::from_ne_bytes([pair[0], pair[1]])) as u32;
    }

    if let [last] = chunks.remainder() {
        csum += (!u16::from_ne_bytes([*last, 0])) as u32;
    }

    csum
}
