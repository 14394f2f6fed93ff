// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// The IPv4 protocol numbers the engine cares to name.
///
/// Anything else is carried as `Unknown` so that a frame with an odd
/// protocol can still be passed along untouched.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize,
)]
pub enum Protocol {
    ICMP,
    IGMP,
    TCP,
    UDP,
    Unknown(u8),
    #[default]
    Reserved,
}

impl From<u8> for Protocol {
    fn from(proto: u8) -> Self {
        match proto {
            0x1 => Protocol::ICMP,
            0x2 => Protocol::IGMP,
            0x6 => Protocol::TCP,
            0x11 => Protocol::UDP,
            0xFF => Protocol::Reserved,
            proto => Protocol::Unknown(proto),
        }
    }
}

impl From<Protocol> for u8 {
    fn from(proto: Protocol) -> u8 {
        match proto {
            Protocol::ICMP => 0x1,
            Protocol::IGMP => 0x2,
            Protocol::TCP => 0x6,
            Protocol::UDP => 0x11,
            Protocol::Unknown(v) => v,
            Protocol::Reserved => 0xFF,
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::ICMP => write!(f, "ICMP"),
            Protocol::IGMP => write!(f, "IGMP"),
            Protocol::TCP => write!(f, "TCP"),
            Protocol::UDP => write!(f, "UDP"),
            Protocol::Unknown(v) => write!(f, "0x{:X}", v),
            Protocol::Reserved => write!(f, "Reserved"),
        }
    }
}
