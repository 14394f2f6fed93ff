// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Knock sequence configuration.

use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// The first port of the default knock sequence.
pub const KPORT_1: u16 = 14234;
/// The second port of the default knock sequence.
pub const KPORT_2: u16 = 9786;
/// The third, sequence-completing port of the default knock sequence.
pub const KPORT_3: u16 = 32232;
/// The default protected port.
pub const HIDE_PORT: u16 = 111;

/// The default maximum age, in seconds, of the last knock.
pub const STALE_SECS: i64 = 5;
/// The default maximum gap, in seconds, between consecutive knocks.
pub const GAP_SECS: i64 = 3;

/// The position of a trigger port within the knock sequence.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum KnockSlot {
    First,
    Second,
    Third,
}

impl KnockSlot {
    /// All slots, in sequence order.
    pub const ALL: [KnockSlot; 3] =
        [KnockSlot::First, KnockSlot::Second, KnockSlot::Third];

    /// The index of this slot in the knock timestamp array.
    pub const fn index(self) -> usize {
        match self {
            KnockSlot::First => 0,
            KnockSlot::Second => 1,
            KnockSlot::Third => 2,
        }
    }

    /// Is this the slot that completes a knock sequence?
    pub const fn is_last(self) -> bool {
        matches!(self, KnockSlot::Third)
    }
}

/// Slots display as their position in the sequence, counting from one.
impl Display for KnockSlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.index() + 1)
    }
}

/// The static configuration of the knock engine.
///
/// A configuration file may specify any subset of the fields; the
/// remainder take their default value.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct KnockCfg {
    /// The trigger ports, in the order they must be knocked.
    pub knock_ports: [u16; 3],

    /// The port which is hidden until a valid knock sequence is seen.
    pub hide_port: u16,

    /// The maximum age of the last knock for the sequence to be valid.
    pub stale_secs: i64,

    /// The maximum time allowed between two consecutive knocks.
    pub gap_secs: i64,
}

impl Default for KnockCfg {
    fn default() -> Self {
        Self {
            knock_ports: [KPORT_1, KPORT_2, KPORT_3],
            hide_port: HIDE_PORT,
            stale_secs: STALE_SECS,
            gap_secs: GAP_SECS,
        }
    }
}

impl KnockCfg {
    /// Return the knock slot for `port`, if it is a trigger port.
    pub fn slot_for(&self, port: u16) -> Option<KnockSlot> {
        KnockSlot::ALL
            .into_iter()
            .find(|slot| self.knock_ports[slot.index()] == port)
    }

    /// Return the trigger port assigned to `slot`.
    pub fn port_for(&self, slot: KnockSlot) -> u16 {
        self.knock_ports[slot.index()]
    }

    /// Verify the configuration is usable.
    ///
    /// Every trigger port must be distinct, the protected port must
    /// not double as a trigger port, no port may be zero, and the
    /// thresholds must not be negative.
    pub fn validate(&self) -> Result<(), CfgError> {
        for (i, port) in self.knock_ports.iter().enumerate() {
            if *port == 0 {
                return Err(CfgError::ZeroPort);
            }

            if self.knock_ports[..i].contains(port) {
                return Err(CfgError::DuplicateKnockPort(*port));
            }
        }

        if self.hide_port == 0 {
            return Err(CfgError::ZeroPort);
        }

        if self.knock_ports.contains(&self.hide_port) {
            return Err(CfgError::HidePortIsKnockPort(self.hide_port));
        }

        if self.stale_secs < 0 {
            return Err(CfgError::NegativeThreshold {
                name: "stale_secs",
                value: self.stale_secs,
            });
        }

        if self.gap_secs < 0 {
            return Err(CfgError::NegativeThreshold {
                name: "gap_secs",
                value: self.gap_secs,
            });
        }

        Ok(())
    }
}

/// A [`KnockCfg`] failed validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CfgError {
    DuplicateKnockPort(u16),
    HidePortIsKnockPort(u16),
    NegativeThreshold { name: &'static str, value: i64 },
    ZeroPort,
}

impl Display for CfgError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DuplicateKnockPort(port) => {
                write!(f, "knock port {port} appears more than once")
            }
            Self::HidePortIsKnockPort(port) => {
                write!(f, "hide port {port} is also a knock port")
            }
            Self::NegativeThreshold { name, value } => {
                write!(f, "{name} must not be negative: {value}")
            }
            Self::ZeroPort => write!(f, "port 0 is not a valid port"),
        }
    }
}

impl core::error::Error for CfgError {}
