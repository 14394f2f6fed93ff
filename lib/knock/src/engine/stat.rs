// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Engine counters.

use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering;
use knock_api::Direction;
use knock_api::KnockStatsDump;

/// Counters bumped from the packet path.
///
/// These are purely observational. Each counter is independently
/// atomic and they are read one at a time, so a dump taken under load
/// need not add up.
#[derive(Debug, Default)]
pub struct KnockStats {
    in_pkts: AtomicU64,
    out_pkts: AtomicU64,
    knocks: AtomicU64,
    hides: AtomicU64,
    unhides: AtomicU64,
    resets: AtomicU64,
}

impl KnockStats {
    pub fn pkt(&self, dir: Direction) {
        let ctr = match dir {
            Direction::In => &self.in_pkts,
            Direction::Out => &self.out_pkts,
        };
        ctr.fetch_add(1, Ordering::Relaxed);
    }

    pub fn knock(&self) {
        self.knocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hide(&self) {
        self.hides.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unhide(&self) {
        self.unhides.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dump(&self) -> KnockStatsDump {
        KnockStatsDump {
            in_pkts: self.in_pkts.load(Ordering::Relaxed),
            out_pkts: self.out_pkts.load(Ordering::Relaxed),
            knocks: self.knocks.load(Ordering::Relaxed),
            hides: self.hides.load(Ordering::Relaxed),
            unhides: self.unhides.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }
}
