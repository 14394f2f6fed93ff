// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The knock state store.
//!
//! Two values are shared between the hooks: the time each trigger port
//! was last knocked, and whether the protected port is hidden. Each has
//! its own lock. Nothing couples them; a reader may see the knocks from
//! one moment and the hidden flag from another, and callers which
//! check one and then write the other may race. Both hide and unhide
//! are idempotent, so the worst outcome of such a race is a redundant
//! write.

use crate::sync::KRwLock;
use crate::time::Timestamp;
use knock_api::KnockSlot;

/// The knock slots as they stand before any knock is seen.
///
/// Distinct and far in the past, so the sequence is well defined but
/// stale against any real clock.
pub const INITIAL_KNOCKS: [Timestamp; 3] = [0, 10, 20];

#[derive(Debug)]
pub struct KnockState {
    knocks: KRwLock<[Timestamp; 3]>,
    hidden: KRwLock<bool>,
}

impl Default for KnockState {
    fn default() -> Self {
        Self::new()
    }
}

impl KnockState {
    pub const fn new() -> Self {
        Self {
            knocks: KRwLock::new(INITIAL_KNOCKS),
            hidden: KRwLock::new(false),
        }
    }

    /// Record a knock on `slot` at time `t`.
    pub fn record_knock(&self, slot: KnockSlot, t: Timestamp) {
        self.knocks.write()[slot.index()] = t;
    }

    /// Take a snapshot of all three knock slots.
    pub fn read_knocks(&self) -> [Timestamp; 3] {
        self.knocks.get()
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
    }

    pub fn get_hidden(&self) -> bool {
        self.hidden.get()
    }
}
