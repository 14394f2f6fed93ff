// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Hiding and revealing the protected port.

use super::stat::KnockStats;
use super::state::KnockState;
use crate::provider::LogLevel;
use crate::provider::LogProvider;

/// Flips the hidden flag of a [`KnockState`].
///
/// Both transitions are unconditional and idempotent. They take only
/// the hidden lock, never the knock lock, so whatever decision led to
/// the call may already be out of date by the time it lands.
pub struct HideCtl<'a> {
    pub(crate) port: u16,
    pub(crate) state: &'a KnockState,
    pub(crate) stats: &'a KnockStats,
    pub(crate) log: &'a dyn LogProvider,
}

impl HideCtl<'_> {
    pub fn hide(&self) {
        self.log.log(LogLevel::Note, &format!("hiding port {}", self.port));
        self.state.set_hidden(true);
        self.stats.hide();
    }

    pub fn unhide(&self) {
        self.log
            .log(LogLevel::Note, &format!("un-hiding port {}", self.port));
        self.state.set_hidden(false);
        self.stats.unhide();
    }
}
