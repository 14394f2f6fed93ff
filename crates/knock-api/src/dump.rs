// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Point-in-time views of engine state, for administration.

use super::cfg::KnockCfg;
use serde::Deserialize;
use serde::Serialize;

/// Counters kept by the knock engine since it was created.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct KnockStatsDump {
    pub in_pkts: u64,
    pub out_pkts: u64,
    pub knocks: u64,
    pub hides: u64,
    pub unhides: u64,
    pub resets: u64,
}

/// The state of a knock engine.
///
/// The knock slots and hidden flag are read under separate locks, so
/// the dump may straddle a concurrent update.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct KnockStateDump {
    pub cfg: KnockCfg,
    pub knocks: [i64; 3],
    pub hidden: bool,
    pub stats: KnockStatsDump,
}
