// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The knock timing policy.
//!
//! A knock sequence is valid when the three trigger ports were hit
//! quickly one after the other and the last of them recently. This is
//! a freshness check, nothing more: it says the sequence is fresh, fast
//! and ordered, not who sent it.
//!
//! Only upper bounds are enforced. A negative gap, from slots written
//! out of order, passes; so does a last knock in the future, which a
//! backwards clock step can produce.

use crate::time::Timestamp;
use core::fmt;
use core::fmt::Display;
use knock_api::KnockCfg;
use knock_api::KnockSlot;

/// Why a knock sequence was judged invalid.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KnockFail {
    /// The last knock is older than the staleness threshold.
    Stale { age: i64, limit: i64 },

    /// The knock on `slot` came too long after the one before it.
    Gap { slot: KnockSlot, gap: i64, limit: i64 },
}

impl Display for KnockFail {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Stale { age, limit } => {
                write!(f, "last knock is {age}s old (limit {limit}s)")
            }
            Self::Gap { slot, gap, limit } => {
                write!(
                    f,
                    "knock {slot} came {gap}s after the last (limit {limit}s)"
                )
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KnockPolicy {
    pub stale_secs: i64,
    pub gap_secs: i64,
}

impl From<&KnockCfg> for KnockPolicy {
    fn from(cfg: &KnockCfg) -> Self {
        Self { stale_secs: cfg.stale_secs, gap_secs: cfg.gap_secs }
    }
}

impl KnockPolicy {
    /// Judge the knock timestamps `knocks` as of `now`.
    ///
    /// Staleness is checked first, then the gap into the second slot,
    /// then the gap into the third; the first violation is returned.
    pub fn check(
        &self,
        knocks: [Timestamp; 3],
        now: Timestamp,
    ) -> Result<(), KnockFail> {
        let [t0, t1, t2] = knocks;
        let d0 = t1.saturating_sub(t0);
        let d1 = t2.saturating_sub(t1);
        let age = now.saturating_sub(t2);

        if age > self.stale_secs {
            return Err(KnockFail::Stale { age, limit: self.stale_secs });
        }

        if d0 > self.gap_secs {
            return Err(KnockFail::Gap {
                slot: KnockSlot::Second,
                gap: d0,
                limit: self.gap_secs,
            });
        }

        if d1 > self.gap_secs {
            return Err(KnockFail::Gap {
                slot: KnockSlot::Third,
                gap: d1,
                limit: self.gap_secs,
            });
        }

        Ok(())
    }

    pub fn knock_ok(&self, knocks: [Timestamp; 3], now: Timestamp) -> bool {
        self.check(knocks, now).is_ok()
    }
}
