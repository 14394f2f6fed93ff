// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The inbound hook: watches for knocks and for unsolicited attempts
//! on the protected port.

use super::hook::PacketHook;
use super::hook::Verdict;
use super::knocker::KnockCtx;
use super::packet::PacketView;
use crate::provider::LogLevel;
use knock_api::Direction;
use knock_api::Protocol;
use std::sync::Arc;

/// Inspects every packet arriving at the host.
///
/// This hook never drops anything. Hiding works on the reply path (see
/// [`super::outbound::OutboundMutator`]), so the only job here is to
/// keep the knock state current:
///
/// * A TCP packet to the protected port, while it is visible and
///   without a valid knock sequence behind it, hides the port.
///
/// * A TCP packet to a trigger port records the knock. A knock on the
///   last trigger port which completes a valid sequence reveals the
///   port again; knocks on the other trigger ports never do.
///
/// Everything else, including all non-TCP traffic, passes untouched.
pub struct InboundInspector {
    ctx: Arc<KnockCtx>,
}

impl InboundInspector {
    pub(crate) fn new(ctx: Arc<KnockCtx>) -> Self {
        Self { ctx }
    }
}

impl PacketHook for InboundInspector {
    fn name(&self) -> &str {
        "knock-inbound"
    }

    fn process(&self, pkt: &mut dyn PacketView) -> Verdict {
        let ctx = &self.ctx;
        ctx.stats.pkt(Direction::In);
        ctx.log(LogLevel::Debug, "inbound hook called");

        if pkt.protocol() != Protocol::TCP {
            return Verdict::Accept;
        }

        let dport = pkt.dst_port();

        // The hidden flag and the knock sequence are read under
        // different locks; a concurrent knock may land in between.
        if dport == ctx.cfg.hide_port && !ctx.is_hidden() && !ctx.knock_ok() {
            ctx.hide_ctl().hide();
            return Verdict::Accept;
        }

        if let Some(slot) = ctx.cfg.slot_for(dport) {
            ctx.record_knock(slot);

            if slot.is_last() && ctx.knock_ok() && ctx.is_hidden() {
                ctx.hide_ctl().unhide();
            }
        }

        Verdict::Accept
    }
}
