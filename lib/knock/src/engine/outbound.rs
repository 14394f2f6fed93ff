// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The outbound hook: makes a hidden port look closed.

use super::hook::PacketHook;
use super::hook::Verdict;
use super::knocker::KnockCtx;
use super::packet::PacketView;
use super::tcp::TcpFlags;
use crate::provider::LogLevel;
use knock_api::Direction;
use knock_api::Protocol;
use std::sync::Arc;

/// Rewrites every TCP segment leaving the protected port while it is
/// hidden into a reset: RST is set and ACK cleared. The service still
/// answers, but anyone watching sees its answer as a refusal.
///
/// Only the hidden flag is consulted; the knock state is never read
/// here.
pub struct OutboundMutator {
    ctx: Arc<KnockCtx>,
}

impl OutboundMutator {
    pub(crate) fn new(ctx: Arc<KnockCtx>) -> Self {
        Self { ctx }
    }
}

impl PacketHook for OutboundMutator {
    fn name(&self) -> &str {
        "knock-outbound"
    }

    fn process(&self, pkt: &mut dyn PacketView) -> Verdict {
        let ctx = &self.ctx;
        ctx.stats.pkt(Direction::Out);

        if pkt.protocol() != Protocol::TCP {
            return Verdict::Accept;
        }

        if pkt.src_port() == ctx.cfg.hide_port && ctx.is_hidden() {
            let mut flags = pkt.tcp_flags();
            flags.insert(TcpFlags::RST);
            flags.remove(TcpFlags::ACK);
            pkt.set_tcp_flags(flags);
            ctx.stats.reset();
            ctx.log(
                LogLevel::Debug,
                &format!("rewrote segment to port {} as RST", pkt.dst_port()),
            );
        }

        Verdict::Accept
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::Knocker;
    use crate::engine::packet::PacketMeta;
    use crate::provider::PrintlnLog;
    use crate::provider::Providers;
    use knock_api::HIDE_PORT;
    use knock_api::KnockCfg;

    fn knocker() -> Knocker {
        Knocker::new(KnockCfg::default(), Providers::with_log(PrintlnLog))
            .unwrap()
    }

    #[test]
    fn hidden_rewrites_to_rst() {
        let k = knocker();
        k.hide();
        let hook = k.outbound();

        let mut syn_ack =
            PacketMeta::tcp(HIDE_PORT, 40000, TcpFlags::SYN | TcpFlags::ACK);
        assert_eq!(hook.process(&mut syn_ack), Verdict::Accept);
        assert_eq!(syn_ack.flags, TcpFlags::SYN | TcpFlags::RST);

        let mut psh_ack =
            PacketMeta::tcp(HIDE_PORT, 40000, TcpFlags::PSH | TcpFlags::ACK);
        hook.process(&mut psh_ack);
        assert_eq!(psh_ack.flags, TcpFlags::PSH | TcpFlags::RST);
        assert_eq!(k.dump().stats.resets, 2);
    }

    #[test]
    fn visible_untouched() {
        let k = knocker();
        let hook = k.outbound();
        let orig =
            PacketMeta::tcp(HIDE_PORT, 40000, TcpFlags::SYN | TcpFlags::ACK);
        let mut pkt = orig;
        hook.process(&mut pkt);
        assert_eq!(pkt, orig);
    }

    #[test]
    fn other_ports_untouched() {
        let k = knocker();
        k.hide();
        let hook = k.outbound();

        // Traffic *to* the protected port is not ours to rewrite.
        let orig = PacketMeta::tcp(40000, HIDE_PORT, TcpFlags::ACK);
        let mut pkt = orig;
        hook.process(&mut pkt);
        assert_eq!(pkt, orig);

        let orig = PacketMeta::tcp(22, 40000, TcpFlags::SYN | TcpFlags::ACK);
        let mut pkt = orig;
        hook.process(&mut pkt);
        assert_eq!(pkt, orig);
        assert_eq!(k.dump().stats.resets, 0);
    }
}
