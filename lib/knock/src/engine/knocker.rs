// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The knocker: the context shared by both packet hooks.
//!
//! A [`Knocker`] owns the knock state for one protected port along with
//! the configuration, counters and providers the hooks need. Creating
//! one is the equivalent of loading the knock module; the state starts
//! out unhidden with placeholder knocks. The hooks it hands out each
//! hold a reference to the same context, and the context is torn down
//! once the knocker and every hook are gone.

use super::hide::HideCtl;
use super::hook::HookError;
use super::hook::HookRegistry;
use super::hook::PacketHook;
use super::hook::Registration;
use super::inbound::InboundInspector;
use super::outbound::OutboundMutator;
use super::policy::KnockPolicy;
use super::stat::KnockStats;
use super::state::KnockState;
use crate::provider::LogLevel;
use crate::provider::Providers;
use crate::time::Timestamp;
use knock_api::CfgError;
use knock_api::Direction;
use knock_api::KnockCfg;
use knock_api::KnockSlot;
use knock_api::KnockStateDump;
use std::sync::Arc;

pub(crate) struct KnockCtx {
    pub(crate) cfg: KnockCfg,
    pub(crate) policy: KnockPolicy,
    pub(crate) state: KnockState,
    pub(crate) stats: KnockStats,
    pub(crate) providers: Providers,
}

impl KnockCtx {
    pub(crate) fn log(&self, level: LogLevel, msg: &str) {
        self.providers.log.log(level, msg);
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.providers.clock.now()
    }

    /// Judge the current knock sequence.
    ///
    /// The knock slots are read first and the clock second, matching
    /// the order in which a knock is recorded.
    pub(crate) fn knock_ok(&self) -> bool {
        let knocks = self.state.read_knocks();
        let now = self.now();

        match self.policy.check(knocks, now) {
            Ok(()) => {
                self.log(LogLevel::Debug, "knock OK");
                true
            }

            Err(fail) => {
                self.log(LogLevel::Debug, &format!("knock NOT OK: {fail}"));
                false
            }
        }
    }

    pub(crate) fn record_knock(&self, slot: KnockSlot) {
        let now = self.now();
        self.log(
            LogLevel::Note,
            &format!(
                "knock on port {} (slot {slot}) at {now}",
                self.cfg.port_for(slot)
            ),
        );
        self.state.record_knock(slot, now);
        self.stats.knock();
    }

    pub(crate) fn is_hidden(&self) -> bool {
        self.state.get_hidden()
    }

    pub(crate) fn hide_ctl(&self) -> HideCtl<'_> {
        HideCtl {
            port: self.cfg.hide_port,
            state: &self.state,
            stats: &self.stats,
            log: self.providers.log.as_ref(),
        }
    }
}

impl Drop for KnockCtx {
    fn drop(&mut self) {
        self.log(
            LogLevel::Note,
            &format!("knocker for port {} unloaded", self.cfg.hide_port),
        );
    }
}

/// The knock engine for a single protected port.
#[derive(Clone)]
pub struct Knocker {
    ctx: Arc<KnockCtx>,
}

impl Knocker {
    /// Create a new knocker for `cfg`.
    ///
    /// # Errors
    ///
    /// The configuration is validated first; see [`KnockCfg::validate`].
    pub fn new(cfg: KnockCfg, providers: Providers) -> Result<Self, CfgError> {
        cfg.validate()?;

        let ctx = KnockCtx {
            cfg,
            policy: KnockPolicy::from(&cfg),
            state: KnockState::new(),
            stats: KnockStats::default(),
            providers,
        };

        ctx.log(
            LogLevel::Note,
            &format!(
                "knocker loaded: port {} behind knocks {:?}",
                cfg.hide_port, cfg.knock_ports
            ),
        );

        Ok(Self { ctx: Arc::new(ctx) })
    }

    pub fn cfg(&self) -> &KnockCfg {
        &self.ctx.cfg
    }

    pub fn state(&self) -> &KnockState {
        &self.ctx.state
    }

    /// Is the most recent knock sequence valid right now?
    pub fn knock_ok(&self) -> bool {
        self.ctx.knock_ok()
    }

    pub fn is_hidden(&self) -> bool {
        self.ctx.is_hidden()
    }

    pub fn hide(&self) {
        self.ctx.hide_ctl().hide();
    }

    pub fn unhide(&self) {
        self.ctx.hide_ctl().unhide();
    }

    /// The hook for packets arriving at this host.
    pub fn inbound(&self) -> InboundInspector {
        InboundInspector::new(self.ctx.clone())
    }

    /// The hook for packets leaving this host.
    pub fn outbound(&self) -> OutboundMutator {
        OutboundMutator::new(self.ctx.clone())
    }

    /// Register both hooks with `registry`.
    ///
    /// The hooks stay registered until the returned [`Registration`] is
    /// dropped. If either registration fails, neither hook is left
    /// registered.
    pub fn attach<'r>(
        &self,
        registry: &'r dyn HookRegistry,
    ) -> Result<Registration<'r>, HookError> {
        let mut reg = Registration::new(registry);
        let inbound: Arc<dyn PacketHook> = Arc::new(self.inbound());
        let outbound: Arc<dyn PacketHook> = Arc::new(self.outbound());
        reg.add(Direction::In, inbound)?;
        reg.add(Direction::Out, outbound)?;
        Ok(reg)
    }

    pub fn dump(&self) -> KnockStateDump {
        KnockStateDump {
            cfg: self.ctx.cfg,
            knocks: self.ctx.state.read_knocks(),
            hidden: self.ctx.state.get_hidden(),
            stats: self.ctx.stats.dump(),
        }
    }
}
