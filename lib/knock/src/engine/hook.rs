// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Packet hooks and their registration.
//!
//! A packet interception layer offers two points at which it will hand
//! a packet to registered hooks: on receipt, before the forwarding
//! decision ([`Direction::In`]), and on transmit, after routing
//! ([`Direction::Out`]). Each hook returns a [`Verdict`] which the
//! interception layer applies to the packet.
//!
//! [`HookRegistry`] is the registration surface such a layer exposes.
//! [`HookTable`] is an in-process implementation of it, used when the
//! packets are already in hand, as when replaying a capture.

use super::packet::PacketView;
use crate::sync::KRwLock;
use core::fmt;
use core::fmt::Display;
use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering;
use knock_api::Direction;
use std::sync::Arc;

/// What the interception layer should do with a packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Let the packet continue, possibly modified by the hook.
    Accept,

    /// Discard the packet. No further hooks see it.
    Drop,
}

impl Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Verdict::Accept => "ACCEPT",
            Verdict::Drop => "DROP",
        };
        write!(f, "{s}")
    }
}

/// A function run against each packet passing a hook point.
///
/// Hooks may be invoked concurrently from any number of contexts and
/// must not block.
pub trait PacketHook: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, pkt: &mut dyn PacketView) -> Verdict;
}

/// Opaque identifier for a registered hook.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct HookId(u64);

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum HookError {
    #[error("hook {name} already registered for {dir}")]
    Duplicate { name: String, dir: Direction },
}

/// The registration surface of a packet interception layer.
pub trait HookRegistry {
    /// Start running `hook` against packets travelling in `dir`.
    fn register(
        &self,
        dir: Direction,
        hook: Arc<dyn PacketHook>,
    ) -> Result<HookId, HookError>;

    /// Stop running the hook `id`. Return `false` if it was not
    /// registered.
    fn unregister(&self, id: HookId) -> bool;
}

/// A set of hooks registered with a [`HookRegistry`], unregistered when
/// this value is dropped.
pub struct Registration<'r> {
    registry: &'r dyn HookRegistry,
    ids: Vec<HookId>,
}

impl<'r> Registration<'r> {
    pub fn new(registry: &'r dyn HookRegistry) -> Self {
        Self { registry, ids: Vec::new() }
    }

    /// Register `hook` and add it to this set.
    pub fn add(
        &mut self,
        dir: Direction,
        hook: Arc<dyn PacketHook>,
    ) -> Result<HookId, HookError> {
        let id = self.registry.register(dir, hook)?;
        self.ids.push(id);
        Ok(id)
    }

    pub fn ids(&self) -> &[HookId] {
        &self.ids
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        for id in self.ids.drain(..).rev() {
            self.registry.unregister(id);
        }
    }
}

struct HookEntry {
    id: HookId,
    dir: Direction,
    hook: Arc<dyn PacketHook>,
}

/// An in-process dispatcher.
///
/// Hooks for a direction run in the order they were registered. The
/// first [`Verdict::Drop`] ends processing of that packet.
///
/// The table is read-locked while a packet is processed; a hook must
/// not try to register or unregister hooks on the table running it.
pub struct HookTable {
    hooks: KRwLock<Vec<HookEntry>>,
    next_id: AtomicU64,
}

impl Default for HookTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HookTable {
    pub fn new() -> Self {
        Self { hooks: KRwLock::new(Vec::new()), next_id: AtomicU64::new(1) }
    }

    /// Run `pkt` through every hook registered for `dir`.
    pub fn process(&self, dir: Direction, pkt: &mut dyn PacketView) -> Verdict {
        let hooks = self.hooks.read();

        for entry in hooks.iter().filter(|e| e.dir == dir) {
            if entry.hook.process(pkt) == Verdict::Drop {
                return Verdict::Drop;
            }
        }

        Verdict::Accept
    }

    /// The names of the hooks registered for `dir`, in run order.
    pub fn names(&self, dir: Direction) -> Vec<String> {
        self.hooks
            .read()
            .iter()
            .filter(|e| e.dir == dir)
            .map(|e| e.hook.name().to_string())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }
}

impl HookRegistry for HookTable {
    fn register(
        &self,
        dir: Direction,
        hook: Arc<dyn PacketHook>,
    ) -> Result<HookId, HookError> {
        let mut hooks = self.hooks.write();

        if hooks.iter().any(|e| e.dir == dir && e.hook.name() == hook.name())
        {
            return Err(HookError::Duplicate {
                name: hook.name().to_string(),
                dir,
            });
        }

        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        hooks.push(HookEntry { id, dir, hook });
        Ok(id)
    }

    fn unregister(&self, id: HookId) -> bool {
        let mut hooks = self.hooks.write();
        let before = hooks.len();
        hooks.retain(|e| e.id != id);
        hooks.len() != before
    }
}
