// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The knock engine.
//!
//! A [`Knocker`] guards one TCP port. Its inbound hook watches for
//! knocks and unsolicited connection attempts; its outbound hook turns
//! every reply from the port into a reset while the port is hidden.
pub mod checksum;
pub mod hide;
pub mod hook;
pub mod inbound;
pub mod ip4;
pub mod knocker;
pub mod outbound;
pub mod packet;
pub mod policy;
pub mod stat;
pub mod state;
pub mod tcp;
pub mod udp;

pub use hook::HookError;
pub use hook::HookRegistry;
pub use hook::HookTable;
pub use hook::PacketHook;
pub use hook::Verdict;
pub use knock_api::Direction;
pub use knocker::Knocker;
pub use packet::FrameError;
pub use packet::Ipv4Frame;
pub use packet::PacketMeta;
pub use packet::PacketView;
pub use tcp::TcpFlags;
