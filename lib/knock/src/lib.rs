// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Hide a TCP port behind a knock sequence.
//!
//! A client must touch three trigger ports in order, each knock close
//! on the heels of the last, before the protected port will answer.
//! Anyone else who tries the port finds it hidden: every segment the
//! service sends back is rewritten into a reset.

#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

pub mod engine;
pub mod print;
pub mod provider;
pub mod sync;
pub mod time;
