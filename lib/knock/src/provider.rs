// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Providers allow the knock engine to run in different contexts by
//! plugging in implementations of the services it consumes: where its
//! diagnostics go, and where it gets the time. A unit test wants
//! `println!` and a clock it can move by hand; a long-running process
//! wants structured logging and the system clock.

use crate::time::Clock;
use crate::time::SystemClock;
use crate::time::Timestamp;
use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

/// The set of all services required by a [`crate::engine::Knocker`].
pub struct Providers {
    pub log: Box<dyn LogProvider>,
    pub clock: Box<dyn Clock>,
}

impl Providers {
    /// Log through `log`, using the system clock.
    pub fn with_log(log: impl LogProvider + 'static) -> Self {
        Self { log: Box::new(log), clock: Box::new(SystemClock) }
    }
}

/// A logging provider provides the means to log messages to some
/// destination based on the context in which the engine is running.
///
/// Logging levels are provided by [`LogLevel`]. These levels will map
/// to the underlying provider with varying degrees of success.
pub trait LogProvider: Send + Sync {
    /// Log a message at the specified level.
    fn log(&self, level: LogLevel, msg: &str);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogLevel {
    /// Per-packet tracing: hook invocations and knock evaluations.
    Debug,

    /// State changes: knocks recorded, the port hidden or revealed,
    /// the knocker loaded or unloaded.
    Note,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let level_s = match self {
            Self::Debug => "[DEBUG]",
            Self::Note => "[NOTE]",
        };
        write!(f, "{level_s}")
    }
}

#[derive(Clone, Copy)]
pub struct PrintlnLog;

impl LogProvider for PrintlnLog {
    fn log(&self, level: LogLevel, msg: &str) {
        println!("{level} {msg}");
    }
}

/// Route engine diagnostics into a [`slog::Logger`].
///
/// Level filtering is left to the logger's drain.
#[derive(Clone)]
pub struct SlogLog(pub slog::Logger);

impl LogProvider for SlogLog {
    fn log(&self, level: LogLevel, msg: &str) {
        let log = &self.0;
        match level {
            LogLevel::Debug => slog::debug!(log, "{}", msg),
            LogLevel::Note => slog::info!(log, "{}", msg),
        }
    }
}

impl<L: LogProvider + ?Sized> LogProvider for Arc<L> {
    fn log(&self, level: LogLevel, msg: &str) {
        (**self).log(level, msg)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
