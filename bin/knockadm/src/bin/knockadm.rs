// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use slog::Drain;

use knock::engine::HookTable;
use knock::engine::Knocker;
use knock::print::print_knock_state;
use knock::provider::Providers;
use knock::provider::SlogLog;
use knock::time::ManualClock;
use knock_api::API_VERSION;
use knock_api::KnockCfg;
use knock_api::MAJOR_VERSION;
use knockadm::check_knocks;
use knockadm::cfg_to_toml;
use knockadm::load_cfg;
use knockadm::parse_knocks;
use knockadm::print_replay;

/// Administer the port knock engine
#[derive(Debug, Parser)]
#[command(version = pkg_version())]
enum Command {
    /// Print the effective configuration as TOML.
    DumpConfig {
        #[command(flatten)]
        cfg: CfgArgs,
    },

    /// Judge a knock sequence at a given time.
    Check {
        #[command(flatten)]
        cfg: CfgArgs,

        /// The times of the three knocks, in seconds, comma-separated.
        #[arg(long, value_parser = parse_knocks, allow_hyphen_values = true)]
        knocks: [i64; 3],

        /// The time at which to judge them.
        #[arg(long, allow_hyphen_values = true)]
        now: i64,
    },

    /// Run a packet capture through the engine.
    Replay {
        #[command(flatten)]
        cfg: CfgArgs,

        /// The address of the host protecting the port.
        #[arg(long)]
        local: Ipv4Addr,

        /// A capture file in legacy pcap format.
        capture: PathBuf,
    },
}

#[derive(Debug, Args)]
struct CfgArgs {
    /// A TOML configuration file. Defaults apply to anything it omits.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl CfgArgs {
    fn load(&self) -> anyhow::Result<KnockCfg> {
        load_cfg(self.config.as_deref()).context("failed to load config")
    }
}

fn pkg_version() -> String {
    format!("{MAJOR_VERSION}.0 (API v{API_VERSION})")
}

// Engine diagnostics go to stderr, filtered by RUST_LOG.
fn logger() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::new(drain).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, slog::o!("component" => "knock"))
}

fn main() -> anyhow::Result<()> {
    let cmd = Command::parse();
    match cmd {
        Command::DumpConfig { cfg } => {
            print!("{}", cfg_to_toml(&cfg.load()?)?);
        }

        Command::Check { cfg, knocks, now } => {
            println!("{}", check_knocks(&cfg.load()?, knocks, now));
        }

        Command::Replay { cfg, local, capture } => {
            let cfg = cfg.load()?;
            let bytes = std::fs::read(&capture).with_context(|| {
                format!("failed to read {}", capture.display())
            })?;

            let log = logger();
            let clock = Arc::new(ManualClock::new(0));
            let providers = Providers {
                log: Box::new(SlogLog(log.clone())),
                clock: Box::new(clock.clone()),
            };
            let knocker = Knocker::new(cfg, providers)?;
            let table = HookTable::new();
            let reg = knocker.attach(&table)?;

            let out =
                knockadm::replay(&knocker, &clock, &table, local, &bytes)?;
            drop(reg);

            print_replay(&out.records)?;
            println!();
            if out.skipped > 0 {
                println!("{} frames skipped", out.skipped);
                println!();
            }
            print_knock_state(&knocker.dump())?;
            slog::debug!(log, "replay done"; "packets" => out.records.len());
        }
    }

    Ok(())
}
