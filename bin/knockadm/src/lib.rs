// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Knock engine administration library

use knock::engine::HookTable;
use knock::engine::Ipv4Frame;
use knock::engine::Knocker;
use knock::engine::PacketView;
use knock::engine::TcpFlags;
use knock::engine::Verdict;
use knock::engine::policy::KnockPolicy;
use knock::time::ManualClock;
use knock_api::CfgError;
use knock_api::Direction;
use knock_api::KnockCfg;
use knock_api::Protocol;
use pcap_parser::Linktype;
use pcap_parser::pcap;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::Path;
use tabwriter::TabWriter;

/// The length of an Ethernet II header.
const ETHER_HDR_SZ: usize = 14;

/// The EtherType of IPv4.
const ETHERTYPE_IPV4: u16 = 0x0800;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {err}")]
    Io { path: String, err: std::io::Error },

    #[error("bad configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to render configuration: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Cfg(#[from] CfgError),

    #[error("bad capture: {0}")]
    Pcap(String),

    #[error("unsupported capture link type: {0}")]
    Linktype(i32),
}

/// Load the configuration at `path`, or the defaults if there is none.
///
/// Keys missing from the file take their default values. The result is
/// validated either way.
pub fn load_cfg(path: Option<&Path>) -> Result<KnockCfg, Error> {
    let cfg = match path {
        Some(path) => {
            let s = std::fs::read_to_string(path).map_err(|err| {
                Error::Io { path: path.display().to_string(), err }
            })?;
            toml::from_str(&s)?
        }

        None => KnockCfg::default(),
    };

    cfg.validate()?;
    Ok(cfg)
}

/// Render `cfg` the way a configuration file would hold it.
pub fn cfg_to_toml(cfg: &KnockCfg) -> Result<String, Error> {
    Ok(toml::to_string(cfg)?)
}

/// Judge `knocks` as of `now` under `cfg`, and describe the outcome.
pub fn check_knocks(cfg: &KnockCfg, knocks: [i64; 3], now: i64) -> String {
    match KnockPolicy::from(cfg).check(knocks, now) {
        Ok(()) => "knock OK".to_string(),
        Err(fail) => format!("knock NOT OK: {fail}"),
    }
}

/// Parse a comma-separated list of the three knock timestamps.
pub fn parse_knocks(s: &str) -> Result<[i64; 3], String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<i64>().map_err(|e| format!("{p}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    <[i64; 3]>::try_from(parts)
        .map_err(|v| format!("expected 3 timestamps, got {}", v.len()))
}

/// What became of one captured packet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplayRecord {
    pub ts: i64,
    pub dir: Direction,
    pub proto: Protocol,
    pub src_port: u16,
    pub dst_port: u16,
    pub verdict: Verdict,
    pub flags_before: TcpFlags,
    pub flags_after: TcpFlags,
    pub hidden: bool,
}

/// The outcome of a replay.
#[derive(Debug, Default)]
pub struct Replay {
    pub records: Vec<ReplayRecord>,

    /// Frames that were not IPv4, could not be decoded, or neither came
    /// from nor went to the local address.
    pub skipped: usize,
}

/// Replay a legacy pcap capture through `table`.
///
/// A frame destined to `local` is run through the inbound hooks, one
/// sourced from it through the outbound hooks. Before each frame the
/// clock is set to the frame's capture time.
pub fn replay(
    knocker: &Knocker,
    clock: &ManualClock,
    table: &HookTable,
    local: Ipv4Addr,
    capture: &[u8],
) -> Result<Replay, Error> {
    let (mut rest, hdr) = pcap::parse_pcap_header(capture)
        .map_err(|e| Error::Pcap(format!("header: {e:?}")))?;
    let linktype = hdr.network;
    let l3_off = match linktype {
        Linktype::ETHERNET => ETHER_HDR_SZ,
        Linktype::RAW | Linktype::IPV4 => 0,
        other => return Err(Error::Linktype(other.0)),
    };

    let mut out = Replay::default();

    while !rest.is_empty() {
        let res = if hdr.is_bigendian() {
            pcap::parse_pcap_frame_be(rest)
        } else {
            pcap::parse_pcap_frame(rest)
        };
        let (next, block) = res.map_err(|e| {
            Error::Pcap(format!("frame {}: {e:?}", out.records.len()))
        })?;
        rest = next;

        if block.data.len() < l3_off
            || (linktype == Linktype::ETHERNET
                && u16::from_be_bytes([block.data[12], block.data[13]])
                    != ETHERTYPE_IPV4)
        {
            out.skipped += 1;
            continue;
        }

        let mut bytes = block.data[l3_off..].to_vec();
        let Ok(mut frame) = Ipv4Frame::parse(&mut bytes) else {
            out.skipped += 1;
            continue;
        };

        let dir = if frame.dst() == local {
            Direction::In
        } else if frame.src() == local {
            Direction::Out
        } else {
            out.skipped += 1;
            continue;
        };

        let ts = i64::from(block.ts_sec);
        clock.set(ts);
        let flags_before = frame.tcp_flags();
        let verdict = table.process(dir, &mut frame);

        out.records.push(ReplayRecord {
            ts,
            dir,
            proto: frame.protocol(),
            src_port: frame.src_port(),
            dst_port: frame.dst_port(),
            verdict,
            flags_before,
            flags_after: frame.tcp_flags(),
            hidden: knocker.is_hidden(),
        });
    }

    Ok(out)
}

/// Print replay records into a given writer.
pub fn print_replay_into(
    writer: &mut impl Write,
    records: &[ReplayRecord],
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);
    writeln!(t, "TIME\tDIR\tPROTO\tSPORT\tDPORT\tVERDICT\tFLAGS\tHIDDEN")?;
    for r in records {
        let flags = if r.flags_before == r.flags_after {
            format!("{}", r.flags_after)
        } else {
            format!("{} -> {}", r.flags_before, r.flags_after)
        };

        writeln!(
            t,
            "{}\t{}\t{}\t{}\t{}\t{}\t{flags}\t{}",
            r.ts, r.dir, r.proto, r.src_port, r.dst_port, r.verdict, r.hidden
        )?;
    }
    t.flush()
}

/// Print replay records.
pub fn print_replay(records: &[ReplayRecord]) -> std::io::Result<()> {
    print_replay_into(&mut std::io::stdout(), records)
}
