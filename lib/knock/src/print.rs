// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Print engine state in a human-friendly manner.
//!
//! This is mostly just a place to hang printing routines so that they
//! can be used by both knockadm and tests.

use knock_api::KnockSlot;
use knock_api::KnockStateDump;
use std::io::Write;
use tabwriter::TabWriter;

/// Print a [`KnockStateDump`].
pub fn print_knock_state(dump: &KnockStateDump) -> std::io::Result<()> {
    print_knock_state_into(&mut std::io::stdout(), dump)
}

/// Print a [`KnockStateDump`] into a given writer.
pub fn print_knock_state_into(
    writer: &mut impl Write,
    dump: &KnockStateDump,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    let state = if dump.hidden { "HIDDEN" } else { "VISIBLE" };
    writeln!(t, "Port {}: {state}", dump.cfg.hide_port)?;
    write_hrb(&mut t)?;
    writeln!(t, "SLOT\tPORT\tLAST KNOCK")?;
    for slot in KnockSlot::ALL {
        writeln!(
            t,
            "{slot}\t{}\t{}",
            dump.cfg.port_for(slot),
            dump.knocks[slot.index()]
        )?;
    }
    t.flush()?;

    writeln!(t)?;
    writeln!(t, "Counters")?;
    write_hr(&mut t)?;
    let s = &dump.stats;
    writeln!(t, "IN PKTS\tOUT PKTS\tKNOCKS\tHIDES\tUNHIDES\tRESETS")?;
    writeln!(
        t,
        "{}\t{}\t{}\t{}\t{}\t{}",
        s.in_pkts, s.out_pkts, s.knocks, s.hides, s.unhides, s.resets
    )?;
    t.flush()
}

/// Print a horizontal rule in bold.
pub fn write_hrb(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:=<70}", "=")
}

/// Print a horizontal rule.
pub fn write_hr(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:-<70}", "-")
}

#[cfg(test)]
mod test {
    use super::*;
    use knock_api::KnockCfg;
    use knock_api::KnockStatsDump;

    #[test]
    fn state_table() {
        let dump = KnockStateDump {
            cfg: KnockCfg::default(),
            knocks: [0, 10, 20],
            hidden: true,
            stats: KnockStatsDump { knocks: 3, ..Default::default() },
        };

        let mut out = Vec::new();
        print_knock_state_into(&mut out, &dump).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Port 111: HIDDEN\n"));
        assert!(out.contains("32232"));
        assert!(
            out.lines().any(|l| l.starts_with("3 ") && l.ends_with("20"))
        );
    }
}
