// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Integration tests.
//!
//! These drive a [`Knocker`] through its hooks the way an interception
//! layer would: either by calling the hooks directly, or by attaching
//! them to a [`HookTable`] and pushing packets through that.

use knock_test_utils::*;

fn knock_all(table: &HookTable, clock: &ManualClock, gaps: [i64; 2]) {
    table.process(In, &mut syn(KPORT_1));
    clock.advance(gaps[0]);
    table.process(In, &mut syn(KPORT_2));
    clock.advance(gaps[1]);
    table.process(In, &mut syn(KPORT_3));
}

// Knock slots start at (0, 10, 20), so nothing is valid until a real
// sequence arrives. A sequence two seconds apart, judged a second after
// it ends, is valid; and a connection attempt made then does not hide
// the port.
#[test]
fn initial_state_then_valid_knock() {
    let (k, clock, _log) = knocker(1_000_000);
    assert!(!k.knock_ok());

    let inb = k.inbound();
    inb.process(&mut syn(KPORT_1));
    clock.set(1_000_002);
    inb.process(&mut syn(KPORT_2));
    clock.set(1_000_004);
    inb.process(&mut syn(KPORT_3));
    assert_eq!(k.state().read_knocks(), [1_000_000, 1_000_002, 1_000_004]);

    clock.set(1_000_005);
    assert!(k.knock_ok());
    assert!(!k.is_hidden());
    inb.process(&mut syn(HIDE_PORT));
    assert!(!k.is_hidden());
}

#[test]
fn knock_bounds() {
    // (gap 0->1, gap 1->2, time since last knock, expected)
    let cases = [
        (3, 3, 5, true),
        (0, 0, 0, true),
        (4, 3, 5, false),
        (3, 4, 5, false),
        (3, 3, 6, false),
    ];

    for (d0, d1, age, ok) in cases {
        let (k, clock, _log) = knocker(T0);
        let inb = k.inbound();
        inb.process(&mut syn(KPORT_1));
        clock.advance(d0);
        inb.process(&mut syn(KPORT_2));
        clock.advance(d1);
        inb.process(&mut syn(KPORT_3));
        clock.advance(age);
        assert_eq!(k.knock_ok(), ok, "d0={d0} d1={d1} age={age}");
    }
}

#[test]
fn hide_unhide_idempotent() {
    let (k, _clock, _log) = knocker(T0);
    k.hide();
    k.hide();
    assert!(k.is_hidden());
    k.unhide();
    k.unhide();
    assert!(!k.is_hidden());
}

#[test]
fn udp_never_interferes() {
    let (k, _clock, _log) = knocker(T0);
    let (inb, outb) = (k.inbound(), k.outbound());

    for port in [KPORT_1, KPORT_2, KPORT_3, HIDE_PORT, 53] {
        let mut to = PacketMeta::udp(CLIENT_PORT, port);
        let mut from = PacketMeta::udp(port, CLIENT_PORT);
        assert_eq!(inb.process(&mut to), Verdict::Accept);
        assert_eq!(outb.process(&mut from), Verdict::Accept);
        assert_eq!(to, PacketMeta::udp(CLIENT_PORT, port));
        assert_eq!(from, PacketMeta::udp(port, CLIENT_PORT));
    }

    assert!(!k.is_hidden());
    assert_eq!(k.state().read_knocks(), [0, 10, 20]);

    // Hidden or not, a UDP reply is left alone.
    k.hide();
    let mut from = PacketMeta::udp(HIDE_PORT, CLIENT_PORT);
    outb.process(&mut from);
    assert_eq!(from, PacketMeta::udp(HIDE_PORT, CLIENT_PORT));
}

// Only a knock on the last trigger port may reveal the port, even when
// the knocks on the first two happen to form a valid sequence.
#[test]
fn only_last_knock_reveals() {
    let (k, clock, log) = knocker(T0);
    let inb = k.inbound();
    k.hide();

    // A valid sequence is already on record.
    inb.process(&mut syn(KPORT_1));
    inb.process(&mut syn(KPORT_2));
    inb.process(&mut syn(KPORT_3));
    assert!(!k.is_hidden());

    k.hide();
    clock.advance(1);
    inb.process(&mut syn(KPORT_1));
    clock.advance(1);
    inb.process(&mut syn(KPORT_2));
    assert!(k.knock_ok());
    assert!(k.is_hidden());
    let unhides = log.at(LogLevel::Note);
    let unhides = unhides.iter().filter(|m| m.starts_with("un-hiding"));
    assert_eq!(unhides.count(), 1);
}

#[test]
fn hidden_replies_become_resets() {
    let (k, _clock, _log) = knocker(T0);
    let outb = k.outbound();

    let mut pkt = syn_ack();
    outb.process(&mut pkt);
    assert_eq!(pkt, syn_ack());

    k.hide();
    for flags in [
        TcpFlags::SYN | TcpFlags::ACK,
        TcpFlags::ACK,
        TcpFlags::PSH | TcpFlags::ACK,
        TcpFlags::FIN | TcpFlags::ACK,
        TcpFlags::RST,
    ] {
        let mut pkt = PacketMeta::tcp(HIDE_PORT, CLIENT_PORT, flags);
        outb.process(&mut pkt);
        assert!(pkt.flags.contains(TcpFlags::RST), "{pkt}");
        assert!(!pkt.flags.contains(TcpFlags::ACK), "{pkt}");
    }
}

// The whole life of a knocker through a hook table: a stranger trips
// the hide, the service's answers turn into resets, a correct knock
// reveals the port, and detaching leaves the table empty.
#[test]
fn attached_lifecycle() {
    let (k, clock, log) = knocker(T0);
    let table = HookTable::new();
    let reg = k.attach(&table).unwrap();
    assert_eq!(reg.ids().len(), 2);

    assert_eq!(table.process(In, &mut syn(HIDE_PORT)), Verdict::Accept);
    assert!(k.is_hidden());

    let mut reply = syn_ack();
    assert_eq!(table.process(Out, &mut reply), Verdict::Accept);
    assert_eq!(reply.flags, TcpFlags::SYN | TcpFlags::RST);

    clock.advance(30);
    knock_all(&table, &clock, [1, 2]);
    assert!(!k.is_hidden());

    clock.advance(1);
    table.process(In, &mut syn(HIDE_PORT));
    let mut reply = syn_ack();
    table.process(Out, &mut reply);
    assert_eq!(reply, syn_ack());

    // Once the knock goes stale, the next attempt hides it again.
    clock.advance(10);
    table.process(In, &mut syn(HIDE_PORT));
    assert!(k.is_hidden());

    drop(reg);
    assert!(table.is_empty());

    let dump = k.dump();
    assert_eq!(dump.stats.hides, 2);
    assert_eq!(dump.stats.unhides, 1);
    assert_eq!(dump.stats.knocks, 3);
    assert_eq!(dump.stats.resets, 1);
    assert!(log.contains("hiding port 111"));
    assert!(log.contains("un-hiding port 111"));
}

#[test]
fn unload_is_logged() {
    let (k, _clock, log) = knocker(T0);
    let inb = k.inbound();
    drop(k);
    assert!(!log.contains("unloaded"));
    drop(inb);
    assert!(log.contains("knocker for port 111 unloaded"));
}

#[test]
fn debug_trace() {
    let (k, _clock, log) = knocker(T0);
    k.inbound().process(&mut syn(HIDE_PORT));
    let debug = log.at(LogLevel::Debug);
    assert!(debug.iter().any(|m| m == "inbound hook called"));
    assert!(debug.iter().any(|m| m.starts_with("knock NOT OK")));
}

// Raw datagrams through the hooks: the rewrite lands in the bytes and
// the checksum still verifies.
#[test]
fn raw_frames() {
    let (k, _clock, _log) = knocker(T0);
    let table = HookTable::new();
    let _reg = k.attach(&table).unwrap();

    let mut bytes = tcp_frame(
        CLIENT_IP,
        SERVER_IP,
        CLIENT_PORT,
        HIDE_PORT,
        TcpFlags::SYN,
    );
    let mut frame = Ipv4Frame::parse(&mut bytes).unwrap();
    table.process(In, &mut frame);
    assert!(k.is_hidden());

    let mut bytes = tcp_frame(
        SERVER_IP,
        CLIENT_IP,
        HIDE_PORT,
        CLIENT_PORT,
        TcpFlags::SYN | TcpFlags::ACK,
    );
    assert!(csums_valid(&bytes));
    let mut frame = Ipv4Frame::parse(&mut bytes).unwrap();
    table.process(Out, &mut frame);
    assert_eq!(frame.tcp_flags(), TcpFlags::SYN | TcpFlags::RST);
    assert!(csums_valid(&bytes));

    let orig = udp_frame(SERVER_IP, CLIENT_IP, HIDE_PORT, CLIENT_PORT, b"hi");
    let mut bytes = orig.clone();
    let mut frame = Ipv4Frame::parse(&mut bytes).unwrap();
    table.process(Out, &mut frame);
    assert_eq!(bytes, orig);
}

// A non-first fragment carries only payload. Whatever that payload
// looks like, it is neither a knock nor a reply to rewrite.
#[test]
fn later_fragments_pass_untouched() {
    let (k, _clock, _log) = knocker(T0);
    let table = HookTable::new();
    let _reg = k.attach(&table).unwrap();
    k.hide();

    let later = |mut frame: Vec<u8>| {
        frame[6..8].copy_from_slice(&185u16.to_be_bytes());
        frame
    };

    let orig = later(tcp_frame(
        SERVER_IP,
        CLIENT_IP,
        HIDE_PORT,
        CLIENT_PORT,
        TcpFlags::ACK,
    ));
    let mut bytes = orig.clone();
    let mut frame = Ipv4Frame::parse(&mut bytes).unwrap();
    assert_eq!(table.process(Out, &mut frame), Verdict::Accept);
    assert_eq!(bytes, orig);

    for dport in [KPORT_1, KPORT_2, KPORT_3, HIDE_PORT] {
        let mut bytes = later(tcp_frame(
            CLIENT_IP,
            SERVER_IP,
            CLIENT_PORT,
            dport,
            TcpFlags::SYN,
        ));
        let mut frame = Ipv4Frame::parse(&mut bytes).unwrap();
        table.process(In, &mut frame);
    }

    let dump = k.dump();
    assert_eq!(dump.knocks, [0, 10, 20]);
    assert_eq!(dump.stats.resets, 0);
    assert_eq!(dump.stats.hides, 1);
    assert!(dump.hidden);
}

// Hooks run concurrently from many contexts. Whatever interleaving
// occurs, the state must stay coherent and every packet accepted.
#[test]
fn concurrent_hooks() {
    let (k, clock, _log) = knocker(T0);
    let table = HookTable::new();
    let _reg = k.attach(&table).unwrap();

    std::thread::scope(|s| {
        for i in 0..4 {
            let table = &table;
            let clock = &clock;
            s.spawn(move || {
                for j in 0..250 {
                    let port = match (i + j) % 5 {
                        0 => KPORT_1,
                        1 => KPORT_2,
                        2 => KPORT_3,
                        3 => HIDE_PORT,
                        _ => 22,
                    };
                    let v = table.process(In, &mut syn(port));
                    assert_eq!(v, Verdict::Accept);
                    let v = table.process(Out, &mut syn_ack());
                    assert_eq!(v, Verdict::Accept);
                    if j % 50 == 0 {
                        clock.advance(1);
                    }
                }
            });
        }
    });

    let dump = k.dump();
    assert_eq!(dump.stats.in_pkts, 1000);
    assert_eq!(dump.stats.out_pkts, 1000);
    assert_eq!(dump.stats.knocks, 600);
    for t in dump.knocks {
        assert!((T0..=T0 + 20).contains(&t));
    }
}
