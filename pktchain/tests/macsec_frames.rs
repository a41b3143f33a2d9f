// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use hex_literal::hex;
use pktchain::layers::macsec::{tci_an, MACSEC_ICV_LEN};
use pktchain::prelude::*;

const SRC_MAC: [u8; 6] = [0xaa; 6];
const DST_MAC: [u8; 6] = [0xbb; 6];
const SCI: [u8; 8] = hex!("aa aa aa aa aa aa 00 00");

const CREATED_FRAME: [u8; 48] = hex!(
    "bb bb bb bb bb bb"
    "aa aa aa aa aa aa"
    "88 e5"
    "34 55 de ad be ef"
    "aa aa aa aa aa aa 00 00"
    "c0 ca c0 1a"
    "bb bb bb bb bb bb bb bb bb bb bb bb bb bb bb bb"
);

const CAPTURED_FRAME: [u8; 60] = hex!(
    "01 00 0c cc cc cd"
    "bc 16 65 2b 75 0d"
    "88 e5"
    "2c 00 00 00 00 0d"
    "bc 16 65 2b 75 0d 00 00"
    "4e 8b 1d 22 7f 90 a1 03 66 2e 95 2f 77 11 c4 09"
    "01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f 10"
);

fn created_frame() -> Packet {
    let mut payload = hex!("c0 ca c0 1a").to_vec();
    payload.extend([0xbb; MACSEC_ICV_LEN]);

    let mut packet = Packet::new(1);
    packet.add_layer(Ether::new(SRC_MAC, DST_MAC, ETH_PROTOCOL_MACSEC));
    packet.add_layer(Macsec::new(
        tci_an(TciFlags::from_bits_truncate(0x0d), 0),
        0x55,
        0xdeadbeef,
        SCI,
    ));
    packet.add_layer(Raw::from(payload));
    packet
}

#[test]
fn created_frame_is_wire_exact() {
    let packet = created_frame();
    assert!(packet.has_layer::<Ether>());

    let ether = packet.layer::<EtherRef>().unwrap();
    assert_eq!(ether.dst_mac(), DST_MAC);
    assert_eq!(ether.src_mac(), SRC_MAC);
    assert_eq!(ether.eth_type(), ETH_PROTOCOL_MACSEC);

    let macsec = packet.layer::<MacsecRef>().unwrap();
    assert_eq!(macsec.tci(), 0x0d);
    assert_eq!(macsec.an(), 0);
    assert_eq!(macsec.sl(), 0x55);
    assert_eq!(macsec.pn(), 0xdeadbeef);
    assert_eq!(macsec.sci(), SCI);

    assert_eq!(packet.as_bytes(), &CREATED_FRAME);
}

#[test]
fn composed_frame_matches_added_frame() {
    let mut payload = hex!("c0 ca c0 1a").to_vec();
    payload.extend([0xbb; MACSEC_ICV_LEN]);
    let mut packet = Ether::new(SRC_MAC, DST_MAC, 0)
        / Macsec::new(0x34, 0x55, 0xdeadbeef, SCI)
        / Raw::from(payload);
    packet.compute_calculate_fields();
    assert_eq!(packet.as_bytes(), &CREATED_FRAME);
}

#[test]
fn captured_frame_parses() {
    let packet = Packet::from_bytes(&CAPTURED_FRAME, LinkType::ETHERNET);

    let ether = packet.layer::<EtherRef>().unwrap();
    assert_eq!(ether.dst_mac(), hex!("01 00 0c cc cc cd"));
    assert_eq!(ether.src_mac(), hex!("bc 16 65 2b 75 0d"));
    assert_eq!(ether.eth_type(), ETH_PROTOCOL_MACSEC);

    let macsec = packet.layer::<MacsecRef>().unwrap();
    assert_eq!(macsec.tci_an(), 0x2c);
    assert_eq!(macsec.tci(), 0x0b);
    assert_eq!(macsec.an(), 0);
    assert_eq!(macsec.sl(), 0);
    assert_eq!(macsec.pn(), 0x0d);
    assert_eq!(macsec.sci(), hex!("bc 16 65 2b 75 0d 00 00"));
    assert!(macsec.is_encrypted());
    assert!(macsec.is_changed_text());
    assert_eq!(macsec.icv(), Some(&hex!("01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f 10")));

    // Encrypted data is never interpreted further and never includes the ICV.
    let raw = packet.layer::<RawRef>().unwrap();
    assert_eq!(raw.data(), &CAPTURED_FRAME[28..44]);
    assert_eq!(packet.layer_count(), 3);
}

#[test]
fn captured_frame_edit_in_place() {
    let mut packet = Packet::from_bytes(&CAPTURED_FRAME, LinkType::ETHERNET);
    let new_sci = hex!("00 01 02 03 04 05 06 07");

    {
        let mut macsec = packet.layer_mut::<MacsecMut>().unwrap();
        macsec.set_tci_an(tci_an(TciFlags::from_bits_truncate(0x0d), 1));
        macsec.set_sl(2);
        macsec.set_pn(0xdeadbeef);
        macsec.set_sci(new_sci);
    }

    let macsec = packet.layer::<MacsecRef>().unwrap();
    assert_eq!(macsec.tci_an(), 0x35);
    assert_eq!(macsec.tci(), 0x0d);
    assert_eq!(macsec.an(), 1);
    assert_eq!(macsec.sl(), 2);
    assert_eq!(macsec.pn(), 0xdeadbeef);
    assert_eq!(macsec.sci(), new_sci);
    assert_eq!(&packet.as_bytes()[16..20], &hex!("de ad be ef"));
}

#[test]
fn edit_touches_only_edited_fields() {
    let mut packet = Packet::from_bytes(&CREATED_FRAME, LinkType::ETHERNET);

    packet
        .layer_mut::<EtherMut>()
        .unwrap()
        .set_dst_mac(hex!("aa bb cc dd ee ff"));
    packet.layer_mut::<MacsecMut>().unwrap().set_pn(100);
    packet.compute_calculate_fields();

    let edited = packet.to_bytes();
    assert_eq!(edited.len(), CREATED_FRAME.len());
    assert_eq!(&edited[0..6], &hex!("aa bb cc dd ee ff"));
    assert_eq!(&edited[16..20], &100u32.to_be_bytes());
    assert_eq!(&edited[6..16], &CREATED_FRAME[6..16]);
    assert_eq!(&edited[20..], &CREATED_FRAME[20..]);
}

#[test]
fn setters_mask_and_convert() {
    let mut packet = created_frame();
    let mut macsec = packet.layer_mut::<MacsecMut>().unwrap();

    macsec.set_an(0xFF);
    assert_eq!(macsec.an(), 3);
    assert_eq!(macsec.tci(), 0x0d);

    macsec.set_pn(1);
    assert_eq!(&packet.as_bytes()[16..20], &hex!("00 00 00 01"));
}

#[test]
fn short_secure_data_ends_chain() {
    let header = Ether::new(SRC_MAC, DST_MAC, ETH_PROTOCOL_MACSEC).to_bytes();
    let sectag = Macsec::new(0x2c, 0, 1, SCI).to_bytes();

    for icv_bytes in [0usize, 8, MACSEC_ICV_LEN] {
        let mut frame = header.clone();
        frame.extend(&sectag);
        frame.extend(vec![0xbb; icv_bytes]);

        let packet = Packet::from_bytes(&frame, LinkType::ETHERNET);
        assert_eq!(packet.layer_count(), 2, "{} bytes after the SecTAG", icv_bytes);
        assert!(packet.layer::<RawRef>().is_none());
        assert_eq!(packet.as_bytes(), frame.as_slice());

        let info = packet.layers().nth(1).unwrap();
        assert_eq!(info.trailer_len, icv_bytes);
        assert_eq!(info.len, 14 + icv_bytes);
    }
}

#[test]
fn compute_is_idempotent() {
    let mut packet = Packet::new(64);
    packet.add_layer(Macsec::new(0x2c, 0, 7, SCI));
    packet.add_layer(Raw::new(&[0x5a; 24]));

    packet.compute_calculate_fields();
    let first = packet.to_bytes();
    packet.compute_calculate_fields();
    assert_eq!(packet.to_bytes(), first);
}

#[test]
fn insert_and_detach_security_tag() {
    let mut payload = hex!("c0 ca c0 1a").to_vec();
    payload.extend([0xbb; MACSEC_ICV_LEN]);
    let mut packet = Ether::new(SRC_MAC, DST_MAC, 0x0800) / Raw::from(payload);

    let ether = packet.index_of::<Ether>().unwrap();
    packet
        .insert_layer(Some(ether), Macsec::new(0x34, 0x55, 0xdeadbeef, SCI))
        .unwrap();
    packet.compute_calculate_fields();
    assert_eq!(packet.as_bytes(), &CREATED_FRAME);

    let macsec = packet.detach_layer::<Macsec>().unwrap();
    assert_eq!(macsec.pn(), 0xdeadbeef);
    assert_eq!(packet.as_bytes().len(), CREATED_FRAME.len() - 14);
    assert!(packet.layer::<MacsecRef>().is_none());
    assert!(!packet.has_layer::<Macsec>());
}

#[test]
fn lookup_miss_is_not_an_error() {
    let packet = Packet::from_layer(Raw::new(&[1, 2, 3]));
    assert!(packet.layer::<MacsecRef>().is_none());
    assert!(packet.layer::<EtherRef>().is_none());
    assert_eq!(packet.index_of::<Macsec>(), None);
}

#[test]
fn summaries() {
    let packet = Packet::from_bytes(&CREATED_FRAME, LinkType::ETHERNET);
    let text = packet.to_string();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "Ethernet II Layer, Src: aa:aa:aa:aa:aa:aa, Dst: bb:bb:bb:bb:bb:bb, Type: 0x88e5",
            "MACsec Layer, TCI: d, AN: 0, TCI details: Encryption Off, SL: 85, PN: 3735928559, \
             SCI: aaaaaaaaaaaa0000, ICV in trailer",
            "Payload Layer, Data length: 4 [Bytes]",
        ]
    );
}
