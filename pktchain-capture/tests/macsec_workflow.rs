// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io::Cursor;

use hex_literal::hex;
use pktchain::layers::macsec::{tci_an, MACSEC_ICV_LEN};
use pktchain::prelude::*;
use pktchain_capture::{CaptureError, FrameReader, FrameWriter, PcapReader, PcapWriter};

fn created_frame() -> Packet {
    let mut secure_data = vec![0x42; 100];
    for (i, b) in secure_data[100 - MACSEC_ICV_LEN..].iter_mut().enumerate() {
        *b = i as u8 + 1;
    }

    let mut packet = Packet::new(100);
    packet.add_layer(Ether::new(hex!("00 50 43 11 22 33"), hex!("aa bb cc dd ee 00"), 0));
    packet.add_layer(Macsec::new(
        tci_an(TciFlags::SCI_PRESENT | TciFlags::ENCRYPTED | TciFlags::CHANGED_TEXT, 0),
        0,
        10,
        hex!("00 50 43 11 22 33 00 00"),
    ));
    packet.add_layer(Raw::from(secure_data));
    packet.compute_calculate_fields();
    packet
}

fn write_capture(frames: &[&FrameBuffer]) -> Vec<u8> {
    let mut writer = PcapWriter::new(Vec::new(), LinkType::ETHERNET).unwrap();
    for frame in frames {
        writer.write(frame).unwrap();
    }
    writer.close().unwrap();
    writer.into_inner()
}

#[test]
fn create_read_edit_write() {
    let created = created_frame().into_frame();
    let capture = write_capture(&[&created]);

    let mut reader = PcapReader::new(Cursor::new(capture)).unwrap();
    let frame = reader.read_next().unwrap().unwrap();
    assert!(reader.read_next().unwrap().is_none());
    assert_eq!(frame.as_slice(), created.as_slice());

    let mut packet = Packet::from_buffer(frame);
    assert_eq!(packet.layer::<EtherRef>().unwrap().eth_type(), ETH_PROTOCOL_MACSEC);
    assert_eq!(packet.layer::<MacsecRef>().unwrap().pn(), 10);
    assert_eq!(packet.layer::<RawRef>().unwrap().data().len(), 100 - MACSEC_ICV_LEN);

    packet
        .layer_mut::<EtherMut>()
        .unwrap()
        .set_dst_mac(hex!("aa bb cc dd ee ff"));
    packet.layer_mut::<MacsecMut>().unwrap().set_pn(100);
    packet.compute_calculate_fields();

    let edited = packet.into_frame();
    let capture = write_capture(&[&edited]);
    let reread = PcapReader::new(Cursor::new(capture))
        .unwrap()
        .next()
        .unwrap()
        .unwrap();

    let original = created.as_slice();
    let modified = reread.as_slice();
    assert_eq!(modified.len(), original.len());
    assert_eq!(&modified[0..6], &hex!("aa bb cc dd ee ff"));
    assert_eq!(&modified[16..20], &100u32.to_be_bytes());
    assert_eq!(&modified[6..16], &original[6..16]);
    assert_eq!(&modified[20..], &original[20..]);
    assert_eq!(reread.timestamp().as_micros(), edited.timestamp().as_micros());
}

#[test]
fn truncated_capture_aborts_workflow() {
    let created = created_frame().into_frame();
    let mut capture = write_capture(&[&created, &created]);
    capture.truncate(capture.len() - 1);

    let results: Vec<_> = PcapReader::new(Cursor::new(capture)).unwrap().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(CaptureError::TruncatedRecord)));
}
