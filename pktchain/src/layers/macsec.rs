// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The IEEE 802.1AE (MACsec) security tag.
//!
//! A MACsec frame carries a 14-byte SecTAG directly after the Ethernet header, followed by the
//! (possibly encrypted) secure data and a 16-byte Integrity Check Value (ICV):
//!
//! ```text
//! byte 0      : TCI (6 bits) | AN (2 bits)
//! byte 1      : SL
//! bytes 2-5   : PN  (big-endian)
//! bytes 6-13  : SCI
//! ...secure data...
//! last 16 bytes: ICV
//! ```
//!
//! The ICV is not framed on its own. When a frame is parsed, the last 16 bytes of the tag's span
//! are reserved as its trailer and the layer following the tag only covers what lies between the
//! header and the ICV. The secure data is always decoded as [`Raw`](super::Raw), even when the
//! encryption bit is clear, since the tag itself does not name the protocol it protects.

use core::fmt;

use bitflags::bitflags;
use pktchain_common::fields::{self, BitField};
use pktchain_macros::{layer_metadata, Layer, LayerMut, LayerRef};

use crate::error::*;
use crate::layers::dev_traits::*;
use crate::layers::l2::ETH_PROTOCOL_MACSEC;
use crate::layers::traits::*;
use crate::layers::RawMetadata;
use crate::registry::LayerRegistry;

/// The length of the SecTAG, with the SCI always present.
pub const MACSEC_HEADER_LEN: usize = 14;

/// The length of the Integrity Check Value at the tail of a MACsec frame.
pub const MACSEC_ICV_LEN: usize = 16;

const TCI_FIELD: BitField = BitField::new(2, 6);
const AN_FIELD: BitField = BitField::new(0, 2);

bitflags! {
    /// The bits of the 6-bit Tag Control Information field.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TciFlags: u8 {
        /// Version number; always 0 in current revisions of the standard.
        const VERSION = 0b_0010_0000;
        /// End Station.
        const END_STATION = 0b_0001_0000;
        /// The SCI is explicitly encoded in the SecTAG.
        const SCI_PRESENT = 0b_0000_1000;
        /// Single Copy Broadcast.
        const SINGLE_COPY_BROADCAST = 0b_0000_0100;
        /// The secure data is encrypted.
        const ENCRYPTED = 0b_0000_0010;
        /// The secure data differs from the user data.
        const CHANGED_TEXT = 0b_0000_0001;
    }
}

/// Packs a 6-bit TCI and a 2-bit AN into the first byte of a SecTAG.
#[inline]
pub fn tci_an(tci: TciFlags, an: u8) -> u8 {
    let mut byte = 0;
    TCI_FIELD.set(&mut byte, tci.bits());
    AN_FIELD.set(&mut byte, an);
    byte
}

layer_metadata!(MacsecMetadata);

impl LayerMetadata for MacsecMetadata {
    #[inline]
    fn layer_id(&self) -> LayerId {
        Macsec::layer_id()
    }

    #[inline]
    fn layer_name(&self) -> &'static str {
        Macsec::name()
    }

    #[inline]
    fn header_len(&self, _bytes: &[u8]) -> usize {
        MACSEC_HEADER_LEN
    }

    #[inline]
    fn trailer_len(&self, bytes: &[u8]) -> usize {
        MACSEC_ICV_LEN.min(bytes.len().saturating_sub(MACSEC_HEADER_LEN))
    }

    fn parse_next_layer(
        &self,
        bytes: &[u8],
        _registry: &LayerRegistry,
    ) -> Option<&'static dyn LayerMetadata> {
        match bytes.len().checked_sub(MACSEC_HEADER_LEN + MACSEC_ICV_LEN) {
            Some(remaining) if remaining > 0 => Some(RawMetadata::instance()),
            _ => {
                tracing::trace!(
                    span_len = bytes.len(),
                    "no secure data between MACsec header and ICV"
                );
                None
            }
        }
    }

    #[inline]
    fn ether_type(&self) -> Option<u16> {
        Some(ETH_PROTOCOL_MACSEC)
    }

    #[inline]
    fn osi_layer(&self) -> OsiLayer {
        OsiLayer::DataLink
    }

    fn summary(&self, bytes: &[u8]) -> String {
        MacsecRef::from_bytes_unchecked(bytes).to_string()
    }

    fn to_boxed_layer(&self, header: &[u8]) -> Box<dyn LayerObject> {
        Box::new(Macsec::from_bytes_current_layer_unchecked(header))
    }
}

/// A MACsec security tag (SecTAG).
///
/// The owned layer holds only the 14-byte header. When built from scratch, the secure data and
/// the ICV are whatever the caller attaches after it; when parsed, the ICV stays in the packet
/// as the tag's trailer.
#[derive(Clone, Debug, Layer)]
#[metadata_type(MacsecMetadata)]
#[ref_type(MacsecRef)]
pub struct Macsec {
    #[data_field]
    data: [u8; MACSEC_HEADER_LEN],
}

impl Macsec {
    /// Builds a SecTAG from its raw field values.
    ///
    /// Fields are written through the same setters used on an attached tag, so the byte layout
    /// is identical regardless of how the tag was constructed.
    pub fn new(tci_an: u8, sl: u8, pn: u32, sci: [u8; 8]) -> Self {
        let mut macsec = Macsec {
            data: [0; MACSEC_HEADER_LEN],
        };
        let mut view = macsec.view_mut();
        view.set_tci_an(tci_an);
        view.set_sl(sl);
        view.set_pn(pn);
        view.set_sci(sci);
        macsec
    }

    #[inline]
    fn view(&self) -> MacsecRef<'_> {
        MacsecRef::from_bytes_unchecked(&self.data)
    }

    #[inline]
    fn view_mut(&mut self) -> MacsecMut<'_> {
        MacsecMut::from_bytes_mut_unchecked(&mut self.data)
    }

    /// The Tag Control Information, as the raw 6-bit value.
    #[inline]
    pub fn tci(&self) -> u8 {
        self.view().tci()
    }

    /// The Tag Control Information, as flags.
    #[inline]
    pub fn tci_flags(&self) -> TciFlags {
        self.view().tci_flags()
    }

    #[inline]
    pub fn set_tci(&mut self, tci: u8) {
        self.view_mut().set_tci(tci)
    }

    /// The Association Number.
    #[inline]
    pub fn an(&self) -> u8 {
        self.view().an()
    }

    #[inline]
    pub fn set_an(&mut self, an: u8) {
        self.view_mut().set_an(an)
    }

    /// The whole first byte of the tag (TCI and AN).
    #[inline]
    pub fn tci_an(&self) -> u8 {
        self.view().tci_an()
    }

    #[inline]
    pub fn set_tci_an(&mut self, tci_an: u8) {
        self.view_mut().set_tci_an(tci_an)
    }

    /// The Short Length.
    #[inline]
    pub fn sl(&self) -> u8 {
        self.view().sl()
    }

    #[inline]
    pub fn set_sl(&mut self, sl: u8) {
        self.view_mut().set_sl(sl)
    }

    /// The Packet Number.
    #[inline]
    pub fn pn(&self) -> u32 {
        self.view().pn()
    }

    #[inline]
    pub fn set_pn(&mut self, pn: u32) {
        self.view_mut().set_pn(pn)
    }

    /// The Secure Channel Identifier.
    #[inline]
    pub fn sci(&self) -> [u8; 8] {
        self.view().sci()
    }

    #[inline]
    pub fn set_sci(&mut self, sci: [u8; 8]) {
        self.view_mut().set_sci(sci)
    }

    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.view().is_encrypted()
    }

    #[inline]
    pub fn is_changed_text(&self) -> bool {
        self.view().is_changed_text()
    }
}

impl FromBytesCurrent for Macsec {
    #[inline]
    fn from_bytes_current_layer_unchecked(bytes: &[u8]) -> Self {
        Macsec {
            data: fields::to_array(bytes, 0).expect("insufficient bytes in MACsec header"),
        }
    }
}

/// A reference to a MACsec security tag and the bytes it protects.
#[derive(Copy, Clone, Debug, LayerRef)]
#[owned_type(Macsec)]
#[metadata_type(MacsecMetadata)]
pub struct MacsecRef<'a> {
    #[data_field]
    data: &'a [u8],
}

impl<'a> MacsecRef<'a> {
    #[inline]
    pub fn tci_an(&self) -> u8 {
        *self
            .data
            .first()
            .expect("insufficient bytes in MacsecRef to retrieve TCI/AN field")
    }

    #[inline]
    pub fn tci(&self) -> u8 {
        TCI_FIELD.get(self.tci_an())
    }

    /// The TCI as flags. Every 6-bit value is a valid set of flags.
    #[inline]
    pub fn tci_flags(&self) -> TciFlags {
        TciFlags::from_bits_truncate(self.tci())
    }

    #[inline]
    pub fn an(&self) -> u8 {
        AN_FIELD.get(self.tci_an())
    }

    #[inline]
    pub fn sl(&self) -> u8 {
        *self
            .data
            .get(1)
            .expect("insufficient bytes in MacsecRef to retrieve Short Length field")
    }

    #[inline]
    pub fn pn(&self) -> u32 {
        fields::read_be_u32(self.data, 2)
            .expect("insufficient bytes in MacsecRef to retrieve Packet Number field")
    }

    /// The Secure Channel Identifier, borrowed from the packet.
    #[inline]
    pub fn sci_bytes(&self) -> &'a [u8; 8] {
        fields::get_array(self.data, 6)
            .expect("insufficient bytes in MacsecRef to retrieve Secure Channel Identifier field")
    }

    #[inline]
    pub fn sci(&self) -> [u8; 8] {
        *self.sci_bytes()
    }

    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.tci_flags().contains(TciFlags::ENCRYPTED)
    }

    #[inline]
    pub fn is_changed_text(&self) -> bool {
        self.tci_flags().contains(TciFlags::CHANGED_TEXT)
    }

    /// The secure data between the header and the ICV.
    #[inline]
    pub fn payload_raw(&self) -> &'a [u8] {
        let icv_len = MacsecMetadata::instance().trailer_len(self.data);
        self.data
            .get(MACSEC_HEADER_LEN..self.data.len() - icv_len)
            .unwrap_or(&[])
    }

    /// The Integrity Check Value, or `None` if fewer than 16 bytes follow the header.
    #[inline]
    pub fn icv(&self) -> Option<&'a [u8; MACSEC_ICV_LEN]> {
        let start = self
            .data
            .len()
            .checked_sub(MACSEC_ICV_LEN)
            .filter(|&start| start >= MACSEC_HEADER_LEN)?;
        fields::get_array(self.data, start)
    }
}

impl<'a> FromBytesRef<'a> for MacsecRef<'a> {
    #[inline]
    fn from_bytes_unchecked(bytes: &'a [u8]) -> Self {
        MacsecRef { data: bytes }
    }
}

impl Validate for MacsecRef<'_> {
    fn validate_current_layer(curr_layer: &[u8]) -> Result<(), ValidationError> {
        check_header_len(Macsec::name(), curr_layer, MACSEC_HEADER_LEN)?;

        let tci = TciFlags::from_bits_truncate(TCI_FIELD.get(curr_layer[0]));
        if tci.contains(TciFlags::VERSION) {
            return Err(ValidationError {
                layer: Macsec::name(),
                class: ValidationErrorClass::InvalidValue,
                reason: "MACsec version bit must be 0",
            });
        }

        Ok(())
    }
}

impl fmt::Display for MacsecRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MACsec Layer, TCI: {:x}, AN: {}, TCI details: Encryption {}",
            self.tci(),
            self.an(),
            if self.is_encrypted() { "On" } else { "Off" }
        )?;
        if !self.is_changed_text() {
            f.write_str(" [Secure Data == User Data]")?;
        }
        write!(f, ", SL: {}, PN: {}, SCI: ", self.sl(), self.pn())?;
        for b in self.sci_bytes() {
            write!(f, "{:02x}", b)?;
        }
        f.write_str(", ICV in trailer")
    }
}

/// A mutable reference to a MACsec security tag.
///
/// Every setter writes in place and none of them changes the length of the packet.
#[derive(Debug, LayerMut)]
#[owned_type(Macsec)]
#[metadata_type(MacsecMetadata)]
#[ref_type(MacsecRef)]
pub struct MacsecMut<'a> {
    #[data_field]
    data: &'a mut [u8],
}

impl<'a> MacsecMut<'a> {
    #[inline]
    fn first_byte(&mut self) -> &mut u8 {
        self.data
            .first_mut()
            .expect("insufficient bytes in MacsecMut to set TCI/AN field")
    }

    #[inline]
    pub fn tci_an(&self) -> u8 {
        self.as_ref_layer().tci_an()
    }

    /// Overwrites the whole first byte (TCI and AN).
    #[inline]
    pub fn set_tci_an(&mut self, tci_an: u8) {
        *self.first_byte() = tci_an;
    }

    #[inline]
    pub fn tci(&self) -> u8 {
        self.as_ref_layer().tci()
    }

    /// Sets the TCI, masked to 6 bits. The AN is left untouched.
    #[inline]
    pub fn set_tci(&mut self, tci: u8) {
        TCI_FIELD.set(self.first_byte(), tci);
    }

    #[inline]
    pub fn tci_flags(&self) -> TciFlags {
        self.as_ref_layer().tci_flags()
    }

    #[inline]
    pub fn set_tci_flags(&mut self, flags: TciFlags) {
        self.set_tci(flags.bits());
    }

    #[inline]
    pub fn an(&self) -> u8 {
        self.as_ref_layer().an()
    }

    /// Replaces the AN with `an`, masked to 2 bits. The previous AN bits are cleared rather than
    /// combined with the new value, and the TCI is left untouched.
    #[inline]
    pub fn set_an(&mut self, an: u8) {
        AN_FIELD.set(self.first_byte(), an);
    }

    #[inline]
    pub fn sl(&self) -> u8 {
        self.as_ref_layer().sl()
    }

    #[inline]
    pub fn set_sl(&mut self, sl: u8) {
        *self
            .data
            .get_mut(1)
            .expect("insufficient bytes in MacsecMut to set Short Length field") = sl;
    }

    #[inline]
    pub fn pn(&self) -> u32 {
        self.as_ref_layer().pn()
    }

    #[inline]
    pub fn set_pn(&mut self, pn: u32) {
        fields::write_be_u32(self.data, 2, pn)
            .expect("insufficient bytes in MacsecMut to set Packet Number field");
    }

    #[inline]
    pub fn sci(&self) -> [u8; 8] {
        self.as_ref_layer().sci()
    }

    #[inline]
    pub fn set_sci(&mut self, sci: [u8; 8]) {
        *fields::get_mut_array(self.data, 6)
            .expect("insufficient bytes in MacsecMut to set Secure Channel Identifier field") = sci;
    }

    /// The Secure Channel Identifier, mutably borrowed from the packet.
    #[inline]
    pub fn sci_mut(&mut self) -> &mut [u8; 8] {
        fields::get_mut_array(self.data, 6)
            .expect("insufficient bytes in MacsecMut to retrieve Secure Channel Identifier field")
    }

    /// The Integrity Check Value, mutably, or `None` if fewer than 16 bytes follow the header.
    pub fn icv_mut(&mut self) -> Option<&mut [u8; MACSEC_ICV_LEN]> {
        let start = self
            .data
            .len()
            .checked_sub(MACSEC_ICV_LEN)
            .filter(|&start| start >= MACSEC_HEADER_LEN)?;
        fields::get_mut_array(self.data, start)
    }
}

impl<'a> FromBytesMut<'a> for MacsecMut<'a> {
    #[inline]
    fn from_bytes_mut_unchecked(bytes: &'a mut [u8]) -> Self {
        MacsecMut { data: bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Raw;

    const SCI: [u8; 8] = [0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0x00, 0x00];

    #[test]
    fn build_matches_wire_layout() {
        let macsec = Macsec::new(tci_an(TciFlags::from_bits_truncate(0x0d), 0), 0x55, 0xdeadbeef, SCI);
        assert_eq!(
            macsec.to_bytes(),
            [0x34, 0x55, 0xde, 0xad, 0xbe, 0xef, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0x00, 0x00]
        );
        assert_eq!(macsec.tci(), 0x0d);
        assert_eq!(macsec.an(), 0);
        assert_eq!(macsec.sl(), 0x55);
        assert_eq!(macsec.pn(), 0xdeadbeef);
        assert_eq!(macsec.sci(), SCI);
    }

    #[test]
    fn an_is_masked_and_keeps_tci() {
        let mut macsec = Macsec::new(tci_an(TciFlags::ENCRYPTED | TciFlags::SCI_PRESENT, 1), 0, 0, [0; 8]);
        macsec.set_an(0xFF);
        assert_eq!(macsec.an(), 3);
        assert_eq!(macsec.tci_flags(), TciFlags::ENCRYPTED | TciFlags::SCI_PRESENT);

        macsec.set_tci(0xFF);
        assert_eq!(macsec.tci(), 0x3F);
        assert_eq!(macsec.an(), 3);

        macsec.set_an(1);
        assert_eq!(macsec.an(), 1);
        assert_eq!(macsec.tci(), 0x3F);

        macsec.set_tci_an(0x01);
        assert_eq!(macsec.tci(), 0);
        assert_eq!(macsec.an(), 1);
    }

    #[test]
    fn pn_is_big_endian() {
        let mut macsec = Macsec::new(0, 0, 0, [0; 8]);
        macsec.set_pn(1);
        assert_eq!(&macsec.to_bytes()[2..6], &[0, 0, 0, 1]);

        let wire = [0x2c, 0, 0, 0, 0, 0x0d, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(MacsecRef::from_bytes(&wire).unwrap().pn(), 13);
    }

    #[test]
    fn icv_is_reserved_from_secure_data() {
        let mut frame = Macsec::new(0x2c, 0, 7, [1; 8]).to_bytes();
        frame.extend([0x11; 4]);
        frame.extend([0xbb; MACSEC_ICV_LEN]);

        let metadata = MacsecMetadata::instance();
        assert_eq!(metadata.trailer_len(&frame), MACSEC_ICV_LEN);
        let next = metadata.parse_next_layer(&frame, LayerRegistry::global());
        assert_eq!(next.map(|m| m.layer_id()), Some(Raw::layer_id()));

        let view = MacsecRef::from_bytes(&frame).unwrap();
        assert_eq!(view.payload_raw(), &[0x11; 4]);
        assert_eq!(view.icv(), Some(&[0xbb; MACSEC_ICV_LEN]));
    }

    #[test]
    fn short_frames_end_the_chain() {
        let metadata = MacsecMetadata::instance();
        let header = Macsec::new(0x2c, 0, 0, [0; 8]).to_bytes();

        for trailing in [0usize, 1, 15, 16] {
            let mut frame = header.clone();
            frame.resize(MACSEC_HEADER_LEN + trailing, 0);
            assert!(metadata
                .parse_next_layer(&frame, LayerRegistry::global())
                .is_none());
            assert_eq!(metadata.trailer_len(&frame), trailing);
            assert!(MacsecRef::from_bytes(&frame).unwrap().payload_raw().is_empty());
        }

        let mut frame = header;
        frame.resize(MACSEC_HEADER_LEN + 3, 0);
        assert_eq!(MacsecRef::from_bytes(&frame).unwrap().icv(), None);
    }

    #[test]
    fn validation() {
        let err = MacsecRef::from_bytes(&[0u8; 13]).unwrap_err();
        assert_eq!(err.class, ValidationErrorClass::InsufficientBytes);

        let versioned = Macsec::new(tci_an(TciFlags::VERSION, 0), 0, 0, [0; 8]).to_bytes();
        let err = MacsecRef::from_bytes(&versioned).unwrap_err();
        assert_eq!(err.class, ValidationErrorClass::InvalidValue);
        assert!(Macsec::from_bytes_current_layer(&versioned).is_err());
    }

    #[test]
    fn summary_reports_tci_details() {
        let macsec = Macsec::new(tci_an(TciFlags::from_bits_truncate(0x0d), 0), 0x55, 0xdeadbeef, SCI);
        assert_eq!(
            MacsecMetadata::instance().summary(&macsec.to_bytes()),
            "MACsec Layer, TCI: d, AN: 0, TCI details: Encryption Off, SL: 85, PN: 3735928559, \
             SCI: aaaaaaaaaaaa0000, ICV in trailer"
        );

        let plain = Macsec::new(tci_an(TciFlags::ENCRYPTED, 2), 0, 1, [0; 8]);
        assert_eq!(
            MacsecMetadata::instance().summary(&plain.to_bytes()),
            "MACsec Layer, TCI: 2, AN: 2, TCI details: Encryption On [Secure Data == User Data], \
             SL: 0, PN: 1, SCI: 0000000000000000, ICV in trailer"
        );
    }

    #[test]
    fn mut_view_edits_in_place() {
        let mut bytes = Macsec::new(0, 0, 0, [0; 8]).to_bytes();
        bytes.extend([0u8; 20]);
        let mut view = MacsecMut::from_bytes_mut(&mut bytes).unwrap();
        view.set_tci_flags(TciFlags::SCI_PRESENT);
        view.set_an(2);
        view.sci_mut()[7] = 9;
        view.icv_mut().unwrap().fill(0xcc);
        assert_eq!(view.to_owned_layer().sci(), [0, 0, 0, 0, 0, 0, 0, 9]);
        assert_eq!(bytes[0], 0x22);
        assert_eq!(&bytes[18..], &[0xcc; 16]);
    }

    proptest::proptest! {
        #[test]
        fn fields_round_trip(tci in 0u8..64, an in 0u8..4, sl: u8, pn: u32, sci: [u8; 8]) {
            let macsec = Macsec::new(tci_an(TciFlags::from_bits_truncate(tci), an), sl, pn, sci);
            proptest::prop_assert_eq!(macsec.tci(), tci);
            proptest::prop_assert_eq!(macsec.an(), an);
            proptest::prop_assert_eq!(macsec.sl(), sl);
            proptest::prop_assert_eq!(macsec.pn(), pn);
            proptest::prop_assert_eq!(macsec.sci(), sci);
        }
    }
}
