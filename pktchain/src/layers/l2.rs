// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Ethernet and associated link-layer protocols.
//!
//! The EtherType of an [`Ether`] header selects its payload layer through the
//! [`LayerRegistry`](crate::registry::LayerRegistry).

use core::fmt;

use pktchain_common::fields;
use pktchain_macros::{layer_metadata, Layer, LayerMut, LayerRef};

use crate::error::*;
use crate::layers::dev_traits::*;
use crate::layers::traits::*;
use crate::registry::LayerRegistry;

/// The length of an Ethernet II header.
pub const ETH_HEADER_LEN: usize = 14;

pub const ETH_PROTOCOL_IP: u16 = 0x0800;
pub const ETH_PROTOCOL_ARP: u16 = 0x0806;
pub const ETH_PROTOCOL_VLAN: u16 = 0x8100;
pub const ETH_PROTOCOL_IPV6: u16 = 0x86DD;
pub const ETH_PROTOCOL_EXPERIMENTAL: u16 = 0x88B5;
/// Announces an IEEE 802.1AE (MACsec) security tag.
pub const ETH_PROTOCOL_MACSEC: u16 = 0x88E5;

layer_metadata!(EtherMetadata);

impl LayerMetadata for EtherMetadata {
    #[inline]
    fn layer_id(&self) -> LayerId {
        Ether::layer_id()
    }

    #[inline]
    fn layer_name(&self) -> &'static str {
        Ether::name()
    }

    #[inline]
    fn header_len(&self, _bytes: &[u8]) -> usize {
        ETH_HEADER_LEN
    }

    fn parse_next_layer(
        &self,
        bytes: &[u8],
        registry: &LayerRegistry,
    ) -> Option<&'static dyn LayerMetadata> {
        if bytes.len() <= ETH_HEADER_LEN {
            return None;
        }

        Some(registry.ether_payload(EtherRef::from_bytes_unchecked(bytes).eth_type()))
    }

    fn compute_calculate_fields(&self, bytes: &mut [u8], ctx: &FieldContext) {
        // Layers without a registered EtherType (e.g. `Raw`) keep whatever the header holds.
        if let Some(eth_type) = ctx.next_layer().and_then(|next| next.ether_type()) {
            EtherMut::from_bytes_mut_unchecked(bytes).set_eth_type(eth_type);
        }
    }

    #[inline]
    fn osi_layer(&self) -> OsiLayer {
        OsiLayer::DataLink
    }

    fn summary(&self, bytes: &[u8]) -> String {
        EtherRef::from_bytes_unchecked(bytes).to_string()
    }

    fn to_boxed_layer(&self, header: &[u8]) -> Box<dyn LayerObject> {
        Box::new(Ether::from_bytes_current_layer_unchecked(header))
    }
}

/// A basic Ethernet II frame header.
///
/// An Ethernet II header consists of destination and source MAC addresses followed by an Ether
/// Type that identifies the payload. Note that `Ether` does not include any 802.1Q VLAN tags
/// within the header or a frame check sequence at the end of the payload.
#[derive(Clone, Debug, Layer)]
#[metadata_type(EtherMetadata)]
#[ref_type(EtherRef)]
pub struct Ether {
    #[data_field]
    data: [u8; ETH_HEADER_LEN],
}

impl Ether {
    /// Creates a standalone Ethernet header.
    pub fn new(src: [u8; 6], dst: [u8; 6], eth_type: u16) -> Self {
        let mut ether = Ether {
            data: [0; ETH_HEADER_LEN],
        };
        let mut view = ether.view_mut();
        view.set_src_mac(src);
        view.set_dst_mac(dst);
        view.set_eth_type(eth_type);
        ether
    }

    #[inline]
    fn view(&self) -> EtherRef<'_> {
        EtherRef::from_bytes_unchecked(&self.data)
    }

    #[inline]
    fn view_mut(&mut self) -> EtherMut<'_> {
        EtherMut::from_bytes_mut_unchecked(&mut self.data)
    }

    /// The source MAC address contained within the Ethernet frame.
    #[inline]
    pub fn src_mac(&self) -> [u8; 6] {
        self.view().src_mac()
    }

    #[inline]
    pub fn set_src_mac(&mut self, mac: [u8; 6]) {
        self.view_mut().set_src_mac(mac)
    }

    /// The destination MAC address contained within the Ethernet frame.
    #[inline]
    pub fn dst_mac(&self) -> [u8; 6] {
        self.view().dst_mac()
    }

    #[inline]
    pub fn set_dst_mac(&mut self, mac: [u8; 6]) {
        self.view_mut().set_dst_mac(mac)
    }

    /// The Ether Type contained within the Ethernet frame.
    ///
    /// This field determines the type and structure of the Ethernet's payload.
    #[inline]
    pub fn eth_type(&self) -> u16 {
        self.view().eth_type()
    }

    #[inline]
    pub fn set_eth_type(&mut self, eth_type: u16) {
        self.view_mut().set_eth_type(eth_type)
    }
}

impl FromBytesCurrent for Ether {
    #[inline]
    fn from_bytes_current_layer_unchecked(bytes: &[u8]) -> Self {
        Ether {
            data: fields::to_array(bytes, 0).expect("insufficient bytes in Ether header"),
        }
    }
}

/// A reference to an Ethernet II frame.
#[derive(Copy, Clone, Debug, LayerRef)]
#[owned_type(Ether)]
#[metadata_type(EtherMetadata)]
pub struct EtherRef<'a> {
    #[data_field]
    data: &'a [u8],
}

impl<'a> EtherRef<'a> {
    /// The destination MAC address contained within the Ethernet frame.
    #[inline]
    pub fn dst_mac(&self) -> [u8; 6] {
        fields::to_array(self.data, 0).expect("insufficient bytes in EtherRef to retrieve destination MAC")
    }

    /// The source MAC address contained within the Ethernet frame.
    #[inline]
    pub fn src_mac(&self) -> [u8; 6] {
        fields::to_array(self.data, 6).expect("insufficient bytes in EtherRef to retrieve source MAC")
    }

    /// The Ether Type contained within the Ethernet frame.
    #[inline]
    pub fn eth_type(&self) -> u16 {
        fields::read_be_u16(self.data, 12).expect("insufficient bytes in EtherRef to retrieve Ether Type")
    }

    /// The payload bytes of the Ethernet frame.
    #[inline]
    pub fn payload_raw(&self) -> &'a [u8] {
        self.data.get(ETH_HEADER_LEN..).unwrap_or(&[])
    }
}

impl<'a> FromBytesRef<'a> for EtherRef<'a> {
    #[inline]
    fn from_bytes_unchecked(bytes: &'a [u8]) -> Self {
        EtherRef { data: bytes }
    }
}

impl Validate for EtherRef<'_> {
    #[inline]
    fn validate_current_layer(curr_layer: &[u8]) -> Result<(), ValidationError> {
        check_header_len(Ether::name(), curr_layer, ETH_HEADER_LEN)
    }
}

impl fmt::Display for EtherRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ethernet II Layer, Src: {}, Dst: {}, Type: {:#06x}",
            MacDisplay(&self.src_mac()),
            MacDisplay(&self.dst_mac()),
            self.eth_type()
        )
    }
}

/// A mutable reference to an Ethernet II frame.
#[derive(Debug, LayerMut)]
#[owned_type(Ether)]
#[metadata_type(EtherMetadata)]
#[ref_type(EtherRef)]
pub struct EtherMut<'a> {
    #[data_field]
    data: &'a mut [u8],
}

impl<'a> EtherMut<'a> {
    #[inline]
    pub fn dst_mac(&self) -> [u8; 6] {
        self.as_ref_layer().dst_mac()
    }

    #[inline]
    pub fn set_dst_mac(&mut self, mac: [u8; 6]) {
        *fields::get_mut_array(self.data, 0).expect("insufficient bytes in EtherMut to set destination MAC") = mac;
    }

    #[inline]
    pub fn src_mac(&self) -> [u8; 6] {
        self.as_ref_layer().src_mac()
    }

    #[inline]
    pub fn set_src_mac(&mut self, mac: [u8; 6]) {
        *fields::get_mut_array(self.data, 6).expect("insufficient bytes in EtherMut to set source MAC") = mac;
    }

    #[inline]
    pub fn eth_type(&self) -> u16 {
        self.as_ref_layer().eth_type()
    }

    #[inline]
    pub fn set_eth_type(&mut self, eth_type: u16) {
        fields::write_be_u16(self.data, 12, eth_type).expect("insufficient bytes in EtherMut to set Ether Type");
    }
}

impl<'a> FromBytesMut<'a> for EtherMut<'a> {
    #[inline]
    fn from_bytes_mut_unchecked(bytes: &'a mut [u8]) -> Self {
        EtherMut { data: bytes }
    }
}

/// Formats a MAC address as colon-separated lowercase hex.
pub struct MacDisplay<'a>(pub &'a [u8; 6]);

impl fmt::Display for MacDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = *self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}
