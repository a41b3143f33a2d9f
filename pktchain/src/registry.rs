// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Lookup tables from protocol identifiers to layer types.
//!
//! Parsing a frame needs to know which layer starts it (decided by the capture's link type) and,
//! for Ethernet, which layer an EtherType announces. Rather than each layer hard-coding its
//! neighbors, these decisions are answered by a [`LayerRegistry`]. Identifiers without an entry
//! resolve to [`Raw`], so an unrecognized protocol never stops a frame from being parsed.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use pktchain_common::LinkType;

use crate::layers::dev_traits::*;
use crate::layers::l2::{EtherMetadata, ETH_PROTOCOL_MACSEC};
use crate::layers::macsec::MacsecMetadata;
use crate::layers::RawMetadata;

#[cfg(doc)]
use crate::layers::Raw;

static GLOBAL_REGISTRY: Lazy<LayerRegistry> = Lazy::new(LayerRegistry::with_defaults);

/// Maps link types and EtherTypes to the metadata of the layer they identify.
#[derive(Clone, Default)]
pub struct LayerRegistry {
    link_types: HashMap<LinkType, &'static dyn LayerMetadata>,
    ether_types: HashMap<u16, &'static dyn LayerMetadata>,
}

impl LayerRegistry {
    /// An empty registry, in which every identifier resolves to [`Raw`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every layer this library implements.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_link_type(LinkType::ETHERNET, EtherMetadata::instance());
        registry.register_ether_type(ETH_PROTOCOL_MACSEC, MacsecMetadata::instance());
        registry
    }

    /// The process-wide registry used by [`Packet::from_buffer`](crate::packet::Packet::from_buffer).
    #[inline]
    pub fn global() -> &'static LayerRegistry {
        &GLOBAL_REGISTRY
    }

    /// Declares `metadata` as the first layer of frames captured with `link_type`.
    ///
    /// Returns the previous entry, if any.
    pub fn register_link_type(
        &mut self,
        link_type: LinkType,
        metadata: &'static dyn LayerMetadata,
    ) -> Option<&'static dyn LayerMetadata> {
        self.link_types.insert(link_type, metadata)
    }

    /// Declares `metadata` as the layer announced by `ether_type` in an Ethernet header.
    ///
    /// Returns the previous entry, if any.
    pub fn register_ether_type(
        &mut self,
        ether_type: u16,
        metadata: &'static dyn LayerMetadata,
    ) -> Option<&'static dyn LayerMetadata> {
        self.ether_types.insert(ether_type, metadata)
    }

    /// The first layer of a frame captured with `link_type`.
    #[inline]
    pub fn link_layer(&self, link_type: LinkType) -> &'static dyn LayerMetadata {
        match self.link_types.get(&link_type) {
            Some(metadata) => *metadata,
            None => RawMetadata::instance(),
        }
    }

    /// The layer following an Ethernet header carrying `ether_type`.
    #[inline]
    pub fn ether_payload(&self, ether_type: u16) -> &'static dyn LayerMetadata {
        match self.ether_types.get(&ether_type) {
            Some(metadata) => *metadata,
            None => RawMetadata::instance(),
        }
    }
}

impl fmt::Debug for LayerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerRegistry")
            .field(
                "link_types",
                &self
                    .link_types
                    .iter()
                    .map(|(k, v)| (k.value(), v.layer_name()))
                    .collect::<Vec<_>>(),
            )
            .field(
                "ether_types",
                &self
                    .ether_types
                    .iter()
                    .map(|(k, v)| (*k, v.layer_name()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::l2::Ether;
    use crate::layers::macsec::Macsec;
    use crate::layers::Raw;

    #[test]
    fn defaults() {
        let registry = LayerRegistry::global();
        assert_eq!(registry.link_layer(LinkType::ETHERNET).layer_id(), Ether::layer_id());
        assert_eq!(registry.ether_payload(0x88E5).layer_id(), Macsec::layer_id());
    }

    #[test]
    fn unknown_identifiers_resolve_to_raw() {
        let registry = LayerRegistry::new();
        assert_eq!(registry.link_layer(LinkType::ETHERNET).layer_id(), Raw::layer_id());
        assert_eq!(LayerRegistry::global().ether_payload(0x0800).layer_id(), Raw::layer_id());
        assert_eq!(LayerRegistry::global().link_layer(LinkType::RAW).layer_id(), Raw::layer_id());
    }

    #[test]
    fn registration_replaces_entries() {
        let mut registry = LayerRegistry::with_defaults();
        let previous = registry.register_ether_type(0x88E5, RawMetadata::instance());
        assert_eq!(previous.map(|m| m.layer_id()), Some(Macsec::layer_id()));
        assert_eq!(registry.ether_payload(0x88E5).layer_id(), Raw::layer_id());
    }
}
