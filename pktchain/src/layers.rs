// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The collection of protocol layers implemented by this library.
//!
//! The `Layer` type is a fundamental abstraction used in this library for data. Most
//! communication protocols make use of multiple encapsulated layers of data, where each layer
//! performs a distinct purpose in relaying information from one peer to another. Each layer can
//! be generalized into a header, a payload (the next layer) and occasionally a trailer that
//! follows the payload.
//!
//! Tightly related layers are each within their own modules: Ethernet lives in [`l2`], the
//! MACsec security tag in [`macsec`]. The [`traits`] module contains the traits implemented
//! across all layers and [`dev_traits`] those only needed to write a new one.

pub mod dev_traits;
pub mod l2;
pub mod macsec;
pub mod traits;

use core::fmt;

use pktchain_macros::{layer_metadata, Layer, LayerMut, LayerRef};

use crate::error::*;
use crate::layers::dev_traits::*;
use crate::layers::traits::*;
use crate::registry::LayerRegistry;

layer_metadata!(RawMetadata);

impl LayerMetadata for RawMetadata {
    #[inline]
    fn layer_id(&self) -> LayerId {
        Raw::layer_id()
    }

    #[inline]
    fn layer_name(&self) -> &'static str {
        Raw::name()
    }

    #[inline]
    fn header_len(&self, bytes: &[u8]) -> usize {
        bytes.len()
    }

    #[inline]
    fn parse_next_layer(
        &self,
        _bytes: &[u8],
        _registry: &LayerRegistry,
    ) -> Option<&'static dyn LayerMetadata> {
        None
    }

    #[inline]
    fn osi_layer(&self) -> OsiLayer {
        OsiLayer::Application
    }

    fn summary(&self, bytes: &[u8]) -> String {
        RawRef::from_bytes_unchecked(bytes).to_string()
    }

    fn to_boxed_layer(&self, header: &[u8]) -> Box<dyn LayerObject> {
        Box::new(Raw::from_bytes_current_layer_unchecked(header))
    }
}

/// A raw [`Layer`] composed of unstructured bytes.
///
/// This type is used when inner layers cannot be inferred or interpreted automatically, or when
/// payload data is literally meant to be interpreted as an opaque array of bytes. A `Raw` layer
/// does not necessarily indicate the presence of only one protocol in its contained bytes; an
/// encrypted MACsec payload, for instance, is always decoded as `Raw` even though it carries a
/// whole network-layer packet.
///
/// The header of a `Raw` layer is its entire contents, so its length is fixed once it is
/// attached to a packet.
#[derive(Clone, Debug, Layer)]
#[metadata_type(RawMetadata)]
#[ref_type(RawRef)]
pub struct Raw {
    #[data_field]
    data: Vec<u8>,
}

impl Raw {
    /// Creates a `Raw` layer holding a copy of `data`.
    #[inline]
    pub fn new(data: &[u8]) -> Self {
        Raw {
            data: Vec::from(data),
        }
    }

    /// The entire contents of the `Raw` layer.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The entire contents of the `Raw` layer, mutably.
    #[inline]
    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}

impl From<Vec<u8>> for Raw {
    #[inline]
    fn from(data: Vec<u8>) -> Self {
        Raw { data }
    }
}

impl FromBytesCurrent for Raw {
    #[inline]
    fn from_bytes_current_layer_unchecked(bytes: &[u8]) -> Self {
        Raw::new(bytes)
    }
}

/// A reference to a raw [`Layer`] composed of unstructured bytes.
#[derive(Clone, Copy, Debug, LayerRef)]
#[owned_type(Raw)]
#[metadata_type(RawMetadata)]
pub struct RawRef<'a> {
    #[data_field]
    data: &'a [u8],
}

impl<'a> RawRef<'a> {
    /// The entire contents of the `Raw` layer.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

impl<'a> FromBytesRef<'a> for RawRef<'a> {
    #[inline]
    fn from_bytes_unchecked(bytes: &'a [u8]) -> Self {
        RawRef { data: bytes }
    }
}

impl Validate for RawRef<'_> {
    #[inline]
    fn validate_current_layer(_curr_layer: &[u8]) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl fmt::Display for RawRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload Layer, Data length: {} [Bytes]", self.data.len())
    }
}

/// A mutable reference to a raw [`Layer`] composed of unstructured bytes.
#[derive(Debug, LayerMut)]
#[owned_type(Raw)]
#[metadata_type(RawMetadata)]
#[ref_type(RawRef)]
pub struct RawMut<'a> {
    #[data_field]
    data: &'a mut [u8],
}

impl<'a> FromBytesMut<'a> for RawMut<'a> {
    #[inline]
    fn from_bytes_mut_unchecked(bytes: &'a mut [u8]) -> Self {
        RawMut { data: bytes }
    }
}
