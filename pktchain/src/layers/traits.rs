// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Traits used to provide [`Layer`] functionality.
//!
//! A protocol is exposed through three types. The owned [`Layer`] type holds a freshly
//! allocated copy of its header and is what gets attached to a [`Packet`]. The [`LayerRef`] and
//! [`LayerMut`] types are zero-copy views into a packet's buffer, handed out by the packet for
//! as long as it is borrowed.
//!
//! [`Packet`]: crate::packet::Packet

use core::fmt;

use super::dev_traits::*;
use crate::error::*;

// =============================================================================
//                       User-Facing Traits (for `Layer`)
// =============================================================================

/// A trait for retrieving the current length (in bytes) of a protocol layer.
pub trait LayerLength {
    /// The length (in bytes) of the layer.
    ///
    /// For an owned [`Layer`] this is the length of its header. For a [`LayerRef`] or
    /// [`LayerMut`] this is the length of the layer's whole span within the packet: its header,
    /// every layer nested within it and its trailer.
    fn len(&self) -> usize;
}

/// An object-safe subtrait of [`Layer`], suitable for internal operations involving layers of
/// differing types.
pub trait LayerObject: AsAny + BaseLayer + fmt::Debug {
    /// The bytes copied into a packet's buffer when the layer is attached.
    fn header_bytes(&self) -> &[u8];

    /// Clone the given instance in a [`Box`] and return it as a `dyn LayerObject` type.
    fn to_boxed_layer(&self) -> Box<dyn LayerObject>;
}

impl Clone for Box<dyn LayerObject> {
    #[inline]
    fn clone(&self) -> Self {
        self.as_ref().to_boxed_layer()
    }
}

/// A standalone protocol layer owning its own header bytes.
pub trait Layer:
    LayerObject + LayerName + LayerIdentifier + BaseLayerMetadata + FromBytesCurrent + Clone
{
    /// The serialized header of the layer.
    #[inline]
    fn to_bytes(&self) -> Vec<u8> {
        self.header_bytes().to_vec()
    }
}

/// A zero-copy, read-only view of a layer within a packet.
pub trait LayerRef<'a>:
    BaseLayer + LayerName + LayerIdentifier + FromBytesRef<'a> + Copy + Into<&'a [u8]>
{
    type Owned: Layer;

    /// Copies the layer's header into a standalone owned layer.
    fn to_owned_layer(&self) -> Self::Owned;
}

/// A zero-copy, mutable view of a layer within a packet.
///
/// Setters on these views write directly into the packet's buffer. Every field is fixed width,
/// so no setter ever changes the length of the packet.
pub trait LayerMut<'a>: BaseLayer + LayerName + LayerIdentifier + FromBytesMut<'a> {
    type Owned: Layer;

    /// Copies the layer's header into a standalone owned layer.
    fn to_owned_layer(&self) -> Self::Owned;
}

/// Checks that a byte slice can hold a layer.
pub trait Validate {
    /// Checks the current layer's header for well-formedness without looking at its payload.
    fn validate_current_layer(curr_layer: &[u8]) -> Result<(), ValidationError>;
}

/// A trait for building an owned layer out of the header at the start of a byte slice.
pub trait FromBytesCurrent: Sized + Validate {
    /// Validates `bytes`, then copies the layer's header out of them.
    #[inline]
    fn from_bytes_current_layer(bytes: &[u8]) -> Result<Self, ValidationError> {
        Self::validate_current_layer(bytes)?;
        Ok(Self::from_bytes_current_layer_unchecked(bytes))
    }

    /// Copies the layer's header out of `bytes` without checking them.
    ///
    /// # Panics
    ///
    /// May panic if `bytes` is shorter than the layer's header.
    fn from_bytes_current_layer_unchecked(bytes: &[u8]) -> Self;
}

/// A trait for wrapping a byte slice in a read-only layer view.
pub trait FromBytesRef<'a>: Sized + Validate {
    /// Validates `bytes`, then wraps them.
    #[inline]
    fn from_bytes(bytes: &'a [u8]) -> Result<Self, ValidationError> {
        Self::validate_current_layer(bytes)?;
        Ok(Self::from_bytes_unchecked(bytes))
    }

    /// Wraps `bytes` without decoding or validating them.
    ///
    /// The caller guarantees `bytes` holds at least the layer's header; field accessors panic
    /// otherwise.
    fn from_bytes_unchecked(bytes: &'a [u8]) -> Self;
}

/// A trait for wrapping a mutable byte slice in a mutable layer view.
pub trait FromBytesMut<'a>: Sized + Validate {
    /// Validates `bytes`, then wraps them.
    #[inline]
    fn from_bytes_mut(bytes: &'a mut [u8]) -> Result<Self, ValidationError> {
        Self::validate_current_layer(bytes)?;
        Ok(Self::from_bytes_mut_unchecked(bytes))
    }

    /// Wraps `bytes` without decoding or validating them.
    ///
    /// The caller guarantees `bytes` holds at least the layer's header; field accessors panic
    /// otherwise.
    fn from_bytes_mut_unchecked(bytes: &'a mut [u8]) -> Self;
}

/// Returns `Err` naming `layer` if `bytes` is shorter than `header_len`.
#[inline]
pub(crate) fn check_header_len(
    layer: &'static str,
    bytes: &[u8],
    header_len: usize,
) -> Result<(), ValidationError> {
    if bytes.len() < header_len {
        Err(ValidationError {
            layer,
            class: ValidationErrorClass::InsufficientBytes,
            reason: "insufficient bytes for layer header fields",
        })
    } else {
        Ok(())
    }
}
