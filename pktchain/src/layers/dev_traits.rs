// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Traits that are only needed for developing new `Layer` types.
//!
//! A new protocol is added to the library by writing its owned, `Ref` and `Mut` types (deriving
//! [`Layer`], [`LayerRef`] and [`LayerMut`] respectively), declaring its metadata singleton
//! with `layer_metadata!` and implementing [`LayerMetadata`] on that singleton. The singleton
//! is what a [`Packet`] dispatches on when it parses, edits or summarizes a chain.
//!
//! [`Layer`]: crate::layers::traits::Layer
//! [`LayerRef`]: crate::layers::traits::LayerRef
//! [`LayerMut`]: crate::layers::traits::LayerMut
//! [`Packet`]: crate::packet::Packet

use core::{any, fmt};

use crate::layers::traits::{LayerLength, LayerObject};
use crate::registry::LayerRegistry;

/// An identifier unique to a protocol layer.
pub type LayerId = any::TypeId;

/// An object-safe base trait for protocol layers that is extended by all `Layer` trait variants.
///
/// The [`BaseLayer`] trait enables packet layers of different implementations (owned, `Ref` and
/// `Mut`) to be used interchangably for name and metadata lookups.
pub trait BaseLayer: LayerLength {
    /// The name of the layer, usually (though not guaranteed to be) the same as the name of the
    /// struct.
    ///
    /// For `Ref` and `Mut` types, this will return the name of the associated owned layer.
    fn layer_name(&self) -> &'static str;

    /// Static metadata associated with the given layer. This method is normally only used
    /// internally or when defining a custom `Layer` type.
    fn layer_metadata(&self) -> &'static dyn LayerMetadata;
}

/// Allows the name of a protocol layer to be retrieved as a string.
///
/// This trait's single associated function is effectively an object-unsafe variant of the
/// [`BaseLayer::layer_name()`] method.
pub trait LayerName {
    fn name() -> &'static str;
}

/// Assigns a unique identifier to the layer.
///
/// Each protocol layer must have the same `LayerId` returned by this trait across its owned,
/// `Ref` and `Mut` types. So, were there a protocol layer called `Example`, then
/// `Example::layer_id()` == `ExampleRef::layer_id()` == `ExampleMut::layer_id()`.
pub trait LayerIdentifier {
    fn layer_id() -> LayerId;
}

/// Methods relating to [`BaseLayer`] types that would violate the object-safety of `BaseLayer`
/// if added to it.
pub trait BaseLayerMetadata: BaseLayer {
    fn metadata() -> &'static dyn LayerMetadata;
}

/// An extension to [`any::Any`]; adds methods for retrieving a `dyn Any` reference, mutable
/// reference or box.
pub trait AsAny: any::Any {
    /// Return a `dyn Any` reference to `self`.
    fn as_any(&self) -> &dyn any::Any;

    /// Return a mutable `dyn Any` reference to `self`.
    fn as_any_mut(&mut self) -> &mut dyn any::Any;

    /// Convert a boxed `self` into a boxed `dyn Any` so it can be downcast by value.
    fn into_any(self: Box<Self>) -> Box<dyn any::Any>;
}

/// Blanket implementation of [`AsAny`] for all types capable of returning a `dyn Any` reference.
impl<T: any::Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn any::Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn any::Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn any::Any> {
        self
    }
}

/// A type with exactly one `'static` instance.
pub trait ConstSingleton {
    fn instance() -> &'static Self;
}

/// The layer of the OSI model a protocol belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OsiLayer {
    Physical,
    DataLink,
    Network,
    Transport,
    Session,
    Presentation,
    Application,
    Unknown,
}

/// What a layer may look at when recomputing its derived fields.
#[derive(Clone, Copy)]
pub struct FieldContext {
    remaining_len: usize,
    next: Option<&'static dyn LayerMetadata>,
}

impl FieldContext {
    #[inline]
    pub(crate) fn new(remaining_len: usize, next: Option<&'static dyn LayerMetadata>) -> Self {
        FieldContext {
            remaining_len,
            next,
        }
    }

    /// The number of bytes from the start of the layer to the end of its span, including its
    /// own header, every layer nested within it and any trailer it owns.
    #[inline]
    pub fn remaining_len(&self) -> usize {
        self.remaining_len
    }

    /// The metadata of the layer directly following this one in the chain, if any.
    #[inline]
    pub fn next_layer(&self) -> Option<&'static dyn LayerMetadata> {
        self.next
    }
}

impl fmt::Debug for FieldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldContext")
            .field("remaining_len", &self.remaining_len)
            .field("next", &self.next.map(|m| m.layer_name()))
            .finish()
    }
}

/// The protocol behavior of a layer, implemented on its zero-sized metadata singleton.
///
/// Every method operates on the layer's span within a packet: its own header followed by
/// everything nested inside it, and finally any trailer it owns. A `Packet` only ever hands a
/// metadata method bytes that hold at least `header_len()` bytes.
pub trait LayerMetadata: AsAny + Send + Sync {
    /// The identifier shared by the owned, `Ref` and `Mut` types of the layer.
    fn layer_id(&self) -> LayerId;

    fn layer_name(&self) -> &'static str;

    /// The size of the layer's own header, excluding nested layers and trailers.
    fn header_len(&self, bytes: &[u8]) -> usize;

    /// The number of bytes at the end of the span that belong to this layer rather than to the
    /// layer following it. Never more than the bytes left after the header.
    #[inline]
    fn trailer_len(&self, _bytes: &[u8]) -> usize {
        0
    }

    /// Decides the type of the layer following this one, or `None` when the chain ends here.
    ///
    /// The following layer spans the bytes between the end of `header_len()` and the start of
    /// `trailer_len()`; a chain that ends early because too few bytes remain is not an error.
    fn parse_next_layer(
        &self,
        bytes: &[u8],
        registry: &LayerRegistry,
    ) -> Option<&'static dyn LayerMetadata>;

    /// Recomputes fields whose value depends on the rest of the frame.
    #[inline]
    fn compute_calculate_fields(&self, _bytes: &mut [u8], _ctx: &FieldContext) {}

    /// The EtherType that announces this layer within an Ethernet header, if it has one.
    #[inline]
    fn ether_type(&self) -> Option<u16> {
        None
    }

    #[inline]
    fn osi_layer(&self) -> OsiLayer {
        OsiLayer::Unknown
    }

    /// A single-line diagnostic summary of the layer.
    fn summary(&self, bytes: &[u8]) -> String;

    /// Copies the layer's header out into a standalone owned layer.
    fn to_boxed_layer(&self, header: &[u8]) -> Box<dyn LayerObject>;
}
