// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A frame buffer together with the chain of layers overlaid on it.
//!
//! A [`Packet`] owns one contiguous [`FrameBuffer`] and records, for each layer in its chain, the
//! metadata of the layer's protocol and where the layer sits within the buffer. Layers are
//! nested: each one spans its own header, every layer that follows it in the chain and finally
//! any trailer it owns. The headers and trailers of all layers exactly tile the frame.
//!
//! Typed access to a layer is handed out as a `Ref` or `Mut` view borrowed from the packet, so a
//! view can never outlive a structural change (adding, inserting or removing a layer) or a
//! reallocation of the buffer:
//!
//! ```
//! use pktchain::prelude::*;
//!
//! let mut pkt = Ether::new([0xaa; 6], [0xbb; 6], 0)
//!     / Macsec::new(0x2c, 0, 1, [0; 8])
//!     / Raw::new(&[0u8; 20]);
//! pkt.compute_calculate_fields();
//!
//! let ether = pkt.layer::<EtherRef>().unwrap();
//! assert_eq!(ether.eth_type(), ETH_PROTOCOL_MACSEC);
//!
//! pkt.layer_mut::<MacsecMut>().unwrap().set_pn(2);
//! assert_eq!(pkt.layer::<MacsecRef>().unwrap().pn(), 2);
//! ```

use core::fmt;
use core::ops::{Div, DivAssign, Range};

use pktchain_common::{FrameBuffer, LinkType};
use tracing::{debug, trace};

use crate::error::PacketError;
use crate::layers::dev_traits::*;
use crate::layers::traits::*;
use crate::layers::RawMetadata;
use crate::registry::LayerRegistry;

/// Where a layer sits within its packet's buffer.
#[derive(Clone, Copy)]
struct LayerEntry {
    metadata: &'static dyn LayerMetadata,
    offset: usize,
    header_len: usize,
    /// The length of the whole span: header, nested layers and trailer.
    len: usize,
    trailer_len: usize,
}

impl LayerEntry {
    #[inline]
    fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    #[inline]
    fn header_range(&self) -> Range<usize> {
        self.offset..self.offset + self.header_len
    }

    #[inline]
    fn trailer_range(&self) -> Range<usize> {
        let end = self.offset + self.len;
        end - self.trailer_len..end
    }

    /// The bytes available to the next layer in the chain.
    #[inline]
    fn payload_range(&self) -> Range<usize> {
        let start = self.offset + self.header_len;
        let end = (self.offset + self.len - self.trailer_len).max(start);
        start..end
    }

    fn info(&self) -> LayerInfo {
        LayerInfo {
            name: self.metadata.layer_name(),
            layer_id: self.metadata.layer_id(),
            osi_layer: self.metadata.osi_layer(),
            offset: self.offset,
            header_len: self.header_len,
            len: self.len,
            trailer_len: self.trailer_len,
        }
    }
}

/// A description of one layer in a [`Packet`]'s chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerInfo {
    pub name: &'static str,
    pub layer_id: LayerId,
    pub osi_layer: OsiLayer,
    /// The position of the layer's first header byte within the frame.
    pub offset: usize,
    pub header_len: usize,
    /// The length of the layer's span, including nested layers and its trailer.
    pub len: usize,
    pub trailer_len: usize,
}

/// A frame and the chain of protocol layers that make it up.
///
/// The packet is the sole owner of both the frame's bytes and its layers. Owned layers passed to
/// [`add_layer()`](Packet::add_layer) are copied into the frame and consumed; typed views
/// returned by [`layer()`](Packet::layer) and [`layer_mut()`](Packet::layer_mut) borrow the
/// packet.
#[derive(Clone)]
pub struct Packet {
    buffer: FrameBuffer,
    chain: Vec<LayerEntry>,
}

impl Packet {
    /// Creates an empty Ethernet packet able to hold `capacity` bytes before reallocating.
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Packet {
            buffer: FrameBuffer::with_capacity(capacity, LinkType::ETHERNET),
            chain: Vec::new(),
        }
    }

    /// Creates a packet whose chain consists of `layer` alone.
    pub fn from_layer<T: Layer>(layer: T) -> Self {
        let mut packet = Packet::new(layer.len());
        packet.add_layer(layer);
        packet
    }

    /// Parses a captured frame, resolving protocols through the global [`LayerRegistry`].
    #[inline]
    pub fn from_buffer(buffer: FrameBuffer) -> Self {
        Self::from_buffer_with(buffer, LayerRegistry::global())
    }

    /// Parses a captured frame, resolving protocols through `registry`.
    ///
    /// Parsing never fails. A frame that ends before a layer's header is complete has its
    /// remaining bytes decoded as [`Raw`](crate::layers::Raw), and a layer with no bytes left
    /// for a successor simply ends the chain.
    pub fn from_buffer_with(buffer: FrameBuffer, registry: &LayerRegistry) -> Self {
        let mut packet = Packet {
            buffer,
            chain: Vec::new(),
        };
        packet.parse_chain(registry);
        debug!(
            link_type = %packet.buffer.link_type(),
            frame_len = packet.buffer.len(),
            layers = packet.chain.len(),
            "parsed frame"
        );
        packet
    }

    /// Copies `bytes` into a new frame and parses it.
    pub fn from_bytes(bytes: &[u8], link_type: LinkType) -> Self {
        let mut buffer = FrameBuffer::with_capacity(bytes.len(), link_type);
        buffer.append(bytes);
        Self::from_buffer(buffer)
    }

    fn parse_chain(&mut self, registry: &LayerRegistry) {
        let mut next = Some(registry.link_layer(self.buffer.link_type()));
        let mut range = 0..self.buffer.len();

        while let Some(mut metadata) = next {
            if range.is_empty() {
                break;
            }

            let bytes = &self.buffer.as_slice()[range.clone()];
            let mut header_len = metadata.header_len(bytes);
            if bytes.len() < header_len {
                debug!(
                    layer = metadata.layer_name(),
                    available = bytes.len(),
                    required = header_len,
                    "frame truncated within header; remaining bytes decoded as Raw"
                );
                metadata = RawMetadata::instance();
                header_len = bytes.len();
            }

            let trailer_len = metadata
                .trailer_len(bytes)
                .min(bytes.len() - header_len);
            next = metadata.parse_next_layer(bytes, registry);

            let entry = LayerEntry {
                metadata,
                offset: range.start,
                header_len,
                len: bytes.len(),
                trailer_len,
            };
            trace!(
                layer = metadata.layer_name(),
                offset = entry.offset,
                header_len,
                trailer_len,
                "decoded layer"
            );
            range = entry.payload_range();
            self.chain.push(entry);
        }
    }

    // =========================================================================
    //                               Lookup
    // =========================================================================

    fn position_of(&self, id: LayerId, n: usize) -> Option<usize> {
        self.chain
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.metadata.layer_id() == id)
            .nth(n)
            .map(|(index, _)| index)
    }

    /// The index of the first layer of type `T` in the chain.
    #[inline]
    pub fn index_of<T: LayerIdentifier>(&self) -> Option<usize> {
        self.position_of(T::layer_id(), 0)
    }

    /// A read-only view of the first layer of type `T`, or `None` if the chain has none.
    #[inline]
    pub fn layer<'a, T: LayerRef<'a>>(&'a self) -> Option<T> {
        self.nth_layer(0)
    }

    /// A read-only view of the `n`th layer (counting from 0) of type `T`.
    pub fn nth_layer<'a, T: LayerRef<'a>>(&'a self, n: usize) -> Option<T> {
        let entry = self.chain[self.position_of(T::layer_id(), n)?];
        Some(T::from_bytes_unchecked(&self.buffer.as_slice()[entry.range()]))
    }

    /// A mutable view of the first layer of type `T`, or `None` if the chain has none.
    #[inline]
    pub fn layer_mut<'a, T: LayerMut<'a>>(&'a mut self) -> Option<T> {
        self.nth_layer_mut(0)
    }

    /// A mutable view of the `n`th layer (counting from 0) of type `T`.
    pub fn nth_layer_mut<'a, T: LayerMut<'a>>(&'a mut self, n: usize) -> Option<T> {
        let entry = self.chain[self.position_of(T::layer_id(), n)?];
        Some(T::from_bytes_mut_unchecked(
            &mut self.buffer.as_mut_slice()[entry.range()],
        ))
    }

    /// Whether the chain contains a layer of type `T`.
    #[inline]
    pub fn has_layer<T: LayerIdentifier>(&self) -> bool {
        self.index_of::<T>().is_some()
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.chain.len()
    }

    /// Describes each layer of the chain, outermost first.
    pub fn layers(&self) -> impl Iterator<Item = LayerInfo> + '_ {
        self.chain.iter().map(LayerEntry::info)
    }

    /// The number of bytes covered by the layer at `index` and everything nested within it,
    /// trailers included.
    #[inline]
    pub fn remaining_length_from(&self, index: usize) -> Option<usize> {
        self.chain.get(index).map(|entry| entry.len)
    }

    // =========================================================================
    //                          Structural Mutation
    // =========================================================================

    /// Appends `layer` to the end of the chain, returning its index.
    ///
    /// The layer's header is copied into the frame directly after the header of the current
    /// innermost layer; the buffer grows if needed.
    #[inline]
    pub fn add_layer<T: Layer>(&mut self, layer: T) -> usize {
        self.splice(self.chain.len(), T::metadata(), layer.header_bytes())
    }

    /// Inserts `layer` directly after the layer at index `after`, or at the front of the chain
    /// if `after` is `None`. Returns the new layer's index.
    ///
    /// The inserted layer takes over the former successor of `after` (and everything nested
    /// within it) as its own payload.
    pub fn insert_layer<T: Layer>(
        &mut self,
        after: Option<usize>,
        layer: T,
    ) -> Result<usize, PacketError> {
        let index = match after {
            None => 0,
            Some(after) if after < self.chain.len() => after + 1,
            Some(after) => {
                return Err(PacketError::InvalidLayerIndex {
                    index: after,
                    len: self.chain.len(),
                })
            }
        };

        Ok(self.splice(index, T::metadata(), layer.header_bytes()))
    }

    fn splice(
        &mut self,
        index: usize,
        metadata: &'static dyn LayerMetadata,
        header: &[u8],
    ) -> usize {
        let (pos, region_end) = match index.checked_sub(1).map(|prev| self.chain[prev]) {
            Some(prev) => (prev.offset + prev.header_len, prev.payload_range().end),
            None => (0, self.buffer.len()),
        };

        let added = header.len();
        let reallocated = self.buffer.insert_at(pos, header);

        for outer in &mut self.chain[..index] {
            outer.len += added;
        }
        for inner in &mut self.chain[index..] {
            inner.offset += added;
        }

        self.chain.insert(
            index,
            LayerEntry {
                metadata,
                offset: pos,
                header_len: added,
                len: added + (region_end - pos),
                trailer_len: 0,
            },
        );

        debug!(
            layer = metadata.layer_name(),
            index,
            offset = pos,
            header_len = added,
            reallocated,
            "attached layer"
        );
        index
    }

    /// Removes the layer at `index` from the chain and its header and trailer bytes from the
    /// frame, returning the removed layer as an owned object.
    ///
    /// Layers nested within the removed one move up to take its place. The buffer's capacity is
    /// retained.
    pub fn remove_layer(&mut self, index: usize) -> Result<Box<dyn LayerObject>, PacketError> {
        let entry = *self.chain.get(index).ok_or(PacketError::InvalidLayerIndex {
            index,
            len: self.chain.len(),
        })?;

        let layer = entry
            .metadata
            .to_boxed_layer(&self.buffer.as_slice()[entry.header_range()]);

        // The trailer sits after the header, so it goes first to keep the header range valid.
        self.buffer.remove_range(entry.trailer_range());
        self.buffer.remove_range(entry.header_range());

        let removed = entry.header_len + entry.trailer_len;
        for outer in &mut self.chain[..index] {
            outer.len -= removed;
        }
        for inner in &mut self.chain[index + 1..] {
            inner.offset -= entry.header_len;
        }
        self.chain.remove(index);

        debug!(
            layer = entry.metadata.layer_name(),
            index,
            removed,
            "detached layer"
        );
        Ok(layer)
    }

    /// Removes the first layer of type `T` from the chain and returns it, or `None` if the
    /// chain has none.
    pub fn detach_layer<T: Layer>(&mut self) -> Option<T> {
        let index = self.index_of::<T>()?;
        let layer = self.remove_layer(index).ok()?;
        layer.into_any().downcast::<T>().ok().map(|layer| *layer)
    }

    // =========================================================================
    //                           Derived Fields
    // =========================================================================

    /// Recomputes every field whose value depends on the rest of the frame, outermost layer
    /// first.
    pub fn compute_calculate_fields(&mut self) {
        for index in 0..self.chain.len() {
            let entry = self.chain[index];
            let ctx = FieldContext::new(entry.len, self.chain.get(index + 1).map(|e| e.metadata));
            entry
                .metadata
                .compute_calculate_fields(&mut self.buffer.as_mut_slice()[entry.range()], &ctx);
        }
    }

    // =========================================================================
    //                              Accessors
    // =========================================================================

    /// The serialized frame.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.as_slice().to_vec()
    }

    /// The frame buffer along with its capture metadata.
    #[inline]
    pub fn frame(&self) -> &FrameBuffer {
        &self.buffer
    }

    #[inline]
    pub fn into_frame(self) -> FrameBuffer {
        self.buffer
    }

    #[inline]
    pub fn link_type(&self) -> LinkType {
        self.buffer.link_type()
    }
}

impl<T: Layer> Div<T> for Packet {
    type Output = Packet;

    #[inline]
    fn div(mut self, rhs: T) -> Self::Output {
        self.add_layer(rhs);
        self
    }
}

impl<T: Layer> DivAssign<T> for Packet {
    #[inline]
    fn div_assign(&mut self, rhs: T) {
        self.add_layer(rhs);
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.chain {
            writeln!(
                f,
                "{}",
                entry.metadata.summary(&self.buffer.as_slice()[entry.range()])
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("frame", &self.buffer)
            .field("layers", &self.layers().collect::<Vec<_>>())
            .finish()
    }
}
