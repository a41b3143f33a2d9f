// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

/// A layer's bytes could not be interpreted as that layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid {layer} layer: {reason}")]
pub struct ValidationError {
    pub layer: &'static str,
    pub class: ValidationErrorClass,
    pub reason: &'static str,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValidationErrorClass {
    /// The slice is shorter than the layer's fixed header.
    InsufficientBytes,
    /// A field holds a value the layer cannot represent.
    InvalidValue,
}

/// A structural operation on a [`Packet`](crate::packet::Packet) referred to a layer that is
/// not in its chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("layer index {index} out of range for a chain of {len} layers")]
    InvalidLayerIndex { index: usize, len: usize },
}
