// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for building, decoding and modifying layered network frames.
//!
//! A frame is held by a [`Packet`](packet::Packet) as one contiguous buffer with a chain of typed
//! protocol layers overlaid on it. Layers can be parsed out of captured bytes, built standalone
//! and attached, edited in place through zero-copy views, and removed again.

#![forbid(unsafe_code)]
#![allow(clippy::len_without_is_empty)]

pub mod error;
pub mod layers;
pub mod packet;
pub mod prelude;
pub mod registry;

pub use pktchain_common::{fields, FrameBuffer, LinkType};
