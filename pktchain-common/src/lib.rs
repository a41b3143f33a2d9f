// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Building blocks shared between the `pktchain` layer engine and its capture adapters.
//!
//! [`FrameBuffer`] is the single contiguous byte buffer a packet's layers are overlaid on, and
//! [`fields`] contains the small bit-packing and byte-order helpers that protocol layers use to
//! read and write their fixed-width fields in place.

#![forbid(unsafe_code)]

mod buffer;
pub mod fields;

pub use buffer::{FrameBuffer, LinkType};
