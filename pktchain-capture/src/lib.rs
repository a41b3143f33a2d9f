// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reading and writing captured frames.
//!
//! Capture sources and sinks are only touched at the edges of a workflow: frames are read into
//! [`FrameBuffer`]s, parsed and modified in memory by `pktchain`, and written back out. Any
//! failure along the way is returned as a [`CaptureError`] so that a workflow never goes on to
//! operate on a partially read frame.

#![forbid(unsafe_code)]

pub mod pcap;

use std::io;

use pcap_file::PcapError;
use pktchain_common::{FrameBuffer, LinkType};
use thiserror::Error;

pub use pcap::{PcapReader, PcapWriter};

/// A source of captured frames.
pub trait FrameReader {
    /// Reads the next frame, or returns `Ok(None)` once the source is exhausted.
    fn read_next(&mut self) -> Result<Option<FrameBuffer>, CaptureError>;

    /// The link type of every frame produced by this source.
    fn link_type(&self) -> LinkType;
}

/// A sink for captured frames.
pub trait FrameWriter {
    fn write(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError>;

    /// Flushes every frame written so far to the underlying sink.
    fn close(&mut self) -> Result<(), CaptureError>;
}

/// An error encountered while reading or writing a capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The capture file or one of its records is malformed.
    #[error("malformed capture: {0}")]
    Pcap(#[from] PcapError),
    #[error("unsupported pcap version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("capture file ended within its file header")]
    TruncatedHeader,
    /// The capture ended partway through a record.
    #[error("capture ended within a record")]
    TruncatedRecord,
    #[error("capture record of {len} bytes exceeds the limit of {limit} bytes")]
    RecordTooLarge { len: usize, limit: usize },
    #[error("frame has link type {found}, but the capture holds {expected}")]
    LinkTypeMismatch { expected: LinkType, found: LinkType },
    #[error("frame timestamp cannot be represented in the capture format")]
    TimestampOutOfRange,
}
