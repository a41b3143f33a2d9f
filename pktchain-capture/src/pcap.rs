// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The classic libpcap capture file format.
//!
//! File and record headers are handled by the `pcap-file` crate. Both byte orders are accepted on
//! read, along with microsecond and nanosecond timestamp resolutions. Files are always written
//! little-endian with microsecond timestamps.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use pcap_file::pcap::{PcapHeader, PcapPacket};
use pcap_file::{DataLink, Endianness, PcapError, TsResolution};
use pktchain_common::{FrameBuffer, LinkType};
use tracing::{debug, trace};

use crate::{CaptureError, FrameReader, FrameWriter};

const VERSION_MAJOR: u16 = 2;

/// The default snapshot length used by tcpdump since 4.9.
pub const DEFAULT_SNAPLEN: u32 = 262_144;

/// Reads frames from a pcap capture.
pub struct PcapReader<R: Read> {
    inner: pcap_file::pcap::PcapReader<R>,
    link_type: LinkType,
    snaplen: u32,
}

impl PcapReader<BufReader<File>> {
    /// Opens the capture file at `path` and reads its file header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening pcap file for reading");
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read> PcapReader<R> {
    /// Reads the file header of a capture from `reader`.
    pub fn new(reader: R) -> Result<Self, CaptureError> {
        let inner = pcap_file::pcap::PcapReader::new(reader).map_err(|e| match e {
            PcapError::IncompleteBuffer => CaptureError::TruncatedHeader,
            e => CaptureError::from(e),
        })?;

        let header = inner.header();
        if header.version_major != VERSION_MAJOR {
            return Err(CaptureError::UnsupportedVersion {
                major: header.version_major,
                minor: header.version_minor,
            });
        }

        let link_type = LinkType(u32::from(header.datalink));
        let snaplen = header.snaplen;
        debug!(
            endianness = ?header.endianness,
            resolution = ?header.ts_resolution,
            snaplen,
            %link_type,
            "read pcap file header"
        );

        Ok(PcapReader {
            inner,
            link_type,
            snaplen,
        })
    }

    /// The snapshot length declared in the file header.
    #[inline]
    pub fn snaplen(&self) -> u32 {
        self.snaplen
    }

    #[inline]
    pub fn into_inner(self) -> R {
        self.inner.into_reader()
    }
}

impl<R: Read> FrameReader for PcapReader<R> {
    fn read_next(&mut self) -> Result<Option<FrameBuffer>, CaptureError> {
        let packet = match self.inner.next_packet() {
            None => return Ok(None),
            Some(Ok(packet)) => packet,
            Some(Err(PcapError::IncompleteBuffer)) => return Err(CaptureError::TruncatedRecord),
            Some(Err(e)) => return Err(e.into()),
        };

        let orig_len = packet.orig_len as usize;
        let data = packet.data.into_owned();
        trace!(incl_len = data.len(), orig_len, "read pcap record");
        Ok(Some(FrameBuffer::from_vec(
            data,
            self.link_type,
            packet.timestamp,
            orig_len,
        )))
    }

    #[inline]
    fn link_type(&self) -> LinkType {
        self.link_type
    }
}

impl<R: Read> Iterator for PcapReader<R> {
    type Item = Result<FrameBuffer, CaptureError>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

impl<R: Read> fmt::Debug for PcapReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcapReader")
            .field("link_type", &self.link_type)
            .field("snaplen", &self.snaplen)
            .finish()
    }
}

/// Writes frames to a little-endian, microsecond-resolution pcap capture.
pub struct PcapWriter<W: Write> {
    inner: pcap_file::pcap::PcapWriter<W>,
    link_type: LinkType,
    snaplen: u32,
}

impl PcapWriter<BufWriter<File>> {
    /// Creates (or truncates) the capture file at `path` and writes its file header.
    pub fn create<P: AsRef<Path>>(path: P, link_type: LinkType) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        debug!(path = %path.display(), %link_type, "creating pcap file");
        Self::new(BufWriter::new(File::create(path)?), link_type)
    }
}

impl<W: Write> PcapWriter<W> {
    /// Writes a capture file header for frames of `link_type` to `writer`.
    pub fn new(writer: W, link_type: LinkType) -> Result<Self, CaptureError> {
        Self::with_snaplen(writer, link_type, DEFAULT_SNAPLEN)
    }

    /// Like [`new()`](PcapWriter::new), but records longer than `snaplen` are truncated to it.
    pub fn with_snaplen(writer: W, link_type: LinkType, snaplen: u32) -> Result<Self, CaptureError> {
        let header = PcapHeader {
            snaplen,
            datalink: DataLink::from(link_type.value()),
            ts_resolution: TsResolution::MicroSecond,
            endianness: Endianness::Little,
            ..Default::default()
        };

        Ok(PcapWriter {
            inner: pcap_file::pcap::PcapWriter::with_header(writer, header)?,
            link_type,
            snaplen,
        })
    }

    #[inline]
    pub fn into_inner(self) -> W {
        self.inner.into_writer()
    }
}

impl<W: Write> FrameWriter for PcapWriter<W> {
    fn write(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError> {
        if frame.link_type() != self.link_type {
            return Err(CaptureError::LinkTypeMismatch {
                expected: self.link_type,
                found: frame.link_type(),
            });
        }

        let timestamp = frame.timestamp();
        if u32::try_from(timestamp.as_secs()).is_err() {
            return Err(CaptureError::TimestampOutOfRange);
        }

        let data = frame.as_slice();
        let incl_len = data.len().min(self.snaplen as usize);
        let orig_len = u32::try_from(frame.orig_len().max(data.len())).map_err(|_| {
            CaptureError::RecordTooLarge {
                len: frame.orig_len(),
                limit: u32::MAX as usize,
            }
        })?;

        self.inner
            .write_packet(&PcapPacket::new(timestamp, orig_len, &data[..incl_len]))?;
        trace!(incl_len, orig_len, "wrote pcap record");
        Ok(())
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        self.inner.get_mut().flush()?;
        debug!("flushed pcap writer");
        Ok(())
    }
}

impl<W: Write> fmt::Debug for PcapWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcapWriter")
            .field("link_type", &self.link_type)
            .field("snaplen", &self.snaplen)
            .finish()
    }
}
