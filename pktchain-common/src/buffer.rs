// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use core::fmt;
use core::ops::Range;
use std::time::{Duration, SystemTime};

use tracing::trace;

/// The link-layer header type of a captured frame.
///
/// Values follow the `LINKTYPE_*` registry used by pcap and pcapng files, so a `LinkType` read
/// from a capture file can be written back out unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkType(pub u32);

impl LinkType {
    /// No link-layer encapsulation (BSD loopback).
    pub const NULL: LinkType = LinkType(0);
    /// IEEE 802.3 Ethernet.
    pub const ETHERNET: LinkType = LinkType(1);
    /// Raw IPv4 or IPv6; the first nibble selects the version.
    pub const RAW: LinkType = LinkType(101);
    /// Linux "cooked" capture encapsulation.
    pub const LINUX_SLL: LinkType = LinkType(113);
    /// Linux "cooked" capture encapsulation, version 2.
    pub const LINUX_SLL2: LinkType = LinkType(276);

    /// The numeric `LINKTYPE_*` value.
    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for LinkType {
    #[inline]
    fn from(value: u32) -> Self {
        LinkType(value)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LinkType::NULL => f.write_str("NULL"),
            LinkType::ETHERNET => f.write_str("ETHERNET"),
            LinkType::RAW => f.write_str("RAW"),
            LinkType::LINUX_SLL => f.write_str("LINUX_SLL"),
            LinkType::LINUX_SLL2 => f.write_str("LINUX_SLL2"),
            LinkType(other) => write!(f, "LINKTYPE({})", other),
        }
    }
}

/// A contiguous, growable frame buffer along with its capture metadata.
///
/// The valid bytes of the frame are `as_slice()`; the buffer may hold additional spare capacity
/// so that layers can be inserted without reallocating. Removing bytes never gives capacity back.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
    timestamp: Duration,
    link_type: LinkType,
    orig_len: usize,
}

impl FrameBuffer {
    /// Creates an empty frame buffer timestamped with the current system time.
    #[inline]
    pub fn new(link_type: LinkType) -> Self {
        Self::with_capacity(0, link_type)
    }

    /// Creates an empty frame buffer able to hold `capacity` bytes without reallocating.
    pub fn with_capacity(capacity: usize, link_type: LinkType) -> Self {
        FrameBuffer {
            data: Vec::with_capacity(capacity),
            timestamp: now(),
            link_type,
            orig_len: 0,
        }
    }

    /// Wraps bytes read from a capture source.
    ///
    /// `orig_len` is the frame's length on the wire, which may exceed `data.len()` if the
    /// capture truncated it to a snapshot length.
    pub fn from_vec(data: Vec<u8>, link_type: LinkType, timestamp: Duration, orig_len: usize) -> Self {
        FrameBuffer {
            orig_len: orig_len.max(data.len()),
            data,
            timestamp,
            link_type,
        }
    }

    /// The valid bytes of the frame.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// The valid bytes of the frame, mutably. The length of the frame cannot change through
    /// this slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The number of valid bytes in the frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The number of bytes the buffer can hold before it must reallocate.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Reserves room for at least `additional` more bytes, returning `true` if the buffer had to
    /// reallocate to do so.
    pub fn reserve(&mut self, additional: usize) -> bool {
        let old_capacity = self.data.capacity();
        self.data.reserve(additional);
        let grew = self.data.capacity() != old_capacity;
        if grew {
            trace!(
                old_capacity,
                new_capacity = self.data.capacity(),
                "frame buffer reallocated"
            );
        }
        grew
    }

    /// Splices `bytes` into the frame at `pos`, shifting every byte at or after `pos` towards the
    /// end of the buffer. Returns `true` if the buffer reallocated.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is greater than the frame's length.
    pub fn insert_at(&mut self, pos: usize, bytes: &[u8]) -> bool {
        assert!(
            pos <= self.data.len(),
            "FrameBuffer insert position exceeded frame length"
        );
        let grew = self.reserve(bytes.len());
        self.data.splice(pos..pos, bytes.iter().copied());
        self.orig_len = (self.orig_len + bytes.len()).max(self.data.len());
        grew
    }

    /// Appends `bytes` to the end of the frame, returning `true` if the buffer reallocated.
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) -> bool {
        self.insert_at(self.data.len(), bytes)
    }

    /// Removes the given byte range from the frame, closing the gap. Capacity is retained.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds of the frame.
    pub fn remove_range(&mut self, range: Range<usize>) {
        let removed = range.len();
        self.data.drain(range);
        self.orig_len = self.orig_len.saturating_sub(removed).max(self.data.len());
    }

    /// Shortens the frame to `len` bytes. Has no effect if `len` is not less than the current
    /// length.
    pub fn truncate(&mut self, len: usize) {
        if len < self.data.len() {
            self.remove_range(len..self.data.len());
        }
    }

    /// The time at which the frame was captured (or created), relative to the UNIX epoch.
    #[inline]
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    #[inline]
    pub fn set_timestamp(&mut self, timestamp: Duration) {
        self.timestamp = timestamp;
    }

    /// The link-layer type of the frame's outermost header.
    #[inline]
    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    #[inline]
    pub fn set_link_type(&mut self, link_type: LinkType) {
        self.link_type = link_type;
    }

    /// The length of the frame as originally seen on the wire.
    #[inline]
    pub fn orig_len(&self) -> usize {
        self.orig_len
    }

    /// Consumes the frame buffer, returning its valid bytes.
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("len", &self.data.len())
            .field("capacity", &self.data.capacity())
            .field("timestamp", &self.timestamp)
            .field("link_type", &self.link_type)
            .field("orig_len", &self.orig_len)
            .finish()
    }
}

impl AsRef<[u8]> for FrameBuffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[inline]
fn now() -> Duration {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_shifts_suffix() {
        let mut buf = FrameBuffer::with_capacity(4, LinkType::ETHERNET);
        buf.append(&[1, 2, 5, 6]);
        let grew = buf.insert_at(2, &[3, 4]);
        assert!(grew);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(buf.orig_len(), 6);
    }

    #[test]
    fn insert_within_capacity_does_not_grow() {
        let mut buf = FrameBuffer::with_capacity(64, LinkType::ETHERNET);
        assert!(!buf.append(&[0xaa; 14]));
        assert!(!buf.append(&[0xbb; 14]));
        assert_eq!(buf.len(), 28);
    }

    #[test]
    fn remove_keeps_capacity() {
        let mut buf = FrameBuffer::with_capacity(32, LinkType::ETHERNET);
        buf.append(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let capacity = buf.capacity();
        buf.remove_range(2..5);
        assert_eq!(buf.as_slice(), &[0, 1, 5, 6, 7]);
        assert_eq!(buf.capacity(), capacity);
        assert_eq!(buf.orig_len(), 5);
    }

    #[test]
    fn from_vec_keeps_wire_length() {
        let buf = FrameBuffer::from_vec(vec![0; 60], LinkType::ETHERNET, Duration::from_secs(7), 1514);
        assert_eq!(buf.len(), 60);
        assert_eq!(buf.orig_len(), 1514);
        assert_eq!(buf.timestamp(), Duration::from_secs(7));
    }

    #[test]
    fn wire_length_tracks_splices() {
        let mut buf = FrameBuffer::from_vec(vec![0; 60], LinkType::ETHERNET, Duration::from_secs(1), 1514);
        buf.insert_at(14, &[0xaa; 14]);
        assert_eq!(buf.len(), 74);
        assert_eq!(buf.orig_len(), 1528);
        buf.remove_range(14..28);
        assert_eq!(buf.len(), 60);
        assert_eq!(buf.orig_len(), 1514);
    }

    #[test]
    fn link_type_display() {
        assert_eq!(LinkType::ETHERNET.to_string(), "ETHERNET");
        assert_eq!(LinkType(147).to_string(), "LINKTYPE(147)");
    }
}
