// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Wire field helpers
//!
//! Helpers for reading and writing fixed-width protocol fields in place. Multi-byte integers on
//! the wire are big-endian; every accessor here converts to and from host order so that layer
//! code never handles raw byte order itself.

/// Copies `T` bytes starting at `start` into an array.
#[inline]
pub fn to_array<const T: usize>(bytes: &[u8], start: usize) -> Option<[u8; T]> {
    Some(*get_array(bytes, start)?)
}

/// Borrows `T` bytes starting at `start` as an array reference.
#[inline]
pub fn get_array<const T: usize>(bytes: &[u8], start: usize) -> Option<&[u8; T]> {
    bytes.get(start..start.checked_add(T)?)?.try_into().ok()
}

/// Mutably borrows `T` bytes starting at `start` as an array reference.
#[inline]
pub fn get_mut_array<const T: usize>(bytes: &mut [u8], start: usize) -> Option<&mut [u8; T]> {
    bytes.get_mut(start..start.checked_add(T)?)?.try_into().ok()
}

/// Reads a big-endian `u16` at `start`.
#[inline]
pub fn read_be_u16(bytes: &[u8], start: usize) -> Option<u16> {
    to_array(bytes, start).map(u16::from_be_bytes)
}

/// Reads a big-endian `u32` at `start`.
#[inline]
pub fn read_be_u32(bytes: &[u8], start: usize) -> Option<u32> {
    to_array(bytes, start).map(u32::from_be_bytes)
}

/// Writes `value` as a big-endian `u16` at `start`, returning `None` if the field is out of range.
#[inline]
pub fn write_be_u16(bytes: &mut [u8], start: usize, value: u16) -> Option<()> {
    *get_mut_array(bytes, start)? = value.to_be_bytes();
    Some(())
}

/// Writes `value` as a big-endian `u32` at `start`, returning `None` if the field is out of range.
#[inline]
pub fn write_be_u32(bytes: &mut [u8], start: usize, value: u32) -> Option<()> {
    *get_mut_array(bytes, start)? = value.to_be_bytes();
    Some(())
}

/// A run of `width` bits within a single byte, `shift` bits up from the least significant bit.
///
/// For example, the upper six bits of a byte are `BitField::new(2, 6)` and the lower two bits are
/// `BitField::new(0, 2)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitField {
    shift: u8,
    width: u8,
}

impl BitField {
    /// # Panics
    ///
    /// Panics (at compile time when used in a `const`) if the field does not fit within a byte.
    #[inline]
    pub const fn new(shift: u8, width: u8) -> Self {
        assert!(width > 0 && shift + width <= 8, "BitField must fit within one byte");
        BitField { shift, width }
    }

    /// The mask of the field's value, before shifting.
    #[inline]
    pub const fn value_mask(&self) -> u8 {
        (((1u16 << self.width) - 1) & 0xFF) as u8
    }

    /// The mask of the field's bits in place within the byte.
    #[inline]
    pub const fn mask(&self) -> u8 {
        self.value_mask() << self.shift
    }

    /// Extracts the field's value from `byte`.
    #[inline]
    pub const fn get(&self, byte: u8) -> u8 {
        (byte & self.mask()) >> self.shift
    }

    /// Stores `value` into the field's bits of `byte`. `value` is masked to the field's width and
    /// all bits outside the field are left untouched.
    #[inline]
    pub fn set(&self, byte: &mut u8, value: u8) {
        *byte = (*byte & !self.mask()) | ((value & self.value_mask()) << self.shift);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIGH6: BitField = BitField::new(2, 6);
    const LOW2: BitField = BitField::new(0, 2);

    #[test]
    fn bitfield_masks() {
        assert_eq!(HIGH6.mask(), 0b1111_1100);
        assert_eq!(LOW2.mask(), 0b0000_0011);
        assert_eq!(BitField::new(0, 8).mask(), 0xFF);
    }

    #[test]
    fn bitfield_set_leaves_neighbours() {
        let mut byte = 0b1010_1001;
        LOW2.set(&mut byte, 0xFF);
        assert_eq!(byte, 0b1010_1011);
        HIGH6.set(&mut byte, 0);
        assert_eq!(byte, 0b0000_0011);
        assert_eq!(LOW2.get(byte), 3);
    }

    #[test]
    fn big_endian_fields() {
        let mut bytes = [0u8; 6];
        write_be_u32(&mut bytes, 2, 1).unwrap();
        assert_eq!(bytes, [0, 0, 0, 0, 0, 1]);
        assert_eq!(read_be_u32(&bytes, 2), Some(1));
        write_be_u16(&mut bytes, 0, 0x88E5).unwrap();
        assert_eq!(&bytes[..2], &[0x88, 0xE5]);
        assert_eq!(read_be_u16(&bytes, 0), Some(0x88E5));
    }

    #[test]
    fn out_of_range_fields() {
        let mut bytes = [0u8; 3];
        assert_eq!(read_be_u32(&bytes, 0), None);
        assert_eq!(write_be_u16(&mut bytes, 2, 7), None);
        assert_eq!(get_array::<2>(&bytes, usize::MAX), None);
    }

    proptest::proptest! {
        #[test]
        fn bitfield_round_trip(shift in 0u8..8, value: u8, byte: u8) {
            let field = BitField::new(shift, 8 - shift);
            let mut b = byte;
            field.set(&mut b, value);
            proptest::prop_assert_eq!(field.get(b), value & field.value_mask());
            proptest::prop_assert_eq!(b & !field.mask(), byte & !field.mask());
        }
    }
}
