use crate::error::{BmpError, BmpResult};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

//===========================================================================//

/// A bounds-checked view over an immutable input buffer.
///
/// Every read names an absolute offset; a read that would extend past the
/// end of the buffer fails with [`BmpError::OutOfBounds`] instead of
/// panicking.
#[derive(Clone, Copy, Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    /// Creates a reader over the given bytes.
    pub fn new(data: &'a [u8]) -> ByteReader<'a> {
        ByteReader { data }
    }

    /// Returns the length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the whole underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns true if `len` bytes starting at `offset` lie inside the
    /// buffer.
    pub fn contains(&self, offset: usize, len: usize) -> bool {
        match offset.checked_add(len) {
            Some(end) => end <= self.data.len(),
            None => false,
        }
    }

    /// Returns a borrowed view of `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> BmpResult<&'a [u8]> {
        if !self.contains(offset, len) {
            return Err(BmpError::OutOfBounds {
                offset,
                len,
                available: self.data.len(),
            });
        }
        Ok(&self.data[offset..offset + len])
    }

    /// Reads a byte.
    pub fn read_u8(&self, offset: usize) -> BmpResult<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16_le(&self, offset: usize) -> BmpResult<u16> {
        Ok(LittleEndian::read_u16(self.slice(offset, 2)?))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32_le(&self, offset: usize) -> BmpResult<u32> {
        Ok(LittleEndian::read_u32(self.slice(offset, 4)?))
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32_le(&self, offset: usize) -> BmpResult<i32> {
        Ok(LittleEndian::read_i32(self.slice(offset, 4)?))
    }

    /// Reads a big-endian `u16`, as stored in PNG chunks.
    pub fn read_u16_be(&self, offset: usize) -> BmpResult<u16> {
        Ok(BigEndian::read_u16(self.slice(offset, 2)?))
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32_be(&self, offset: usize) -> BmpResult<u32> {
        Ok(BigEndian::read_u32(self.slice(offset, 4)?))
    }
}

//===========================================================================//


//===========================================================================//
