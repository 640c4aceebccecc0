//! Binary reader for sequential parsing of byte slices.
//!
//! This module provides [`BinaryReader`], a cursor-like type that reads
//! little-endian values from a byte slice strictly in order.

use zerocopy::FromBytes;

use crate::{Charset, Error, Result};

/// A forward-only little-endian reader over a byte slice.
///
/// The slice can be an owned buffer or a memory-mapped region; the reader
/// never copies unless asked to decode a string.
///
/// # Example
///
/// ```
/// use vapor_common::{BinaryReader, Charset};
///
/// let data = [0x34, 0x12, 0xAA, 0x55, b'v', b'p', b'k', 0x00];
/// let mut reader = BinaryReader::new(&data);
///
/// assert_eq!(reader.read_u32().unwrap(), 0x55AA1234);
/// assert_eq!(reader.read_null_terminated_string(16, Charset::Ascii, false).unwrap(), "vpk");
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    /// Create a new reader from a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the total length of the underlying buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Get the remaining bytes as a slice.
    #[inline]
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.position.min(self.data.len())..]
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::Truncated {
                needed: count,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read a little-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian i32.
    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a null-terminated string of at most `limit` bytes.
    ///
    /// Reading stops at the first zero byte (which is consumed but not part
    /// of the result) or after `limit` bytes, whichever comes first. With
    /// `padded` set, exactly `limit` bytes are consumed no matter where the
    /// terminator was found.
    pub fn read_null_terminated_string(
        &mut self,
        limit: usize,
        charset: Charset,
        padded: bool,
    ) -> Result<String> {
        if limit == 0 {
            return Err(Error::InvalidArgument(
                "string limit must be positive".into(),
            ));
        }

        let remaining = self.remaining_bytes();
        let window = &remaining[..remaining.len().min(limit)];

        let (length, consumed) = match memchr::memchr(0, window) {
            Some(null_pos) => (null_pos, null_pos + 1),
            None if window.len() == limit => (limit, limit),
            None => {
                return Err(Error::Truncated {
                    needed: window.len() + 1,
                    available: window.len(),
                })
            }
        };

        let consumed = if padded {
            if remaining.len() < limit {
                return Err(Error::Truncated {
                    needed: limit,
                    available: remaining.len(),
                });
            }
            limit
        } else {
            consumed
        };

        let text = charset.decode(&window[..length]);
        self.position += consumed;
        Ok(text)
    }

    /// Read a struct using zerocopy.
    ///
    /// The struct must implement `FromBytes` from the zerocopy crate.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::Truncated {
            needed: size,
            available: bytes.len(),
        })
    }
}
