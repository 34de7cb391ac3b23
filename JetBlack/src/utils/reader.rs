//! Bounds-checked little-endian reads over a byte window
//!
//! Every decoder in this crate indexes into buffers using offsets taken from
//! the file itself. [`ByteReader`] turns each of those reads into a checked
//! operation that reports [`Error::UnexpectedEof`] instead of panicking.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

/// A read-only window over a byte slice with an optional sequential cursor.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a reader positioned at `pos`.
    #[must_use]
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Length of the window in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The underlying bytes.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current cursor position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor to an absolute position.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Bytes left between the cursor and the end of the window.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn bytes_at(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(Error::UnexpectedEof {
                offset,
                needed: len,
                len: self.data.len(),
            })
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes_at(offset, 1)?[0])
    }

    pub fn i8_at(&self, offset: usize) -> Result<i8> {
        Ok(self.u8_at(offset)? as i8)
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.bytes_at(offset, 2)?))
    }

    pub fn i16_at(&self, offset: usize) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.bytes_at(offset, 2)?))
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.bytes_at(offset, 4)?))
    }

    pub fn i32_at(&self, offset: usize) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.bytes_at(offset, 4)?))
    }

    pub fn f32_at(&self, offset: usize) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.bytes_at(offset, 4)?))
    }

    /// Read a NUL-terminated string at `offset`. A string that runs to the
    /// end of the window without a terminator is returned as is.
    pub fn zstring_at(&self, offset: usize) -> Result<String> {
        let bytes = self.data.get(offset..).ok_or(Error::UnexpectedEof {
            offset,
            needed: 1,
            len: self.data.len(),
        })?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Read a NUL-terminated string stored in a fixed `len`-byte field.
    pub fn fixed_string_at(&self, offset: usize, len: usize) -> Result<String> {
        let bytes = self.bytes_at(offset, len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Read a u32 header field and interpret it as an offset into this window.
    pub fn offset_at(&self, offset: usize, field: &'static str) -> Result<usize> {
        let value = self.i32_at(offset)?;
        self.resolve_offset(0, value, field)
    }

    /// Add a signed `delta` to `base` and check the result lies inside the window.
    ///
    /// Several formats store pointers relative to an entry or chunk start.
    pub fn resolve_offset(&self, base: usize, delta: i32, field: &'static str) -> Result<usize> {
        let resolved = base as i64 + i64::from(delta);
        if resolved < 0 || resolved as usize >= self.data.len() {
            return Err(Error::OffsetOutOfRange {
                field,
                offset: resolved,
                len: self.data.len(),
            });
        }
        Ok(resolved as usize)
    }

    // ==================== Sequential reads ====================

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self.bytes_at(self.pos, len)?;
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut bytes = self.take(2)?;
        Ok(bytes.read_u16::<LittleEndian>()?)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let mut bytes = self.take(2)?;
        Ok(bytes.read_i16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut bytes = self.take(4)?;
        Ok(bytes.read_u32::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut bytes = self.take(4)?;
        Ok(bytes.read_i32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let mut bytes = self.take(4)?;
        Ok(bytes.read_f32::<LittleEndian>()?)
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Advance the cursor without reading.
    pub fn skip(&mut self, len: usize) {
        self.pos += len;
    }

    /// Round the cursor up to a multiple of `alignment` (a power of two).
    pub fn align(&mut self, alignment: usize) {
        self.pos = (self.pos + alignment - 1) & !(alignment - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_reads() {
        let data = [0x34, 0x12, 0xFE, 0xFF, 0x78, 0x56, 0x34, 0x12];
        let reader = ByteReader::new(&data);
        assert_eq!(reader.u16_at(0).unwrap(), 0x1234);
        assert_eq!(reader.i16_at(2).unwrap(), -2);
        assert_eq!(reader.u32_at(4).unwrap(), 0x12345678);
        assert_eq!(reader.i8_at(2).unwrap(), -2);
    }

    #[test]
    fn test_read_past_end_is_typed_error() {
        let data = [0u8; 6];
        let reader = ByteReader::new(&data);
        match reader.u32_at(4) {
            Err(Error::UnexpectedEof { offset, needed, len }) => {
                assert_eq!((offset, needed, len), (4, 4, 6));
            }
            other => panic!("expected UnexpectedEof, got {other:?}"),
        }
        assert!(reader.bytes_at(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_sequential_reads_and_align() {
        let data = [1, 0, 2, 0, 0, 0, 0, 0, 0xFF];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u16().unwrap(), 1);
        assert_eq!(reader.read_u8().unwrap(), 2);
        reader.align(4);
        assert_eq!(reader.position(), 4);
        reader.skip(4);
        assert_eq!(reader.read_i8().unwrap(), -1);
        assert_eq!(reader.remaining(), 0);
        assert!(reader.read_u8().is_err());
    }

    #[test]
    fn test_strings_and_floats() {
        let mut data = b"town\0tail".to_vec();
        data.extend_from_slice(&1.5f32.to_le_bytes());
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.zstring_at(0).unwrap(), "town");
        assert_eq!(reader.zstring_at(5).unwrap(), "tail");
        assert_eq!(reader.zstring_at(data.len()).unwrap(), "");
        assert!(reader.zstring_at(data.len() + 1).is_err());
        assert_eq!(reader.f32_at(9).unwrap(), 1.5);
        assert_eq!(reader.fixed_string_at(5, 2).unwrap(), "ta");
        assert_eq!(reader.fixed_string_at(0, 8).unwrap(), "town");
        assert!(reader.fixed_string_at(9, 8).is_err());
        reader.set_position(9);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
    }

    #[test]
    fn test_resolve_offset() {
        let data = [0u8; 0x20];
        let reader = ByteReader::new(&data);
        assert_eq!(reader.resolve_offset(0x10, 4, "test").unwrap(), 0x14);
        assert_eq!(reader.resolve_offset(0x10, -0x10, "test").unwrap(), 0);
        assert!(matches!(
            reader.resolve_offset(0x10, 0x10, "test"),
            Err(Error::OffsetOutOfRange { field: "test", offset: 0x20, .. })
        ));
        assert!(reader.resolve_offset(0, -1, "test").is_err());
    }
}
