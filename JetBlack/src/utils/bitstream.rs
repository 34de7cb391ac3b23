//! MSB-first bit reader over byte-swapped 16-bit words
//!
//! The Return to Arms animation stream is written as little-endian 16-bit
//! words whose bits are consumed from the top down. Swapping every pair of
//! bytes up front turns it into a plain big-endian bitstream.

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct BitstreamReader {
    data: Vec<u8>,
    bit_position: usize,
}

impl BitstreamReader {
    /// Copy `data` and swap each pair of bytes. A trailing odd byte is kept as is.
    #[must_use]
    pub fn new(data: &[u8]) -> Self {
        let mut swapped = data.to_vec();
        for pair in swapped.chunks_exact_mut(2) {
            pair.swap(0, 1);
        }
        Self {
            data: swapped,
            bit_position: 0,
        }
    }

    /// Whether at least `required_bits` remain.
    #[must_use]
    pub fn has_data(&self, required_bits: usize) -> bool {
        self.bit_position + required_bits <= self.data.len() * 8
    }

    #[must_use]
    pub fn bit_position(&self) -> usize {
        self.bit_position
    }

    /// Read `num_bits` (1..=16) as an unsigned value.
    pub fn read(&mut self, num_bits: u32) -> Result<u16> {
        if num_bits == 0 || num_bits > 16 {
            return Err(Error::InvalidAnimation {
                message: format!("bit field width {num_bits} is outside 1..=16"),
            });
        }

        let byte_pos = self.bit_position / 8;
        let first = *self.data.get(byte_pos).ok_or(Error::UnexpectedEof {
            offset: byte_pos,
            needed: 1,
            len: self.data.len(),
        })?;

        // Three bytes cover any 16-bit field at any bit alignment.
        let mut value = u32::from(first) << 16;
        value |= u32::from(self.data.get(byte_pos + 1).copied().unwrap_or(0)) << 8;
        value |= u32::from(self.data.get(byte_pos + 2).copied().unwrap_or(0));

        value >>= 8 - (self.bit_position & 7);
        value >>= 16 - num_bits;
        value &= 0xFFFF >> (16 - num_bits);

        self.bit_position += num_bits as usize;
        Ok(value as u16)
    }

    /// Read a signed `num_bits` field.
    ///
    /// Values at or above `2^(n-1)` decode to `-(2^n - 1 - v)`, so the top
    /// code is `0` again and `2^(n-1)` is `-(2^(n-1) - 1)`.
    pub fn read_signed(&mut self, num_bits: u32) -> Result<i32> {
        let v = i32::from(self.read(num_bits)?);
        let max_val = 1i32 << (num_bits - 1);
        if v >= max_val {
            Ok(-(max_val - (v - max_val) - 1))
        } else {
            Ok(v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_nibbles_across_swapped_words() {
        // 0x1234 0x5678 stored little-endian
        let mut reader = BitstreamReader::new(&[0x34, 0x12, 0x78, 0x56]);
        assert_eq!(reader.read(4).unwrap(), 0x1);
        assert_eq!(reader.read(8).unwrap(), 0x23);
        assert_eq!(reader.read(5).unwrap(), 0x08);
        assert_eq!(reader.read(5).unwrap(), 0b10101);
        assert_eq!(reader.bit_position(), 22);
        assert!(reader.has_data(10));
        assert!(!reader.has_data(11));
    }

    #[test]
    fn test_read_signed() {
        // 0b1000_0001 ...
        let mut reader = BitstreamReader::new(&[0x00, 0x81]);
        assert_eq!(reader.read_signed(8).unwrap(), -0x7E);

        let mut reader = BitstreamReader::new(&[0x00, 0x7F]);
        assert_eq!(reader.read_signed(8).unwrap(), 0x7F);

        let mut reader = BitstreamReader::new(&[0x00, 0xFF]);
        assert_eq!(reader.read_signed(8).unwrap(), 0);
    }

    #[test]
    fn test_invalid_width_and_eof() {
        let mut reader = BitstreamReader::new(&[0xAA, 0x55]);
        assert!(reader.read(0).is_err());
        assert!(reader.read(17).is_err());
        assert_eq!(reader.read(16).unwrap(), 0x55AA);
        assert!(matches!(reader.read(1), Err(Error::UnexpectedEof { .. })));
    }
}
