//! Huffman block decoder for compressed world textures
//!
//! World textures are stored as independent 16x16 blocks of 8-bit palette
//! indices. Each index is coded with a canonical Huffman code whose symbols
//! are either literals, references to a neighbouring pixel already decoded
//! in the same block, or a context lookup keyed by the previous pixel.
//!
//! Table region layout (offsets relative to the region start):
//!
//! | Offset           | Contents                                         |
//! |------------------|--------------------------------------------------|
//! | `0x00`           | u32 `table1` length in 16-bit entries            |
//! | `0x04`           | `table1`: i16 symbols                            |
//! | `+table1 bytes`  | `table2`: 18 x i32 symbol base per code length   |
//! | `+0x48`          | `table3`: i32 largest code per code length       |

use crate::error::{Error, Result};
use crate::utils::ByteReader;

/// Pixels along one side of a block.
pub const BLOCK_SIZE: usize = 16;

/// Offset of the Huffman table region from `table0`.
pub const TABLE_REGION_OFFSET: usize = 0x800;

const TABLE2_SIZE: usize = 0x48;
const FAST_BITS: u32 = 8;
const MAX_CODE_BITS: u32 = 16;

/// Pixel offsets for back-reference symbols `0x100..=0x104`:
/// left, up, up-left, up-right, two left.
const BACK_JUMPS: [isize; 5] = [-1, -16, -17, -15, -2];

const FIRST_BACK_REFERENCE: i32 = 0x100;
const FIRST_CONTEXT_SYMBOL: i32 = 0x105;

#[derive(Debug, Clone, Copy, Default)]
struct FastCode {
    value: i16,
    num_bits: u32,
}

/// Decoder for the 16x16 blocks of one texture.
pub struct HuffmanBlockDecoder<'a> {
    reader: ByteReader<'a>,
    table0: usize,
    table1: usize,
    table2: usize,
    table3: usize,
    fast: [FastCode; 256],
}

impl<'a> HuffmanBlockDecoder<'a> {
    /// Set up a decoder whose context table starts at `table0` and whose
    /// Huffman tables follow at `table0 + 0x800`.
    pub fn new(data: &'a [u8], table0: usize) -> Result<Self> {
        let reader = ByteReader::new(data);
        let region = table0 + TABLE_REGION_OFFSET;
        let table1_len = reader.u32_at(region)? as usize * 2;
        let table1 = region + 4;
        let table2 = table1 + table1_len;
        let table3 = table2 + TABLE2_SIZE;

        let mut decoder = Self {
            reader,
            table0,
            table1,
            table2,
            table3,
            fast: [FastCode::default(); 256],
        };
        decoder.fast = decoder.build_fast_table()?;
        Ok(decoder)
    }

    fn table2_at(&self, bits: u32) -> Result<i32> {
        self.reader.i32_at(self.table2 + bits as usize * 4)
    }

    fn table3_at(&self, bits: u32) -> Result<i32> {
        self.reader.i32_at(self.table3 + bits as usize * 4)
    }

    fn symbol(&self, code: i32, bits: u32) -> Result<i16> {
        let index = i64::from(code) + i64::from(self.table2_at(bits)?);
        let offset = self.table1 as i64 + index * 2;
        if index < 0 {
            return Err(Error::OffsetOutOfRange {
                field: "Huffman symbol",
                offset,
                len: self.reader.len(),
            });
        }
        self.reader.i16_at(offset as usize)
    }

    /// Resolve every code of up to 8 bits from the leading byte.
    fn build_fast_table(&self) -> Result<[FastCode; 256]> {
        let mut fast = [FastCode::default(); 256];
        for (byte, entry) in fast.iter_mut().enumerate() {
            let byte = byte as i32;
            let mut bits = 1;
            let mut code = byte >> (FAST_BITS - bits);
            while self.table3_at(bits)? < code {
                bits += 1;
                if bits > FAST_BITS {
                    break;
                }
                code = byte >> (FAST_BITS - bits);
            }
            if bits <= FAST_BITS {
                *entry = FastCode {
                    value: self.symbol(code, bits)?,
                    num_bits: bits,
                };
            }
        }
        Ok(fast)
    }

    /// Decode the 256 palette indices of the block whose bits start at `block_offset`.
    pub fn decode_block(&self, block_offset: usize) -> Result<[u8; BLOCK_SIZE * BLOCK_SIZE]> {
        let mut pixels = [0u8; BLOCK_SIZE * BLOCK_SIZE];
        let mut start_bit = 0usize;
        let mut prev_pixel = 0u8;

        for current in 0..pixels.len() {
            let word_offset = block_offset + (start_bit / 16) * 2;
            let high = u32::from(self.reader.u16_at(word_offset)?);
            // The second word is lookahead only; it may lie past the end of the data.
            let low = u32::from(self.reader.u16_at(word_offset + 2).unwrap_or(0));
            let window = (((high << 16) | low) >> (16 - (start_bit & 0x0F))) & 0xFFFF;

            let fast = self.fast[(window >> 8) as usize];
            let command = if fast.num_bits != 0 {
                start_bit += fast.num_bits as usize;
                i32::from(fast.value)
            } else {
                let mut bits = FAST_BITS + 1;
                let mut code = (window >> (16 - bits)) as i32;
                while self.table3_at(bits)? < code {
                    bits += 1;
                    if bits > MAX_CODE_BITS {
                        return Err(Error::HuffmanOverflow {
                            block_offset,
                            bit: start_bit,
                            max_bits: MAX_CODE_BITS,
                        });
                    }
                    code = (window >> (16 - bits)) as i32;
                }
                start_bit += bits as usize;
                i32::from(self.symbol(code, bits)?)
            };

            let pixel = if command < FIRST_BACK_REFERENCE {
                command as u8
            } else if command < FIRST_CONTEXT_SYMBOL {
                let jump = BACK_JUMPS[(command - FIRST_BACK_REFERENCE) as usize];
                let source = current
                    .checked_add_signed(jump)
                    .ok_or(Error::HuffmanBackReference {
                        command: command as u16,
                        pixel: current,
                    })?;
                pixels[source]
            } else {
                let index = (command - FIRST_CONTEXT_SYMBOL) as usize + usize::from(prev_pixel) * 8;
                self.reader.u8_at(self.table0 + index)?
            };

            pixels[current] = pixel;
            prev_pixel = pixel;
        }

        Ok(pixels)
    }
}
