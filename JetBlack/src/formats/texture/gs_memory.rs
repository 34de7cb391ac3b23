//! GS local memory emulation
//!
//! Textures are uploaded to the PS2 Graphics Synthesizer as 32-bit pixels
//! (PSMCT32) but sampled as 8-bit or 4-bit indices (PSMT8/PSMT4). The GS
//! lays pixels out in pages, blocks and columns whose order differs per
//! pixel format, so decoding means writing through the PSMCT32 swizzle and
//! reading back through the indexed one.
//!
//! | Format  | Page    | Block  | Column |
//! |---------|---------|--------|--------|
//! | PSMCT32 | 64x32   | 8x8    | 8x2    |
//! | PSMT8   | 128x64  | 16x16  | 16x4   |
//! | PSMT4   | 128x128 | 32x16  | 32x4   |
//!
//! All addressing is in 32-bit words: a page is 2048 words, a block 64 and a
//! column 16. `dbp` counts 64-word blocks and `dbw` counts 64-pixel widths.

use crate::error::{Error, Result};

/// Size of GS local memory in bytes.
pub const GS_MEMORY_SIZE: usize = 4 * 1024 * 1024;

const PAGE_WORDS: usize = 2048;
const BLOCK_WORDS: usize = 64;
const COLUMN_WORDS: usize = 16;

const BLOCK32: [usize; 32] = [
    0, 1, 4, 5, 16, 17, 20, 21,
    2, 3, 6, 7, 18, 19, 22, 23,
    8, 9, 12, 13, 24, 25, 28, 29,
    10, 11, 14, 15, 26, 27, 30, 31,
];

const COLUMN_WORD32: [usize; 16] = [0, 1, 4, 5, 8, 9, 12, 13, 2, 3, 6, 7, 10, 11, 14, 15];

const BLOCK8: [usize; 32] = BLOCK32;

const COLUMN_WORD8: [[usize; 64]; 2] = [
    [
        0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13,
        2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15,
        8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5,
        10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7,
    ],
    [
        8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5,
        10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7,
        0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13,
        2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15,
    ],
];

const COLUMN_BYTE8: [usize; 64] = [
    0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 2, 2, 2, 2,
    0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 2, 2, 2, 2,
    1, 1, 1, 1, 1, 1, 1, 1, 3, 3, 3, 3, 3, 3, 3, 3,
    1, 1, 1, 1, 1, 1, 1, 1, 3, 3, 3, 3, 3, 3, 3, 3,
];

const BLOCK4: [usize; 32] = [
    0, 2, 8, 10,
    1, 3, 9, 11,
    4, 6, 12, 14,
    5, 7, 13, 15,
    16, 18, 24, 26,
    17, 19, 25, 27,
    20, 22, 28, 30,
    21, 23, 29, 31,
];

const COLUMN_WORD4: [[usize; 128]; 2] = [
    [
        0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13,
        0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13,
        2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15,
        2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15,
        8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5,
        8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5,
        10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7,
        10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7,
    ],
    [
        8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5,
        8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5,
        10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7,
        10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7,
        0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13,
        0, 1, 4, 5, 8, 9, 12, 13, 0, 1, 4, 5, 8, 9, 12, 13,
        2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15,
        2, 3, 6, 7, 10, 11, 14, 15, 2, 3, 6, 7, 10, 11, 14, 15,
    ],
];

const COLUMN_BYTE4: [usize; 128] = [
    0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 2, 2, 2, 2,
    4, 4, 4, 4, 4, 4, 4, 4, 6, 6, 6, 6, 6, 6, 6, 6,
    0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 2, 2, 2, 2,
    4, 4, 4, 4, 4, 4, 4, 4, 6, 6, 6, 6, 6, 6, 6, 6,
    1, 1, 1, 1, 1, 1, 1, 1, 3, 3, 3, 3, 3, 3, 3, 3,
    5, 5, 5, 5, 5, 5, 5, 5, 7, 7, 7, 7, 7, 7, 7, 7,
    1, 1, 1, 1, 1, 1, 1, 1, 3, 3, 3, 3, 3, 3, 3, 3,
    5, 5, 5, 5, 5, 5, 5, 5, 7, 7, 7, 7, 7, 7, 7, 7,
];

/// A 4 MiB GS memory image, owned by a single decode.
pub struct GsMemory {
    mem: Box<[u8]>,
}

impl Default for GsMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl GsMemory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mem: vec![0u8; GS_MEMORY_SIZE].into_boxed_slice(),
        }
    }

    /// Raw view of the memory image.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mem
    }

    fn word_slot(&mut self, word: usize, bytes: usize) -> Result<&mut [u8]> {
        let address = word * 4;
        self.mem
            .get_mut(address..address + bytes)
            .ok_or(Error::GsAddressOutOfRange { address })
    }

    /// Reject a read of `rrw` x `rrh` pixels that could not fit in video
    /// memory before its output buffer is allocated.
    fn check_extent(rrw: usize, rrh: usize, bits_per_pixel: usize) -> Result<()> {
        let bytes = rrw
            .checked_mul(rrh)
            .and_then(|pixels| pixels.checked_mul(bits_per_pixel))
            .map_or(usize::MAX, |bits| bits.div_ceil(8));
        if bytes > GS_MEMORY_SIZE {
            return Err(Error::GsAddressOutOfRange { address: bytes });
        }
        Ok(())
    }

    fn byte_at(&self, address: usize) -> Result<u8> {
        self.mem
            .get(address)
            .copied()
            .ok_or(Error::GsAddressOutOfRange { address })
    }

    /// Upload `rrw` x `rrh` 32-bit pixels from `src` to `(dsax, dsay)` of a
    /// PSMCT32 buffer at block `dbp` with width `dbw` (in 64-pixel units).
    ///
    /// The transfer stops early once `src` runs out.
    pub fn write_psmct32(
        &mut self,
        dbp: usize,
        dbw: usize,
        dsax: usize,
        dsay: usize,
        rrw: usize,
        rrh: usize,
        src: &[u8],
    ) -> Result<()> {
        let start_block = dbp * BLOCK_WORDS;
        let mut pixels = src.chunks_exact(4);

        for y in dsay..dsay + rrh {
            for x in dsax..dsax + rrw {
                let Some(pixel) = pixels.next() else {
                    tracing::debug!("PSMCT32 upload ran out of source data at ({x}, {y})");
                    return Ok(());
                };

                let page = x / 64 + (y / 32) * dbw;
                let (px, py) = (x % 64, y % 32);

                let block = BLOCK32[px / 8 + (py / 8) * 8];
                let (bx, by) = (px % 8, py % 8);

                let column = by / 2;
                let cw = COLUMN_WORD32[bx + (by % 2) * 8];

                let word = start_block
                    + page * PAGE_WORDS
                    + block * BLOCK_WORDS
                    + column * COLUMN_WORDS
                    + cw;
                self.word_slot(word, 4)?.copy_from_slice(pixel);
            }
        }
        Ok(())
    }

    /// Read `rrw` x `rrh` 8-bit indices from a PSMT8 buffer.
    ///
    /// `dbw` is given in 64-pixel units of the equivalent PSMCT32 buffer and
    /// is halved to address 128-pixel PSMT8 pages.
    pub fn read_psmt8(
        &self,
        dbp: usize,
        dbw: usize,
        dsax: usize,
        dsay: usize,
        rrw: usize,
        rrh: usize,
    ) -> Result<Vec<u8>> {
        Self::check_extent(rrw, rrh, 8)?;
        let dbw = dbw >> 1;
        let start_block = dbp * BLOCK_WORDS;
        let mut out = Vec::with_capacity(rrw * rrh);

        for y in dsay..dsay + rrh {
            for x in dsax..dsax + rrw {
                let page = x / 128 + (y / 64) * dbw;
                let (px, py) = (x % 128, y % 64);

                let block = BLOCK8[px / 16 + (py / 16) * 8];
                let (bx, by) = (px % 16, py % 16);

                let column = by / 4;
                let cell = bx + (by % 4) * 16;
                let cw = COLUMN_WORD8[column & 1][cell];
                let cb = COLUMN_BYTE8[cell];

                let word = start_block
                    + page * PAGE_WORDS
                    + block * BLOCK_WORDS
                    + column * COLUMN_WORDS
                    + cw;
                out.push(self.byte_at(word * 4 + cb)?);
            }
        }
        Ok(out)
    }

    /// Read `rrw` x `rrh` 4-bit indices from a PSMT4 buffer.
    ///
    /// The result packs two pixels per byte: the even pixel in the low
    /// nibble and the odd pixel in the high nibble.
    pub fn read_psmt4(
        &self,
        dbp: usize,
        dbw: usize,
        dsax: usize,
        dsay: usize,
        rrw: usize,
        rrh: usize,
    ) -> Result<Vec<u8>> {
        Self::check_extent(rrw, rrh, 4)?;
        let dbw = dbw >> 1;
        let start_block = dbp * BLOCK_WORDS;
        let mut out = vec![0u8; (rrw * rrh).div_ceil(2)];
        let mut index = 0;
        let mut odd = false;

        for y in dsay..dsay + rrh {
            for x in dsax..dsax + rrw {
                let page = x / 128 + (y / 128) * dbw;
                let (px, py) = (x % 128, y % 128);

                let block = BLOCK4[px / 32 + (py / 16) * 4];
                let (bx, by) = (px % 32, py % 16);

                let column = by / 4;
                let cell = bx + (by % 4) * 32;
                let cw = COLUMN_WORD4[column & 1][cell];
                let cb = COLUMN_BYTE4[cell];

                let word = start_block
                    + page * PAGE_WORDS
                    + block * BLOCK_WORDS
                    + column * COLUMN_WORDS
                    + cw;
                let gs_byte = self.byte_at(word * 4 + (cb >> 1))?;
                let nibble = if cb & 1 == 1 { gs_byte >> 4 } else { gs_byte & 0x0F };

                if odd {
                    out[index] = (out[index] & 0x0F) | (nibble << 4);
                    index += 1;
                } else {
                    out[index] = (out[index] & 0xF0) | nibble;
                }
                odd = !odd;
            }
        }
        Ok(out)
    }
}

/// Unpack two 4-bit pixels per byte into one byte per pixel, low nibble first.
#[must_use]
pub fn expand_4bit(packed: &[u8]) -> Vec<u8> {
    packed
        .iter()
        .flat_map(|&b| [b & 0x0F, b >> 4])
        .collect()
}
