//! Huffman-compressed world textures
//!
//! World texture files group textures into chunks. A chunk starts with a
//! u32 texture count and holds one `0x40` byte entry per texture, numbered
//! from 1 (entry `n` lives at `chunk_start + n * 0x40`):
//!
//! | Offset | Type | Contents                                 |
//! |--------|------|------------------------------------------|
//! | `0x00` | u16  | pixel width                              |
//! | `0x02` | u16  | pixel height                             |
//! | `0x10` | i32  | compressed data offset (relative)        |
//!
//! Dark Alliance stores these offsets relative to the entry itself; the later
//! engines store them relative to the chunk start.
//!
//! The compressed data begins with a relative palette offset followed by a
//! list of block rectangles `x0, y0, x1, y1`, terminated by `0xFF`. Each
//! rectangle is followed by one relative block-data offset per 16x16 block.
//! The palette (256 entries) is followed by the context table at `+0x400`
//! and the Huffman tables at `+0xC00`.

use std::path::Path;

use serde::Serialize;

use super::huffman::{BLOCK_SIZE, HuffmanBlockDecoder};
use super::palette::{read_palette, unswizzle_palette};
use super::pixels::PixelBuffer;
use crate::config::EngineVersion;
use crate::error::{Error, Result};
use crate::utils::{ByteReader, align_up};

/// Size of one texture entry in a chunk.
pub const TEXTURE_ENTRY_SIZE: usize = 0x40;

const PALETTE_ENTRIES: usize = 256;
const CONTEXT_TABLE_OFFSET: usize = 0x400;
const END_OF_RECTS: u8 = 0xFF;

/// A directory entry mapping a world cell to a texture chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TexEntry {
    /// `div * 100 + mod` of the owning cell.
    pub cell_offset: i32,
    /// Offset of the texture chunk in the file.
    pub directory_offset: i32,
    pub size: i32,
}

impl TexEntry {
    /// The `(div, mod)` pair encoded in `cell_offset`.
    #[must_use]
    pub const fn cell(&self) -> (i32, i32) {
        (self.cell_offset / 100, self.cell_offset % 100)
    }
}

/// A loaded world texture file.
#[derive(Debug, Clone)]
pub struct WorldTexFile {
    data: Vec<u8>,
    engine_version: EngineVersion,
    entries: Vec<TexEntry>,
}

impl WorldTexFile {
    /// Wrap file contents. Return to Arms and Justice League Heroes files
    /// carry a cell directory which is parsed up front.
    pub fn new(engine_version: EngineVersion, data: Vec<u8>) -> Result<Self> {
        let entries = if engine_version.has_texture_directory() {
            read_entries(&data)?
        } else {
            Vec::new()
        };
        tracing::debug!("world texture file: {} bytes, {} directory entries", data.len(), entries.len());
        Ok(Self {
            data,
            engine_version,
            entries,
        })
    }

    pub fn open<P: AsRef<Path>>(engine_version: EngineVersion, path: P) -> Result<Self> {
        Self::new(engine_version, std::fs::read(path)?)
    }

    #[must_use]
    pub fn engine_version(&self) -> EngineVersion {
        self.engine_version
    }

    #[must_use]
    pub fn entries(&self) -> &[TexEntry] {
        &self.entries
    }

    /// Decode texture `number` (1-based) of the chunk at `chunk_start`.
    pub fn texture(&self, chunk_start: usize, number: usize) -> Result<PixelBuffer> {
        let reader = ByteReader::new(&self.data);
        let count = reader.u32_at(chunk_start)? as usize;
        if number == 0 || number > count {
            return Err(Error::TextureIndexOutOfRange { index: number, count });
        }
        self.decode(chunk_start + number * TEXTURE_ENTRY_SIZE, chunk_start)
    }

    /// Decode texture `number` of the chunk the directory assigns to cell
    /// `(div, modulo)`. Returns `None` when no entry matches.
    pub fn texture_for_cell(&self, div: i32, modulo: i32, number: usize) -> Result<Option<PixelBuffer>> {
        let Some(entry) = self.entries.iter().find(|e| e.cell() == (div, modulo)) else {
            return Ok(None);
        };
        let chunk_start = ByteReader::new(&self.data).resolve_offset(0, entry.directory_offset, "texture chunk")?;
        self.texture(chunk_start, number).map(Some)
    }

    /// Decode the texture whose entry lies at `offset` inside the chunk at `chunk_start`.
    pub fn decode(&self, offset: usize, chunk_start: usize) -> Result<PixelBuffer> {
        let reader = ByteReader::new(&self.data);
        let delta_base = match self.engine_version {
            EngineVersion::DarkAlliance => offset,
            _ => chunk_start,
        };

        let pixel_width = usize::from(reader.u16_at(offset)?);
        let pixel_height = usize::from(reader.u16_at(offset + 2)?);
        let compressed = reader.resolve_offset(delta_base, reader.i32_at(offset + 0x10)?, "compressed data")?;
        let palette_offset = reader.resolve_offset(delta_base, reader.i32_at(compressed)?, "palette")?;

        let palette = unswizzle_palette(read_palette(&self.data, palette_offset, PALETTE_ENTRIES)?);
        let decoder = HuffmanBlockDecoder::new(&self.data, palette_offset + CONTEXT_TABLE_OFFSET)?;

        let width = align_up(pixel_width, BLOCK_SIZE);
        let height = align_up(pixel_height, BLOCK_SIZE);
        let mut image = PixelBuffer::new(width, height);
        tracing::debug!("world texture at {offset:#x}: {pixel_width}x{pixel_height}, palette at {palette_offset:#x}");

        let mut p = compressed + 4;
        while reader.u8_at(p)? != END_OF_RECTS {
            let rect = reader.bytes_at(p, 4)?;
            let (x0, y0, x1, y1) = (
                usize::from(rect[0]),
                usize::from(rect[1]),
                usize::from(rect[2]),
                usize::from(rect[3]),
            );
            p += 4;

            for y_block in y0..=y1 {
                for x_block in x0..=x1 {
                    let block = reader.resolve_offset(delta_base, reader.i32_at(p)?, "texture block")?;
                    let indices = decoder.decode_block(block)?;
                    for (i, &index) in indices.iter().enumerate() {
                        let x = x_block * BLOCK_SIZE + i % BLOCK_SIZE;
                        let y = y_block * BLOCK_SIZE + i / BLOCK_SIZE;
                        image.set(x, y, palette[usize::from(index)])?;
                    }
                    p += 4;
                }
            }
        }

        Ok(image)
    }
}

/// Parse the cell directory: a skipped u32, then `(cell, offset, size)`
/// triples until a negative cell offset.
pub fn read_entries(data: &[u8]) -> Result<Vec<TexEntry>> {
    let mut reader = ByteReader::new(data);
    reader.skip(4);

    let mut entries = Vec::new();
    loop {
        let entry = TexEntry {
            cell_offset: reader.read_i32()?,
            directory_offset: reader.read_i32()?,
            size: reader.read_i32()?,
        };
        if entry.cell_offset < 0 {
            break;
        }
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::formats::texture::palette::PalEntry;
    use pretty_assertions::assert_eq;

    pub(crate) const CHUNK: usize = 0x100;
    const ENTRY: usize = CHUNK + TEXTURE_ENTRY_SIZE;
    const COMPRESSED: usize = 0x180;
    const PALETTE: usize = 0x200;
    const TABLES: usize = PALETTE + 0xC00;

    fn put_i32(data: &mut [u8], offset: usize, value: i32) {
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// One 16x32 texture made of two blocks. Every code is the single bit
    /// "0", which decodes to literal 5.
    pub(crate) fn build_file(engine: EngineVersion) -> Vec<u8> {
        let delta = (if engine == EngineVersion::DarkAlliance { ENTRY } else { CHUNK }) as i32;
        let mut data = vec![0u8; TABLES];

        // Directory: unknown word, cell 203 -> chunk, terminator.
        put_i32(&mut data, 4, 203);
        put_i32(&mut data, 8, CHUNK as i32);
        put_i32(&mut data, 16, -1);

        put_i32(&mut data, CHUNK, 1);
        data[ENTRY..ENTRY + 2].copy_from_slice(&16u16.to_le_bytes());
        data[ENTRY + 2..ENTRY + 4].copy_from_slice(&20u16.to_le_bytes());
        put_i32(&mut data, ENTRY + 0x10, COMPRESSED as i32 - delta);

        data[PALETTE + 5 * 4..PALETTE + 6 * 4].copy_from_slice(&[1, 2, 3, 0]);

        // Huffman tables: table1 = [5], table2 = 0, table3[1] = 0.
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&5i16.to_le_bytes());
        data.extend_from_slice(&[0u8; 0x48]);
        let mut table3 = [i32::MAX; 17];
        table3[1] = 0;
        for value in table3 {
            data.extend_from_slice(&value.to_le_bytes());
        }

        // A block of 256 zero bits plus lookahead.
        let block = data.len();
        data.extend_from_slice(&[0u8; 36]);

        put_i32(&mut data, COMPRESSED, PALETTE as i32 - delta);
        data[COMPRESSED + 4..COMPRESSED + 8].copy_from_slice(&[0, 0, 0, 1]);
        put_i32(&mut data, COMPRESSED + 8, block as i32 - delta);
        put_i32(&mut data, COMPRESSED + 12, block as i32 - delta);
        data[COMPRESSED + 16] = END_OF_RECTS;
        data
    }

    #[test]
    fn test_read_entries() {
        let data = build_file(EngineVersion::ReturnToArms);
        let entries = read_entries(&data).unwrap();
        assert_eq!(
            entries,
            vec![TexEntry {
                cell_offset: 203,
                directory_offset: CHUNK as i32,
                size: 0
            }]
        );
        assert_eq!(entries[0].cell(), (2, 3));
    }

    #[test]
    fn test_decode_dark_alliance() {
        let file = WorldTexFile::new(EngineVersion::DarkAlliance, build_file(EngineVersion::DarkAlliance)).unwrap();
        assert!(file.entries().is_empty());

        let image = file.texture(CHUNK, 1).unwrap();
        assert_eq!((image.width, image.height), (16, 32));
        assert!(image.pixels.iter().all(|p| *p == PalEntry::new(1, 2, 3, 0)));
    }

    #[test]
    fn test_decode_by_cell() {
        let file = WorldTexFile::new(EngineVersion::ReturnToArms, build_file(EngineVersion::ReturnToArms)).unwrap();
        let image = file.texture_for_cell(2, 3, 1).unwrap().unwrap();
        assert_eq!(image.get(15, 31), Some(&PalEntry::new(1, 2, 3, 0)));
        assert!(file.texture_for_cell(3, 2, 1).unwrap().is_none());
    }

    #[test]
    fn test_texture_number_out_of_range() {
        let file = WorldTexFile::new(EngineVersion::ReturnToArms, build_file(EngineVersion::ReturnToArms)).unwrap();
        assert!(matches!(
            file.texture(CHUNK, 2),
            Err(Error::TextureIndexOutOfRange { index: 2, count: 1 })
        ));
        assert!(matches!(file.texture(CHUNK, 0), Err(Error::TextureIndexOutOfRange { .. })));
    }

    #[test]
    fn test_bad_compressed_offset() {
        let mut data = build_file(EngineVersion::ReturnToArms);
        put_i32(&mut data, ENTRY + 0x10, 0x7FFF_0000);
        let file = WorldTexFile::new(EngineVersion::ReturnToArms, data).unwrap();
        assert!(matches!(file.texture(CHUNK, 1), Err(Error::OffsetOutOfRange { .. })));
    }
}
