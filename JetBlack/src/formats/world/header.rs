//! World file header and texture chunk grid

use serde::Serialize;

use crate::config::EngineVersion;
use crate::error::{Error, Result};
use crate::utils::ByteReader;

/// World cells are numbered `row * 100 + column`.
pub const CELL_STRIDE: i32 = 100;

/// Largest row or column index a cell number can encode.
const MAX_CELL: i32 = CELL_STRIDE - 1;

/// Size of one grid cell record in the texture offset table.
const GRID_CELL_SIZE: usize = 8;

/// Fixed header at the start of every world file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorldHeader {
    pub num_elements: usize,
    pub num_cols: i32,
    pub num_rows: i32,
    /// Offset of the element array.
    pub element_array_start: usize,
    pub offset38_cols: i32,
    pub offset38_rows: i32,
    pub offset38: i32,
    /// Lower-left texture cell, `row * 100 + column`.
    pub tex_ll: i32,
    /// Upper-right texture cell.
    pub tex_ur: i32,
    /// Offset of the Dark Alliance texture chunk table.
    pub world_tex_offsets: i32,
}

impl WorldHeader {
    pub fn parse(reader: &ByteReader<'_>) -> Result<Self> {
        let num_elements = reader.i32_at(0x00)?;
        let num_elements = usize::try_from(num_elements).map_err(|_| Error::InvalidHeader {
            format: "world",
            message: format!("negative element count {num_elements}"),
        })?;

        Ok(Self {
            num_elements,
            num_cols: reader.i32_at(0x10)?,
            num_rows: reader.i32_at(0x14)?,
            element_array_start: reader.offset_at(0x24, "element array")?,
            offset38_cols: reader.i32_at(0x30)?,
            offset38_rows: reader.i32_at(0x34)?,
            offset38: reader.i32_at(0x38)?,
            tex_ll: reader.i32_at(0x58)?,
            tex_ur: reader.i32_at(0x5C)?,
            world_tex_offsets: reader.i32_at(0x64)?,
        })
    }

    /// Column and row of the lower-left texture cell.
    #[must_use]
    pub const fn tex_origin(&self) -> (i32, i32) {
        (self.tex_ll % CELL_STRIDE, self.tex_ll / CELL_STRIDE)
    }
}

/// Texture chunk offsets of a Dark Alliance world, one per cell of the
/// rectangle spanned by the header's texture corners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextureGrid {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    /// Row-major over `x0..=x1` and `y0..=y1`. `None` where the table runs
    /// past the end of the file.
    pub offsets: Vec<Option<i32>>,
}

impl TextureGrid {
    /// Read the grid for `header`. Only Dark Alliance worlds address texture
    /// chunks this way; other engines get an empty grid.
    pub fn read(engine_version: EngineVersion, reader: &ByteReader<'_>, header: &WorldHeader) -> Self {
        if engine_version.has_texture_directory() {
            return Self::default();
        }

        let (x0, y0) = header.tex_origin();
        let (x0, y0) = (x0.clamp(0, MAX_CELL), y0.clamp(0, MAX_CELL));
        // The table is one column wider than the upper-right corner says.
        let x1 = (header.tex_ur % CELL_STRIDE + 1).min(MAX_CELL);
        let y1 = (header.tex_ur / CELL_STRIDE).min(MAX_CELL);

        let mut offsets = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                let cell = i64::from(y - y0) * i64::from(CELL_STRIDE) + i64::from(x - x0);
                let at = i64::from(header.world_tex_offsets) + cell * GRID_CELL_SIZE as i64;
                // Some towns address cells past the end of the table.
                let offset = usize::try_from(at).ok().and_then(|at| reader.i32_at(at).ok());
                offsets.push(offset);
            }
        }
        tracing::debug!("texture grid ({x0}, {y0})..=({x1}, {y1})");
        Self {
            x0,
            y0,
            x1,
            y1,
            offsets,
        }
    }

    /// Chunk offset for column `x`, row `y`.
    #[must_use]
    pub fn chunk_offset(&self, x: i32, y: i32) -> Option<i32> {
        if x < self.x0 || x > self.x1 || y < self.y0 || y > self.y1 {
            return None;
        }
        let width = (self.x1 - self.x0 + 1) as usize;
        let index = (y - self.y0) as usize * width + (x - self.x0) as usize;
        self.offsets.get(index).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn put(data: &mut [u8], at: usize, value: i32) {
        data[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn header_bytes() -> Vec<u8> {
        let mut data = vec![0u8; 0x430];
        put(&mut data, 0x00, 3);
        put(&mut data, 0x10, 8);
        put(&mut data, 0x14, 6);
        put(&mut data, 0x24, 0x68);
        put(&mut data, 0x58, 102);
        put(&mut data, 0x5C, 203);
        put(&mut data, 0x64, 0x100);
        data
    }

    #[test]
    fn test_parse_header() {
        let data = header_bytes();
        let header = WorldHeader::parse(&ByteReader::new(&data)).unwrap();
        assert_eq!(header.num_elements, 3);
        assert_eq!((header.num_cols, header.num_rows), (8, 6));
        assert_eq!(header.element_array_start, 0x68);
        assert_eq!(header.tex_origin(), (2, 1));
    }

    #[test]
    fn test_negative_element_count() {
        let mut data = header_bytes();
        put(&mut data, 0x00, -1);
        assert!(matches!(
            WorldHeader::parse(&ByteReader::new(&data)),
            Err(Error::InvalidHeader { format: "world", .. })
        ));
    }

    #[test]
    fn test_texture_grid() {
        let mut data = header_bytes();
        // Cell (3, 2): one row down and one column across from (2, 1).
        put(&mut data, 0x100 + (100 + 1) * 8, 0x2000);
        let reader = ByteReader::new(&data);
        let header = WorldHeader::parse(&reader).unwrap();

        let grid = TextureGrid::read(EngineVersion::DarkAlliance, &reader, &header);
        assert_eq!((grid.x0, grid.y0, grid.x1, grid.y1), (2, 1, 4, 2));
        assert_eq!(grid.chunk_offset(3, 2), Some(0x2000));
        assert_eq!(grid.chunk_offset(2, 1), Some(0));
        // Past the end of the file.
        assert_eq!(grid.chunk_offset(4, 2), None);
        assert_eq!(grid.chunk_offset(5, 2), None);

        let grid = TextureGrid::read(EngineVersion::ReturnToArms, &reader, &header);
        assert!(grid.offsets.is_empty());
        assert_eq!(grid.chunk_offset(0, 0), None);
    }

    #[test]
    fn test_texture_grid_stays_inside_cell_range() {
        let mut data = header_bytes();
        put(&mut data, 0x58, -5);
        put(&mut data, 0x5C, i32::MAX);
        let reader = ByteReader::new(&data);
        let header = WorldHeader::parse(&reader).unwrap();

        let grid = TextureGrid::read(EngineVersion::DarkAlliance, &reader, &header);
        assert_eq!((grid.x0, grid.y0, grid.x1, grid.y1), (0, 0, 48, 99));
        assert_eq!(grid.offsets.len(), 49 * 100);
    }
}
