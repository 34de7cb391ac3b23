//! `.vif` model files
//!
//! A model file holds one or more VIF packets, one per mesh, located through
//! an offset table. Two header layouts exist:
//!
//! | Layout        | Mesh count    | Offset table |
//! |---------------|---------------|--------------|
//! | default       | u8 at `0x12`  | `0x28`       |
//! | `"1.30"` tag  | u8 at `0x4A`  | `0x68`       |
//!
//! A zero mesh count means a single mesh with its table at `0x68`. Table
//! entry `i` is the start of mesh `i` and entry `i + 1` its end.

use std::ops::Range;

use super::assembler::MeshAssembler;
use super::interpreter::read_chunks;
use super::types::{Chunk, Mesh};
use crate::error::{Error, Result};
use crate::utils::ByteReader;

/// `"1.30"` read as a little-endian u32.
pub const SIGNATURE_V130: u32 = 0x3033_2E31;

const MESH_COUNT: usize = 0x12;
const MESH_TABLE: usize = 0x28;
const MESH_COUNT_V130: usize = 0x4A;
const MESH_TABLE_V130: usize = 0x68;

/// Byte ranges of the VIF packet of every mesh in the file.
pub fn mesh_ranges(data: &[u8]) -> Result<Vec<Range<usize>>> {
    let reader = ByteReader::new(data);
    let (mut num_meshes, mut table) = if reader.u32_at(0)? == SIGNATURE_V130 {
        (reader.u8_at(MESH_COUNT_V130)?, MESH_TABLE_V130)
    } else {
        (reader.u8_at(MESH_COUNT)?, MESH_TABLE)
    };
    if num_meshes == 0 {
        num_meshes = 1;
        table = MESH_TABLE_V130;
    }

    (0..usize::from(num_meshes))
        .map(|mesh| {
            let entry = table + mesh * 4;
            let start = reader.u32_at(entry)? as usize;
            let end = reader.u32_at(entry + 4)? as usize;
            if start > end || end > data.len() {
                return Err(Error::OffsetOutOfRange {
                    field: "mesh packet",
                    offset: end as i64,
                    len: data.len(),
                });
            }
            Ok(start..end)
        })
        .collect()
}

/// Decode every mesh of a model file.
pub fn decode_model(data: &[u8], assembler: &MeshAssembler) -> Result<Vec<Mesh>> {
    let mut meshes = Vec::new();
    let mut total_chunks = 0;
    for range in mesh_ranges(data)? {
        let chunks = read_chunks(&data[range])?;
        total_chunks += chunks.len();
        meshes.push(assembler.assemble(&chunks)?);
    }
    tracing::info!("decoded {} meshes from {total_chunks} chunks", meshes.len());
    Ok(meshes)
}

/// Raw chunks of every mesh, for inspection.
pub fn decode_chunks(data: &[u8]) -> Result<Vec<Vec<Chunk>>> {
    mesh_ranges(data)?
        .into_iter()
        .map(|range| read_chunks(&data[range]))
        .collect()
}

/// Decode a bare VIF packet as a single mesh.
pub fn decode_mesh(data: &[u8], assembler: &MeshAssembler) -> Result<Mesh> {
    assembler.assemble(&read_chunks(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn put_u32(data: &mut [u8], offset: usize, value: u32) {
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// MSCAL 66 followed by NOP: one empty chunk.
    const EMPTY_PACKET: [u8; 8] = [66, 0, 0, 0x14, 0, 0, 0, 0];

    #[test]
    fn test_default_layout() {
        let mut data = vec![0u8; 0x80];
        data[MESH_COUNT] = 2;
        put_u32(&mut data, MESH_TABLE, 0x80);
        put_u32(&mut data, MESH_TABLE + 4, 0x88);
        put_u32(&mut data, MESH_TABLE + 8, 0x90);
        data.extend_from_slice(&EMPTY_PACKET);
        data.extend_from_slice(&EMPTY_PACKET);

        assert_eq!(mesh_ranges(&data).unwrap(), vec![0x80..0x88, 0x88..0x90]);
        let chunks = decode_chunks(&data).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1][0].mscal_id, 66);

        let meshes = decode_model(&data, &MeshAssembler::default()).unwrap();
        assert_eq!(meshes.len(), 2);
        assert!(meshes[0].positions.is_empty());
    }

    #[test]
    fn test_v130_layout() {
        let mut data = vec![0u8; 0x80];
        put_u32(&mut data, 0, SIGNATURE_V130);
        data[MESH_COUNT] = 5;
        data[MESH_COUNT_V130] = 1;
        put_u32(&mut data, MESH_TABLE_V130, 0x80);
        put_u32(&mut data, MESH_TABLE_V130 + 4, 0x88);
        data.extend_from_slice(&EMPTY_PACKET);
        assert_eq!(mesh_ranges(&data).unwrap(), vec![0x80..0x88]);
    }

    #[test]
    fn test_zero_meshes_means_one() {
        let mut data = vec![0u8; 0x80];
        put_u32(&mut data, MESH_TABLE_V130, 0x78);
        put_u32(&mut data, MESH_TABLE_V130 + 4, 0x80);
        assert_eq!(mesh_ranges(&data).unwrap(), vec![0x78..0x80]);
    }

    #[test]
    fn test_bad_table() {
        let mut data = vec![0u8; 0x80];
        data[MESH_COUNT] = 1;
        put_u32(&mut data, MESH_TABLE, 0x40);
        put_u32(&mut data, MESH_TABLE + 4, 0x400);
        assert!(matches!(mesh_ranges(&data), Err(Error::OffsetOutOfRange { .. })));
    }
}
