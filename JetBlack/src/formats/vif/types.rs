//! Chunk and mesh types produced by the VIF decoder

use glam::{Vec2, Vec3};
use serde::Serialize;

use crate::formats::gif::GifTag;

/// Bit set on a strip entry or vloc field to suppress the triangle ending there.
pub const STRIP_SKIP: u16 = 0x8000;

/// Vertex position in 12.4 fixed point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Vertex {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// Normal with components scaled by 127.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PackedNormal {
    pub x: i8,
    pub y: i8,
    pub z: i8,
}

/// Three VU memory addresses describing how one vertex enters the strip.
///
/// The low 9 bits of each value address VU memory; bit 15 is the skip flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VLoc {
    pub v1: u16,
    pub v2: u16,
    pub v3: u16,
}

/// Texture coordinate in texels * 16.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Uv {
    pub u: i16,
    pub v: i16,
}

/// Skinning for an inclusive range of vertices.
///
/// Bones are stored already divided by 4. A single-bone binding leaves
/// slots 2..4 at weight 0; an unused fourth bone stays `0xFF`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VertexWeight {
    pub start_vertex: usize,
    pub end_vertex: usize,
    pub bones: [u8; 4],
    pub weights: [u8; 4],
}

impl VertexWeight {
    /// Whether `vertex` lies in `start_vertex..=end_vertex`.
    #[must_use]
    pub const fn covers(&self, vertex: usize) -> bool {
        vertex >= self.start_vertex && vertex <= self.end_vertex
    }

    /// Bound to exactly one bone.
    #[must_use]
    pub const fn is_rigid(&self) -> bool {
        self.weights[1] == 0 && self.weights[2] == 0 && self.weights[3] == 0
    }
}

/// One primitive group sent to the vector unit by a single MSCAL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Microcode entry point that draws this chunk.
    pub mscal_id: u16,
    pub gif_tag0: Option<GifTag>,
    pub gif_tag1: Option<GifTag>,
    pub vertices: Vec<Vertex>,
    pub normals: Vec<PackedNormal>,
    pub vlocs: Vec<VLoc>,
    pub uvs: Vec<Uv>,
    /// Weight ranges in chunk-local vertex indices.
    pub vertex_weights: Vec<VertexWeight>,
    /// Strip remap table. Entry 0 is the pair count; pairs start at entry 4.
    pub extra_vlocs: Vec<u16>,
    pub direct_gif_tags: Vec<GifTag>,
}

/// Renderer-agnostic triangle mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// One per position. Vertices no triangle references keep [`UNSET_UV`].
    pub uvs: Vec<Vec2>,
    /// Triangle list; every face is emitted twice, once per winding.
    pub triangle_indices: Vec<u32>,
    /// Weight ranges in mesh vertex indices.
    pub vertex_weights: Vec<VertexWeight>,
}

/// Placeholder UV for vertices that have not been assigned one yet.
pub const UNSET_UV: Vec2 = Vec2::new(-10000.0, -10000.0);

impl Mesh {
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.len() / 3
    }

    /// The weight range covering `vertex`, if any.
    #[must_use]
    pub fn weight_for(&self, vertex: usize) -> Option<&VertexWeight> {
        self.vertex_weights.iter().find(|w| w.covers(vertex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_ranges() {
        let weight = VertexWeight {
            start_vertex: 2,
            end_vertex: 4,
            bones: [1, 0, 0, 0],
            weights: [255, 0, 0, 0],
        };
        assert!(weight.covers(2) && weight.covers(4));
        assert!(!weight.covers(5));
        assert!(weight.is_rigid());
    }
}
