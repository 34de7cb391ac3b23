//! Chunk to mesh assembly
//!
//! Rebuilds the triangle strip each chunk's microcode would have drawn and
//! flattens all chunks into one indexed [`Mesh`]. A vertex that the strip
//! samples with two different texture coordinates is split so every
//! output vertex has exactly one UV.

use glam::{Vec2, Vec3};

use super::types::{Chunk, Mesh, STRIP_SKIP, UNSET_UV, Uv, VertexWeight};
use crate::error::{Error, Result};

/// GIF primitive type for triangle strips.
const PRIM_TRIANGLE_STRIP: u16 = 4;

const POSITION_SCALE: f32 = 16.0;
const NORMAL_SCALE: f32 = 127.0;
const SLOT_MASK: u32 = 0x1FF;
const VERTEX_MASK: u32 = 0xFF;
const SKIP: u32 = STRIP_SKIP as u32;

/// Builds meshes from decoded chunks.
#[derive(Debug, Clone, Copy)]
pub struct MeshAssembler {
    /// Width of the bound texture in pixels, used to normalise UVs.
    pub texture_width: u32,
    pub texture_height: u32,
    /// Fail instead of clamping weight ranges that run past their chunk.
    pub strict_weights: bool,
}

impl Default for MeshAssembler {
    fn default() -> Self {
        Self {
            texture_width: 256,
            texture_height: 256,
            strict_weights: false,
        }
    }
}

/// Mutable output shared by every chunk of one assembly.
#[derive(Default)]
struct MeshBuilder {
    mesh: Mesh,
}

impl MeshBuilder {
    /// Split `vertex` into a new vertex at `new_index`, copying its position,
    /// normal and any weight that covers it.
    fn duplicate(
        &mut self,
        chunk_index: usize,
        chunk: &Chunk,
        v_start: usize,
        vertex: usize,
        new_index: usize,
    ) -> Result<()> {
        let mesh = &mut self.mesh;
        mesh.positions.push(mesh.positions[vertex]);
        if let Some(&normal) = mesh.normals.get(vertex) {
            mesh.normals.push(normal);
        }
        mesh.uvs.push(UNSET_UV);

        let local = vertex - v_start;
        match chunk.vertex_weights.iter().find(|w| w.covers(local)) {
            Some(weight) if weight.weights[0] > 0 => mesh.vertex_weights.push(VertexWeight {
                start_vertex: new_index,
                end_vertex: new_index,
                ..*weight
            }),
            Some(_) => {}
            None if chunk.vertex_weights.is_empty() => {}
            None => {
                return Err(Error::VertexWeightMissing {
                    chunk: chunk_index,
                    vertex: local,
                });
            }
        }
        tracing::trace!("split vertex {vertex} into {new_index} for a UV seam");
        Ok(())
    }
}

impl MeshAssembler {
    #[must_use]
    pub fn new(texture_width: u32, texture_height: u32) -> Self {
        Self {
            texture_width,
            texture_height,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_strict_weights(mut self, strict: bool) -> Self {
        self.strict_weights = strict;
        self
    }

    /// Assemble `chunks` into a single mesh.
    pub fn assemble(&self, chunks: &[Chunk]) -> Result<Mesh> {
        let capacity: usize = chunks.iter().map(|c| c.vertices.len()).sum();
        let mut builder = MeshBuilder::default();
        builder.mesh.positions.reserve(capacity);
        builder.mesh.uvs.reserve(capacity);

        let mut v_start = 0;
        for (index, chunk) in chunks.iter().enumerate() {
            v_start += self.add_chunk(&mut builder, index, chunk, v_start)?;
        }

        let mesh = builder.mesh;
        tracing::debug!(
            "assembled {} chunks: {} vertices, {} triangles",
            chunks.len(),
            mesh.positions.len(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    /// Append one chunk, returning the number of vertices it added.
    fn add_chunk(&self, builder: &mut MeshBuilder, index: usize, chunk: &Chunk, v_start: usize) -> Result<usize> {
        let Some(tag) = chunk.gif_tag0.as_ref() else {
            tracing::debug!("chunk {index} has no GIF tag, skipping");
            return Ok(0);
        };
        if tag.primitive_type() != PRIM_TRIANGLE_STRIP {
            return Err(Error::UnsupportedPrimitive {
                chunk: index,
                prim: tag.prim,
            });
        }

        let mesh = &mut builder.mesh;
        for vertex in &chunk.vertices {
            mesh.positions.push(Vec3::new(
                f32::from(vertex.x) / POSITION_SCALE,
                f32::from(vertex.y) / POSITION_SCALE,
                f32::from(vertex.z) / POSITION_SCALE,
            ));
            mesh.uvs.push(UNSET_UV);
        }
        for normal in &chunk.normals {
            mesh.normals.push(Vec3::new(
                f32::from(normal.x) / NORMAL_SCALE,
                f32::from(normal.y) / NORMAL_SCALE,
                f32::from(normal.z) / NORMAL_SCALE,
            ));
        }

        self.add_weights(&mut mesh.vertex_weights, index, chunk, v_start)?;

        let vstrip = build_strip(index, chunk, usize::from(tag.nloop), u32::from(tag.nreg))?;
        let mut num_verts = chunk.vertices.len();
        let u_div = f64::from(self.texture_width) * 16.0;
        let v_div = f64::from(self.texture_height) * 16.0;

        for i in 2..vstrip.len() {
            let mut corners = [
                (v_start + (vstrip[i - 2] & VERTEX_MASK) as usize, i - 2),
                (v_start + (vstrip[i - 1] & VERTEX_MASK) as usize, i - 1),
                (v_start + (vstrip[i] & VERTEX_MASK) as usize, i),
            ];
            // Alternate triangles of a strip wind the other way.
            if (i - 2) & 1 == 1 {
                corners.swap(0, 1);
            }
            if vstrip[i] & SKIP != 0 {
                continue;
            }

            // Every corner is compared against the UVs as they were before
            // this triangle; the new UVs are stored only once all three
            // corners are resolved.
            let mut resolved = [(0usize, Vec2::ZERO); 3];
            for (slot, &(vertex, uv_index)) in corners.iter().enumerate() {
                let count = builder.mesh.positions.len();
                if vertex >= count {
                    return Err(Error::VertexOutOfRange {
                        chunk: index,
                        vertex,
                        count,
                    });
                }
                let raw = chunk.uvs.get(uv_index).ok_or(Error::UvOutOfRange {
                    chunk: index,
                    index: uv_index,
                    count: chunk.uvs.len(),
                })?;
                let uv = normalise_uv(*raw, u_div, v_div);

                let stored = builder.mesh.uvs[vertex];
                let mut target = vertex;
                if stored != UNSET_UV && stored != uv {
                    target = v_start + num_verts;
                    num_verts += 1;
                    builder.duplicate(index, chunk, v_start, vertex, target)?;
                }
                resolved[slot] = (target, uv);
            }

            for &(target, uv) in &resolved {
                builder.mesh.uvs[target] = uv;
            }
            let [a, b, c] = resolved.map(|(target, _)| target as u32);
            builder.mesh.triangle_indices.extend_from_slice(&[a, b, c, b, a, c]);
        }

        Ok(num_verts)
    }

    /// Re-base the chunk's weight ranges into mesh indices.
    fn add_weights(&self, out: &mut Vec<VertexWeight>, index: usize, chunk: &Chunk, v_start: usize) -> Result<()> {
        let count = chunk.vertices.len();
        if count == 0 {
            return Ok(());
        }
        for weight in &chunk.vertex_weights {
            if weight.start_vertex >= count {
                continue;
            }
            let mut end = weight.end_vertex;
            if end >= count {
                if self.strict_weights {
                    return Err(Error::VertexWeightOutOfRange {
                        chunk: index,
                        start: weight.start_vertex,
                        end,
                        count,
                    });
                }
                tracing::warn!(
                    "chunk {index}: weight range {}..={end} clamped to {} vertices",
                    weight.start_vertex,
                    count
                );
                end = count - 1;
            }
            out.push(VertexWeight {
                start_vertex: weight.start_vertex + v_start,
                end_vertex: end + v_start,
                ..*weight
            });
        }
        Ok(())
    }
}

/// Reconstruct the strip index table for `chunk`.
///
/// Each entry holds a chunk-local vertex index in its low bits and
/// [`STRIP_SKIP`] when no triangle ends at that position.
fn build_strip(index: usize, chunk: &Chunk, nloop: usize, regs_per_vertex: u32) -> Result<Vec<u32>> {
    let mut vstrip = vec![0u32; nloop];
    let slot_of = |value: u16| ((u32::from(value) & SLOT_MASK) / regs_per_vertex) as usize;

    for (i, vloc) in chunk.vlocs.iter().enumerate().skip(2) {
        let v = i - 2;
        let (src, dst) = (slot_of(vloc.v2), slot_of(vloc.v3));
        if src < nloop && dst < nloop {
            vstrip[dst] = (vstrip[src] & SLOT_MASK) | (u32::from(vloc.v3) & SKIP);
        }

        let slot = slot_of(vloc.v1);
        if v < chunk.vertices.len() && slot < nloop {
            vstrip[slot] = v as u32 | (u32::from(vloc.v1) & SKIP);
        }
    }

    let extra = &chunk.extra_vlocs;
    let pairs = extra.first().map_or(0, |&n| usize::from(n));
    if pairs * 4 + 4 > extra.len() && pairs > 0 {
        return Err(Error::ExtraVlocsTruncated {
            chunk: index,
            pairs,
            len: extra.len(),
        });
    }
    for pair in 0..pairs {
        let base = pair * 4 + 4;
        for (src, dst) in [(extra[base], extra[base + 1]), (extra[base + 2], extra[base + 3])] {
            let (from, to) = (slot_of(src), slot_of(dst));
            let bad = if from >= nloop { from } else { to };
            if from >= nloop || to >= nloop {
                return Err(Error::StripIndexOutOfRange {
                    chunk: index,
                    slot: bad,
                    nloop,
                });
            }
            vstrip[to] = (u32::from(dst) & SKIP) | (vstrip[from] & SLOT_MASK);
        }
    }

    Ok(vstrip)
}

/// Scale a raw UV to texture space and wrap coordinates past 1.0.
fn normalise_uv(raw: Uv, u_div: f64, v_div: f64) -> Vec2 {
    let tile = |x: f64| if x > 1.0 { x % 1.0 } else { x };
    Vec2::new(
        tile(f64::from(raw.u) / u_div) as f32,
        tile(f64::from(raw.v) / v_div) as f32,
    )
}
