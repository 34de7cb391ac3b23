//! VIF command stream interpreter
//!
//! Walks a VIF packet and collects the data each MSCAL hands to the vector
//! unit into a [`Chunk`]. Commands are 32-bit words:
//!
//! | Bits    | Contents                  |
//! |---------|---------------------------|
//! | `0..16` | immediate                 |
//! | `16..24`| count                     |
//! | `24..31`| command                   |
//!
//! UV data for a chunk arrives after its MSCAL, so the interpreter keeps the
//! most recently sealed chunk open for UNPACK v2-16 until the next MSCAL.

use super::types::{Chunk, PackedNormal, Uv, VLoc, Vertex, VertexWeight};
use crate::error::{Error, Result};
use crate::formats::gif::{GIF_TAG_SIZE, GifTag};
use crate::utils::{ByteReader, align_up};

// =============================================================================
// COMMANDS
// =============================================================================

const NOP: u8 = 0x00;
const STCYCL: u8 = 0x01;
const ITOP: u8 = 0x04;
const STMOD: u8 = 0x05;
const FLUSH: u8 = 0x11;
const MSCAL: u8 = 0x14;
const STMASK: u8 = 0x20;
const DIRECT: u8 = 0x50;

const UNPACK_MASK: u8 = 0x60;

const IMM_FLAG: u16 = 0x8000;
const IMM_USN: u16 = 0x4000;
const IMM_ADDR: u16 = 0x01FF;

/// Microcode programs the mesh layout is known for.
const KNOWN_MICROCODE: [u16; 3] = [66, 68, 70];

const SINGLE_BONE: u8 = 0xFF;

/// One decoded command word.
#[derive(Debug, Clone, Copy)]
struct Command {
    offset: usize,
    immediate: u16,
    count: u8,
    code: u8,
}

impl Command {
    fn read(reader: &ByteReader<'_>, offset: usize) -> Result<Self> {
        let word = reader.bytes_at(offset, 4)?;
        Ok(Self {
            offset,
            immediate: u16::from_le_bytes([word[0], word[1]]),
            count: word[2],
            code: word[3] & 0x7F,
        })
    }

    fn is_unpack(self) -> bool {
        self.code & UNPACK_MASK == UNPACK_MASK
    }
}

/// Interpreter state: the chunk being filled and the last sealed chunk.
struct VifInterpreter<'a> {
    reader: ByteReader<'a>,
    chunks: Vec<Chunk>,
    sealed: Option<Chunk>,
    open: Chunk,
}

/// Decode a VIF packet into its chunks.
///
/// Data after the final MSCAL never reaches the vector unit and is dropped.
pub fn read_chunks(data: &[u8]) -> Result<Vec<Chunk>> {
    let mut interpreter = VifInterpreter {
        reader: ByteReader::new(data),
        chunks: Vec::new(),
        sealed: None,
        open: Chunk::default(),
    };
    interpreter.run()?;

    let VifInterpreter {
        mut chunks, sealed, open, ..
    } = interpreter;
    chunks.extend(sealed);
    if open != Chunk::default() {
        tracing::debug!("discarding data after the final MSCAL");
    }
    tracing::debug!("read {} chunks", chunks.len());
    Ok(chunks)
}

impl VifInterpreter<'_> {
    fn run(&mut self) -> Result<()> {
        let mut offset = 0;
        while offset < self.reader.len() {
            let command = Command::read(&self.reader, offset)?;
            offset = self.execute(command)?;
        }
        Ok(())
    }

    /// Execute one command and return the offset of the next.
    fn execute(&mut self, cmd: Command) -> Result<usize> {
        let next = cmd.offset + 4;
        match cmd.code {
            NOP => {
                tracing::trace!("{:#06x} NOP", cmd.offset);
                Ok(next)
            }
            STCYCL => {
                tracing::trace!(
                    "{:#06x} STCYCL: WL: {} CL: {}",
                    cmd.offset,
                    cmd.immediate >> 8,
                    cmd.immediate & 0xFF
                );
                Ok(next)
            }
            ITOP => {
                tracing::trace!("{:#06x} ITOP: {}", cmd.offset, cmd.immediate);
                Ok(next)
            }
            STMOD => {
                tracing::trace!("{:#06x} STMOD: {}", cmd.offset, cmd.immediate);
                Ok(next)
            }
            FLUSH => {
                tracing::trace!("{:#06x} FLUSH", cmd.offset);
                Ok(next)
            }
            STMASK => {
                let mask = self.reader.u32_at(next)?;
                tracing::trace!("{:#06x} STMASK: {mask:#010x}", cmd.offset);
                Ok(next + 4)
            }
            MSCAL => {
                self.seal(cmd.immediate, cmd.offset);
                Ok(next)
            }
            DIRECT => {
                let count = usize::from(cmd.immediate);
                tracing::trace!("{:#06x} DIRECT, {} bytes", cmd.offset, count * GIF_TAG_SIZE);
                for i in 0..count {
                    let tag = GifTag::parse(self.reader.data(), next + i * GIF_TAG_SIZE)?;
                    tracing::debug!("DIRECT GIF tag: {tag}");
                    self.open.direct_gif_tags.push(tag);
                }
                Ok(next + count * GIF_TAG_SIZE)
            }
            _ if cmd.is_unpack() => self.unpack(cmd),
            code => Err(Error::UnknownVifCommand {
                command: code,
                offset: cmd.offset,
            }),
        }
    }

    fn seal(&mut self, mscal_id: u16, offset: usize) {
        tracing::trace!("{offset:#06x} MSCAL: {mscal_id}");
        if !KNOWN_MICROCODE.contains(&mscal_id) {
            tracing::warn!("microcode {mscal_id} at {offset:#x} is not a known mesh program");
        }

        let mut chunk = std::mem::take(&mut self.open);
        chunk.mscal_id = mscal_id;
        if let Some(previous) = self.sealed.replace(chunk) {
            self.chunks.push(previous);
        }
    }

    fn unpack(&mut self, cmd: Command) -> Result<usize> {
        let vn = (cmd.code >> 2) & 3;
        let vl = cmd.code & 3;
        let usn = cmd.immediate & IMM_USN != 0;
        let count = usize::from(cmd.count);
        let offset = cmd.offset + 4;

        tracing::trace!(
            "{:#06x} UNPACK: vn: {vn}, vl: {vl}, addr: {}, num: {count}{}{}{}",
            cmd.offset,
            cmd.immediate & IMM_ADDR,
            if cmd.immediate & IMM_FLAG != 0 { ", flag" } else { "" },
            if usn { ", unsigned" } else { "" },
            if cmd.code & 0x10 != 0 { ", mask" } else { "" },
        );

        match (vn, vl) {
            (1, 1) => self.unpack_uvs(offset, count),
            (2, 1) => self.unpack_v3_16(offset, count, usn),
            (2, 2) => self.unpack_normals(offset, count),
            (3, 0) => self.unpack_gif_tags(offset, cmd.count),
            (3, 1) => self.unpack_extra_vlocs(offset, count, usn),
            (3, 2) => self.unpack_weights(offset, count),
            _ => Err(Error::UnsupportedUnpack {
                vn,
                vl,
                offset: cmd.offset,
            }),
        }
    }

    /// v2-16: texture coordinates for the previously sealed chunk.
    fn unpack_uvs(&mut self, offset: usize, count: usize) -> Result<usize> {
        let Some(chunk) = self.sealed.as_mut() else {
            tracing::debug!("skipping {count} UVs at {offset:#x} with no sealed chunk");
            return Ok(offset + count * 4);
        };
        for i in 0..count {
            let at = offset + i * 4;
            chunk.uvs.push(Uv {
                u: self.reader.i16_at(at)?,
                v: self.reader.i16_at(at + 2)?,
            });
        }
        Ok(offset + count * 4)
    }

    /// v3-16: signed vertices, or unsigned vlocs when `usn` is set.
    fn unpack_v3_16(&mut self, offset: usize, count: usize, usn: bool) -> Result<usize> {
        for i in 0..count {
            let at = offset + i * 6;
            if usn {
                self.open.vlocs.push(VLoc {
                    v1: self.reader.u16_at(at)?,
                    v2: self.reader.u16_at(at + 2)?,
                    v3: self.reader.u16_at(at + 4)?,
                });
            } else {
                self.open.vertices.push(Vertex {
                    x: self.reader.i16_at(at)?,
                    y: self.reader.i16_at(at + 2)?,
                    z: self.reader.i16_at(at + 4)?,
                });
            }
        }
        Ok(align_up(offset + count * 6, 4))
    }

    /// v3-8: packed normals.
    fn unpack_normals(&mut self, offset: usize, count: usize) -> Result<usize> {
        let bytes = self.reader.bytes_at(offset, count * 3)?;
        self.open
            .normals
            .extend(bytes.chunks_exact(3).map(|n| PackedNormal {
                x: n[0] as i8,
                y: n[1] as i8,
                z: n[2] as i8,
            }));
        Ok(offset + align_up(count * 3, 4))
    }

    /// v4-32: the GIF tag(s) the microcode will emit.
    fn unpack_gif_tags(&mut self, offset: usize, count: u8) -> Result<usize> {
        let data = self.reader.data();
        match count {
            1 => {
                let tag = GifTag::parse(data, offset)?;
                tracing::debug!("{offset:#06x} GifTag: {tag}");
                self.open.gif_tag0 = Some(tag);
            }
            2 => {
                let tag0 = GifTag::parse(data, offset)?;
                let tag1 = GifTag::parse(data, offset + GIF_TAG_SIZE)?;
                tracing::debug!("{offset:#06x} GifTag0: {tag0}");
                tracing::debug!("{offset:#06x} GifTag1: {tag1}");
                self.open.gif_tag0 = Some(tag0);
                self.open.gif_tag1 = Some(tag1);
            }
            _ => return Err(Error::UnexpectedGifTagCount { count, offset }),
        }
        Ok(offset + usize::from(count) * GIF_TAG_SIZE)
    }

    /// v4-16: the strip remap table. Only the unsigned form carries data.
    fn unpack_extra_vlocs(&mut self, offset: usize, count: usize, usn: bool) -> Result<usize> {
        let len = count * 4;
        if usn {
            self.open.extra_vlocs = (0..len)
                .map(|i| self.reader.u16_at(offset + i * 2))
                .collect::<Result<_>>()?;
        } else {
            tracing::debug!("ignoring signed v4-16 data at {offset:#x}");
        }
        Ok(offset + len * 2)
    }

    /// v4-8: skinning records. Each record covers a run of vertices;
    /// two-bone records whose weights do not sum to 255 spill into a second
    /// record that holds bones three and four.
    fn unpack_weights(&mut self, offset: usize, count: usize) -> Result<usize> {
        let mut reader = ByteReader::at(self.reader.data(), offset);
        let mut weights = Vec::new();
        let mut cur_vertex = 0usize;

        let mut i = 0;
        while i < count {
            let start_vertex = cur_vertex;
            let mut bones = [0u8; 4];
            let mut bone_weights = [0u8; 4];

            bones[0] = reader.read_u8()? / 4;
            bone_weights[0] = reader.read_u8()?;
            let bone2 = reader.read_u8()?;

            if bone2 == SINGLE_BONE {
                bones[1] = SINGLE_BONE;
                cur_vertex += usize::from(reader.read_u8()?);
            } else {
                bones[1] = bone2 / 4;
                bone_weights[1] = reader.read_u8()?;
                cur_vertex += 1;

                if u16::from(bone_weights[0]) + u16::from(bone_weights[1]) < 255 {
                    i += 1;
                    bones[2] = reader.read_u8()? / 4;
                    bone_weights[2] = reader.read_u8()?;
                    let bone4 = reader.read_u8()?;
                    let weight4 = reader.read_u8()?;
                    if bone4 == SINGLE_BONE {
                        bones[3] = SINGLE_BONE;
                    } else {
                        bones[3] = bone4 / 4;
                        bone_weights[3] = weight4;
                    }
                }
            }

            if cur_vertex > start_vertex {
                weights.push(VertexWeight {
                    start_vertex,
                    end_vertex: cur_vertex - 1,
                    bones,
                    weights: bone_weights,
                });
            } else {
                tracing::trace!("empty weight run at vertex {start_vertex}");
            }
            i += 1;
        }

        self.open.vertex_weights = weights;
        Ok(reader.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::gif::GifFlag;
    use pretty_assertions::assert_eq;

    /// Builds VIF packets one command at a time.
    #[derive(Default)]
    struct VifWriter {
        pub data: Vec<u8>,
    }

    impl VifWriter {
        pub fn command(&mut self, code: u8, count: u8, immediate: u16) -> &mut Self {
            self.data.extend_from_slice(&immediate.to_le_bytes());
            self.data.push(count);
            self.data.push(code);
            self
        }

        pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
            self.data.extend_from_slice(bytes);
            self
        }

        pub fn pad(&mut self) -> &mut Self {
            while self.data.len() % 4 != 0 {
                self.data.push(0);
            }
            self
        }

        pub fn mscal(&mut self, id: u16) -> &mut Self {
            self.command(MSCAL, 0, id)
        }
    }

    fn strip_tag() -> [u8; 16] {
        GifTag {
            nloop: 4,
            eop: true,
            pre: true,
            prim: 4,
            flg: GifFlag::Packed,
            nreg: 3,
            regs: vec![2, 1, 5],
        }
        .encode()
    }

    #[test]
    fn test_uvs_attach_to_sealed_chunk() {
        let mut w = VifWriter::default();
        w.command(0x6C, 1, 0).bytes(&strip_tag());
        w.command(0x69, 2, 0).bytes(&[1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0]);
        w.mscal(66);
        w.command(0x65, 2, 0).bytes(&[16, 0, 32, 0, 48, 0, 64, 0]);
        w.command(NOP, 0, 0);
        w.mscal(68);

        let chunks = read_chunks(&w.data).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].mscal_id, 66);
        assert_eq!(chunks[0].vertices.len(), 2);
        assert_eq!(chunks[0].vertices[1], Vertex { x: 4, y: 5, z: 6 });
        assert_eq!(chunks[0].uvs, vec![Uv { u: 16, v: 32 }, Uv { u: 48, v: 64 }]);
        assert_eq!(chunks[0].gif_tag0.as_ref().map(|t| t.nloop), Some(4));
        assert!(chunks[1].vertices.is_empty());
    }

    #[test]
    fn test_uvs_before_any_mscal_are_skipped() {
        let mut w = VifWriter::default();
        w.command(0x65, 1, 0).bytes(&[1, 0, 2, 0]);
        w.command(0x69, 1, 0).bytes(&[1, 0, 2, 0, 3, 0]).pad();
        w.mscal(66);
        let chunks = read_chunks(&w.data).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].uvs.is_empty());
        assert_eq!(chunks[0].vertices.len(), 1);
    }

    #[test]
    fn test_trailing_open_chunk_is_dropped() {
        let mut w = VifWriter::default();
        w.mscal(66);
        w.command(0x69, 1, 0).bytes(&[1, 0, 2, 0, 3, 0]).pad();
        let chunks = read_chunks(&w.data).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].vertices.is_empty());
    }

    #[test]
    fn test_vlocs_normals_and_extra_vlocs() {
        let mut w = VifWriter::default();
        w.command(0x69, 1, IMM_USN).bytes(&[3, 0, 6, 0, 0x09, 0x80]).pad();
        w.command(0x6A, 2, 0).bytes(&[127, 0x81, 0, 1, 2, 3]).pad();
        w.command(0x6D, 1, IMM_USN).bytes(&[1, 0, 0, 0, 0, 0, 0, 0]);
        w.command(STMASK, 0, 0).bytes(&[0xFF; 4]);
        w.command(STCYCL, 0, 0x0101);
        w.mscal(70);

        let chunks = read_chunks(&w.data).unwrap();
        let chunk = &chunks[0];
        assert_eq!(chunk.vlocs, vec![VLoc { v1: 3, v2: 6, v3: 0x8009 }]);
        assert_eq!(chunk.normals[0], PackedNormal { x: 127, y: -127, z: 0 });
        assert_eq!(chunk.normals[1], PackedNormal { x: 1, y: 2, z: 3 });
        assert_eq!(chunk.extra_vlocs, vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_weight_records() {
        let mut w = VifWriter::default();
        // Run of 3 on bone 2, a full two-bone vertex, then a four-bone vertex.
        w.command(0x6E, 4, 0).bytes(&[
            8, 255, 0xFF, 3, //
            4, 200, 12, 55, //
            4, 100, 12, 100, //
            16, 55, 0xFF, 0,
        ]);
        w.mscal(66);

        let chunks = read_chunks(&w.data).unwrap();
        assert_eq!(
            chunks[0].vertex_weights,
            vec![
                VertexWeight {
                    start_vertex: 0,
                    end_vertex: 2,
                    bones: [2, 0xFF, 0, 0],
                    weights: [255, 0, 0, 0],
                },
                VertexWeight {
                    start_vertex: 3,
                    end_vertex: 3,
                    bones: [1, 3, 0, 0],
                    weights: [200, 55, 0, 0],
                },
                VertexWeight {
                    start_vertex: 4,
                    end_vertex: 4,
                    bones: [1, 3, 4, 0xFF],
                    weights: [100, 100, 55, 0],
                },
            ]
        );
    }

    #[test]
    fn test_direct_tags_go_to_open_chunk() {
        let mut w = VifWriter::default();
        w.command(DIRECT, 0, 1).bytes(&strip_tag());
        w.mscal(66);
        let chunks = read_chunks(&w.data).unwrap();
        assert_eq!(chunks[0].direct_gif_tags.len(), 1);
    }

    #[test]
    fn test_errors() {
        let mut w = VifWriter::default();
        w.command(0x13, 0, 0);
        assert!(matches!(
            read_chunks(&w.data),
            Err(Error::UnknownVifCommand { command: 0x13, offset: 0 })
        ));

        let mut w = VifWriter::default();
        w.command(NOP, 0, 0).command(0x60, 1, 0);
        assert!(matches!(
            read_chunks(&w.data),
            Err(Error::UnsupportedUnpack { vn: 0, vl: 0, offset: 4 })
        ));

        let mut w = VifWriter::default();
        w.command(0x6C, 3, 0).bytes(&[0; 48]);
        assert!(matches!(
            read_chunks(&w.data),
            Err(Error::UnexpectedGifTagCount { count: 3, .. })
        ));

        let mut w = VifWriter::default();
        w.command(0x69, 4, 0).bytes(&[0; 6]);
        assert!(matches!(read_chunks(&w.data), Err(Error::UnexpectedEof { .. })));
    }
}
