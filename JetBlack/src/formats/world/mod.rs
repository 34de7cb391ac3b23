//! World geometry
//!
//! A world file is a header, an array of [`WorldElement`]s and the VIF
//! packets they point at. Each element's packet goes through the same chunk
//! pipeline as a `.vif` model; its texture comes from the companion
//! [`WorldTexFile`], addressed by cell:
//!
//! - Dark Alliance worlds carry a [`TextureGrid`] of chunk offsets
//! - later engines look the cell up in the texture file's own directory
//!
//! [`objects`] decodes the `.ob` object definitions that sit beside a world.

pub mod element;
pub mod header;
pub mod objects;

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

pub use element::{Orientation, WorldElement};
pub use header::{TextureGrid, WorldHeader};
pub use objects::{ObjectDef, decode_objects, read_objects};

use crate::config::{DecodeOptions, EngineVersion};
use crate::error::{Error, Result};
use crate::formats::texture::{PixelBuffer, WorldTexFile};
use crate::formats::vif::{Mesh, MeshAssembler, read_chunks};
use crate::utils::ByteReader;

/// Offset of the register count in an element's packet header.
const PACKET_REGISTER_COUNT: usize = 0x10;
const QUADWORD: usize = 0x10;

/// A decoded world.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorldData {
    pub header: WorldHeader,
    #[serde(skip)]
    pub texture_grid: TextureGrid,
    pub elements: Vec<WorldElement>,
    /// Distinct meshes; elements sharing a packet and texture size share one.
    pub models: Vec<Mesh>,
    /// Distinct textures, in the order elements first used them.
    #[serde(skip)]
    pub textures: Vec<PixelBuffer>,
}

impl WorldData {
    #[must_use]
    pub fn model(&self, element: &WorldElement) -> Option<&Mesh> {
        self.models.get(element.model?)
    }

    #[must_use]
    pub fn texture(&self, element: &WorldElement) -> Option<&PixelBuffer> {
        self.textures.get(element.texture?)
    }

    /// Triangles drawn for the whole world, counting shared meshes once per
    /// element.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.elements
            .iter()
            .filter_map(|element| self.model(element))
            .map(Mesh::triangle_count)
            .sum()
    }
}

struct WorldDecoder<'a> {
    reader: ByteReader<'a>,
    options: &'a DecodeOptions,
    tex_file: Option<&'a WorldTexFile>,
    grid: TextureGrid,
    models: Vec<Mesh>,
    textures: Vec<PixelBuffer>,
    model_cache: HashMap<(usize, usize, usize), Option<usize>>,
    texture_cache: HashMap<((i32, i32), usize), Option<usize>>,
}

impl WorldDecoder<'_> {
    fn find_texture(&self, element: &WorldElement) -> Result<Option<PixelBuffer>> {
        let Some(tex_file) = self.tex_file else {
            return Ok(None);
        };
        if element.texture_number == 0 {
            return Ok(None);
        }

        let (div, modulo) = element.texture_cell;
        let found = match self.options.engine_version {
            EngineVersion::DarkAlliance => {
                let chunk = self
                    .grid
                    .chunk_offset(modulo, div)
                    .and_then(|offset| usize::try_from(offset).ok());
                chunk.map_or(Ok(None), |chunk| {
                    tex_file.texture(chunk, element.texture_number).map(Some)
                })
            }
            _ => tex_file.texture_for_cell(div, modulo, element.texture_number),
        };

        match found {
            Err(Error::TextureIndexOutOfRange { index, count }) => {
                tracing::warn!(
                    "element {}: cell ({div}, {modulo}) has {count} textures, wanted {index}",
                    element.index
                );
                Ok(None)
            }
            other => other,
        }
    }

    fn texture(&mut self, element: &WorldElement) -> Result<Option<usize>> {
        let key = (element.texture_cell, element.texture_number);
        if let Some(&cached) = self.texture_cache.get(&key) {
            return Ok(cached);
        }
        let index = self.find_texture(element)?.map(|image| {
            self.textures.push(image);
            self.textures.len() - 1
        });
        self.texture_cache.insert(key, index);
        Ok(index)
    }

    fn model(&mut self, element: &WorldElement, texture: Option<usize>) -> Result<Option<usize>> {
        let (width, height) = texture.and_then(|index| self.textures.get(index)).map_or(
            (
                self.options.texture_width as usize,
                self.options.texture_height as usize,
            ),
            |image| (image.width, image.height),
        );
        let key = (element.vif_data_offset, width, height);
        if let Some(&cached) = self.model_cache.get(&key) {
            return Ok(cached);
        }

        let registers = usize::from(self.reader.u8_at(element.vif_data_offset + PACKET_REGISTER_COUNT)?);
        let header_len = (registers + 2) * QUADWORD;
        let packet_len = element.vif_length.saturating_mul(QUADWORD);
        let index = if packet_len > header_len {
            let packet = self
                .reader
                .bytes_at(element.vif_data_offset + header_len, packet_len - header_len)?;
            let assembler = MeshAssembler::new(
                u32::try_from(width).unwrap_or(u32::MAX),
                u32::try_from(height).unwrap_or(u32::MAX),
            )
            .with_strict_weights(self.options.strict_weights);
            self.models.push(assembler.assemble(&read_chunks(packet)?)?);
            Some(self.models.len() - 1)
        } else {
            tracing::debug!("element {}: empty packet", element.index);
            None
        };
        self.model_cache.insert(key, index);
        Ok(index)
    }
}

/// Decode a world file. `textures` is the matching world texture file, if
/// the caller has it; without one every element is left untextured.
pub fn decode_world(data: &[u8], textures: Option<&WorldTexFile>, options: &DecodeOptions) -> Result<WorldData> {
    let reader = ByteReader::new(data);
    let header = WorldHeader::parse(&reader)?;
    let grid = TextureGrid::read(options.engine_version, &reader, &header);

    let mut elements = Vec::new();
    for index in 0..header.num_elements {
        let element = match options.engine_version {
            EngineVersion::DarkAlliance => Some(element::parse_v1(&reader, header.element_array_start, index)?),
            _ => element::parse_v2(&reader, header.element_array_start, index)?,
        };
        elements.extend(element);
    }

    let mut decoder = WorldDecoder {
        reader,
        options,
        tex_file: textures,
        grid,
        models: Vec::new(),
        textures: Vec::new(),
        model_cache: HashMap::new(),
        texture_cache: HashMap::new(),
    };
    for element in &mut elements {
        element.texture = decoder.texture(element)?;
        element.model = decoder.model(element, element.texture)?;
    }

    tracing::info!(
        "decoded world: {} elements, {} models, {} textures",
        elements.len(),
        decoder.models.len(),
        decoder.textures.len()
    );
    Ok(WorldData {
        header,
        texture_grid: decoder.grid,
        elements,
        models: decoder.models,
        textures: decoder.textures,
    })
}

/// Read and decode the world file at `path`.
pub fn read_world<P: AsRef<Path>>(path: P, textures: Option<&WorldTexFile>, options: &DecodeOptions) -> Result<WorldData> {
    decode_world(&std::fs::read(path)?, textures, options)
}
