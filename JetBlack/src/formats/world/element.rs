//! World elements
//!
//! Each element places one VIF model in the world. Dark Alliance stores
//! 0x38-byte records with 16-bit positions and an orientation packed into
//! the flags word; Return to Arms and Justice League Heroes store 0x3C-byte
//! records with 32-bit positions and a separate rotation flags field.

use glam::{Mat3, Mat4, Vec3};
use serde::Serialize;

use super::header::CELL_STRIDE;
use crate::error::{Error, Result};
use crate::utils::ByteReader;

pub const V1_ELEMENT_SIZE: usize = 0x38;
pub const V2_ELEMENT_SIZE: usize = 0x3C;

const POSITION_SCALE: f32 = 16.0;
const ANGLE_SCALE: f32 = 32767.0;
const TEXTURE_ENTRY_SIZE: i32 = 0x40;

const FLAG_ROT_FLAGS: i32 = 0x01;
const FLAG_NEG_Y_AXIS: i32 = 0x40;

const ROT_FLIP_X: u32 = 0x01;
const ROT_FLIP_Y: u32 = 0x02;
const ROT_SWAP_XY: u32 = 0x04;

/// How an element is oriented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Axis swaps and flips, see [`Orientation::matrix`].
    Flags(u32),
    /// A rotation angle given as its cosine and sine.
    Angle { cos: f32, sin: f32 },
}

impl Orientation {
    /// Linear part of the element transform.
    ///
    /// Bit 2 swaps x and y, then bit 0 negates the new x and bit 1 the new y.
    /// Angle orientations are carried through but not applied.
    #[must_use]
    pub fn matrix(&self) -> Mat3 {
        let Self::Flags(flags) = *self else {
            return Mat3::IDENTITY;
        };
        let (mut x_axis, mut y_axis) = if flags & ROT_SWAP_XY != 0 {
            (Vec3::Y, Vec3::X)
        } else {
            (Vec3::X, Vec3::Y)
        };
        if flags & ROT_FLIP_X != 0 {
            x_axis.x = -x_axis.x;
            y_axis.x = -y_axis.x;
        }
        if flags & ROT_FLIP_Y != 0 {
            x_axis.y = -x_axis.y;
            y_axis.y = -y_axis.y;
        }
        Mat3::from_cols(x_axis, y_axis, Vec3::Z)
    }
}

/// One placed model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldElement {
    /// Index of the record in the element array.
    pub index: usize,
    pub position: Vec3,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    pub orientation: Orientation,
    pub neg_y_axis: bool,
    /// Low 16 bits of the Dark Alliance flags word.
    pub raw_flags: u16,
    /// 1-based texture number inside the cell's chunk, 0 for none.
    pub texture_number: usize,
    /// Texture cell as `(div, mod)` of `row * 100 + column`.
    pub texture_cell: (i32, i32),
    /// Offset of the element's VIF packet in the world file.
    pub vif_data_offset: usize,
    /// Packet length in quadwords, including its header.
    pub vif_length: usize,
    /// Index into [`WorldData::models`](super::WorldData::models).
    pub model: Option<usize>,
    /// Index into [`WorldData::textures`](super::WorldData::textures).
    pub texture: Option<usize>,
}

impl WorldElement {
    /// Model-to-world transform. The orientation is applied after the
    /// translation.
    #[must_use]
    pub fn transform(&self) -> Mat4 {
        Mat4::from_mat3(self.orientation.matrix()) * Mat4::from_translation(self.position)
    }
}

fn read_vec3(reader: &ByteReader<'_>, at: usize) -> Result<Vec3> {
    Ok(Vec3::new(reader.f32_at(at)?, reader.f32_at(at + 4)?, reader.f32_at(at + 8)?))
}

fn count_field(value: i32, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::InvalidHeader {
        format: "world",
        message: format!("negative {field} {value}"),
    })
}

fn texture_number(raw: i32) -> usize {
    usize::try_from(raw / TEXTURE_ENTRY_SIZE).unwrap_or(0)
}

fn split_cell(cell: i16) -> (i32, i32) {
    let cell = i32::from(cell);
    (cell / CELL_STRIDE, cell % CELL_STRIDE)
}

/// Parse Dark Alliance element `index`.
pub fn parse_v1(reader: &ByteReader<'_>, array_start: usize, index: usize) -> Result<WorldElement> {
    let at = array_start + index * V1_ELEMENT_SIZE;

    let vif_data_offset = count_field(reader.i32_at(at)?, "VIF offset")?;
    let tex2 = reader.i32_at(at + 0x04)?;
    if tex2 != 0 {
        tracing::debug!("element {index}: second texture field {tex2}");
    }
    let vif_length = count_field(reader.i32_at(at + 0x08)?, "VIF length")?;
    let bounds_min = read_vec3(reader, at + 0x0C)?;
    let bounds_max = read_vec3(reader, at + 0x18)?;
    let texture_number = texture_number(reader.i32_at(at + 0x24)?);
    let texture_cell = split_cell(reader.i16_at(at + 0x28)?);
    let position = Vec3::new(
        f32::from(reader.i16_at(at + 0x2A)?),
        f32::from(reader.i16_at(at + 0x2C)?),
        f32::from(reader.i16_at(at + 0x2E)?),
    ) / POSITION_SCALE;

    let flags = reader.i32_at(at + 0x30)?;
    let orientation = if flags & FLAG_ROT_FLAGS != 0 {
        Orientation::Flags(((flags >> 16) & 7) as u32)
    } else {
        Orientation::Angle {
            cos: (flags >> 16) as f32 / ANGLE_SCALE,
            sin: f32::from(reader.i16_at(at + 0x34)?) / ANGLE_SCALE,
        }
    };

    Ok(WorldElement {
        index,
        position,
        bounds_min,
        bounds_max,
        orientation,
        neg_y_axis: flags & FLAG_NEG_Y_AXIS != 0,
        raw_flags: (flags & 0xFFFF) as u16,
        texture_number,
        texture_cell,
        vif_data_offset,
        vif_length,
        model: None,
        texture: None,
    })
}

/// Parse Return to Arms element `index`. Elements without a texture cell
/// are not drawn and come back as `None`.
pub fn parse_v2(reader: &ByteReader<'_>, array_start: usize, index: usize) -> Result<Option<WorldElement>> {
    let at = array_start + index * V2_ELEMENT_SIZE;

    let texture_cell = reader.i16_at(at + 0x34)?;
    if texture_cell == 0 {
        return Ok(None);
    }

    let vif_data_offset = count_field(reader.i32_at(at)?, "VIF offset")?;
    let vif_length = count_field(reader.i32_at(at + 0x04)?, "VIF length")?;
    let bounds_min = read_vec3(reader, at + 0x08)?;
    let bounds_max = read_vec3(reader, at + 0x14)?;
    let texture_number = texture_number(reader.i32_at(at + 0x20)?);
    let flags = reader.i32_at(at + 0x24)?;
    let position = Vec3::new(
        reader.i32_at(at + 0x28)? as f32,
        reader.i32_at(at + 0x2C)? as f32,
        reader.i32_at(at + 0x30)? as f32,
    ) / POSITION_SCALE;
    let rot_flags = reader.u32_at(at + 0x36)?;

    Ok(Some(WorldElement {
        index,
        position,
        bounds_min,
        bounds_max,
        orientation: Orientation::Flags(rot_flags),
        neg_y_axis: flags & FLAG_NEG_Y_AXIS != 0,
        raw_flags: 0,
        texture_number,
        texture_cell: split_cell(texture_cell),
        vif_data_offset,
        vif_length,
        model: None,
        texture: None,
    }))
}
