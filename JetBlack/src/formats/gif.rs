//! GIF tag codec
//!
//! A GIF tag is the 128-bit header the PS2 GIF unit expects in front of
//! register data. Meshes embed them in the VIF stream to describe each
//! triangle strip; textures use them to frame GS register writes and
//! IMAGE transfers.
//!
//! Layout (little-endian):
//!
//! | Bits    | Field                                   |
//! |---------|-----------------------------------------|
//! | 0-14    | `nloop`                                 |
//! | 15      | `eop`                                   |
//! | 46      | `pre`                                   |
//! | 47-56   | `prim`                                  |
//! | 58-59   | `flg`                                   |
//! | 60-63   | `nreg` (0 means 16)                     |
//! | 64-127  | 4-bit register descriptors              |

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::utils::ByteReader;

/// Size of an encoded GIF tag in bytes.
pub const GIF_TAG_SIZE: usize = 0x10;

/// Data format selected by the `flg` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GifFlag {
    Packed,
    RegList,
    Image,
    Disable,
}

impl GifFlag {
    fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => GifFlag::Packed,
            1 => GifFlag::RegList,
            2 => GifFlag::Image,
            _ => GifFlag::Disable,
        }
    }

    fn bits(self) -> u32 {
        match self {
            GifFlag::Packed => 0,
            GifFlag::RegList => 1,
            GifFlag::Image => 2,
            GifFlag::Disable => 3,
        }
    }
}

impl fmt::Display for GifFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GifFlag::Packed => "PACKED",
            GifFlag::RegList => "REGLIST",
            GifFlag::Image => "IMAGE",
            GifFlag::Disable => "DISABLE",
        };
        f.write_str(name)
    }
}

/// A decoded GIF tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GifTag {
    pub nloop: u16,
    pub eop: bool,
    pub pre: bool,
    /// Primitive type and attributes (10 bits). The low 3 bits are the primitive.
    pub prim: u16,
    pub flg: GifFlag,
    /// Register count, already mapped so that an encoded 0 reads as 16.
    pub nreg: u8,
    pub regs: Vec<u8>,
}

impl GifTag {
    /// Parse a tag from the 16 bytes at `offset`.
    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let reader = ByteReader::new(data);
        let low32 = reader.u32_at(offset)?;
        let next32 = reader.u32_at(offset + 4)?;
        let regs64 = reader.u32_at(offset + 8)?;
        let regs96 = reader.u32_at(offset + 12)?;

        let nreg = match (next32 >> 28) & 0xF {
            0 => 16,
            n => n as u8,
        };

        let regs = (0..nreg)
            .map(|reg| {
                let word = if reg > 7 { regs96 } else { regs64 };
                ((word >> (u32::from(reg & 7) * 4)) & 0xF) as u8
            })
            .collect();

        Ok(Self {
            nloop: (low32 & 0x7FFF) as u16,
            eop: low32 & 0x8000 != 0,
            pre: (next32 >> 14) & 1 == 1,
            prim: ((next32 >> 15) & 0x3FF) as u16,
            flg: GifFlag::from_bits(next32 >> 26),
            nreg,
            regs,
        })
    }

    /// Encode back to the 16-byte wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; GIF_TAG_SIZE] {
        let low32 = u32::from(self.nloop & 0x7FFF) | (u32::from(self.eop) << 15);
        let next32 = (u32::from(self.pre) << 14)
            | (u32::from(self.prim & 0x3FF) << 15)
            | (self.flg.bits() << 26)
            | ((u32::from(self.nreg) & 0xF) << 28);

        let mut regs64 = 0u32;
        let mut regs96 = 0u32;
        for (i, &reg) in self.regs.iter().enumerate().take(16) {
            let shift = (i as u32 & 7) * 4;
            if i > 7 {
                regs96 |= u32::from(reg & 0xF) << shift;
            } else {
                regs64 |= u32::from(reg & 0xF) << shift;
            }
        }

        let mut out = [0u8; GIF_TAG_SIZE];
        out[0..4].copy_from_slice(&low32.to_le_bytes());
        out[4..8].copy_from_slice(&next32.to_le_bytes());
        out[8..12].copy_from_slice(&regs64.to_le_bytes());
        out[12..16].copy_from_slice(&regs96.to_le_bytes());
        out
    }

    /// Bytes covered by this tag and the data that follows it.
    #[must_use]
    pub fn length(&self) -> usize {
        let nloop = usize::from(self.nloop);
        if self.is_image() {
            (nloop + 1) * GIF_TAG_SIZE
        } else {
            (nloop * usize::from(self.nreg) + 1) * GIF_TAG_SIZE
        }
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.flg == GifFlag::Image
    }

    /// The primitive type (`prim & 7`); 4 is a triangle strip.
    #[must_use]
    pub fn primitive_type(&self) -> u16 {
        self.prim & 0x07
    }
}

impl fmt::Display for GifTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nloop: {}, eop: {}, pre: {}, prim: {:#x}, flg: {}, nreg: {}, regs: {:?}",
            self.nloop, self.eop, self.pre, self.prim, self.flg, self.nreg, self.regs
        )
    }
}
