//! CLUT palette reading and un-swizzling

use serde::Serialize;

use crate::error::Result;
use crate::utils::ByteReader;

/// One RGBA palette entry as stored by the GS.
///
/// The stored alpha is inverted for display: [`PalEntry::display_alpha`]
/// returns `255 - a`, so a stored `0x00` is opaque and a stored `0x80`
/// comes out as `0x7F`, close to fully transparent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PalEntry {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl PalEntry {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Standard alpha for display (`255 - a`).
    #[must_use]
    pub const fn display_alpha(&self) -> u8 {
        255 - self.a
    }

    /// RGBA bytes with the alpha converted for display.
    #[must_use]
    pub const fn to_rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.display_alpha()]
    }
}

/// Read `count` consecutive RGBA entries starting at `offset`.
pub fn read_palette(data: &[u8], offset: usize, count: usize) -> Result<Vec<PalEntry>> {
    let bytes = ByteReader::new(data).bytes_at(offset, count * 4)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|px| PalEntry::new(px[0], px[1], px[2], px[3]))
        .collect())
}

/// Reorder a 256-entry CSM1 palette into linear index order.
///
/// Within every 32-entry group the second and third runs of eight are
/// swapped. Palettes of any other size are returned unchanged. The
/// permutation is its own inverse.
#[must_use]
pub fn unswizzle_palette(palette: Vec<PalEntry>) -> Vec<PalEntry> {
    if palette.len() != 256 {
        return palette;
    }

    let mut unswizzled = palette.clone();
    for group in (0..256).step_by(32) {
        unswizzled[group + 8..group + 16].copy_from_slice(&palette[group + 16..group + 24]);
        unswizzled[group + 16..group + 24].copy_from_slice(&palette[group + 8..group + 16]);
    }
    unswizzled
}
