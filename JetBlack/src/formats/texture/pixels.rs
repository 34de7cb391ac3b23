//! Decoded pixel buffers

use serde::Serialize;

use super::palette::PalEntry;
use crate::error::{Error, Result};

/// A row-major image of palette-resolved pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<PalEntry>,
}

impl PixelBuffer {
    /// A buffer filled with `PalEntry::default()`.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![PalEntry::default(); width * height],
        }
    }

    /// Resolve 8-bit indices through `palette`.
    ///
    /// `indices.len()` must be a multiple of `width`; the height follows from it.
    pub fn from_indices(width: usize, indices: &[u8], palette: &[PalEntry]) -> Result<Self> {
        let pixels = indices
            .iter()
            .map(|&idx| {
                palette
                    .get(usize::from(idx))
                    .copied()
                    .ok_or_else(|| Error::UnsupportedTexture {
                        message: format!(
                            "pixel index {idx} outside the {} entry palette",
                            palette.len()
                        ),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let height = if width == 0 { 0 } else { pixels.len() / width };
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<&PalEntry> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x)
    }

    /// Write a pixel, failing if it lies outside the buffer.
    pub fn set(&mut self, x: usize, y: usize, pixel: PalEntry) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::UnsupportedTexture {
                message: format!(
                    "pixel ({x}, {y}) outside the {}x{} image",
                    self.width, self.height
                ),
            });
        }
        self.pixels[y * self.width + x] = pixel;
        Ok(())
    }

    /// Copy the top-left `width` x `height` region. Areas the source does
    /// not cover stay at `PalEntry::default()`.
    #[must_use]
    pub fn crop(&self, width: usize, height: usize) -> PixelBuffer {
        let mut out = PixelBuffer::new(width, height);
        for y in 0..height.min(self.height) {
            for x in 0..width.min(self.width) {
                out.pixels[y * width + x] = self.pixels[y * self.width + x];
            }
        }
        out
    }

    /// Flatten to RGBA8 with display alpha.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(PalEntry::to_rgba).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_indices_and_rgba() {
        let palette = [PalEntry::new(10, 20, 30, 0), PalEntry::new(1, 2, 3, 0x80)];
        let buffer = PixelBuffer::from_indices(2, &[0, 1, 1, 0], &palette).unwrap();
        assert_eq!((buffer.width, buffer.height), (2, 2));
        assert_eq!(buffer.get(1, 0), Some(&palette[1]));
        assert_eq!(
            buffer.to_rgba8()[..8],
            [10, 20, 30, 255, 1, 2, 3, 0x7F]
        );
    }

    #[test]
    fn test_index_outside_palette() {
        let palette = [PalEntry::default()];
        assert!(PixelBuffer::from_indices(1, &[1], &palette).is_err());
    }

    #[test]
    fn test_crop() {
        let mut buffer = PixelBuffer::new(4, 4);
        buffer.set(1, 1, PalEntry::new(9, 9, 9, 0)).unwrap();
        buffer.set(3, 3, PalEntry::new(7, 7, 7, 0)).unwrap();
        let cropped = buffer.crop(2, 3);
        assert_eq!((cropped.width, cropped.height), (2, 3));
        assert_eq!(cropped.get(1, 1), Some(&PalEntry::new(9, 9, 9, 0)));
        assert_eq!(cropped.pixels.len(), 6);
        assert!(buffer.set(4, 0, PalEntry::default()).is_err());
    }
}
