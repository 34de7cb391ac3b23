//! Pixel buffer to PNG

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::{ImageBuffer, RgbaImage};

use crate::error::{Error, Result};
use crate::formats::texture::PixelBuffer;

/// Encode a pixel buffer as PNG bytes, converting alpha for display.
pub fn pixel_buffer_to_png_bytes(buffer: &PixelBuffer) -> Result<Vec<u8>> {
    let width = u32::try_from(buffer.width).map_err(|_| Error::PngEncodeFailed {
        message: format!("width {} is too large", buffer.width),
    })?;
    let height = u32::try_from(buffer.height).map_err(|_| Error::PngEncodeFailed {
        message: format!("height {} is too large", buffer.height),
    })?;

    let img: RgbaImage =
        ImageBuffer::from_raw(width, height, buffer.to_rgba8()).ok_or_else(|| {
            Error::PngEncodeFailed {
                message: format!("pixel data does not fill a {width}x{height} image"),
            }
        })?;

    let mut png_data = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_data);
    img.write_with_encoder(encoder)
        .map_err(|e| Error::PngEncodeFailed {
            message: e.to_string(),
        })?;

    Ok(png_data)
}

/// Write a pixel buffer to a PNG file.
pub fn write_png<P: AsRef<Path>>(buffer: &PixelBuffer, path: P) -> Result<()> {
    let png_data = pixel_buffer_to_png_bytes(buffer)?;
    let mut output = BufWriter::new(File::create(path.as_ref())?);
    output.write_all(&png_data)?;
    output.flush()?;
    tracing::info!(
        "wrote {}x{} PNG to {}",
        buffer.width,
        buffer.height,
        path.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::texture::PalEntry;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_png_round_trip_through_image() {
        let mut buffer = PixelBuffer::new(2, 1);
        buffer.set(1, 0, PalEntry::new(200, 100, 50, 0x80)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        write_png(&buffer, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(1, 0).0, [200, 100, 50, 0x7F]);
        assert_eq!(img.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn test_empty_buffer_fails() {
        let buffer = PixelBuffer {
            width: 4,
            height: 4,
            pixels: Vec::new(),
        };
        assert!(matches!(
            pixel_buffer_to_png_bytes(&buffer),
            Err(Error::PngEncodeFailed { .. })
        ));
    }
}
