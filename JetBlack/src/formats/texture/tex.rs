//! GIF-packet texture decoder (`.tex`)
//!
//! A `.tex` file is the GIF packet the game sends to upload a texture: a
//! palette transfer followed by one or more BITBLTBUF/TRXPOS/TRXREG register
//! writes and IMAGE transfers. Decoding replays those transfers into a
//! [`GsMemory`] and reads the result back in the sampled pixel format.
//!
//! Header:
//!
//! | Offset | Type | Contents                          |
//! |--------|------|-----------------------------------|
//! | `0x00` | i16  | image width                       |
//! | `0x02` | i16  | image height                      |
//! | `0x06` | u16  | GIF packet length in quadwords    |
//! | `0x10` | u32  | offset of the first GIF tag       |

use super::gs_memory::{GS_MEMORY_SIZE, GsMemory, expand_4bit};
use super::palette::{PalEntry, read_palette, unswizzle_palette};
use super::pixels::PixelBuffer;
use crate::error::{Error, Result};
use crate::formats::gif::{GIF_TAG_SIZE, GifTag};
use crate::utils::{ByteReader, align_up};

/// GS register addresses written through A+D packets.
const BITBLTBUF: u32 = 0x50;
const TRXPOS: u32 = 0x51;
const TRXREG: u32 = 0x52;

/// Pixel storage formats.
const PSMCT32: u8 = 0x00;

/// Most pixels video memory can hold, at four bits each.
const MAX_GS_PIXELS: usize = GS_MEMORY_SIZE * 2;

/// Offset of the IMAGE tag in files holding 32-bit pixels directly.
const DIRECT_IMAGE_TAG: usize = 0xC0;
const DIRECT_PIXELS: usize = 0xD0;

/// Transfer state accumulated from A+D register writes.
#[derive(Debug, Default, Clone, Copy)]
struct TransferRegs {
    dbp: usize,
    dbw: usize,
    dpsm: u8,
    rrw: usize,
    rrh: usize,
    start_x: usize,
    start_y: usize,
}

/// Find the A+D quadword that writes `register`, returning its offset.
fn find_ad_entry(reader: &ByteReader<'_>, data_start: usize, nloop: u16, register: u32) -> Result<Option<usize>> {
    for i in 0..usize::from(nloop) {
        let entry = data_start + i * GIF_TAG_SIZE;
        if reader.u32_at(entry + 8)? == register {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

impl TransferRegs {
    fn apply_ad_list(&mut self, reader: &ByteReader<'_>, tag_offset: usize, tag: &GifTag) -> Result<()> {
        let data_start = tag_offset + GIF_TAG_SIZE;

        if let Some(entry) = find_ad_entry(reader, data_start, tag.nloop, TRXREG)? {
            self.rrw = usize::from(reader.u16_at(entry)?);
            self.rrh = usize::from(reader.u16_at(entry + 4)?);
        }
        if let Some(entry) = find_ad_entry(reader, data_start, tag.nloop, TRXPOS)? {
            self.start_x = usize::from(reader.u16_at(entry + 4)? & 0x07FF);
            self.start_y = usize::from(reader.u16_at(entry + 6)? & 0x07FF);
        }
        if let Some(entry) = find_ad_entry(reader, data_start, tag.nloop, BITBLTBUF)? {
            self.dbp = usize::from(reader.u8_at(entry + 4)?);
            self.dbw = usize::from(reader.u8_at(entry + 6)? & 0x3F);
            self.dpsm = reader.u8_at(entry + 7)? & 0x3F;
        }
        tracing::trace!(?self, "A+D register list at {tag_offset:#x}");
        Ok(())
    }
}

/// Decode a `.tex` file into a pixel buffer of its declared size.
pub fn decode_tex(data: &[u8]) -> Result<PixelBuffer> {
    let reader = ByteReader::new(data);
    let final_w = reader.i16_at(0)?;
    let final_h = reader.i16_at(2)?;
    if final_w <= 0 || final_h <= 0 {
        return Err(Error::UnsupportedTexture {
            message: format!("image size {final_w}x{final_h}"),
        });
    }
    let (final_w, final_h) = (final_w as usize, final_h as usize);

    let length = usize::from(reader.u16_at(6)?) * 16;
    let gif_start = reader.offset_at(0x10, "GIF packet")?;
    let first_tag = GifTag::parse(data, gif_start)?;
    tracing::debug!("texture {final_w}x{final_h}, first GIF tag: {first_tag}");

    let decoded = match first_tag.nloop {
        4 => decode_palettised(&reader, gif_start, gif_start + length, final_w, final_h)?,
        3 => {
            let image_tag = GifTag::parse(data, DIRECT_IMAGE_TAG)?;
            if !image_tag.is_image() {
                return Err(Error::UnsupportedTexture {
                    message: format!("expected IMAGE tag at {DIRECT_IMAGE_TAG:#x}, found {}", image_tag.flg),
                });
            }
            let palette = read_palette(data, DIRECT_PIXELS, final_w * final_h)?;
            PixelBuffer {
                width: final_w,
                height: final_h,
                pixels: palette,
            }
        }
        nloop => {
            return Err(Error::UnsupportedTexture {
                message: format!("first GIF tag has nloop {nloop}, expected 3 or 4"),
            });
        }
    };

    Ok(decoded.crop(final_w, final_h))
}

fn decode_palettised(
    reader: &ByteReader<'_>,
    gif_start: usize,
    end: usize,
    final_w: usize,
    final_h: usize,
) -> Result<PixelBuffer> {
    let data = reader.data();
    if align_up(final_w, 128) * align_up(final_h, 16) > MAX_GS_PIXELS {
        return Err(Error::UnsupportedTexture {
            message: format!("{final_w}x{final_h} image does not fit in video memory"),
        });
    }
    let mut cur = gif_start;

    // The first packet sets up the palette upload; its TRXREG holds the CLUT size.
    let pal_w = usize::from(reader.u16_at(cur + 0x30)?);
    let pal_h = usize::from(reader.u16_at(cur + 0x34)?);
    cur += GifTag::parse(data, cur)?.length();

    let palette_tag = GifTag::parse(data, cur)?;
    let palette = unswizzle_palette(read_palette(data, cur + GIF_TAG_SIZE, pal_w * pal_h)?);
    cur += palette_tag.length();
    tracing::debug!("{} entry palette", palette.len());

    let mut dest_w = align_up(final_w, 16);
    let dest_h = align_up(final_h, 16);

    let mut gs = GsMemory::new();
    let mut regs = TransferRegs::default();
    let mut indices: Option<Vec<u8>> = None;

    while cur + GIF_TAG_SIZE < end {
        let mut tag = GifTag::parse(data, cur)?;
        while !tag.is_image() {
            regs.apply_ad_list(reader, cur, &tag)?;
            cur += tag.length();
            if cur + GIF_TAG_SIZE >= end {
                break;
            }
            tag = GifTag::parse(data, cur)?;
        }
        if !tag.is_image() {
            break;
        }

        cur += GIF_TAG_SIZE;
        let mut transfer_len = usize::from(tag.nloop) * 16;

        if palette.len() == 16 {
            if regs.dpsm == PSMCT32 {
                // 4-bit data uploaded as 32-bit pixels; it may be split over two IMAGE tags.
                let mut image = reader.bytes_at(cur, transfer_len)?.to_vec();
                let next_tag = cur + transfer_len;
                if next_tag + GIF_TAG_SIZE < end {
                    let second = GifTag::parse(data, next_tag)?;
                    if second.is_image() {
                        let second_len = usize::from(second.nloop) * 16;
                        image.extend_from_slice(reader.bytes_at(next_tag + GIF_TAG_SIZE, second_len)?);
                        transfer_len += second.length();
                    }
                }

                gs.write_psmct32(regs.dbp, regs.dbw, regs.start_x, regs.start_y, regs.rrw, regs.rrh, &image)?;

                dest_w = align_up(final_w, 64);
                let packed = gs.read_psmt4(regs.dbp, dest_w / 64, regs.start_x, regs.start_y, dest_w, dest_h)?;
                indices = Some(expand_4bit(&packed));
            } else {
                // Source and destination are both PSMT4, so the data is linear.
                let buffer = indices.get_or_insert_with(|| vec![0u8; dest_w * dest_h]);
                transfer_psmt4(reader, cur, &regs, dest_w, dest_h, buffer)?;
            }
        } else {
            let image = reader.bytes_at(cur, transfer_len.min(data.len().saturating_sub(cur)))?;
            gs.write_psmct32(regs.dbp, regs.dbw, regs.start_x, regs.start_y, regs.rrw, regs.rrh, image)?;
        }

        cur += transfer_len;
    }

    match palette.len() {
        256 => {
            dest_w = align_up(final_w, 128);
            indices = Some(gs.read_psmt8(regs.dbp, dest_w / 64, 0, 0, dest_w, final_h)?);
        }
        1024 => {
            dest_w = align_up(final_w, 64);
            indices = Some(gs.read_psmt8(regs.dbp, dest_w / 64, 0, 0, dest_w, final_h)?);
        }
        _ => {}
    }

    let indices = indices.ok_or_else(|| Error::UnsupportedTexture {
        message: format!("no IMAGE transfer for a {} entry palette", palette.len()),
    })?;
    PixelBuffer::from_indices(dest_w, &indices, &palette)
}

/// Copy linear 4-bit pixels into a one-byte-per-pixel buffer.
fn transfer_psmt4(
    reader: &ByteReader<'_>,
    start: usize,
    regs: &TransferRegs,
    dest_w: usize,
    dest_h: usize,
    pixels: &mut [u8],
) -> Result<()> {
    let mut source = start;
    let mut nibbles = [0u8; 2];
    let mut nibble = 2;

    for y in 0..regs.rrh {
        if y + regs.start_y >= dest_h {
            break;
        }
        for x in 0..regs.rrw {
            if nibble > 1 {
                let two = reader.u8_at(source)?;
                source += 1;
                nibbles = [two & 0x0F, two >> 4];
                nibble = 0;
            }
            let dest = (y + regs.start_y) * dest_w + x + regs.start_x;
            let slot = pixels.get_mut(dest).ok_or_else(|| Error::UnsupportedTexture {
                message: format!("PSMT4 transfer writes past the {dest_w}x{dest_h} image"),
            })?;
            *slot = nibbles[nibble];
            nibble += 1;
        }
    }
    Ok(())
}

/// Build a `.tex` file around the given GIF packet. Test helper shared with
/// the integration tests.
#[doc(hidden)]
#[must_use]
pub fn build_tex_header(width: i16, height: i16, packet: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 0x20];
    data[0..2].copy_from_slice(&width.to_le_bytes());
    data[2..4].copy_from_slice(&height.to_le_bytes());
    data[6..8].copy_from_slice(&((packet.len() / 16) as u16).to_le_bytes());
    data[0x10..0x14].copy_from_slice(&0x20u32.to_le_bytes());
    data.extend_from_slice(packet);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::gif::GifFlag;
    use pretty_assertions::assert_eq;

    fn tag(nloop: u16, flg: GifFlag, nreg: u8) -> [u8; 16] {
        GifTag {
            nloop,
            eop: false,
            pre: false,
            prim: 0,
            flg,
            nreg,
            regs: vec![0xE; usize::from(nreg)],
        }
        .encode()
    }

    fn ad(value: u64, register: u32) -> [u8; 16] {
        let mut q = [0u8; 16];
        q[0..8].copy_from_slice(&value.to_le_bytes());
        q[8..12].copy_from_slice(&register.to_le_bytes());
        q
    }

    fn trxreg(w: u64, h: u64) -> [u8; 16] {
        ad(w | (h << 32), TRXREG)
    }

    fn trxpos(x: u64, y: u64) -> [u8; 16] {
        ad((x << 32) | (y << 48), TRXPOS)
    }

    fn bitbltbuf(dbp: u64, dbw: u64, dpsm: u64) -> [u8; 16] {
        ad((dbp << 32) | (dbw << 48) | (dpsm << 56), BITBLTBUF)
    }

    /// Palette setup packet (4 A+D writes) followed by the palette IMAGE.
    fn palette_packet(pal_w: u64, pal_h: u64, palette: &[PalEntry]) -> Vec<u8> {
        let mut packet = Vec::new();
        packet.extend_from_slice(&tag(4, GifFlag::Packed, 1));
        packet.extend_from_slice(&bitbltbuf(0x3000, 1, 0));
        packet.extend_from_slice(&trxpos(0, 0));
        packet.extend_from_slice(&trxreg(pal_w, pal_h));
        packet.extend_from_slice(&ad(0, 0x53));
        let quads = (palette.len() * 4).div_ceil(16) as u16;
        packet.extend_from_slice(&tag(quads, GifFlag::Image, 1));
        for entry in palette {
            packet.extend_from_slice(&[entry.r, entry.g, entry.b, entry.a]);
        }
        packet
    }

    #[test]
    fn test_linear_psmt4_texture() {
        let palette: Vec<PalEntry> = (0..16u8).map(|i| PalEntry::new(i * 16, 0, 0, 0)).collect();
        let mut packet = palette_packet(8, 2, &palette);

        packet.extend_from_slice(&tag(3, GifFlag::Packed, 1));
        packet.extend_from_slice(&bitbltbuf(0, 1, 0x14));
        packet.extend_from_slice(&trxpos(0, 0));
        packet.extend_from_slice(&trxreg(4, 2));
        // 4x2 4-bit pixels: 1 2 3 4 / 5 6 7 8
        packet.extend_from_slice(&tag(1, GifFlag::Image, 1));
        let mut image = [0u8; 16];
        image[..4].copy_from_slice(&[0x21, 0x43, 0x65, 0x87]);
        packet.extend_from_slice(&image);

        let data = build_tex_header(4, 2, &packet);
        let decoded = decode_tex(&data).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 2));
        let reds: Vec<u8> = decoded.pixels.iter().map(|p| p.r).collect();
        assert_eq!(reds, vec![16, 32, 48, 64, 80, 96, 112, 128]);
    }

    #[test]
    fn test_psmt8_texture_round_trips_through_gs() {
        let palette: Vec<PalEntry> = (0..=255u8).map(|i| PalEntry::new(i, 0, 0, 0)).collect();
        // Upload the palette swizzled so it reads back in index order.
        let mut packet = palette_packet(16, 16, &unswizzle_palette(palette));

        // A 16x16 PSMT8 texture uploaded as 8x8 PSMCT32 pixels.
        let mut gs = GsMemory::new();
        let swizzled_src: Vec<u8> = (0..=255u8).collect();
        gs.write_psmct32(0, 2, 0, 0, 8, 8, &swizzled_src).unwrap();

        packet.extend_from_slice(&tag(3, GifFlag::Packed, 1));
        packet.extend_from_slice(&bitbltbuf(0, 2, 0));
        packet.extend_from_slice(&trxpos(0, 0));
        packet.extend_from_slice(&trxreg(8, 8));
        packet.extend_from_slice(&tag(16, GifFlag::Image, 1));
        packet.extend_from_slice(&swizzled_src);

        let data = build_tex_header(16, 16, &packet);
        let decoded = decode_tex(&data).unwrap();
        let expected = gs.read_psmt8(0, 2, 0, 0, 16, 16).unwrap();
        let reds: Vec<u8> = decoded.pixels.iter().map(|p| p.r).collect();
        assert_eq!(reds, expected);
    }

    #[test]
    fn test_direct_rgba_texture() {
        let mut data = vec![0u8; DIRECT_PIXELS];
        data[0..2].copy_from_slice(&2i16.to_le_bytes());
        data[2..4].copy_from_slice(&1i16.to_le_bytes());
        data[0x10..0x14].copy_from_slice(&0x20u32.to_le_bytes());
        data[0x20..0x30].copy_from_slice(&tag(3, GifFlag::Packed, 1));
        data[0xC0..0xD0].copy_from_slice(&tag(1, GifFlag::Image, 1));
        data.extend_from_slice(&[1, 2, 3, 0x80, 4, 5, 6, 0]);

        let decoded = decode_tex(&data).unwrap();
        assert_eq!(decoded.pixels, vec![PalEntry::new(1, 2, 3, 0x80), PalEntry::new(4, 5, 6, 0)]);
    }

    #[test]
    fn test_rejects_image_larger_than_video_memory() {
        let packet = palette_packet(8, 2, &[PalEntry::default(); 16]);
        let data = build_tex_header(i16::MAX, i16::MAX, &packet);
        assert!(matches!(decode_tex(&data), Err(Error::UnsupportedTexture { .. })));
    }

    #[test]
    fn test_rejects_empty_and_unknown_layouts() {
        let data = build_tex_header(0, 4, &tag(4, GifFlag::Packed, 1));
        assert!(matches!(decode_tex(&data), Err(Error::UnsupportedTexture { .. })));

        let data = build_tex_header(4, 4, &tag(7, GifFlag::Packed, 1));
        assert!(matches!(decode_tex(&data), Err(Error::UnsupportedTexture { .. })));
    }
}
