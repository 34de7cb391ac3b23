//! Return to Arms and Justice League Heroes animation streams
//!
//! The header matches Dark Alliance except that `0x04` holds the frame count
//! and `0x08` points at a bitstream carrying both the base poses and the
//! deltas. Every value is a variable-width signed field preceded by a 4-bit
//! width.

use glam::{Quat, Vec3};

use super::keyframes::KeyframeBuilder;
use super::poses::{AnimHeader, MAX_FRAMES};
use super::types::{AnimData, AnimMeshPose, RTA_VELOCITY_SCALE};
use crate::error::{Error, Result};
use crate::utils::{BitstreamReader, ByteReader};

/// Bits that must remain before another record is read.
const MIN_RECORD_BITS: usize = 22;
const END_OF_STREAM: u16 = 0xFF;

/// Decode a Return to Arms animation.
pub fn decode(data: &[u8]) -> Result<AnimData> {
    let reader = ByteReader::new(data);
    let header = AnimHeader::parse(&reader)?;
    let nb = header.num_bones;

    let max_frames = usize::try_from(header.offset4)
        .ok()
        .filter(|&frames| frames < MAX_FRAMES)
        .ok_or_else(|| Error::InvalidAnimation {
            message: format!("frame count {} is outside 0..{MAX_FRAMES}", header.offset4),
        })?;
    let start = reader.offset_at(0x08, "bitstream")?;
    let mut bits = BitstreamReader::new(&data[start..]);

    let base = (0..nb)
        .map(|bone| read_base_pose(&mut bits, bone))
        .collect::<Result<Vec<_>>>()?;

    let mut keys = KeyframeBuilder::new(base, RTA_VELOCITY_SCALE);
    let mut frame = 0usize;

    while bits.has_data(MIN_RECORD_BITS) && frame < max_frames {
        let count = bits.read(8)?;
        if count == END_OF_STREAM {
            break;
        }
        let is_position = bits.read(1)? == 1;
        let bone = usize::from(bits.read(6)?);
        if bone >= nb {
            break;
        }
        frame += usize::from(count);

        let width = u32::from(bits.read(4)?) + 1;
        if is_position {
            let [x, y, z] = read_values::<3>(&mut bits, width)?;
            keys.position(frame, bone, Vec3::new(x, y, z))?;
        } else {
            let [a, b, c, d] = read_values::<4>(&mut bits, width)?;
            keys.rotation(frame, bone, Quat::from_xyzw(b, c, d, a))?;
        }
    }

    tracing::trace!("bitstream stopped at bit {}", bits.bit_position());
    AnimData::from_keyframes(header, keys.finish(), max_frames + 1, RTA_VELOCITY_SCALE)
}

fn read_base_pose(bits: &mut BitstreamReader, bone: usize) -> Result<AnimMeshPose> {
    let width = u32::from(bits.read(4)?) + 1;
    let [x, y, z] = read_values::<3>(bits, width)?;

    let width = u32::from(bits.read(4)?) + 1;
    let [a, b, c, d] = read_values::<4>(bits, width)?;

    Ok(AnimMeshPose::base(
        bone,
        Vec3::new(x, y, z) / 64.0,
        Quat::from_xyzw(b, c, d, a) / 4096.0,
    ))
}

fn read_values<const N: usize>(bits: &mut BitstreamReader, width: u32) -> Result<[f32; N]> {
    let mut values = [0.0; N];
    for value in &mut values {
        *value = bits.read_signed(width)? as f32;
    }
    Ok(values)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// MSB-first bit packer producing the byte-swapped word layout.
    #[derive(Default)]
    pub(crate) struct BitWriter {
        bits: Vec<bool>,
    }

    impl BitWriter {
        pub fn put(&mut self, value: u32, width: u32) -> &mut Self {
            for i in (0..width).rev() {
                self.bits.push((value >> i) & 1 == 1);
            }
            self
        }

        /// Encode a value the way `read_signed` decodes it.
        pub fn put_signed(&mut self, value: i32, width: u32) -> &mut Self {
            let encoded = if value < 0 {
                (1u32 << width) - 1 - value.unsigned_abs()
            } else {
                value as u32
            };
            self.put(encoded, width)
        }

        pub fn finish(&self) -> Vec<u8> {
            let mut bytes: Vec<u8> = self
                .bits
                .chunks(8)
                .map(|byte| {
                    byte.iter()
                        .enumerate()
                        .fold(0u8, |acc, (i, &bit)| acc | (u8::from(bit) << (7 - i)))
                })
                .collect();
            if bytes.len() % 2 == 1 {
                bytes.push(0);
            }
            for pair in bytes.chunks_exact_mut(2) {
                pair.swap(0, 1);
            }
            bytes
        }
    }

    const HEADER_LEN: usize = 0x20;

    /// One root bone, `max_frames` frames, followed by `stream`.
    pub(crate) fn animation(max_frames: u8, stream: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data[0] = 1;
        data[0x04] = max_frames;
        data[0x08] = HEADER_LEN as u8;
        data[0x0C] = 0x18;
        data[0x10] = 0x1F;
        data.extend_from_slice(stream);
        data
    }

    fn base_pose(bits: &mut BitWriter) {
        // Position (1, -127/64, 0) at 8 bits, rotation w = 1.0 at 14 bits.
        bits.put(7, 4).put_signed(64, 8).put_signed(-128 + 1, 8).put_signed(0, 8);
        bits.put(13, 4)
            .put_signed(4096, 14)
            .put_signed(0, 14)
            .put_signed(0, 14)
            .put_signed(0, 14);
    }

    #[test]
    fn test_base_pose() {
        let mut bits = BitWriter::default();
        base_pose(&mut bits);
        bits.put(0xFF, 8).put(0, 14);
        let anim = decode(&animation(4, &bits.finish())).unwrap();

        assert_eq!(anim.num_frames, 5);
        assert_eq!(anim.offset4, 4);
        let pose = anim.pose(4, 0).unwrap();
        assert_eq!(pose.position, Vec3::new(1.0, -127.0 / 64.0, 0.0));
        assert_eq!(pose.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_position_and_rotation_records() {
        let mut bits = BitWriter::default();
        base_pose(&mut bits);
        // Frame 0: position rate (256, 0, 0) at 10 bits.
        bits.put(0, 8).put(1, 1).put(0, 6).put(9, 4);
        bits.put_signed(256, 10).put_signed(0, 10).put_signed(0, 10);
        // Frame 2: rotation rate at 4 bits.
        bits.put(2, 8).put(0, 1).put(0, 6).put(3, 4);
        bits.put_signed(0, 4).put_signed(0, 4).put_signed(-3, 4).put_signed(1, 4);
        bits.put(0xFF, 8).put(0, 14);

        let anim = decode(&animation(3, &bits.finish())).unwrap();
        assert_eq!(anim.num_frames, 4);
        assert_eq!(anim.velocity_scale, RTA_VELOCITY_SCALE);

        let moving = anim.pose(1, 0).unwrap();
        assert_eq!(moving.velocity, Vec3::new(256.0, 0.0, 0.0));
        assert_eq!(moving.position.x, 1.0);

        let turned = anim.pose(3, 0).unwrap();
        assert_eq!(turned.frame, 2);
        assert_eq!(turned.angular_velocity, Quat::from_xyzw(0.0, -3.0, 1.0, 0.0));
        assert_eq!(turned.position.x, 1.0);

        let advanced = anim.extrapolated_pose(1, 0).unwrap();
        assert_eq!(advanced.position.x, 2.0);
    }

    #[test]
    fn test_stream_stops_at_frame_limit() {
        let mut bits = BitWriter::default();
        base_pose(&mut bits);
        bits.put(5, 8).put(1, 1).put(0, 6).put(0, 4);
        bits.put_signed(0, 1).put_signed(0, 1).put_signed(0, 1);
        // Never reached: the previous record already hit the limit.
        bits.put(0, 8).put(1, 1).put(0, 6).put(15, 4);
        bits.put(0, 16).put(0, 16).put(0, 16);

        let anim = decode(&animation(2, &bits.finish())).unwrap();
        assert_eq!(anim.num_frames, 3);
        // Keyframe at frame 5 is past the table.
        assert_eq!(anim.mesh_poses.len(), 2);
        assert_eq!(anim.pose(2, 0).unwrap().frame, 0);
    }

    #[test]
    fn test_rejects_implausible_frame_count() {
        let mut bits = BitWriter::default();
        base_pose(&mut bits);
        bits.put(0xFF, 8).put(0, 14);
        let mut data = animation(0, &bits.finish());

        data[0x04..0x08].copy_from_slice(&0x7FFF_FFFFi32.to_le_bytes());
        assert!(matches!(decode(&data), Err(Error::InvalidAnimation { .. })));

        data[0x04..0x08].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(decode(&data), Err(Error::InvalidAnimation { .. })));
    }

    #[test]
    fn test_unknown_bone_ends_stream() {
        let mut bits = BitWriter::default();
        base_pose(&mut bits);
        bits.put(1, 8).put(1, 1).put(9, 6).put(0, 4).put(0, 16);
        let anim = decode(&animation(2, &bits.finish())).unwrap();
        assert_eq!(anim.mesh_poses.len(), 1);
    }
}
