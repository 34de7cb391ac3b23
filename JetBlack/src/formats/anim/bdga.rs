//! Dark Alliance animation streams
//!
//! The base-pose table (stride `0x0E`) is followed by a byte-oriented delta
//! stream. Each record is a frame-advance byte and a descriptor byte:
//!
//! | Bits | Meaning                                   |
//! |------|-------------------------------------------|
//! | 0-5  | bone (`0x3F` ends the stream)             |
//! | 6    | values are signed bytes, otherwise i16 LE |
//! | 7    | rotation (4 values), otherwise position   |

use glam::{Quat, Vec3};

use super::keyframes::KeyframeBuilder;
use super::poses::AnimHeader;
use super::types::{AnimData, AnimMeshPose, BDGA_VELOCITY_SCALE};
use crate::error::Result;
use crate::utils::ByteReader;

const BASE_POSE_STRIDE: usize = 0x0E;
const END_OF_STREAM: u8 = 0x3F;

/// Decode a Dark Alliance animation.
pub fn decode(data: &[u8]) -> Result<AnimData> {
    let reader = ByteReader::new(data);
    let header = AnimHeader::parse(&reader)?;
    let nb = header.num_bones;

    let base_table = reader.offset_at(0x08, "base pose")?;
    let base = (0..nb)
        .map(|bone| read_base_pose(&reader, base_table + bone * BASE_POSE_STRIDE, bone))
        .collect::<Result<Vec<_>>>()?;

    let mut keys = KeyframeBuilder::new(base, BDGA_VELOCITY_SCALE);
    let mut stream = ByteReader::at(data, base_table + nb * BASE_POSE_STRIDE);
    let mut frame = 0usize;

    while stream.remaining() > 0 {
        let count = stream.read_u8()?;
        let descriptor = stream.read_u8()?;
        let bone = descriptor & 0x3F;
        if bone == END_OF_STREAM {
            break;
        }
        frame += usize::from(count);

        let signed_bytes = descriptor & 0x40 != 0;
        if descriptor & 0x80 != 0 {
            let [a, b, c, d] = read_values::<4>(&mut stream, signed_bytes)?;
            keys.rotation(frame, usize::from(bone), Quat::from_xyzw(b, c, d, a))?;
        } else {
            let [x, y, z] = read_values::<3>(&mut stream, signed_bytes)?;
            keys.position(frame, usize::from(bone), Vec3::new(x, y, z))?;
        }
    }

    AnimData::from_keyframes(header, keys.finish(), frame + 1, BDGA_VELOCITY_SCALE)
}

fn read_base_pose(reader: &ByteReader<'_>, at: usize, bone: usize) -> Result<AnimMeshPose> {
    let value = |i: usize| reader.i16_at(at + i * 2).map(f32::from);

    let position = Vec3::new(value(0)? / 64.0, value(1)? / 64.0, value(2)? / 64.0);
    let (a, b, c, d) = (
        value(3)? / 4096.0,
        value(4)? / 4096.0,
        value(5)? / 4096.0,
        value(6)? / 4096.0,
    );
    Ok(AnimMeshPose::base(bone, position, Quat::from_xyzw(b, c, d, a)))
}

fn read_values<const N: usize>(stream: &mut ByteReader<'_>, signed_bytes: bool) -> Result<[f32; N]> {
    let mut values = [0.0; N];
    for value in &mut values {
        *value = if signed_bytes {
            f32::from(stream.read_i8()?)
        } else {
            f32::from(stream.read_i16()?)
        };
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    const BASE: usize = 0x20;

    /// Two bones chained root to child, base positions (1,0,0) and (0,2,0).
    fn animation(stream: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; BASE];
        data[0] = 2;
        data[0x08] = BASE as u8;
        data[0x0C] = 0x18;
        data[0x10] = 0x1E;
        data[0x1E] = 0;
        data[0x1F] = 1;

        for position in [[64i16, 0, 0], [0, 128, 0]] {
            for v in position {
                data.extend_from_slice(&v.to_le_bytes());
            }
            // w = 1.0
            for v in [4096i16, 0, 0, 0] {
                data.extend_from_slice(&v.to_le_bytes());
            }
        }
        data.extend_from_slice(stream);
        data
    }

    #[test]
    fn test_base_pose_only() {
        let anim = decode(&animation(&[0, 0x3F])).unwrap();
        assert_eq!(anim.num_bones, 2);
        assert_eq!(anim.num_frames, 1);
        assert_eq!(anim.velocity_scale, BDGA_VELOCITY_SCALE);
        assert_eq!(anim.pose(0, 1).unwrap().position, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(anim.pose(0, 0).unwrap().rotation, Quat::IDENTITY);
        assert_eq!(anim.fk_pose(0, 1).unwrap().position, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_position_rate_at_frame_ten() {
        // Bone 1 starts moving along x at frame 0, stops at frame 10.
        let stream = [
            0, 0x41, 8, 0, 0, // i8 position rate (8,0,0)
            10, 0x01, 0, 0, 0, 0, 0, 0, // i16 position rate zero
            2, 0x3F,
        ];
        let anim = decode(&animation(&stream)).unwrap();
        assert_eq!(anim.num_frames, 11);
        assert_eq!(anim.per_frame_poses.len(), 22);

        for frame in 0..10 {
            let pose = anim.pose(frame, 1).unwrap();
            assert_eq!(pose.position.x, 0.0);
            assert_eq!(pose.velocity.x, 8.0);
        }
        let moved = anim.pose(10, 1).unwrap();
        assert_eq!(moved.frame, 10);
        assert_eq!(moved.position.x, 80.0 / 512.0);
        assert_eq!(moved.velocity, Vec3::ZERO);

        for frame in 0..11 {
            assert_eq!(anim.pose(frame, 0).unwrap().position, Vec3::new(1.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_rotation_record() {
        let stream = [1, 0xC0, 0, 0, 0, 64, 0, 0x3F];
        let anim = decode(&animation(&stream)).unwrap();
        let pose = anim.pose(1, 0).unwrap();
        assert_eq!(pose.angular_velocity, Quat::from_xyzw(0.0, 0.0, 64.0, 0.0));
        assert_eq!(pose.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_bone_out_of_range() {
        let stream = [0, 0x45, 1, 1, 1, 0, 0x3F];
        assert!(matches!(
            decode(&animation(&stream)),
            Err(Error::BoneOutOfRange { bone: 5, num_bones: 2 })
        ));
    }

    #[test]
    fn test_truncated_stream() {
        let stream = [0, 0x01, 1, 0];
        assert!(matches!(
            decode(&animation(&stream)),
            Err(Error::UnexpectedEof { .. })
        ));
    }
}
