//! Cutscene files
//!
//! | Offset | Type   | Contents                 |
//! |--------|--------|--------------------------|
//! | `0x00` | i32    | flags                    |
//! | `0x04` | i32    | keyframe array offset    |
//! | `0x08` | i32    | keyframe count           |
//! | `0x0C` | i32    | cast array offset        |
//! | `0x10` | i32    | cast count               |
//! | `0x20` | string | subtitle file            |
//! | `0x48` | string |                          |
//! | `0x70` | i32    | scale, in tenths         |
//! | `0x74` | string |                          |
//!
//! Cast members are `0x2C` bytes and keyframes `0x14` bytes.

use std::fmt;
use std::path::Path;

use glam::Vec3;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::ByteReader;

const CAST_MEMBER_SIZE: usize = 0x2C;
const KEYFRAME_SIZE: usize = 0x14;

const CAMERA: i16 = -100;
const SOUND: i16 = -99;

/// Camera action whose arguments are floats.
const CAMERA_DELTA: i16 = 5;

/// One character taking part in the scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CastMember {
    pub name: String,
    pub position: Vec3,
    pub extra0: i32,
    pub extra4: i32,
    /// Top four bits hold the facing in 22.5 degree steps.
    pub s28: i16,
}

impl CastMember {
    /// Facing in degrees.
    #[must_use]
    pub fn rotation(&self) -> f32 {
        f32::from(self.s28 >> 12) * 22.5
    }
}

/// Who a keyframe drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Camera,
    Sound,
    Cast(usize),
    Unknown(i16),
}

impl From<i16> for Actor {
    fn from(value: i16) -> Self {
        match value {
            CAMERA => Self::Camera,
            SOUND => Self::Sound,
            _ => usize::try_from(value).map_or(Self::Unknown(value), Self::Cast),
        }
    }
}

/// One timed action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Keyframe {
    pub time: f32,
    pub actor: Actor,
    pub action: i16,
    /// Raw argument words; see [`Keyframe::float_args`].
    pub args: [i32; 3],
}

impl Keyframe {
    /// Whether the arguments are floats rather than integers.
    #[must_use]
    pub fn has_float_args(&self) -> bool {
        self.actor == Actor::Camera && self.action == CAMERA_DELTA
    }

    /// The argument words reinterpreted as floats.
    #[must_use]
    pub fn float_args(&self) -> [f32; 3] {
        self.args.map(|word| f32::from_bits(word as u32))
    }
}

/// A decoded cutscene.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cutscene {
    pub flags: i32,
    pub keyframe_offset: i32,
    pub cast_offset: i32,
    pub subtitles: String,
    pub string48: String,
    pub string74: String,
    /// Scene scale in tenths.
    pub scale: i32,
    pub cast: Vec<CastMember>,
    pub keyframes: Vec<Keyframe>,
}

fn count_field(value: i32, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::InvalidHeader {
        format: "cutscene",
        message: format!("negative {field} {value}"),
    })
}

/// Decode a cutscene. An empty file is an empty scene.
pub fn decode_cutscene(data: &[u8]) -> Result<Cutscene> {
    if data.is_empty() {
        return Ok(Cutscene::default());
    }
    let reader = ByteReader::new(data);

    let num_keyframes = count_field(reader.i32_at(0x08)?, "keyframe count")?;
    let num_cast = count_field(reader.i32_at(0x10)?, "cast count")?;
    let mut scene = Cutscene {
        flags: reader.i32_at(0x00)?,
        keyframe_offset: reader.i32_at(0x04)?,
        cast_offset: reader.i32_at(0x0C)?,
        subtitles: reader.zstring_at(0x20)?,
        string48: reader.zstring_at(0x48)?,
        scale: reader.i32_at(0x70)?,
        string74: reader.zstring_at(0x74)?,
        ..Cutscene::default()
    };

    if num_cast > 0 {
        let base = reader.resolve_offset(0, scene.cast_offset, "cast array")?;
        for c in 0..num_cast {
            let at = base + c * CAST_MEMBER_SIZE;
            scene.cast.push(CastMember {
                extra0: reader.i32_at(at)?,
                extra4: reader.i32_at(at + 4)?,
                name: reader.zstring_at(at + 8)?,
                position: Vec3::new(
                    reader.f32_at(at + 0x1C)?,
                    reader.f32_at(at + 0x20)?,
                    reader.f32_at(at + 0x24)?,
                ),
                s28: reader.i16_at(at + 0x28)?,
            });
        }
    }

    if num_keyframes > 0 {
        let base = reader.resolve_offset(0, scene.keyframe_offset, "keyframe array")?;
        for k in 0..num_keyframes {
            let at = base + k * KEYFRAME_SIZE;
            scene.keyframes.push(Keyframe {
                time: reader.f32_at(at)?,
                actor: Actor::from(reader.i16_at(at + 4)?),
                action: reader.i16_at(at + 6)?,
                args: [
                    reader.i32_at(at + 8)?,
                    reader.i32_at(at + 0x0C)?,
                    reader.i32_at(at + 0x10)?,
                ],
            });
        }
    }

    tracing::debug!(
        "decoded cutscene: {} cast, {} keyframes",
        scene.cast.len(),
        scene.keyframes.len()
    );
    Ok(scene)
}

pub fn read_cutscene<P: AsRef<Path>>(path: P) -> Result<Cutscene> {
    decode_cutscene(&std::fs::read(path)?)
}

impl Cutscene {
    fn actor_name(&self, actor: Actor) -> String {
        match actor {
            Actor::Camera => "camera".to_string(),
            Actor::Sound => "sound".to_string(),
            Actor::Cast(index) => self
                .cast
                .get(index)
                .map_or_else(|| format!("cast {index}"), |member| member.name.clone()),
            Actor::Unknown(value) => format!("actor {value}"),
        }
    }

    /// Describe one keyframe.
    #[must_use]
    pub fn describe_keyframe(&self, keyframe: &Keyframe) -> String {
        let [a, b, c] = keyframe.args;
        let mut line = format!("time: {}, {} ", keyframe.time, self.actor_name(keyframe.actor));
        let action = match (keyframe.actor, keyframe.action) {
            (Actor::Camera, 0) => Some(format!(" pos: {a}, {b}, {c}")),
            (Actor::Camera, 1) => Some(format!(" rotate z, {} deg", f64::from(a) * 360.0 / 65535.0)),
            (Actor::Camera, 2) => {
                // Stored relative to 89 degrees.
                let angle = a.wrapping_add(0x3FD3) & 0xFFFF;
                Some(format!(" rotate x, {} deg", f64::from(angle) * 360.0 / 65535.0))
            }
            (Actor::Camera, CAMERA_DELTA) => {
                let [x, _, z] = keyframe.float_args();
                Some(format!(" delta: {x}, 0x{b:x}, {z}"))
            }
            (Actor::Camera, 6) => Some(format!(" farClip = {}", i64::from(a) * 12)),
            (Actor::Sound, 0) => Some(" step to next subtitle".to_string()),
            (Actor::Cast(_), 0) => Some(format!(" set target pos: {a}, {b}, {c}")),
            (Actor::Cast(_), 2) => Some(format!(" play anim: {a:04x}, {b:04x}, {c:04x}")),
            _ => None,
        };
        line.push_str(&action.unwrap_or_else(|| {
            format!("action: {}, data: {a:04x} {b:04x} {c:04x}", keyframe.action)
        }));
        line
    }
}

impl fmt::Display for CastMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name: {}, pos: {}, {}, {}, rot: {}, extra0: 0x{:04x}, extra4: 0x{:04x}, s28: 0x{:04x}",
            self.name,
            self.position.x,
            self.position.y,
            self.position.z,
            self.rotation(),
            self.extra0,
            self.extra4,
            self.s28
        )
    }
}

impl fmt::Display for Cutscene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Flags:                0x{:04x}", self.flags)?;
        writeln!(f, "keyframeOffset:       0x{:04x}", self.keyframe_offset)?;
        writeln!(f, "numKeyframes:         {}", self.keyframes.len())?;
        writeln!(f, "characterBlockOffset: 0x{:04x}", self.cast_offset)?;
        writeln!(f, "numCharacters:        {}", self.cast.len())?;
        writeln!(f, "scale:     {}", f64::from(self.scale) / 10.0)?;
        writeln!(f, "subtitles: {}", self.subtitles)?;
        writeln!(f, "string48:  {}", self.string48)?;
        writeln!(f, "string74:  {}", self.string74)?;

        writeln!(f, "\nCast\n~~~~")?;
        for member in &self.cast {
            writeln!(f, "{member}")?;
        }

        writeln!(f, "\nKeyframes\n~~~~~~~~~")?;
        for keyframe in &self.keyframes {
            writeln!(f, "{}", self.describe_keyframe(keyframe))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CAST: usize = 0x80;
    const KEYFRAMES: usize = 0xB0;

    fn put(data: &mut [u8], at: usize, bytes: &[u8]) {
        data[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn keyframe(data: &mut [u8], index: usize, time: f32, actor: i16, action: i16, args: [i32; 3]) {
        let at = KEYFRAMES + index * KEYFRAME_SIZE;
        put(data, at, &time.to_le_bytes());
        put(data, at + 4, &actor.to_le_bytes());
        put(data, at + 6, &action.to_le_bytes());
        for (i, arg) in args.iter().enumerate() {
            put(data, at + 8 + i * 4, &arg.to_le_bytes());
        }
    }

    fn build_scene() -> Vec<u8> {
        let mut data = vec![0u8; KEYFRAMES + 5 * KEYFRAME_SIZE];
        put(&mut data, 0x00, &1i32.to_le_bytes());
        put(&mut data, 0x04, &(KEYFRAMES as i32).to_le_bytes());
        put(&mut data, 0x08, &5i32.to_le_bytes());
        put(&mut data, 0x0C, &(CAST as i32).to_le_bytes());
        put(&mut data, 0x10, &1i32.to_le_bytes());
        put(&mut data, 0x20, b"intro.sub\0");
        put(&mut data, 0x70, &15i32.to_le_bytes());

        put(&mut data, CAST + 8, b"Vahn\0");
        put(&mut data, CAST + 0x1C, &2.0f32.to_le_bytes());
        put(&mut data, CAST + 0x20, &(-1.0f32).to_le_bytes());
        put(&mut data, CAST + 0x28, &0x4000i16.to_le_bytes());

        keyframe(&mut data, 0, 0.0, CAMERA, 0, [1, 2, 3]);
        keyframe(
            &mut data,
            1,
            0.5,
            CAMERA,
            CAMERA_DELTA,
            [1.5f32.to_bits() as i32, 0x10, (-2.0f32).to_bits() as i32],
        );
        keyframe(&mut data, 2, 1.0, SOUND, 0, [0; 3]);
        keyframe(&mut data, 3, 1.5, 0, 2, [0x12, 0, 0xAB]);
        keyframe(&mut data, 4, 2.0, 0, 9, [1, 2, 3]);
        data
    }

    #[test]
    fn test_decode_cutscene() {
        let scene = decode_cutscene(&build_scene()).unwrap();
        assert_eq!(scene.subtitles, "intro.sub");
        assert_eq!(scene.scale, 15);

        assert_eq!(scene.cast.len(), 1);
        assert_eq!(scene.cast[0].name, "Vahn");
        assert_eq!(scene.cast[0].position, Vec3::new(2.0, -1.0, 0.0));
        assert_eq!(scene.cast[0].rotation(), 90.0);

        assert_eq!(scene.keyframes.len(), 5);
        assert_eq!(scene.keyframes[0].actor, Actor::Camera);
        assert!(scene.keyframes[1].has_float_args());
        assert_eq!(scene.keyframes[1].float_args()[0], 1.5);
        assert_eq!(scene.keyframes[2].actor, Actor::Sound);
        assert_eq!(scene.keyframes[3].actor, Actor::Cast(0));
    }

    #[test]
    fn test_describe_keyframes() {
        let scene = decode_cutscene(&build_scene()).unwrap();
        let lines: Vec<String> = scene.keyframes.iter().map(|k| scene.describe_keyframe(k)).collect();
        assert_eq!(
            lines,
            vec![
                "time: 0, camera  pos: 1, 2, 3",
                "time: 0.5, camera  delta: 1.5, 0x10, -2",
                "time: 1, sound  step to next subtitle",
                "time: 1.5, Vahn  play anim: 0012, 0000, 00ab",
                "time: 2, Vahn action: 9, data: 0001 0002 0003",
            ]
        );

        let listing = scene.to_string();
        assert!(listing.contains("scale:     1.5"));
        assert!(listing.contains("name: Vahn, pos: 2, -1, 0, rot: 90"));
    }

    #[test]
    fn test_empty_and_bad_scenes() {
        assert_eq!(decode_cutscene(&[]).unwrap(), Cutscene::default());

        let mut data = build_scene();
        put(&mut data, 0x10, &(-1i32).to_le_bytes());
        assert!(matches!(
            decode_cutscene(&data),
            Err(Error::InvalidHeader { format: "cutscene", .. })
        ));

        let mut data = build_scene();
        put(&mut data, 0x08, &1000i32.to_le_bytes());
        assert!(matches!(decode_cutscene(&data), Err(Error::UnexpectedEof { .. })));
    }

    #[test]
    fn test_unknown_cast_index() {
        let mut data = build_scene();
        put(&mut data, KEYFRAMES + 3 * KEYFRAME_SIZE + 4, &4i16.to_le_bytes());
        let scene = decode_cutscene(&data).unwrap();
        assert!(scene.describe_keyframe(&scene.keyframes[3]).starts_with("time: 1.5, cast 4 "));
    }
}
