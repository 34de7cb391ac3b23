//! Animation data types

use glam::{Quat, Vec3};
use serde::Serialize;

/// Rotation rates are stored in units of 1/131072 per frame.
pub const ANGULAR_RATE_SCALE: f32 = 131_072.0;

/// Position rate divisor used by Dark Alliance streams.
pub const BDGA_VELOCITY_SCALE: f32 = 512.0;

/// Position rate divisor used by Return to Arms streams.
pub const RTA_VELOCITY_SCALE: f32 = 256.0;

/// One keyframe of one bone.
///
/// `velocity` and `angular_velocity` are the raw per-frame rates the stream
/// supplied; they drive the bone until its next update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnimMeshPose {
    pub bone: usize,
    pub frame: usize,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Quat,
}

impl AnimMeshPose {
    /// A rest pose with zero rates.
    #[must_use]
    pub fn base(bone: usize, position: Vec3, rotation: Quat) -> Self {
        Self {
            bone,
            frame: 0,
            position,
            rotation,
            velocity: Vec3::ZERO,
            angular_velocity: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        }
    }
}

/// A bone transform in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BonePose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl BonePose {
    pub const ROOT: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };
}

/// Normalise `q`, mapping a zero quaternion to the identity.
#[must_use]
pub fn normalize_or_identity(q: Quat) -> Quat {
    let length = q.length();
    if length > 0.0 && length.is_finite() {
        q / length
    } else {
        Quat::IDENTITY
    }
}

/// A decoded skeletal animation.
#[derive(Debug, Clone, Serialize)]
pub struct AnimData {
    pub num_bones: usize,
    pub num_frames: usize,
    /// Header word at 0x04 (frame count for Return to Arms).
    pub offset4: i32,
    pub offset14: i32,
    /// Four flag bytes OR'd together by the game.
    pub offset18: i32,
    /// Parent-stack slot each bone attaches to; see [`AnimData::fk_pose`].
    pub skeleton_def: Vec<u8>,
    pub binding_pose: Vec<Vec3>,
    /// Keyframes in stream order, starting with one base pose per bone.
    pub mesh_poses: Vec<AnimMeshPose>,
    /// Divisor applied to position rates.
    pub velocity_scale: f32,
    /// `num_frames * num_bones` cells, each holding the most recent keyframe
    /// of that bone at or before that frame.
    #[serde(skip)]
    pub per_frame_poses: Vec<AnimMeshPose>,
    /// World-space transforms, laid out like `per_frame_poses`.
    #[serde(skip)]
    pub per_frame_fk_poses: Vec<BonePose>,
}

impl AnimData {
    /// Local pose of `bone` at `frame`.
    #[must_use]
    pub fn pose(&self, frame: usize, bone: usize) -> Option<&AnimMeshPose> {
        if frame >= self.num_frames || bone >= self.num_bones {
            return None;
        }
        self.per_frame_poses.get(frame * self.num_bones + bone)
    }

    /// World-space pose of `bone` at `frame`.
    ///
    /// Bones attach to a parent stack: slot 0 is the origin and bone `b`
    /// reads its parent from slot `skeleton_def[b]`, then becomes slot
    /// `skeleton_def[b] + 1` for the bones after it.
    #[must_use]
    pub fn fk_pose(&self, frame: usize, bone: usize) -> Option<&BonePose> {
        if frame >= self.num_frames || bone >= self.num_bones {
            return None;
        }
        self.per_frame_fk_poses.get(frame * self.num_bones + bone)
    }

    /// The latest keyframe at or before `frame`, advanced by its rates to `frame`.
    #[must_use]
    pub fn extrapolated_pose(&self, frame: usize, bone: usize) -> Option<AnimMeshPose> {
        let key = self.pose(frame, bone)?;
        let elapsed = (frame - key.frame) as f32;
        let rotation = key.rotation + key.angular_velocity * (elapsed / ANGULAR_RATE_SCALE);
        Some(AnimMeshPose {
            frame,
            position: key.position + key.velocity * (elapsed / self.velocity_scale),
            rotation: normalize_or_identity(rotation),
            ..*key
        })
    }

    /// All local poses of one frame.
    #[must_use]
    pub fn frame_poses(&self, frame: usize) -> &[AnimMeshPose] {
        let start = frame * self.num_bones;
        self.per_frame_poses
            .get(start..start + self.num_bones)
            .unwrap_or(&[])
    }
}
