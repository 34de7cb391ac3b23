//! Keyframe accumulation shared by the stream decoders
//!
//! Both animation formats send sparse per-bone rate updates. Each update
//! integrates the previous rate over the frames since that channel last
//! changed, then installs the new rate.

use glam::{Quat, Vec3};

use super::types::{ANGULAR_RATE_SCALE, AnimMeshPose, normalize_or_identity};
use crate::error::{Error, Result};

pub(crate) struct KeyframeBuilder {
    current: Vec<AnimMeshPose>,
    last_rotation_frame: Vec<usize>,
    last_position_frame: Vec<usize>,
    pending: Option<AnimMeshPose>,
    poses: Vec<AnimMeshPose>,
    velocity_scale: f32,
}

impl KeyframeBuilder {
    /// Start from the base pose of every bone; the base poses become the
    /// first keyframes.
    pub fn new(base: Vec<AnimMeshPose>, velocity_scale: f32) -> Self {
        let num_bones = base.len();
        Self {
            poses: base.clone(),
            current: base,
            last_rotation_frame: vec![0; num_bones],
            last_position_frame: vec![0; num_bones],
            pending: None,
            velocity_scale,
        }
    }

    /// The keyframe record for `bone` at `frame`, opening a new one when the
    /// stream moves to another frame or bone.
    fn record(&mut self, frame: usize, bone: usize) -> Result<&mut AnimMeshPose> {
        let current = *self.current.get(bone).ok_or(Error::BoneOutOfRange {
            bone,
            num_bones: self.current.len(),
        })?;

        let pose = match self.pending.take() {
            Some(pending) if pending.frame == frame && pending.bone == bone => pending,
            previous => {
                self.poses.extend(previous);
                AnimMeshPose {
                    bone,
                    frame,
                    ..current
                }
            }
        };
        Ok(self.pending.insert(pose))
    }

    /// Apply a rotation rate update.
    pub fn rotation(&mut self, frame: usize, bone: usize, rate: Quat) -> Result<()> {
        let since = self.last_rotation_frame.get(bone).copied().unwrap_or(0);
        let pose = self.record(frame, bone)?;

        let coeff = frame.saturating_sub(since) as f32 / ANGULAR_RATE_SCALE;
        pose.rotation = normalize_or_identity(pose.rotation + pose.angular_velocity * coeff);
        pose.angular_velocity = rate;
        let pose = *pose;

        self.current[bone].rotation = pose.rotation;
        self.current[bone].angular_velocity = rate;
        self.last_rotation_frame[bone] = frame;
        Ok(())
    }

    /// Apply a position rate update.
    pub fn position(&mut self, frame: usize, bone: usize, rate: Vec3) -> Result<()> {
        let since = self.last_position_frame.get(bone).copied().unwrap_or(0);
        let scale = self.velocity_scale;
        let pose = self.record(frame, bone)?;

        let coeff = frame.saturating_sub(since) as f32 / scale;
        pose.position += pose.velocity * coeff;
        pose.velocity = rate;
        let pose = *pose;

        self.current[bone].position = pose.position;
        self.current[bone].velocity = rate;
        self.last_position_frame[bone] = frame;
        Ok(())
    }

    /// All keyframes in stream order.
    pub fn finish(mut self) -> Vec<AnimMeshPose> {
        self.poses.extend(self.pending.take());
        self.poses
    }
}
