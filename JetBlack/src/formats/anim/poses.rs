//! Dense pose tables
//!
//! Turns the sparse keyframe list into per-frame local poses by forward
//! fill, then composes the skeleton hierarchy into world-space poses.

use glam::Vec3;

use super::types::{AnimData, AnimMeshPose, BonePose, normalize_or_identity};
use crate::error::{Error, Result};
use crate::utils::ByteReader;

/// Largest skeleton either engine ships.
pub const MAX_BONES: usize = 64;

/// Longest animation the pose tables are built for, in frames.
pub const MAX_FRAMES: usize = 0x4000;

const BINDING_POSE_STRIDE: usize = 8;

/// Header fields shared by both stream formats.
#[derive(Debug, Clone, Default)]
pub(crate) struct AnimHeader {
    pub num_bones: usize,
    pub offset4: i32,
    pub offset14: i32,
    pub offset18: i32,
    pub skeleton_def: Vec<u8>,
    pub binding_pose: Vec<Vec3>,
}

impl AnimHeader {
    /// Read the fields both layouts keep at the same place: bone count at
    /// `0x00`, binding pose at `0x0C`, skeleton at `0x10` and the two
    /// trailing words.
    pub fn parse(reader: &ByteReader<'_>) -> Result<Self> {
        let num_bones = reader.u32_at(0)? as usize;
        if num_bones > MAX_BONES {
            return Err(Error::InvalidAnimation {
                message: format!("{num_bones} bones, at most {MAX_BONES} are supported"),
            });
        }

        let binding = reader.offset_at(0x0C, "binding pose")?;
        let binding_pose = (0..num_bones)
            .map(|bone| {
                let at = binding + bone * BINDING_POSE_STRIDE;
                Ok(Vec3::new(
                    -f32::from(reader.i16_at(at)?) / 64.0,
                    -f32::from(reader.i16_at(at + 2)?) / 64.0,
                    -f32::from(reader.i16_at(at + 4)?) / 64.0,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let skeleton = reader.offset_at(0x10, "skeleton")?;
        let skeleton_def = reader.bytes_at(skeleton, num_bones)?.to_vec();

        Ok(Self {
            num_bones,
            offset4: reader.i32_at(0x04)?,
            offset14: reader.i32_at(0x14)?,
            offset18: reader.i32_at(0x18)?,
            skeleton_def,
            binding_pose,
        })
    }
}

impl AnimData {
    /// Build an animation from its keyframes, filling both pose tables.
    pub(crate) fn from_keyframes(
        header: AnimHeader,
        mesh_poses: Vec<AnimMeshPose>,
        num_frames: usize,
        velocity_scale: f32,
    ) -> Result<Self> {
        if num_frames > MAX_FRAMES {
            return Err(Error::InvalidAnimation {
                message: format!("{num_frames} frames, at most {MAX_FRAMES} are supported"),
            });
        }
        let mut anim = Self {
            num_bones: header.num_bones,
            num_frames,
            offset4: header.offset4,
            offset14: header.offset14,
            offset18: header.offset18,
            skeleton_def: header.skeleton_def,
            binding_pose: header.binding_pose,
            mesh_poses,
            velocity_scale,
            per_frame_poses: Vec::new(),
            per_frame_fk_poses: Vec::new(),
        };
        anim.per_frame_poses = anim.build_per_frame_poses()?;
        anim.per_frame_fk_poses = anim.build_per_frame_fk_poses()?;
        tracing::debug!(
            "animation: {} bones, {} frames, {} keyframes",
            anim.num_bones,
            anim.num_frames,
            anim.mesh_poses.len()
        );
        Ok(anim)
    }

    /// Place every keyframe in its cell, then copy each cell forward into
    /// the empty cells after it.
    fn build_per_frame_poses(&self) -> Result<Vec<AnimMeshPose>> {
        let nb = self.num_bones;
        let len = self.num_frames.checked_mul(nb).ok_or_else(|| Error::InvalidAnimation {
            message: format!("{} frames of {nb} bones overflow the pose table", self.num_frames),
        })?;
        let mut cells: Vec<Option<AnimMeshPose>> = vec![None; len];

        for pose in &self.mesh_poses {
            if pose.bone >= nb {
                return Err(Error::BoneOutOfRange {
                    bone: pose.bone,
                    num_bones: nb,
                });
            }
            if pose.frame >= self.num_frames {
                tracing::debug!("keyframe at frame {} is past the last frame", pose.frame);
                continue;
            }
            cells[pose.frame * nb + pose.bone] = Some(*pose);
        }

        for bone in 0..nb {
            let mut previous: Option<AnimMeshPose> = None;
            for frame in 0..self.num_frames {
                let cell = &mut cells[frame * nb + bone];
                match cell {
                    Some(pose) => previous = Some(*pose),
                    None => *cell = previous,
                }
            }
        }

        cells
            .into_iter()
            .enumerate()
            .map(|(i, cell)| {
                cell.ok_or_else(|| Error::InvalidAnimation {
                    message: format!("bone {} has no pose at frame {}", i % nb, i / nb),
                })
            })
            .collect()
    }

    /// Compose local poses down the parent stack for every frame.
    fn build_per_frame_fk_poses(&self) -> Result<Vec<BonePose>> {
        let nb = self.num_bones;
        let mut out = Vec::with_capacity(self.per_frame_poses.len());
        let mut slots: Vec<Option<BonePose>> = vec![None; nb + 1];

        for frame in 0..self.num_frames {
            slots.fill(None);
            slots[0] = Some(BonePose::ROOT);

            for (bone, &parent) in self.skeleton_def.iter().enumerate().take(nb) {
                let parent = usize::from(parent);
                let invalid = Error::InvalidSkeleton { bone, parent };
                let Some(parent_pose) = slots.get(parent).copied().flatten() else {
                    return Err(invalid);
                };
                let local = &self.per_frame_poses[frame * nb + bone];

                let world = BonePose {
                    position: parent_pose.rotation * local.position + parent_pose.position,
                    rotation: normalize_or_identity(
                        parent_pose.rotation * normalize_or_identity(local.rotation),
                    ),
                };
                out.push(world);

                match slots.get_mut(parent + 1) {
                    Some(slot) => *slot = Some(world),
                    None => return Err(invalid),
                }
            }
        }
        Ok(out)
    }
}
