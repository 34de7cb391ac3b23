//! Skeletal animation decoding
//!
//! Animations are stored as one base pose per bone followed by a sparse
//! stream of per-bone rate changes. The stream layout depends on the engine:
//!
//! - [`bdga`]: Dark Alliance, byte-aligned records
//! - [`rta`]: Return to Arms and Justice League Heroes, a packed bitstream
//!
//! Both produce an [`AnimData`] with dense local and world-space pose tables.

pub mod bdga;
mod keyframes;
mod poses;
pub mod rta;
pub mod types;

use std::path::Path;

pub use poses::{MAX_BONES, MAX_FRAMES};
pub use types::{
    ANGULAR_RATE_SCALE, AnimData, AnimMeshPose, BDGA_VELOCITY_SCALE, BonePose,
    RTA_VELOCITY_SCALE, normalize_or_identity,
};

use crate::config::EngineVersion;
use crate::error::Result;

/// Decode an animation in the layout used by `engine_version`.
pub fn decode_animation(engine_version: EngineVersion, data: &[u8]) -> Result<AnimData> {
    match engine_version {
        EngineVersion::DarkAlliance => bdga::decode(data),
        EngineVersion::ReturnToArms | EngineVersion::JusticeLeagueHeroes => rta::decode(data),
    }
}

/// Read and decode an animation file.
pub fn read_animation<P: AsRef<Path>>(engine_version: EngineVersion, path: P) -> Result<AnimData> {
    let data = std::fs::read(path.as_ref())?;
    tracing::debug!("decoding {} as {engine_version}", path.as_ref().display());
    decode_animation(engine_version, &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_dispatch_by_engine() {
        let mut bits = rta::tests::BitWriter::default();
        bits.put(0, 4).put(0, 3).put(0, 4).put(0, 4);
        bits.put(0xFF, 8).put(0, 16);
        let data = rta::tests::animation(1, &bits.finish());

        let anim = decode_animation(EngineVersion::JusticeLeagueHeroes, &data).unwrap();
        assert_eq!(anim.num_frames, 2);
        assert_eq!(anim.velocity_scale, RTA_VELOCITY_SCALE);

        // The same bytes read as a Dark Alliance file point the base pose
        // table at the bitstream and run out of data.
        assert!(matches!(
            decode_animation(EngineVersion::DarkAlliance, &data),
            Err(Error::UnexpectedEof { .. })
        ));
    }
}
