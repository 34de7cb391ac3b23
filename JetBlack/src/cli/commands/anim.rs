//! CLI commands for animations

use std::path::Path;

use crate::config::EngineVersion;
use crate::converter::write_json;
use crate::formats::anim::read_animation;

/// Decode an animation file
pub fn decode(path: &Path, engine: EngineVersion, output: Option<&Path>) -> anyhow::Result<()> {
    let anim = read_animation(engine, path)?;

    println!("Animation: {} ({engine})", path.display());
    println!("Bones: {}", anim.num_bones);
    println!("Frames: {}", anim.num_frames);
    println!("Keyframes: {}", anim.mesh_poses.len());

    if let Some(output) = output {
        write_json(&anim, output)?;
        println!("Animation written to {}", output.display());
    }
    Ok(())
}
