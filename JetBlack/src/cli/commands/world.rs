//! CLI commands for world files

use std::path::Path;

use crate::config::DecodeOptions;
use crate::converter::{write_json, write_png};
use crate::formats::texture::WorldTexFile;
use crate::formats::world::{read_objects, read_world};

/// Decode a world file, optionally with its textures
pub fn decode(
    path: &Path,
    textures: Option<&Path>,
    options: &DecodeOptions,
    output: Option<&Path>,
    png_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let tex_file = textures
        .map(|textures| WorldTexFile::open(options.engine_version, textures))
        .transpose()?;
    let world = read_world(path, tex_file.as_ref(), options)?;

    println!("World: {} ({})", path.display(), options.engine_version);
    println!("Elements: {} of {}", world.elements.len(), world.header.num_elements);
    println!("Models: {}", world.models.len());
    println!("Textures: {}", world.textures.len());
    println!("Triangles: {}", world.triangle_count());

    if let Some(output) = output {
        write_json(&world, output)?;
        println!("World written to {}", output.display());
    }
    if let Some(png_dir) = png_dir {
        std::fs::create_dir_all(png_dir)?;
        for (i, texture) in world.textures.iter().enumerate() {
            write_png(texture, png_dir.join(format!("texture_{i:03}.png")))?;
        }
        println!("{} textures written to {}", world.textures.len(), png_dir.display());
    }
    Ok(())
}

/// List the objects of an object definition file
pub fn objects(path: &Path, json: Option<&Path>) -> anyhow::Result<()> {
    let objects = read_objects(path)?;

    println!("Objects: {} ({})", path.display(), objects.len());
    for (i, object) in objects.iter().enumerate() {
        let p = object.position;
        println!("  [{i:3}] {:<24} ({:.1}, {:.1}, {:.1})", object.name, p.x, p.y, p.z);
        for property in &object.properties {
            println!("        {property}");
        }
    }

    if let Some(json) = json {
        write_json(&objects, json)?;
        println!("Objects written to {}", json.display());
    }
    Ok(())
}
