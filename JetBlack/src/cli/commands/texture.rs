//! CLI commands for texture operations

use std::path::Path;

use crate::config::EngineVersion;
use crate::converter::write_png;
use crate::formats::texture::{WorldTexFile, decode_tex};

/// Decode a `.tex` file to PNG
pub fn decode(path: &Path, output: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(path)?;
    let buffer = decode_tex(&data)?;
    write_png(&buffer, output)?;
    println!("{}x{} texture written to {}", buffer.width, buffer.height, output.display());
    Ok(())
}

/// Decode one texture of a world texture file to PNG
pub fn world(
    path: &Path,
    offset: usize,
    chunk: usize,
    engine: EngineVersion,
    output: &Path,
) -> anyhow::Result<()> {
    let file = WorldTexFile::open(engine, path)?;
    let buffer = file.decode(offset, chunk)?;
    write_png(&buffer, output)?;
    println!(
        "{}x{} {engine} world texture written to {}",
        buffer.width,
        buffer.height,
        output.display()
    );
    Ok(())
}

/// List the texture directory of a world texture file
pub fn entries(path: &Path, engine: EngineVersion) -> anyhow::Result<()> {
    let file = WorldTexFile::open(engine, path)?;

    println!("World textures: {}", path.display());
    if file.entries().is_empty() {
        println!("No texture directory ({engine} files address textures by offset)");
        return Ok(());
    }
    for (i, entry) in file.entries().iter().enumerate() {
        let (div, modulo) = entry.cell();
        println!(
            "  [{i:3}] cell ({div:3}, {modulo:3})  offset {:#08x}  size {:#x}",
            entry.directory_offset, entry.size
        );
    }
    Ok(())
}
