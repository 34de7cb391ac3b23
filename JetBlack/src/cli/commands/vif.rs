//! CLI commands for VIF models

use std::path::Path;

use crate::config::DecodeOptions;
use crate::converter::write_json;
use crate::formats::vif::{decode_chunks, decode_model};

/// Print the chunk layout of every mesh in a model file
pub fn inspect(path: &Path, json: Option<&Path>) -> anyhow::Result<()> {
    let data = std::fs::read(path)?;
    let meshes = decode_chunks(&data)?;

    println!("VIF model: {}", path.display());
    println!("Meshes: {}", meshes.len());
    for (i, chunks) in meshes.iter().enumerate() {
        println!();
        println!("Mesh {i}: {} chunks", chunks.len());
        for (j, chunk) in chunks.iter().enumerate() {
            let prim = chunk
                .gif_tag0
                .as_ref()
                .map_or_else(|| "-".to_string(), |tag| format!("{:#x}", tag.primitive_type()));
            println!(
                "  [{j:3}] mscal {:3}  prim {prim:>4}  verts {:3}  normals {:3}  vlocs {:3}  uvs {:3}  weights {:2}  extra {:2}",
                chunk.mscal_id,
                chunk.vertices.len(),
                chunk.normals.len(),
                chunk.vlocs.len(),
                chunk.uvs.len(),
                chunk.vertex_weights.len(),
                chunk.extra_vlocs.len(),
            );
        }
    }

    if let Some(json) = json {
        write_json(&meshes, json)?;
        println!();
        println!("Chunks written to {}", json.display());
    }
    Ok(())
}

/// Decode a model file into meshes
pub fn decode(path: &Path, options: &DecodeOptions, output: Option<&Path>) -> anyhow::Result<()> {
    let data = std::fs::read(path)?;
    let meshes = decode_model(&data, &options.mesh_assembler())?;

    for (i, mesh) in meshes.iter().enumerate() {
        println!(
            "Mesh {i}: {} vertices, {} triangles, {} weight ranges",
            mesh.positions.len(),
            mesh.triangle_count(),
            mesh.vertex_weights.len()
        );
    }

    if let Some(output) = output {
        write_json(&meshes, output)?;
        println!("Meshes written to {}", output.display());
    }
    Ok(())
}
