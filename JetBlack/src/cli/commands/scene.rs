//! CLI commands for cutscenes and dialog

use std::path::Path;

use crate::converter::write_json;
use crate::formats::scene::{read_cutscene, read_dialog};

/// Print a cutscene listing
pub fn cutscene(path: &Path, json: Option<&Path>) -> anyhow::Result<()> {
    let scene = read_cutscene(path)?;
    print!("{scene}");

    if let Some(json) = json {
        write_json(&scene, json)?;
        println!("Cutscene written to {}", json.display());
    }
    Ok(())
}

/// List a dialog table
pub fn dialog(path: &Path, json: Option<&Path>) -> anyhow::Result<()> {
    let entries = read_dialog(path)?;

    println!("Dialog: {} ({} entries)", path.display(), entries.len());
    for entry in &entries {
        let length = entry
            .length
            .map_or_else(|| "to end".to_string(), |length| format!("{length:#x}"));
        println!("  {:<40} {:#010x}  {length}", entry.name, entry.start);
    }

    if let Some(json) = json {
        write_json(&entries, json)?;
        println!("Dialog written to {}", json.display());
    }
    Ok(())
}
