//! CLI commands for level scripts

use std::path::Path;

use crate::converter::write_json;
use crate::formats::script::read_script;

/// Disassemble a compiled script
pub fn disassemble(path: &Path, output: Option<&Path>, json: Option<&Path>) -> anyhow::Result<()> {
    let script = read_script(path)?;
    let listing = script.disassemble();

    if let Some(output) = output {
        std::fs::write(output, &listing)?;
        println!(
            "{} instructions disassembled to {}",
            script.instructions.len(),
            output.display()
        );
    } else {
        print!("{listing}");
    }

    if let Some(json) = json {
        write_json(&script, json)?;
        println!("Script written to {}", json.display());
    }
    Ok(())
}
