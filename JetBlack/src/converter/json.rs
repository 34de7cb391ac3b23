//! JSON dumps of decoded assets

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// Pretty-printed JSON for any decoded structure.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write pretty-printed JSON to `path`.
pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let mut output = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut output, value)?;
    output.write_all(b"\n")?;
    output.flush()?;
    tracing::debug!("wrote {}", path.as_ref().display());
    Ok(())
}
