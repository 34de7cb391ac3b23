//! Dialog tables
//!
//! A flat array of `0x44`-byte entries: a `0x40`-byte name followed by the
//! entry's start offset in the voice audio file. Each entry runs up to the
//! start of the next; the last one runs to the end of the audio file.

use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::utils::ByteReader;

const ENTRY_SIZE: usize = 0x44;
const NAME_SIZE: usize = 0x40;

/// One line of recorded dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogEntry {
    pub name: String,
    /// Offset of the clip in the voice audio file.
    pub start: i32,
    /// Clip length in bytes, `None` when it runs to the end of the file.
    pub length: Option<i32>,
}

/// Decode a dialog table. Trailing bytes short of a full entry are ignored.
pub fn decode_dialog(data: &[u8]) -> Result<Vec<DialogEntry>> {
    let reader = ByteReader::new(data);
    let count = data.len() / ENTRY_SIZE;

    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let at = index * ENTRY_SIZE;
        let start = reader.i32_at(at + NAME_SIZE)?;
        let length = if index + 1 < count {
            Some(reader.i32_at(at + ENTRY_SIZE + NAME_SIZE)?.wrapping_sub(start))
        } else {
            None
        };
        entries.push(DialogEntry {
            name: reader.fixed_string_at(at, NAME_SIZE)?,
            start,
            length,
        });
    }
    tracing::debug!("decoded {} dialog entries", entries.len());
    Ok(entries)
}

pub fn read_dialog<P: AsRef<Path>>(path: P) -> Result<Vec<DialogEntry>> {
    decode_dialog(&std::fs::read(path)?)
}
