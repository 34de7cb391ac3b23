//! Batch decoding
//!
//! Decodes every asset of one kind under a directory in parallel, writing
//! each result next to its relative path in the destination directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::DecodeOptions;
use crate::converter::{write_json, write_png};
use crate::error::Result;
use crate::formats::anim::decode_animation;
use crate::formats::texture::decode_tex;
use crate::formats::vif::decode_model;

/// Asset types the batch decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum AssetKind {
    /// `.vif` models, written as mesh JSON
    Vif,
    /// `.tex` GIF-packet textures, written as PNG
    Tex,
    /// `.anm` animations, written as animation JSON
    Anm,
}

impl AssetKind {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vif => "vif",
            Self::Tex => "tex",
            Self::Anm => "anm",
        }
    }

    /// Extension of the decoded output file.
    #[must_use]
    pub fn output_extension(self) -> &'static str {
        match self {
            Self::Tex => "png",
            Self::Vif | Self::Anm => "json",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Progress of a running batch.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    pub file: String,
}

/// Result of a batch decode
#[derive(Debug, Clone, Default)]
pub struct BatchDecodeResult {
    /// Number of files decoded
    pub success_count: usize,
    /// Number of files that failed
    pub fail_count: usize,
    /// One message per file, in input order
    pub results: Vec<String>,
}

/// Find all files of `kind` below `dir`, sorted.
pub fn find_asset_files<P: AsRef<Path>>(dir: P, kind: AssetKind) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(kind.extension()))
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    files.sort();
    files
}

/// Decode one file and write its output.
pub fn decode_file(kind: AssetKind, input: &Path, output: &Path, options: &DecodeOptions) -> Result<()> {
    let data = std::fs::read(input)?;
    match kind {
        AssetKind::Vif => {
            let meshes = decode_model(&data, &options.mesh_assembler())?;
            write_json(&meshes, output)
        }
        AssetKind::Tex => write_png(&decode_tex(&data)?, output),
        AssetKind::Anm => write_json(&decode_animation(options.engine_version, &data)?, output),
    }
}

/// Decode files in parallel.
///
/// Outputs mirror each file's path relative to `source_base` under
/// `dest_base`. A failing file is counted and reported without stopping the
/// others.
pub fn batch_decode<F>(
    files: &[PathBuf],
    kind: AssetKind,
    source_base: &Path,
    dest_base: &Path,
    options: &DecodeOptions,
    progress: F,
) -> BatchDecodeResult
where
    F: Fn(&BatchProgress) + Send + Sync,
{
    let success_counter = AtomicUsize::new(0);
    let fail_counter = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let total = files.len();

    let results: Vec<String> = files
        .par_iter()
        .map(|input| {
            let relative_path = input.strip_prefix(source_base).unwrap_or(input.as_path());
            let display_path = relative_path.to_string_lossy();

            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(&BatchProgress {
                current,
                total,
                file: display_path.to_string(),
            });

            let output = dest_base
                .join(relative_path)
                .with_extension(kind.output_extension());
            if let Some(parent) = output.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    fail_counter.fetch_add(1, Ordering::SeqCst);
                    return format!("Failed to create folder for {display_path}: {e}");
                }
            }

            match decode_file(kind, input, &output, options) {
                Ok(()) => {
                    success_counter.fetch_add(1, Ordering::SeqCst);
                    format!("Decoded: {display_path}")
                }
                Err(e) => {
                    tracing::warn!("failed to decode {display_path}: {e}");
                    fail_counter.fetch_add(1, Ordering::SeqCst);
                    format!("Failed {display_path}: {e}")
                }
            }
        })
        .collect();

    BatchDecodeResult {
        success_count: success_counter.load(Ordering::SeqCst),
        fail_count: fail_counter.load(Ordering::SeqCst),
        results,
    }
}
