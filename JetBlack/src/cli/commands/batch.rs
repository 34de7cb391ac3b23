//! CLI command for batch decoding

use std::path::Path;
use std::time::Instant;

use crate::batch::{AssetKind, batch_decode, find_asset_files};
use crate::cli::progress::{LOOKING_GLASS, TRUCK, print_done, print_step, simple_bar};
use crate::config::DecodeOptions;

/// Decode every asset of `kind` below `source` into `destination`
pub fn execute(
    source: &Path,
    kind: AssetKind,
    destination: &Path,
    options: &DecodeOptions,
    quiet: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();

    if !quiet {
        print_step(1, 2, LOOKING_GLASS, &format!("Finding .{kind} files..."));
    }
    let files = find_asset_files(source, kind);
    if files.is_empty() {
        anyhow::bail!("no .{kind} files found in {}", source.display());
    }
    std::fs::create_dir_all(destination)?;

    if !quiet {
        print_step(2, 2, TRUCK, &format!("Decoding {} files...", files.len()));
    }
    let pb = simple_bar(files.len() as u64, "Decoding");
    if quiet {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let result = batch_decode(&files, kind, source, destination, options, |progress| {
        pb.set_position(progress.current as u64);
        pb.set_message(progress.file.clone());
    });
    pb.finish_and_clear();

    for line in result.results.iter().filter(|line| line.starts_with("Failed")) {
        eprintln!("{line}");
    }
    if !quiet {
        println!(
            "{} decoded, {} failed",
            result.success_count, result.fail_count
        );
        print_done(started.elapsed());
    }
    Ok(())
}
