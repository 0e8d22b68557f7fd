//! Batch Processing Module
//!
//! Input collection for batch conversions.

use crate::common_utils::has_extension;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Raster formats accepted by the WebP encoder.
pub const WEBP_SOURCE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff"];

/// Collect regular files under `dir` whose extension is in `extensions`.
///
/// Only the direct children of `dir` are considered; subfolders are ignored.
/// Unreadable entries are skipped; an unreadable `dir` itself is an error.
pub fn collect_files(dir: &Path, extensions: &[&str]) -> std::io::Result<Vec<PathBuf>> {
    // Surfaces missing/unreadable folders, which walkdir would only yield as entry errors.
    std::fs::read_dir(dir)?;

    Ok(WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| has_extension(e.path(), extensions))
        .map(|e| e.into_path())
        .collect())
}

/// Same as [`collect_files`], ordered by file name.
pub fn collect_files_sorted(dir: &Path, extensions: &[&str]) -> std::io::Result<Vec<PathBuf>> {
    let mut files = collect_files(dir, extensions)?;
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
