//! Copies the bundled `icons/` tree to a user-chosen location.

use crate::services::ApplyError;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use walkdir::WalkDir;

/// Result of an extraction, always returned rather than raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractResult {
    pub success: bool,
    pub message: String,
    pub file_count: usize,
}

impl ExtractResult {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            file_count: 0,
        }
    }
}

/// Copy `source_root/icons` to `dest_root/icons`.
///
/// An existing destination is removed first, so the result never merges with
/// older files. Callers confirm with the user before overwriting.
pub fn extract(source_root: &Utf8Path, dest_root: &Utf8Path) -> ExtractResult {
    let source = source_root.join("icons");
    let dest = dest_root.join("icons");

    if !source.is_dir() {
        tracing::warn!("Icons source folder not found: {}", source);
        return ExtractResult::failed(ApplyError::SourceMissing(source).to_string());
    }

    match replace_tree(&source, &dest) {
        Ok(file_count) => {
            tracing::info!("Extracted {} icon files to {}", file_count, dest);
            ExtractResult {
                success: true,
                message: format!("Icons extracted! ({} files)", file_count),
                file_count,
            }
        }
        Err(e) => {
            tracing::error!("Icon extraction to {} failed: {:#}", dest, e);
            ExtractResult::failed(format!("Extract failed: {:#}", e))
        }
    }
}

fn replace_tree(source: &Utf8Path, dest: &Utf8Path) -> Result<usize> {
    if dest.exists() {
        fs::remove_dir_all(dest)
            .with_context(|| format!("Failed to remove existing folder: {}", dest))?;
        tracing::debug!("Removed existing icons folder: {}", dest);
    }

    copy_tree(source, dest)?;
    count_files(dest)
}

fn copy_tree(source: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.with_context(|| format!("Failed to walk {}", source))?;
        let path = Utf8Path::from_path(entry.path())
            .with_context(|| format!("Non UTF-8 path under {}", source))?;
        let relative = path
            .strip_prefix(source)
            .with_context(|| format!("{} is outside {}", path, source))?;
        let target: Utf8PathBuf = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create directory: {}", target))?;
        } else {
            fs::copy(path, &target)
                .with_context(|| format!("Failed to copy {} -> {}", path, target))?;
        }
    }

    Ok(())
}

/// Number of regular files anywhere under `root`.
pub fn count_files(root: &Utf8Path) -> Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root))?;
        if entry.file_type().is_file() {
            count += 1;
        }
    }
    Ok(count)
}
