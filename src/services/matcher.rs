//! Pairing of style icon files with the live icon files of a game.
//!
//! Icons are discovered as `<style_dir>/<display name>.<ext>` and targets as
//! any file of a wanted type inside the game's target directory. Pairing is
//! purely by lowercased extension: each target is consumed by at most one icon.
//!
//! ```ignore
//! let icons = find_icons("Half-Life", style_dir);
//! let types = file_types(&icons);
//! let targets = find_targets(target_dir, &types);
//! let pairs = match_pairs(&icons, &targets);
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// Lowercased extension without the leading dot.
pub fn file_type_of(path: &Utf8Path) -> Option<String> {
    path.extension()
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Candidate artwork file from the selected style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconAsset {
    pub path: Utf8PathBuf,
    pub file_type: String,
}

/// Existing icon file inside a game's install directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAsset {
    pub path: Utf8PathBuf,
    pub file_type: String,
}

impl IconAsset {
    /// Returns `None` for files without an extension.
    pub fn from_path(path: impl Into<Utf8PathBuf>) -> Option<Self> {
        let path = path.into();
        let file_type = file_type_of(&path)?;
        Some(Self { path, file_type })
    }
}

impl TargetAsset {
    pub fn from_path(path: impl Into<Utf8PathBuf>) -> Option<Self> {
        let path = path.into();
        let file_type = file_type_of(&path)?;
        Some(Self { path, file_type })
    }
}

/// An icon and the target it will overwrite. Both share a file type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub icon: IconAsset,
    pub target: TargetAsset,
}

/// Regular files directly inside `dir`, sorted by file name.
fn list_files(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    let entries = match dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read directory {}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut files: Vec<Utf8PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file())
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

/// Every file in `style_dir` whose stem is exactly `name`, whatever its type.
pub fn find_icons(name: &str, style_dir: &Utf8Path) -> Vec<IconAsset> {
    let icons: Vec<IconAsset> = list_files(style_dir)
        .into_iter()
        .filter(|path| path.file_stem() == Some(name))
        .filter_map(IconAsset::from_path)
        .collect();

    tracing::debug!("Found {} icon file(s) for {} in {}", icons.len(), name, style_dir);
    icons
}

/// Every file in `dir` whose lowercased type is in `types`.
pub fn find_targets(dir: &Utf8Path, types: &IndexSet<String>) -> Vec<TargetAsset> {
    list_files(dir)
        .into_iter()
        .filter_map(TargetAsset::from_path)
        .filter(|target| types.contains(&target.file_type))
        .collect()
}

/// Distinct file types of `icons` in discovery order.
pub fn file_types(icons: &[IconAsset]) -> IndexSet<String> {
    icons.iter().map(|icon| icon.file_type.clone()).collect()
}

/// Pair icons to targets of the same type.
///
/// Icons are visited in order; each takes the first still-unused target of its
/// type, so no target appears in more than one pair.
pub fn match_pairs(icons: &[IconAsset], targets: &[TargetAsset]) -> Vec<MatchedPair> {
    let mut available: IndexMap<&str, VecDeque<&TargetAsset>> = IndexMap::new();
    for target in targets {
        available
            .entry(target.file_type.as_str())
            .or_default()
            .push_back(target);
    }

    let mut pairs = Vec::new();
    for icon in icons {
        if let Some(target) = available
            .get_mut(icon.file_type.as_str())
            .and_then(|pool| pool.pop_front())
        {
            pairs.push(MatchedPair {
                icon: icon.clone(),
                target: target.clone(),
            });
        }
    }

    pairs
}
