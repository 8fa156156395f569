use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// User preferences from `IconPack Settings.yaml`
///
/// Every field has a default so a missing file or a partial file loads cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Selected style, 1-based
    pub style: usize,

    /// Steam install root. Falls back to the platform default when unset.
    pub install_root: Option<Utf8PathBuf>,

    /// Directory containing the bundled `icons/` tree
    pub asset_root: Option<Utf8PathBuf>,

    /// Games to apply to; empty means every available game
    pub selected_games: Vec<u32>,

    pub debug_mode: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            style: 1,
            install_root: None,
            asset_root: None,
            selected_games: Vec::new(),
            debug_mode: false,
        }
    }
}

/// Immutable per-run parameters handed to every apply call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// 1-based style index
    pub style_index: usize,
    pub install_root: Utf8PathBuf,
    pub asset_root: Utf8PathBuf,
}

impl Session {
    pub fn new(
        style_index: usize,
        install_root: impl Into<Utf8PathBuf>,
        asset_root: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            style_index,
            install_root: install_root.into(),
            asset_root: asset_root.into(),
        }
    }

    /// `<asset_root>/icons/style<N>`
    pub fn style_dir(&self) -> Utf8PathBuf {
        self.asset_root
            .join("icons")
            .join(format!("style{}", self.style_index))
    }

    /// `<install_root>/appcache/librarycache`
    pub fn library_cache_root(&self) -> Utf8PathBuf {
        self.install_root.join("appcache").join("librarycache")
    }
}
