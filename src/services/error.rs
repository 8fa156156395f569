use camino::Utf8PathBuf;
use thiserror::Error;

/// Everything that can go wrong for one game in one step of the apply pipeline.
///
/// The display text is the message shown to the user for the failing step.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("Game #{0} is not in the catalog. Skipping.")]
    UnknownGame(u32),

    #[error("Style {0} is not defined. Skipping.")]
    UnknownStyle(usize),

    #[error("{game} folder missing. Skipping.")]
    MissingTargetDirectory { game: String, path: Utf8PathBuf },

    #[error("Style folder missing. Skipping.")]
    MissingStyleDirectory(Utf8PathBuf),

    #[error("No icon files found for {0}. Skipping.")]
    NoIconAssetsFound(String),

    #[error("No matching target files found for {0}. Skipping.")]
    NoMatchingTargetType(String),

    #[error("No matching file pairs found for {0}. Skipping.")]
    NoMatchedPairs(String),

    #[error("Failed to copy {src} to {dest}: {source}")]
    CopyFailure {
        src: String,
        dest: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Library cache folder missing: {0}")]
    ThumbnailCacheDirMissing(Utf8PathBuf),

    #[error("No existing library image in {0}")]
    NoExistingThumbnail(Utf8PathBuf),

    #[error("No JPEG-compatible icon was applied")]
    NoJpegSource,

    #[error("Failed to write library image {path}: {reason}")]
    ThumbnailWrite { path: Utf8PathBuf, reason: String },

    #[error("Shortcut I/O error on {path}: {source}")]
    ShortcutIoFailure {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid launch pattern for app {app_id}: {source}")]
    LaunchPattern {
        app_id: u64,
        #[source]
        source: regex::Error,
    },

    #[error("Icons folder not found!")]
    SourceMissing(Utf8PathBuf),
}

impl ApplyError {
    /// Whether this error only means "nothing to do" rather than a real failure.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ApplyError::ThumbnailCacheDirMissing(_)
                | ApplyError::NoExistingThumbnail(_)
                | ApplyError::NoJpegSource
        )
    }
}
