//! Replacement of the Steam library cache image for a game.
//!
//! Steam keeps a cached preview under `appcache/librarycache/<appid>/` with a
//! content-hash file name it references internally. The file name is kept and
//! only the bytes are replaced. The directory and the cached image are always
//! created by Steam; nothing here creates them.
//!
//! Two strategies are used, in order:
//! 1. copy an applied JPEG icon byte for byte
//! 2. otherwise decode an applied PNG/ICO/BMP icon and re-encode it as JPEG

use crate::services::ApplyError;
use crate::services::matcher::file_type_of;
use camino::{Utf8Path, Utf8PathBuf};
use image::ImageFormat;
use std::fs;

const JPEG_TYPES: [&str; 2] = ["jpg", "jpeg"];
const CONVERTIBLE_TYPES: [&str; 3] = ["png", "ico", "bmp"];

fn is_jpeg(path: &Utf8Path) -> bool {
    file_type_of(path).is_some_and(|t| JPEG_TYPES.contains(&t.as_str()))
}

fn is_convertible(path: &Utf8Path) -> bool {
    file_type_of(path).is_some_and(|t| CONVERTIBLE_TYPES.contains(&t.as_str()))
}

/// What the updater did with the cache
#[derive(Debug)]
pub enum ThumbnailUpdate {
    /// Cached file overwritten with the bytes of a JPEG icon
    Copied(Utf8PathBuf),
    /// Cached file overwritten with a JPEG encoded from another image type
    Reencoded(Utf8PathBuf),
    /// Nothing written; the error says why
    Skipped(ApplyError),
}

impl ThumbnailUpdate {
    pub fn is_updated(&self) -> bool {
        !matches!(self, ThumbnailUpdate::Skipped(_))
    }
}

/// Updates cached library images under an install root
#[derive(Debug, Clone)]
pub struct LibraryThumbnailUpdater {
    cache_root: Utf8PathBuf,
}

impl LibraryThumbnailUpdater {
    /// `cache_root` is `<install root>/appcache/librarycache`.
    pub fn new(cache_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
        }
    }

    pub fn cache_dir(&self, app_id: u64) -> Utf8PathBuf {
        self.cache_root.join(app_id.to_string())
    }

    /// First JPEG-family file in the cache directory, by name.
    fn existing_thumbnail(&self, cache_dir: &Utf8Path) -> Result<Utf8PathBuf, ApplyError> {
        let entries = cache_dir
            .read_dir_utf8()
            .map_err(|_| ApplyError::ThumbnailCacheDirMissing(cache_dir.to_path_buf()))?;

        let mut existing: Vec<Utf8PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .filter(|path| path.is_file() && is_jpeg(path))
            .collect();
        existing.sort();

        existing
            .into_iter()
            .next()
            .ok_or_else(|| ApplyError::NoExistingThumbnail(cache_dir.to_path_buf()))
    }

    /// Replace the cached image for `app_id` using one of `applied_icons`.
    ///
    /// Skips (without writing) when the cache directory or its image is
    /// missing or no applied icon can be turned into a JPEG. Only write
    /// failures are errors.
    pub fn update(
        &self,
        app_id: u64,
        applied_icons: &[Utf8PathBuf],
    ) -> Result<ThumbnailUpdate, ApplyError> {
        let cache_dir = self.cache_dir(app_id);
        if !cache_dir.is_dir() {
            return Ok(ThumbnailUpdate::Skipped(ApplyError::ThumbnailCacheDirMissing(
                cache_dir,
            )));
        }

        let existing = match self.existing_thumbnail(&cache_dir) {
            Ok(path) => path,
            Err(reason) => return Ok(ThumbnailUpdate::Skipped(reason)),
        };

        if let Some(jpeg) = applied_icons.iter().find(|p| is_jpeg(p)) {
            fs::copy(jpeg, &existing).map_err(|e| ApplyError::ThumbnailWrite {
                path: existing.clone(),
                reason: e.to_string(),
            })?;
            tracing::info!("Library image {} replaced with {}", existing, jpeg);
            return Ok(ThumbnailUpdate::Copied(existing));
        }

        if let Some(source) = applied_icons.iter().find(|p| is_convertible(p)) {
            reencode_as_jpeg(source, &existing)?;
            tracing::info!("Library image {} re-encoded from {}", existing, source);
            return Ok(ThumbnailUpdate::Reencoded(existing));
        }

        Ok(ThumbnailUpdate::Skipped(ApplyError::NoJpegSource))
    }

    /// Boolean form of [`update`](Self::update): `true` when the cache was written.
    pub fn update_cache(&self, app_id: u64, applied_icons: &[Utf8PathBuf]) -> Result<bool, ApplyError> {
        self.update(app_id, applied_icons).map(|u| u.is_updated())
    }
}

fn reencode_as_jpeg(source: &Utf8Path, dest: &Utf8Path) -> Result<(), ApplyError> {
    let write_error = |reason: String| ApplyError::ThumbnailWrite {
        path: dest.to_path_buf(),
        reason,
    };

    let img = image::open(source).map_err(|e| write_error(format!("decode {}: {}", source, e)))?;
    // JPEG has no alpha channel
    let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());
    rgb.save_with_format(dest, ImageFormat::Jpeg)
        .map_err(|e| write_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_copies_jpeg_and_keeps_cached_name() {
        let (_dir, root) = setup();
        let cache = root.join("librarycache");
        fs::create_dir_all(cache.join("70")).unwrap();
        fs::write(cache.join("70/ABCDEF.jpg"), b"old").unwrap();
        fs::write(root.join("a.jpg"), b"new artwork").unwrap();

        let updater = LibraryThumbnailUpdater::new(&cache);
        let updated = updater.update_cache(70, &[root.join("a.jpg")]).unwrap();

        assert!(updated);
        assert_eq!(fs::read(cache.join("70/ABCDEF.jpg")).unwrap(), b"new artwork");
        assert_eq!(fs::read_dir(cache.join("70")).unwrap().count(), 1);
    }

    #[test]
    fn test_no_existing_jpeg_is_a_noop() {
        let (_dir, root) = setup();
        let cache = root.join("librarycache");
        fs::create_dir_all(cache.join("70")).unwrap();
        fs::write(cache.join("70/header.png"), b"png").unwrap();
        fs::write(root.join("a.jpg"), b"new").unwrap();

        let updater = LibraryThumbnailUpdater::new(&cache);
        let update = updater.update(70, &[root.join("a.jpg")]).unwrap();

        assert!(matches!(
            update,
            ThumbnailUpdate::Skipped(ApplyError::NoExistingThumbnail(_))
        ));
        assert_eq!(fs::read(cache.join("70/header.png")).unwrap(), b"png");
        assert_eq!(fs::read_dir(cache.join("70")).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_cache_dir_is_a_noop() {
        let (_dir, root) = setup();
        let updater = LibraryThumbnailUpdater::new(root.join("librarycache"));

        let update = updater.update(70, &[root.join("a.jpg")]).unwrap();
        assert!(matches!(
            update,
            ThumbnailUpdate::Skipped(ApplyError::ThumbnailCacheDirMissing(_))
        ));
        assert!(!root.join("librarycache").exists());
    }

    #[test]
    fn test_no_jpeg_source_skips() {
        let (_dir, root) = setup();
        let cache = root.join("librarycache");
        fs::create_dir_all(cache.join("70")).unwrap();
        fs::write(cache.join("70/ABCDEF.jpg"), b"old").unwrap();

        let updater = LibraryThumbnailUpdater::new(&cache);
        let update = updater.update(70, &[root.join("a.txt")]).unwrap();

        assert!(matches!(update, ThumbnailUpdate::Skipped(ApplyError::NoJpegSource)));
        assert_eq!(fs::read(cache.join("70/ABCDEF.jpg")).unwrap(), b"old");
    }

    #[test]
    fn test_reencodes_png_into_cached_jpeg() {
        let (_dir, root) = setup();
        let cache = root.join("librarycache");
        fs::create_dir_all(cache.join("70")).unwrap();
        fs::write(cache.join("70/ABCDEF.jpg"), b"old").unwrap();

        let png = root.join("a.png");
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 10, 10, 255]));
        img.save_with_format(&png, ImageFormat::Png).unwrap();

        let updater = LibraryThumbnailUpdater::new(&cache);
        let update = updater.update(70, &[png]).unwrap();

        assert!(matches!(update, ThumbnailUpdate::Reencoded(_)));
        let written = fs::read(cache.join("70/ABCDEF.jpg")).unwrap();
        assert_eq!(&written[..2], &[0xFF, 0xD8]);
    }
}
