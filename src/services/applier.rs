use crate::models::{ApplyStep, Catalog, GameEntry, OperationOutcome, Session};
use crate::services::ApplyError;
use crate::services::matcher::{file_types, find_icons, find_targets, match_pairs};
use crate::services::shortcuts::ShortcutUpdater;
use crate::services::thumbnail::{LibraryThumbnailUpdater, ThumbnailUpdate};
use camino::Utf8PathBuf;
use indexmap::{IndexMap, IndexSet};
use std::fs;
use std::sync::Arc;

/// Icons successfully copied for one game
#[derive(Debug, Default, Clone)]
pub struct AppliedIcons {
    /// Destination path per file type; a later copy of the same type wins
    pub targets: IndexMap<String, Utf8PathBuf>,
    /// Style files that were copied, in copy order
    pub sources: Vec<Utf8PathBuf>,
}

impl AppliedIcons {
    pub fn count(&self) -> usize {
        self.sources.len()
    }
}

/// Drives the per-game pipeline: validate, match, copy, thumbnail, shortcuts.
///
/// Every failure is reported as an [`OperationOutcome`] for the game and step
/// it happened in; nothing stops the remaining steps or games. Copies that
/// succeeded are never rolled back.
pub struct IconApplier {
    catalog: Arc<Catalog>,
    shortcuts: ShortcutUpdater,
}

impl IconApplier {
    /// Applier using the current platform's shortcut format and desktop folders.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            shortcuts: ShortcutUpdater::for_platform(),
        }
    }

    pub fn with_shortcut_updater(mut self, shortcuts: ShortcutUpdater) -> Self {
        self.shortcuts = shortcuts;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Apply the session's style to `ids`, collecting every outcome in order.
    pub fn apply(&self, session: &Session, ids: &[u32]) -> Vec<OperationOutcome> {
        let mut outcomes = Vec::new();
        self.apply_with(session, ids, |outcome| outcomes.push(outcome));
        outcomes
    }

    /// Like [`apply`](Self::apply) but hands each outcome to `sink` as soon as it exists.
    ///
    /// Duplicate ids are processed once, in first-seen order.
    pub fn apply_with<F>(&self, session: &Session, ids: &[u32], mut sink: F)
    where
        F: FnMut(OperationOutcome),
    {
        let unique: IndexSet<u32> = ids.iter().copied().collect();
        tracing::info!(
            "Applying style {} to {} game(s) under {}",
            session.style_index,
            unique.len(),
            session.install_root
        );

        for id in unique {
            self.apply_game(session, id, &mut sink);
        }
    }

    /// Run the whole pipeline for one game id.
    pub fn apply_game<F>(&self, session: &Session, id: u32, sink: &mut F)
    where
        F: FnMut(OperationOutcome),
    {
        let Some(game) = self.catalog.game(id) else {
            tracing::warn!("Unknown game id {}", id);
            sink(failure(&format!("Game #{}", id), ApplyStep::Validate, ApplyError::UnknownGame(id)));
            return;
        };

        let applied = match self.copy_icons(session, game, sink) {
            Ok(applied) => applied,
            Err(e) => {
                tracing::warn!("{}: {}", game.name, e);
                sink(failure(&game.name, ApplyStep::Validate, e));
                return;
            }
        };

        if applied.count() == 0 {
            return;
        }

        sink(OperationOutcome::success(
            &game.name,
            ApplyStep::Copy,
            format!("{}: Applied {} icon(s)!", game.name, applied.count()),
        ));

        if let Some(outcome) = self.update_thumbnail(session, game, &applied) {
            sink(outcome);
        }
        if let Some(outcome) = self.update_shortcuts(game, &applied) {
            sink(outcome);
        }
    }

    /// Validate, match and copy. Copy failures are reported through `sink`
    /// per pair; errors returned here end the game's pipeline.
    fn copy_icons<F>(
        &self,
        session: &Session,
        game: &GameEntry,
        sink: &mut F,
    ) -> Result<AppliedIcons, ApplyError>
    where
        F: FnMut(OperationOutcome),
    {
        let target_dir = game.target_dir(&session.install_root);
        if !target_dir.is_dir() {
            return Err(ApplyError::MissingTargetDirectory {
                game: game.name.clone(),
                path: target_dir,
            });
        }

        if self.catalog.style(session.style_index).is_none() {
            return Err(ApplyError::UnknownStyle(session.style_index));
        }
        let style_dir = session.style_dir();
        if !style_dir.is_dir() {
            return Err(ApplyError::MissingStyleDirectory(style_dir));
        }

        let icons = find_icons(&game.name, &style_dir);
        if icons.is_empty() {
            return Err(ApplyError::NoIconAssetsFound(game.name.clone()));
        }

        let targets = find_targets(&target_dir, &file_types(&icons));
        if targets.is_empty() {
            return Err(ApplyError::NoMatchingTargetType(game.name.clone()));
        }

        let pairs = match_pairs(&icons, &targets);
        if pairs.is_empty() {
            return Err(ApplyError::NoMatchedPairs(game.name.clone()));
        }

        let mut applied = AppliedIcons::default();
        for pair in pairs {
            match fs::copy(&pair.icon.path, &pair.target.path) {
                Ok(_) => {
                    tracing::debug!("Copied {} -> {}", pair.icon.path, pair.target.path);
                    applied
                        .targets
                        .insert(pair.target.file_type.clone(), pair.target.path.clone());
                    applied.sources.push(pair.icon.path);
                }
                Err(source) => {
                    let err = ApplyError::CopyFailure {
                        src: pair.icon.path.file_name().unwrap_or_default().to_string(),
                        dest: pair.target.path.file_name().unwrap_or_default().to_string(),
                        source,
                    };
                    tracing::warn!("{}: {}", game.name, err);
                    sink(failure(&game.name, ApplyStep::Copy, err));
                }
            }
        }

        Ok(applied)
    }

    fn update_thumbnail(
        &self,
        session: &Session,
        game: &GameEntry,
        applied: &AppliedIcons,
    ) -> Option<OperationOutcome> {
        let updater = LibraryThumbnailUpdater::new(session.library_cache_root());
        match updater.update(game.app_id, &applied.sources) {
            Ok(ThumbnailUpdate::Skipped(reason)) => {
                tracing::debug!("{}: library image not updated: {}", game.name, reason);
                None
            }
            Ok(_) => Some(OperationOutcome::success(
                &game.name,
                ApplyStep::Thumbnail,
                format!("{} library icon applied!", game.name),
            )),
            Err(e) => {
                tracing::warn!("{}: {}", game.name, e);
                Some(OperationOutcome::failure(
                    &game.name,
                    ApplyStep::Thumbnail,
                    format!("Failed library icon for {}: {}", game.name, e),
                ))
            }
        }
    }

    fn update_shortcuts(&self, game: &GameEntry, applied: &AppliedIcons) -> Option<OperationOutcome> {
        let Some(icon) = self.shortcuts.format().preferred_icon(&applied.targets) else {
            tracing::debug!("{}: no applied icon suits {:?} shortcuts", game.name, self.shortcuts.format());
            return None;
        };

        match self.shortcuts.update_all(game.app_id, icon) {
            Ok(0) => None,
            Ok(count) => Some(OperationOutcome::success(
                &game.name,
                ApplyStep::Shortcuts,
                format!("{}: Updated {} desktop shortcut(s)!", game.name, count),
            )),
            Err(e) => {
                tracing::warn!("{}: {}", game.name, e);
                Some(OperationOutcome::failure(
                    &game.name,
                    ApplyStep::Shortcuts,
                    format!("Failed desktop shortcuts for {}: {}", game.name, e),
                ))
            }
        }
    }
}

fn failure(game_name: &str, step: ApplyStep, err: ApplyError) -> OperationOutcome {
    OperationOutcome::failure(game_name, step, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::shortcuts::ShortcutFormat;
    use camino::Utf8Path;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: Utf8PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
            fs::create_dir_all(root.join("pack/icons/style1")).unwrap();
            fs::create_dir_all(root.join("steam/steamapps/common/Half-Life/valve")).unwrap();
            fs::create_dir_all(root.join("desktop")).unwrap();
            Self { _dir: dir, root }
        }

        fn session(&self) -> Session {
            Session::new(1, self.root.join("steam"), self.root.join("pack"))
        }

        fn applier(&self) -> IconApplier {
            IconApplier::new(Arc::new(Catalog::default().normalize().unwrap())).with_shortcut_updater(
                ShortcutUpdater::new(ShortcutFormat::InternetShortcut, vec![self.root.join("desktop")]),
            )
        }

        fn write(&self, relative: &str, bytes: &[u8]) -> Utf8PathBuf {
            let path = self.root.join(relative);
            fs::write(&path, bytes).unwrap();
            path
        }
    }

    #[test]
    fn test_unknown_game_reports_failure() {
        let fx = Fixture::new();
        let outcomes = fx.applier().apply(&fx.session(), &[42]);

        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].game_name, "Game #42");
        assert_eq!(outcomes[0].step, ApplyStep::Validate);
    }

    #[test]
    fn test_missing_style_dir_reports_failure() {
        let fx = Fixture::new();
        fs::remove_dir_all(fx.root.join("pack/icons/style1")).unwrap();

        let outcomes = fx.applier().apply(&fx.session(), &[1]);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].message, "Style folder missing. Skipping.");
    }

    #[test]
    fn test_no_icons_reports_failure() {
        let fx = Fixture::new();
        let outcomes = fx.applier().apply(&fx.session(), &[1]);

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].message, "No icon files found for Half-Life. Skipping.");
    }

    #[test]
    fn test_no_target_of_matching_type() {
        let fx = Fixture::new();
        fx.write("pack/icons/style1/Half-Life.png", b"png");
        fx.write("steam/steamapps/common/Half-Life/valve/game.ico", b"ico");

        let outcomes = fx.applier().apply(&fx.session(), &[1]);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0].message,
            "No matching target files found for Half-Life. Skipping."
        );
    }

    #[test]
    fn test_full_pipeline_updates_every_artifact() {
        let fx = Fixture::new();
        fx.write("pack/icons/style1/Half-Life.ico", b"new ico");
        fx.write("pack/icons/style1/Half-Life.jpg", b"new jpg");
        let ico_target = fx.write("steam/steamapps/common/Half-Life/valve/game.ico", b"old ico");
        fx.write("steam/steamapps/common/Half-Life/valve/game.jpg", b"old jpg");
        fs::create_dir_all(fx.root.join("steam/appcache/librarycache/70")).unwrap();
        fx.write("steam/appcache/librarycache/70/0123abcd.jpg", b"cached");
        fx.write("desktop/Half-Life.url", b"[InternetShortcut]\nURL=steam://rungameid/70\n");

        let outcomes = fx.applier().apply(&fx.session(), &[1]);
        let messages: Vec<&str> = outcomes.iter().map(|o| o.message.as_str()).collect();

        assert_eq!(
            messages,
            vec![
                "Half-Life: Applied 2 icon(s)!",
                "Half-Life library icon applied!",
                "Half-Life: Updated 1 desktop shortcut(s)!",
            ]
        );
        assert!(outcomes.iter().all(|o| o.success));
        assert_eq!(fs::read(&ico_target).unwrap(), b"new ico");
        assert_eq!(
            fs::read(fx.root.join("steam/appcache/librarycache/70/0123abcd.jpg")).unwrap(),
            b"new jpg"
        );
        let shortcut = fs::read_to_string(fx.root.join("desktop/Half-Life.url")).unwrap();
        assert!(shortcut.contains(&format!("IconFile={}\nIconIndex=0", ico_target)));
    }

    #[test]
    fn test_duplicate_ids_processed_once() {
        let fx = Fixture::new();
        let outcomes = fx.applier().apply(&fx.session(), &[1, 1]);
        assert_eq!(outcomes.len(), 1);
    }

    #[test]
    fn test_applied_icons_tracks_targets_by_type() {
        let mut applied = AppliedIcons::default();
        applied.targets.insert("ico".to_string(), Utf8PathBuf::from("/a.ico"));
        applied.sources.push(Utf8PathBuf::from("/s/a.ico"));
        assert_eq!(applied.count(), 1);
        assert_eq!(applied.targets.get("ico").map(|p| p.as_path()), Some(Utf8Path::new("/a.ico")));
    }
}
