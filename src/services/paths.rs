//! Install-root defaults and filtering of the configured games.

use crate::models::{Catalog, GameEntry};
use camino::{Utf8Path, Utf8PathBuf};

/// Default Steam install root for the current platform.
///
/// `None` on platforms without a known location (and when the home directory
/// is not valid UTF-8); callers must then ask the user for a root.
pub fn default_root() -> Option<Utf8PathBuf> {
    if cfg!(target_os = "windows") {
        Some(Utf8PathBuf::from(r"C:\Program Files (x86)\Steam"))
    } else if cfg!(target_os = "linux") {
        let home = dirs::home_dir()?;
        let home = Utf8PathBuf::from_path_buf(home).ok()?;
        Some(home.join(".local").join("share").join("Steam"))
    } else {
        None
    }
}

/// Games whose target directory exists under `root` and which the style does not exclude.
///
/// Keeps catalog order.
pub fn available_games<'a>(
    catalog: &'a Catalog,
    style_index: usize,
    root: &Utf8Path,
) -> Vec<&'a GameEntry> {
    catalog
        .games()
        .filter(|game| {
            if catalog.is_excluded(style_index, game.id) {
                tracing::debug!("{} excluded for style {}", game.name, style_index);
                return false;
            }
            game.target_dir(root).is_dir()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameEntry, StyleDefinition};
    use std::fs;
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.styles = vec![
            StyleDefinition::new("Default").excluding([6, 7]),
            StyleDefinition::new("Alt"),
        ];
        catalog.games.clear();
        for (id, name) in [(1, "One"), (6, "Six"), (7, "Seven"), (9, "Nine")] {
            catalog
                .games
                .insert(id, GameEntry::new(id, name, format!("common/{}", name), 100 + id as u64));
        }
        catalog.normalize().unwrap()
    }

    #[test]
    fn test_available_games_requires_existing_dir() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::create_dir_all(root.join("common/One")).unwrap();
        fs::create_dir_all(root.join("common/Nine")).unwrap();

        let catalog = catalog();
        let games = available_games(&catalog, 2, root);
        let ids: Vec<u32> = games.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![1, 9]);
    }

    #[test]
    fn test_available_games_applies_style_exclusions() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        for name in ["One", "Six", "Seven", "Nine"] {
            fs::create_dir_all(root.join("common").join(name)).unwrap();
        }

        let catalog = catalog();
        let style_one: Vec<u32> = available_games(&catalog, 1, root).iter().map(|g| g.id).collect();
        let style_two: Vec<u32> = available_games(&catalog, 2, root).iter().map(|g| g.id).collect();

        assert_eq!(style_one, vec![1, 9]);
        assert_eq!(style_two, vec![1, 6, 7, 9]);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_default_root_on_linux() {
        let root = default_root().unwrap();
        assert!(root.as_str().ends_with(".local/share/Steam"));
    }
}
