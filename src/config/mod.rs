use crate::models::{Catalog, UserSettings};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Prefix of environment variables overriding user settings (`ICONPACK_STYLE=2`).
pub const ENV_PREFIX: &str = "ICONPACK";

/// Configuration manager for loading and saving YAML configuration files.
///
/// Manages two configuration files:
/// - Catalog (`IconPack Catalog.yaml`): pack name, styles, game mapping
/// - Settings (`IconPack Settings.yaml`): selected style, install root, game selection
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    catalog_path: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            catalog_path: config_dir.join("IconPack Catalog.yaml"),
            settings_path: config_dir.join("IconPack Settings.yaml"),
            config_dir,
        })
    }

    /// Load and validate the catalog.
    ///
    /// # Returns
    /// The loaded Catalog, or the built-in default if the file doesn't exist
    pub fn load_catalog(&self) -> Result<Catalog> {
        if !self.catalog_path.exists() {
            tracing::warn!(
                "Catalog file not found at {}, using defaults",
                self.catalog_path
            );
            return Ok(Catalog::default().normalize()?);
        }

        let file_contents = fs::read_to_string(&self.catalog_path)
            .with_context(|| format!("Failed to read catalog: {}", self.catalog_path))?;

        let catalog: Catalog = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse catalog: {}", self.catalog_path))?;

        let catalog = catalog
            .normalize()
            .with_context(|| format!("Invalid catalog: {}", self.catalog_path))?;

        for dangling in catalog.dangling_exclusions() {
            tracing::debug!("{}", dangling);
        }

        tracing::info!(
            "Loaded catalog from {}: {} styles, {} games",
            self.catalog_path,
            catalog.styles.len(),
            catalog.games.len()
        );
        Ok(catalog)
    }

    /// Save the catalog file.
    pub fn save_catalog(&self, catalog: &Catalog) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(catalog).context("Failed to serialize catalog to YAML")?;

        fs::write(&self.catalog_path, yaml_string)
            .with_context(|| format!("Failed to write catalog: {}", self.catalog_path))?;

        tracing::info!("Saved catalog to {}", self.catalog_path);
        Ok(())
    }

    /// Load user settings, layering `ICONPACK_*` environment variables over the file.
    ///
    /// A missing file yields the defaults (plus any environment overrides).
    pub fn load_settings(&self) -> Result<UserSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let settings = config::Config::builder()
            .add_source(
                config::File::new(self.settings_path.as_str(), config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("selected_games"),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize::<UserSettings>()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!(
            "Loaded settings: style={}, install_root={:?}, selected={}",
            settings.style,
            settings.install_root,
            settings.selected_games.len()
        );
        Ok(settings)
    }

    /// Save the user settings file.
    pub fn save_settings(&self, settings: &UserSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn catalog_path(&self) -> &Utf8Path {
        &self.catalog_path
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_create_config_manager_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = Utf8PathBuf::try_from(temp_dir.path().join("IconPack Data")).unwrap();
        let manager = ConfigManager::new(&nested).unwrap();
        assert!(manager.config_dir().is_dir());
    }

    #[test]
    fn test_default_catalog_when_missing() {
        let (manager, _temp_dir) = create_test_config_manager();
        let catalog = manager.load_catalog().unwrap();

        assert_eq!(catalog.styles.len(), 1);
        assert_eq!(catalog.game(1).unwrap().name, "Half-Life");
        assert_eq!(catalog.game(1).unwrap().app_id, 70);
    }

    #[test]
    fn test_save_load_catalog_round_trip() {
        let (manager, _temp_dir) = create_test_config_manager();
        let mut catalog = manager.load_catalog().unwrap();
        catalog.name = "Retro Pack".to_string();
        manager.save_catalog(&catalog).unwrap();

        let loaded = manager.load_catalog().unwrap();
        assert_eq!(loaded.name, "Retro Pack");
        assert!(loaded.is_excluded(1, 6));
        assert_eq!(loaded.game(1).unwrap().id, 1);
    }

    #[test]
    fn test_load_save_settings() {
        let (manager, _temp_dir) = create_test_config_manager();

        let settings = UserSettings {
            style: 2,
            selected_games: vec![1, 3],
            ..UserSettings::default()
        };
        manager.save_settings(&settings).unwrap();

        let loaded = manager.load_settings().unwrap();
        assert_eq!(loaded.style, 2);
        assert_eq!(loaded.selected_games, vec![1, 3]);
    }
}
