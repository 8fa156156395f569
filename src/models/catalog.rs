use camino::Utf8PathBuf;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named variant of the icon artwork.
///
/// Styles are addressed by their 1-based position in the catalog; the
/// matching asset directory is `icons/style<N>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Game ids this style ships no artwork for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_games: Vec<u32>,
}

impl StyleDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            excluded_games: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn excluding(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.excluded_games.extend(ids);
        self
    }

    pub fn excludes(&self, game_id: u32) -> bool {
        self.excluded_games.contains(&game_id)
    }
}

/// Style entries may be written either as a bare label or as a full record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StyleEntry {
    Label(String),
    Record(StyleDefinition),
}

impl From<StyleEntry> for StyleDefinition {
    fn from(entry: StyleEntry) -> Self {
        match entry {
            StyleEntry::Label(name) => StyleDefinition::new(name),
            StyleEntry::Record(style) => style,
        }
    }
}

fn deserialize_styles<'de, D>(deserializer: D) -> Result<Vec<StyleDefinition>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries = Vec::<StyleEntry>::deserialize(deserializer)?;
    Ok(entries.into_iter().map(StyleDefinition::from).collect())
}

/// One installed application whose icons can be replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEntry {
    /// Filled from the catalog map key at load time.
    #[serde(skip)]
    pub id: u32,

    pub name: String,

    /// Directory holding the live icon files, relative to the install root.
    pub target: String,

    /// Steam application id.
    pub app_id: u64,
}

impl GameEntry {
    pub fn new(id: u32, name: impl Into<String>, target: impl Into<String>, app_id: u64) -> Self {
        Self {
            id,
            name: name.into(),
            target: target.into(),
            app_id,
        }
    }

    /// Resolve the target directory under `root`.
    ///
    /// Accepts either separator in the configured path so catalogs written on
    /// Windows keep working elsewhere.
    pub fn target_dir(&self, root: &camino::Utf8Path) -> Utf8PathBuf {
        let mut dir = root.to_path_buf();
        for component in self.target.split(['/', '\\']).filter(|c| !c.is_empty()) {
            dir.push(component);
        }
        dir
    }
}

/// Errors found while validating a catalog
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog defines no styles")]
    NoStyles,

    #[error("Game id 0 is reserved")]
    ZeroGameId,

    #[error("Game {0} has an empty display name")]
    EmptyGameName(u32),

    #[error("Style {style} excludes unknown game id {game}")]
    UnknownExcludedGame { style: String, game: u32 },
}

/// Static pack data: presentation strings, styles and the game mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Pack title shown by the presentation layer
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub credits: String,

    #[serde(deserialize_with = "deserialize_styles")]
    pub styles: Vec<StyleDefinition>,

    pub games: IndexMap<u32, GameEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        let mut games = IndexMap::new();
        games.insert(
            1,
            GameEntry::new(1, "Half-Life", "steamapps/common/Half-Life/valve", 70),
        );

        Self {
            name: "MY ICON PACK".to_string(),
            credits: String::new(),
            styles: vec![StyleDefinition::new("Default").excluding([6, 7])],
            games,
        }
    }
}

impl Catalog {
    /// Copy map keys into the entries and check the catalog is usable.
    ///
    /// Exclusions naming unknown ids are allowed (the default style carries
    /// ids 6 and 7 for packs that define them); see
    /// [`dangling_exclusions`](Self::dangling_exclusions).
    pub fn normalize(mut self) -> Result<Self, CatalogError> {
        if self.styles.is_empty() {
            return Err(CatalogError::NoStyles);
        }

        for (id, game) in self.games.iter_mut() {
            if *id == 0 {
                return Err(CatalogError::ZeroGameId);
            }
            if game.name.trim().is_empty() {
                return Err(CatalogError::EmptyGameName(*id));
            }
            game.id = *id;
        }

        Ok(self)
    }

    /// Style by 1-based index.
    pub fn style(&self, index: usize) -> Option<&StyleDefinition> {
        index.checked_sub(1).and_then(|i| self.styles.get(i))
    }

    /// Name and description for a 1-based style index; empty strings when out of range.
    pub fn style_info(&self, index: usize) -> (&str, &str) {
        match self.style(index) {
            Some(style) => (
                style.name.as_str(),
                style.description.as_deref().unwrap_or(""),
            ),
            None => ("", ""),
        }
    }

    pub fn game(&self, id: u32) -> Option<&GameEntry> {
        self.games.get(&id)
    }

    pub fn games(&self) -> impl Iterator<Item = &GameEntry> {
        self.games.values()
    }

    /// Whether `game_id` is hidden for the given style.
    pub fn is_excluded(&self, style_index: usize, game_id: u32) -> bool {
        self.style(style_index)
            .is_some_and(|style| style.excludes(game_id))
    }

    /// Exclusions that reference ids missing from `games`.
    pub fn dangling_exclusions(&self) -> Vec<CatalogError> {
        let known: IndexSet<u32> = self.games.keys().copied().collect();
        self.styles
            .iter()
            .flat_map(|style| {
                style
                    .excluded_games
                    .iter()
                    .filter(|id| !known.contains(*id))
                    .map(|id| CatalogError::UnknownExcludedGame {
                        style: style.name.clone(),
                        game: *id,
                    })
            })
            .collect()
    }
}
