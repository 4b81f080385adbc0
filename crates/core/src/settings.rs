//! User preferences stored in `settings.json`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{store, view::SortKey};

/// How games are started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Plain window.
    Windowed,
    /// Pass `--fullscreen`.
    #[default]
    Fullscreen,
}

impl LaunchMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            LaunchMode::Windowed => LaunchMode::Fullscreen,
            LaunchMode::Fullscreen => LaunchMode::Windowed,
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            LaunchMode::Windowed => "Windowed",
            LaunchMode::Fullscreen => "Fullscreen",
        }
    }
}

/// Where cover art comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtSource {
    /// Reuse the ScummVM icon.
    #[default]
    Scummvm,
    /// Scrape the MobyGames search page.
    MobyGames,
    /// Not implemented; always yields no cover.
    Igdb,
    /// TheGamesDB CDN by id.
    TheGamesDb,
    /// User-configured local folder.
    Local,
}

impl ArtSource {
    /// Every source, in menu order.
    pub const ALL: [ArtSource; 5] = [
        ArtSource::Scummvm,
        ArtSource::MobyGames,
        ArtSource::Igdb,
        ArtSource::TheGamesDb,
        ArtSource::Local,
    ];

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            ArtSource::Scummvm => "ScummVM Icons",
            ArtSource::MobyGames => "MobyGames",
            ArtSource::Igdb => "IGDB",
            ArtSource::TheGamesDb => "TheGamesDB",
            ArtSource::Local => "Local folder",
        }
    }

    /// Next source in menu order, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Contents of `settings.json`.
///
/// Each key is read on its own: a missing or malformed value falls back
/// to that key's default. Keys this version does not know are kept and
/// written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Windowed or fullscreen launch.
    pub launch_mode: LaunchMode,
    /// ScummVM executable.
    pub scummvm_path: String,
    /// Sort applied at startup.
    pub default_sort: SortKey,
    /// Cover art provider.
    pub art_source: ArtSource,
    /// Folder searched by [`ArtSource::Local`].
    pub art_local_path: String,
    /// Download screenshots.
    pub fetch_screenshots: bool,
    /// Download cover art.
    pub fetch_covers: bool,
    /// Whether the first-run message has been shown.
    pub welcome_shown: bool,
    /// Keys not understood by this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            launch_mode: LaunchMode::default(),
            scummvm_path: "scummvm".to_string(),
            default_sort: SortKey::default(),
            art_source: ArtSource::default(),
            art_local_path: String::new(),
            fetch_screenshots: false,
            fetch_covers: true,
            welcome_shown: false,
            extra: Map::new(),
        }
    }
}

impl Settings {
    fn from_map(mut map: Map<String, Value>) -> Self {
        let defaults = Settings::default();
        let mut take = |key: &str| map.remove(key);

        let launch_mode = lenient(take("launch_mode"), defaults.launch_mode);
        let scummvm_path = lenient::<String>(take("scummvm_path"), defaults.scummvm_path)
            .trim()
            .to_string();
        let default_sort = take("default_sort")
            .and_then(|value| value.as_str().and_then(SortKey::parse))
            .unwrap_or(defaults.default_sort);
        let art_source = lenient(take("art_source"), defaults.art_source);
        let art_local_path = lenient(take("art_local_path"), defaults.art_local_path);
        let fetch_screenshots = lenient(take("fetch_screenshots"), defaults.fetch_screenshots);
        let fetch_covers = lenient(take("fetch_covers"), defaults.fetch_covers);
        let welcome_shown = lenient(take("welcome_shown"), defaults.welcome_shown);

        Self {
            launch_mode,
            scummvm_path: if scummvm_path.is_empty() {
                "scummvm".to_string()
            } else {
                scummvm_path
            },
            default_sort,
            art_source,
            art_local_path,
            fetch_screenshots,
            fetch_covers,
            welcome_shown,
            extra: map,
        }
    }
}

impl<'de> Deserialize<'de> for Settings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Settings::from_map(map))
    }
}

fn lenient<T: DeserializeOwned>(value: Option<Value>, fallback: T) -> T {
    value
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or(fallback)
}

/// Reads and writes `settings.json`.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences, using defaults for anything missing.
    pub fn load(&self) -> Settings {
        store::load_or_default(&self.path)
    }

    /// Overwrite preferences on disk.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        store::save(&self.path, settings)
    }

    /// Load, modify and save in one step, returning the saved value.
    pub fn update(&self, apply: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let mut settings = self.load();
        apply(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }
}
