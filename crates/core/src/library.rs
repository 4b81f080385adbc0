//! Per-user library state: favorites, play time and custom games.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{models::GameRecord, store};

/// Persisted state for one game id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    /// Favorite flag.
    pub favorite: bool,
    /// Epoch seconds of the last launch, 0 for never.
    #[serde(deserialize_with = "epoch_seconds")]
    pub last_played: i64,
    /// Accumulated play time in seconds.
    pub total_play_time: f64,
    /// Start of the running session, if one is open.
    #[serde(
        deserialize_with = "optional_epoch_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub play_start: Option<i64>,
}

/// Contents of `library.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryDocument {
    /// State keyed by game id.
    #[serde(default)]
    pub games: BTreeMap<String, GameState>,
    /// Games added by the user, in insertion order.
    #[serde(default, deserialize_with = "custom_games")]
    pub custom_games: Vec<GameRecord>,
}

impl LibraryDocument {
    /// State for `id`, defaulted when absent.
    pub fn state(&self, id: &str) -> GameState {
        self.games.get(id).cloned().unwrap_or_default()
    }

    fn state_mut(&mut self, id: &str) -> &mut GameState {
        self.games.entry(id.to_string()).or_default()
    }

    /// Whether a custom game with `id` exists.
    pub fn has_custom(&self, id: &str) -> bool {
        self.custom_games.iter().any(|game| game.id == id)
    }
}

/// Reads and writes `library.json`. Every mutation is a full
/// load-modify-save cycle.
#[derive(Debug, Clone)]
pub struct LibraryStore {
    path: PathBuf,
}

impl LibraryStore {
    /// Store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document; missing or corrupt files yield an empty library.
    pub fn load(&self) -> LibraryDocument {
        store::load_or_default(&self.path)
    }

    /// Overwrite the document on disk.
    pub fn save(&self, document: &LibraryDocument) -> Result<()> {
        store::save(&self.path, document)
    }

    /// Flip the favorite flag for `id` and return the new value.
    pub fn toggle_favorite(&self, id: &str) -> Result<bool> {
        let mut document = self.load();
        let state = document.state_mut(id);
        state.favorite = !state.favorite;
        let favorite = state.favorite;
        self.save(&document)?;
        debug!(game_id = %id, favorite, "favorite toggled");
        Ok(favorite)
    }

    /// Current favorite flag for `id`.
    pub fn is_favorite(&self, id: &str) -> bool {
        self.load().state(id).favorite
    }

    /// Mark the start of a play session now.
    pub fn record_play_start(&self, id: &str) -> Result<()> {
        self.record_play_start_at(id, now())
    }

    /// Mark the start of a play session at `now` (epoch seconds).
    pub fn record_play_start_at(&self, id: &str, now: i64) -> Result<()> {
        let mut document = self.load();
        document.state_mut(id).play_start = Some(now);
        self.save(&document)
    }

    /// Close the play session now.
    pub fn record_play_end(&self, id: &str) -> Result<()> {
        self.record_play_end_at(id, now())
    }

    /// Close the play session at `now` (epoch seconds).
    ///
    /// Adds the elapsed time when a session was open. `last_played` is
    /// updated even without a matching start, so a launch whose duration is
    /// unknown still counts as played.
    pub fn record_play_end_at(&self, id: &str, now: i64) -> Result<()> {
        let mut document = self.load();
        let state = document.state_mut(id);
        let start = state.play_start.take().unwrap_or(0);
        if start != 0 {
            let elapsed = (now - start).max(0);
            state.total_play_time += elapsed as f64;
            info!(game_id = %id, elapsed, "play session recorded");
        }
        state.last_played = now;
        self.save(&document)
    }

    /// Accumulated play time for `id` in seconds.
    pub fn total_play_time(&self, id: &str) -> f64 {
        self.load().state(id).total_play_time
    }

    /// Epoch seconds of the last launch of `id`, 0 for never.
    pub fn last_played(&self, id: &str) -> i64 {
        self.load().state(id).last_played
    }

    /// Full state for `id`.
    pub fn state(&self, id: &str) -> GameState {
        self.load().state(id)
    }

    /// Append custom games whose id is not already present.
    ///
    /// Returns how many were added; the file is only written when that is
    /// non-zero.
    pub fn add_custom_games(&self, games: impl IntoIterator<Item = GameRecord>) -> Result<usize> {
        let mut document = self.load();
        let mut added = 0;
        for game in games {
            if game.id.trim().is_empty() || document.has_custom(&game.id) {
                continue;
            }
            document.custom_games.push(game);
            added += 1;
        }
        if added > 0 {
            self.save(&document)?;
            info!(added, "custom games added");
        }
        Ok(added)
    }

    /// Replace per-game state with the given entries, keeping everything else.
    pub fn merge_states(&self, states: BTreeMap<String, GameState>) -> Result<usize> {
        if states.is_empty() {
            return Ok(0);
        }
        let mut document = self.load();
        let merged = states.len();
        document.games.extend(states);
        self.save(&document)?;
        Ok(merged)
    }
}

/// Build a custom game from a dropped folder: the folder name becomes
/// the title and, lowercased with spaces replaced by `_`, the id.
pub fn custom_game_from_folder(path: impl AsRef<Path>) -> Option<GameRecord> {
    let path = path.as_ref();
    if !path.is_dir() {
        return None;
    }
    let folder_name = path.file_name()?.to_str()?.trim();
    if folder_name.is_empty() {
        return None;
    }
    let id = folder_name.to_lowercase().replace(' ', "_");
    Some(GameRecord {
        path: path.to_string_lossy().to_string(),
        installed: true,
        ..GameRecord::new(id, folder_name)
    })
}

/// Human-readable play time: `<1m`, `42m`, `3h 05m`.
pub fn format_play_time(seconds: f64) -> String {
    let total_minutes = (seconds.max(0.0) / 60.0).floor() as u64;
    if total_minutes == 0 {
        return "<1m".to_string();
    }
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours == 0 {
        format!("{minutes}m")
    } else {
        format!("{hours}h {minutes:02}m")
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

fn value_to_epoch(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|secs| secs as i64))
}

fn epoch_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_epoch(&value).unwrap_or(0))
}

fn optional_epoch_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_epoch(&value).filter(|secs| *secs != 0))
}

fn custom_games<'de, D>(deserializer: D) -> Result<Vec<GameRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values.iter().filter_map(GameRecord::from_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> LibraryStore {
        LibraryStore::new(dir.join("library.json"))
    }

    #[test]
    fn toggle_favorite_alternates() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(dir.path());

        assert!(!store.is_favorite("dig"));
        assert!(store.toggle_favorite("dig")?);
        assert!(store.is_favorite("dig"));
        assert!(!store.toggle_favorite("dig")?);
        assert!(!store.is_favorite("dig"));
        Ok(())
    }

    #[test]
    fn play_session_accumulates_time() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(dir.path());

        store.record_play_start_at("dig", 1_000)?;
        assert_eq!(store.state("dig").play_start, Some(1_000));
        store.record_play_end_at("dig", 1_001)?;

        let state = store.state("dig");
        assert!(state.total_play_time >= 1.0);
        assert_eq!(state.last_played, 1_001);
        assert_eq!(state.play_start, None);

        // No intervening start: time unchanged, last_played still moves.
        store.record_play_end_at("dig", 1_005)?;
        let state = store.state("dig");
        assert_eq!(state.total_play_time, 1.0);
        assert_eq!(state.last_played, 1_005);
        Ok(())
    }

    #[test]
    fn wall_clock_session_marks_played() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(dir.path());
        store.record_play_start("ft")?;
        store.record_play_end("ft")?;
        assert!(store.last_played("ft") > 0);
        assert!(store.total_play_time("ft") >= 0.0);
        Ok(())
    }

    #[test]
    fn corrupt_library_resets_to_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(dir.path());
        fs::write(store.path(), "[1, 2")?;
        assert_eq!(store.load(), LibraryDocument::default());
        assert!(store.toggle_favorite("loom")?);
        Ok(())
    }

    #[test]
    fn tolerates_legacy_shapes() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(dir.path());
        fs::write(
            store.path(),
            r#"{
                "games": {"monkey": {"favorite": true, "last_played": 1700000000.5, "total_play_time": 90.5, "play_start": 0}},
                "custom_games": [{"game_id": "mygame", "name": "My Game", "extra": 1}, {"name": "no id"}],
                "version": 3
            }"#,
        )?;

        let document = store.load();
        let monkey = document.state("monkey");
        assert!(monkey.favorite);
        assert_eq!(monkey.last_played, 1_700_000_000);
        assert_eq!(monkey.play_start, None);
        assert_eq!(document.custom_games.len(), 1);
        assert_eq!(document.custom_games[0].id, "mygame");
        Ok(())
    }

    #[test]
    fn custom_games_are_deduplicated() -> Result<()> {
        let dir = tempdir()?;
        let store = store_in(dir.path());
        let added = store.add_custom_games(vec![
            GameRecord::new("a", "A"),
            GameRecord::new("a", "A again"),
            GameRecord::new("b", "B"),
        ])?;
        assert_eq!(added, 2);
        assert_eq!(store.add_custom_games(vec![GameRecord::new("b", "B")])?, 0);

        let names: Vec<_> = store
            .load()
            .custom_games
            .into_iter()
            .map(|game| game.name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        Ok(())
    }

    #[test]
    fn folder_becomes_custom_game() -> Result<()> {
        let dir = tempdir()?;
        let folder = dir.path().join("Space Quest IV");
        fs::create_dir_all(&folder)?;

        let game = custom_game_from_folder(&folder).expect("custom game");
        assert_eq!(game.id, "space_quest_iv");
        assert_eq!(game.name, "Space Quest IV");
        assert!(game.installed);
        assert_eq!(game.path, folder.to_string_lossy());

        assert!(custom_game_from_folder(dir.path().join("missing")).is_none());
        Ok(())
    }

    #[test]
    fn play_time_formatting() {
        assert_eq!(format_play_time(0.0), "<1m");
        assert_eq!(format_play_time(59.0), "<1m");
        assert_eq!(format_play_time(42.0 * 60.0), "42m");
        assert_eq!(format_play_time(3.0 * 3600.0 + 5.0 * 60.0), "3h 05m");
    }
}
