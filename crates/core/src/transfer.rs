//! Export the library to a single JSON file and import it back.
//!
//! The exported document is `{"library": <library.json>, "games": [...]}`.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    library::{GameState, LibraryDocument, LibraryStore},
    models::GameRecord,
    store,
};

/// Write the library document and the given records to `path`.
pub fn export(path: impl AsRef<Path>, library: &LibraryDocument, games: &[GameRecord]) -> Result<()> {
    let path = path.as_ref();
    let document = json!({
        "library": library,
        "games": games.iter().map(GameRecord::to_value).collect::<Vec<_>>(),
    });
    store::save(path, &document)?;
    info!(path = %path.display(), games = games.len(), "library exported");
    Ok(())
}

/// Merge the per-game state found in an export into `store` and return
/// the exported records.
///
/// An imported entry replaces the existing entry for the same id. Entries
/// that cannot be read are skipped.
pub fn import(path: impl AsRef<Path>, store: &LibraryStore) -> Result<Vec<GameRecord>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read export {}", path.display()))?;
    let document: Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse export {}", path.display()))?;
    if !document.is_object() {
        bail!("{} is not a library export", path.display());
    }

    let states = imported_states(document.pointer("/library/games"));
    let merged = store.merge_states(states)?;

    let games: Vec<GameRecord> = document
        .get("games")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(GameRecord::from_value).collect())
        .unwrap_or_default();

    info!(path = %path.display(), merged, games = games.len(), "library imported");
    Ok(games)
}

/// Add imported records as custom games, skipping ids already custom.
pub fn merge_imported_games(store: &LibraryStore, games: Vec<GameRecord>) -> Result<usize> {
    store.add_custom_games(games)
}

fn imported_states(section: Option<&Value>) -> BTreeMap<String, GameState> {
    let Some(entries) = section.and_then(Value::as_object) else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(id, value)| match serde_json::from_value(value.clone()) {
            Ok(state) => Some((id.clone(), state)),
            Err(err) => {
                warn!(%id, %err, "skipping unreadable library entry");
                None
            }
        })
        .collect()
}
