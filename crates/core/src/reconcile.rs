//! Merge the static catalog, custom games and probe results into one
//! collection keyed by game id.

use std::collections::HashMap;

use crate::{library::LibraryDocument, models::GameRecord};

/// Counts shown in the status line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    /// Distinct games.
    pub total: usize,
    /// Games reported as installed.
    pub installed: usize,
    /// Games flagged as favorite.
    pub favorites: usize,
}

impl CatalogSummary {
    /// Count the given records.
    pub fn of(records: &[GameRecord]) -> Self {
        Self {
            total: records.len(),
            installed: records.iter().filter(|game| game.installed).count(),
            favorites: records.iter().filter(|game| game.favorite).count(),
        }
    }
}

/// Build the authoritative record set.
///
/// 1. seed from the static catalog;
/// 2. add custom games whose id is not present yet;
/// 3. overlay probe results (`installed` and `path`), inserting unknown ids;
/// 4. overlay favorite, last played and play time from the library.
///
/// Probe results never touch descriptive metadata of an existing record.
/// The returned order is catalog, then new custom games, then new probed
/// games; display order is the view pipeline's job.
pub fn reconcile(
    static_catalog: &[GameRecord],
    probed: &[GameRecord],
    library: &LibraryDocument,
) -> Vec<GameRecord> {
    let mut records: Vec<GameRecord> = Vec::with_capacity(static_catalog.len() + probed.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    let mut insert = |records: &mut Vec<GameRecord>, record: GameRecord| -> Option<usize> {
        if let Some(&existing) = index.get(&record.id) {
            return Some(existing);
        }
        index.insert(record.id.clone(), records.len());
        records.push(record);
        None
    };

    for game in static_catalog {
        insert(&mut records, game.clone());
    }

    for game in &library.custom_games {
        insert(&mut records, game.clone());
    }

    for found in probed {
        let fresh = GameRecord {
            installed: true,
            ..found.clone()
        };
        if let Some(existing) = insert(&mut records, fresh) {
            let record = &mut records[existing];
            record.installed = true;
            record.path = found.path.clone();
        }
    }

    for record in &mut records {
        let state = library.state(&record.id);
        record.favorite = state.favorite;
        record.last_played = state.last_played;
        record.total_play_time = state.total_play_time;
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog, library::GameState};
    use std::collections::HashSet;

    fn probed(id: &str, name: &str, path: &str) -> GameRecord {
        GameRecord {
            path: path.to_string(),
            installed: true,
            ..GameRecord::new(id, name)
        }
    }

    #[test]
    fn ids_are_the_union_of_sources() {
        let mut library = LibraryDocument::default();
        library.custom_games.push(GameRecord::new("homebrew", "Homebrew"));
        library.custom_games.push(GameRecord::new("dig", "Shadowed custom Dig"));
        let probe = vec![
            probed("dig", "The Dig (probe)", ""),
            probed("sq4", "Space Quest IV", ""),
        ];

        let merged = reconcile(catalog::known_games(), &probe, &library);

        let ids: Vec<_> = merged.iter().map(|game| game.id.as_str()).collect();
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());

        let expected: HashSet<_> = catalog::known_games()
            .iter()
            .map(|game| game.id.as_str())
            .chain(["homebrew", "sq4", "dig"])
            .collect();
        assert_eq!(unique, expected);
    }

    #[test]
    fn probe_overlays_install_state_only() {
        let probe = vec![probed("dig", "Something Else", "/games/dig")];
        let merged = reconcile(catalog::known_games(), &probe, &LibraryDocument::default());

        let dig = merged.iter().find(|game| game.id == "dig").expect("dig");
        let original = catalog::find("dig").expect("catalog dig");
        assert!(dig.installed);
        assert_eq!(dig.path, "/games/dig");
        assert_eq!(dig.name, original.name);
        assert_eq!(dig.company, original.company);
        assert_eq!(dig.year, original.year);

        let loom = merged.iter().find(|game| game.id == "loom").expect("loom");
        assert!(!loom.installed);
    }

    #[test]
    fn unknown_probe_result_is_inserted_installed() {
        let mut probe = probed("sq4", "Space Quest IV", "");
        probe.installed = false;
        let merged = reconcile(&[], &[probe], &LibraryDocument::default());
        assert_eq!(merged.len(), 1);
        assert!(merged[0].installed);
        assert_eq!(merged[0].name, "Space Quest IV");
    }

    #[test]
    fn library_state_overlays_every_record() {
        let mut library = LibraryDocument::default();
        library.games.insert(
            "sq4".to_string(),
            GameState {
                favorite: true,
                last_played: 42,
                total_play_time: 600.0,
                play_start: None,
            },
        );
        library.games.insert(
            "monkey".to_string(),
            GameState {
                favorite: true,
                ..GameState::default()
            },
        );

        let merged = reconcile(
            catalog::known_games(),
            &[probed("sq4", "Space Quest IV", "")],
            &library,
        );

        let sq4 = merged.iter().find(|game| game.id == "sq4").expect("sq4");
        assert!(sq4.favorite);
        assert_eq!(sq4.last_played, 42);
        assert_eq!(sq4.total_play_time, 600.0);

        let summary = CatalogSummary::of(&merged);
        assert_eq!(summary.total, catalog::known_games().len() + 1);
        assert_eq!(summary.installed, 1);
        assert_eq!(summary.favorites, 2);

        let dig = merged.iter().find(|game| game.id == "dig").expect("dig");
        assert!(!dig.favorite);
        assert_eq!(dig.last_played, 0);
    }
}
