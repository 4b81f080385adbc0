//! Filter, sort and grouping applied to the reconciled catalog before display.

use std::{cmp::Ordering, collections::BTreeMap};

use serde::{Deserialize, Serialize};

use crate::models::GameRecord;

/// Label used for records without an engine when grouping.
pub const UNKNOWN_ENGINE: &str = "Unknown";

/// Sort orders offered to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Name A→Z.
    #[default]
    NameAsc,
    /// Name Z→A.
    NameDesc,
    /// Oldest first.
    YearAsc,
    /// Newest first.
    YearDesc,
    /// Company A→Z.
    Developer,
    /// Engine A→Z.
    Engine,
}

impl SortKey {
    /// Every key, in menu order.
    pub const ALL: [SortKey; 6] = [
        SortKey::NameAsc,
        SortKey::NameDesc,
        SortKey::YearAsc,
        SortKey::YearDesc,
        SortKey::Developer,
        SortKey::Engine,
    ];

    /// Persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::NameAsc => "name_asc",
            SortKey::NameDesc => "name_desc",
            SortKey::YearAsc => "year_asc",
            SortKey::YearDesc => "year_desc",
            SortKey::Developer => "developer",
            SortKey::Engine => "engine",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == raw.trim())
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            SortKey::NameAsc => "Name (A-Z)",
            SortKey::NameDesc => "Name (Z-A)",
            SortKey::YearAsc => "Year (oldest)",
            SortKey::YearDesc => "Year (newest)",
            SortKey::Developer => "Developer",
            SortKey::Engine => "Engine",
        }
    }

    /// Next key in menu order, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|key| *key == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Everything that shapes the displayed list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewOptions {
    /// Keep only installed games.
    pub installed_only: bool,
    /// Keep only games with exactly this genre.
    pub genre: Option<String>,
    /// Free-text query; blank disables the filter.
    pub search: String,
    /// Sort order.
    pub sort: SortKey,
    /// Move favorites ahead of everything else.
    pub favorites_first: bool,
    /// Split the result into per-engine sections.
    pub group_by_engine: bool,
}

/// One engine section of a grouped view.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineGroup {
    /// Engine identifier, or [`UNKNOWN_ENGINE`].
    pub label: String,
    /// Records in display order.
    pub games: Vec<GameRecord>,
}

/// Output of [`present`].
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    /// A single ordered list.
    Flat(Vec<GameRecord>),
    /// Engine sections in label order.
    Grouped(Vec<EngineGroup>),
}

impl View {
    /// Total number of records shown.
    pub fn len(&self) -> usize {
        match self {
            View::Flat(games) => games.len(),
            View::Grouped(groups) => groups.iter().map(|group| group.games.len()).sum(),
        }
    }

    /// Whether nothing is shown.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every record in display order, groups concatenated.
    pub fn records(&self) -> Vec<&GameRecord> {
        match self {
            View::Flat(games) => games.iter().collect(),
            View::Grouped(groups) => groups.iter().flat_map(|group| group.games.iter()).collect(),
        }
    }
}

impl Default for View {
    fn default() -> Self {
        View::Flat(Vec::new())
    }
}

/// Run the full pipeline: filter, sort, favorites-first, grouping.
pub fn present(records: &[GameRecord], options: &ViewOptions) -> View {
    let mut games = filter(records, options);
    sort_records(&mut games, options.sort);
    if options.favorites_first {
        games = favorites_first(games);
    }
    if options.group_by_engine {
        View::Grouped(group_by_engine(games))
    } else {
        View::Flat(games)
    }
}

/// Apply installed-only, genre and search filters, in that order.
pub fn filter(records: &[GameRecord], options: &ViewOptions) -> Vec<GameRecord> {
    let needle = options.search.trim().to_lowercase();
    let genre = options.genre.as_deref().filter(|genre| !genre.is_empty());

    records
        .iter()
        .filter(|game| !options.installed_only || game.installed)
        .filter(|game| genre.map_or(true, |genre| game.genre == genre))
        .filter(|game| needle.is_empty() || matches_search(game, &needle))
        .cloned()
        .collect()
}

/// Case-insensitive substring match against name, id, company, engine or
/// genre. `needle` must already be lowercase.
pub fn matches_search(game: &GameRecord, needle: &str) -> bool {
    [
        &game.name,
        &game.id,
        &game.company,
        &game.engine,
        &game.genre,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Stable sort by `key`. Text comparisons ignore case; a missing year
/// sorts last in both directions.
pub fn sort_records(records: &mut [GameRecord], key: SortKey) {
    match key {
        SortKey::NameAsc => records.sort_by_cached_key(|game| game.name.to_lowercase()),
        SortKey::NameDesc => {
            records.sort_by(|a, b| b.name.to_lowercase().cmp(&a.name.to_lowercase()))
        }
        SortKey::YearAsc => records.sort_by(|a, b| year_key(a, "9999").cmp(&year_key(b, "9999"))),
        SortKey::YearDesc => {
            records.sort_by(|a, b| year_key(b, "0000").cmp(&year_key(a, "0000")))
        }
        SortKey::Developer => records.sort_by_cached_key(|game| game.company.to_lowercase()),
        SortKey::Engine => records.sort_by_cached_key(|game| game.engine.to_lowercase()),
    }
}

fn year_key<'a>(game: &'a GameRecord, missing: &'a str) -> &'a str {
    let year = game.year.trim();
    if year.is_empty() {
        missing
    } else {
        year
    }
}

/// Stable partition: favorites first, each side keeping its order.
pub fn favorites_first(records: Vec<GameRecord>) -> Vec<GameRecord> {
    let (mut favorites, rest): (Vec<_>, Vec<_>) =
        records.into_iter().partition(|game| game.favorite);
    favorites.extend(rest);
    favorites
}

/// Split into engine sections ordered by label, keeping record order
/// inside each section.
pub fn group_by_engine(records: Vec<GameRecord>) -> Vec<EngineGroup> {
    let mut groups: BTreeMap<String, Vec<GameRecord>> = BTreeMap::new();
    for game in records {
        let label = match game.engine.trim() {
            "" => UNKNOWN_ENGINE.to_string(),
            engine => engine.to_string(),
        };
        groups.entry(label).or_default().push(game);
    }
    groups
        .into_iter()
        .map(|(label, games)| EngineGroup { label, games })
        .collect()
}

/// Distinct non-empty genres, sorted.
pub fn genres(records: &[GameRecord]) -> Vec<String> {
    let mut genres: Vec<String> = records
        .iter()
        .map(|game| game.genre.trim())
        .filter(|genre| !genre.is_empty())
        .map(str::to_string)
        .collect();
    genres.sort_by(|a, b| match a.to_lowercase().cmp(&b.to_lowercase()) {
        Ordering::Equal => a.cmp(b),
        other => other,
    });
    genres.dedup();
    genres
}
