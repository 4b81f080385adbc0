use std::iter;

use scummtui_core::{
    models::GameRecord,
    view::{self, View, ViewOptions},
};

const MAX_PATH_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Search,
}

/// One line of the game list.
#[derive(Debug, Clone)]
pub enum Row {
    Header { label: String, count: usize },
    Game(GameRecord),
}

impl Row {
    pub fn game(&self) -> Option<&GameRecord> {
        match self {
            Row::Game(game) => Some(game),
            Row::Header { .. } => None,
        }
    }
}

pub struct UiState {
    pub all_games: Vec<GameRecord>,
    pub rows: Vec<Row>,
    pub options: ViewOptions,
    pub cursor: usize,
    pub offset: usize,
    pub list_height: usize,
    pub status: String,
    pub mode: Mode,
    pub should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            all_games: Vec::new(),
            rows: Vec::new(),
            options: ViewOptions::default(),
            cursor: 0,
            offset: 0,
            list_height: 1,
            status: "Ready".to_string(),
            mode: Mode::Browse,
            should_quit: false,
        }
    }
}

impl UiState {
    pub fn set_games(&mut self, games: Vec<GameRecord>) {
        self.all_games = games;
        self.apply_view();
    }

    /// Re-run the view pipeline, keeping the selected game when it is
    /// still shown.
    pub fn apply_view(&mut self) {
        let selected = self.current_game().map(|game| game.id.clone());
        self.rows = match view::present(&self.all_games, &self.options) {
            View::Flat(games) => games.into_iter().map(Row::Game).collect(),
            View::Grouped(groups) => groups
                .into_iter()
                .flat_map(|group| {
                    let header = Row::Header {
                        label: group.label,
                        count: group.games.len(),
                    };
                    iter::once(header).chain(group.games.into_iter().map(Row::Game))
                })
                .collect(),
        };
        self.cursor = 0;
        self.offset = 0;
        if let Some(id) = selected {
            if self.select_game(&id) {
                return;
            }
        }
        self.cursor = self.nearest_game(0, 1).unwrap_or(0);
        self.ensure_cursor_visible();
    }

    pub fn game_count(&self) -> usize {
        self.rows.iter().filter(|row| row.game().is_some()).count()
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.rows.is_empty() {
            return;
        }
        let last = self.rows.len() as isize - 1;
        let target = (self.cursor as isize + delta).clamp(0, last) as usize;
        let direction = if delta < 0 { -1 } else { 1 };
        if let Some(index) = self.nearest_game(target, direction) {
            self.cursor = index;
        }
        self.ensure_cursor_visible();
    }

    pub fn move_to_start(&mut self) {
        self.cursor = self.nearest_game(0, 1).unwrap_or(0);
        self.ensure_cursor_visible();
    }

    pub fn move_to_end(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        self.cursor = self
            .nearest_game(self.rows.len() - 1, -1)
            .unwrap_or(self.cursor);
        self.ensure_cursor_visible();
    }

    pub fn page_down(&mut self) {
        if self.rows.is_empty() || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(self.rows.len());
        self.move_cursor(delta as isize);
    }

    pub fn page_up(&mut self) {
        if self.rows.is_empty() || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(self.rows.len());
        self.move_cursor(-(delta as isize));
    }

    pub fn visible_rows(&self, height: usize) -> &[Row] {
        if self.rows.is_empty() {
            return &[];
        }
        let end = (self.offset + height).min(self.rows.len());
        &self.rows[self.offset..end]
    }

    pub fn current_game(&self) -> Option<&GameRecord> {
        self.rows.get(self.cursor).and_then(Row::game)
    }

    pub fn select_game(&mut self, game_id: &str) -> bool {
        let found = self
            .rows
            .iter()
            .position(|row| row.game().is_some_and(|game| game.id == game_id));
        match found {
            Some(pos) => {
                self.cursor = pos;
                self.ensure_cursor_visible();
                true
            }
            None => false,
        }
    }

    /// Apply `update` to the record with `game_id` and refresh the view.
    pub fn update_game(&mut self, game_id: &str, update: impl FnOnce(&mut GameRecord)) {
        if let Some(game) = self.all_games.iter_mut().find(|game| game.id == game_id) {
            update(game);
            self.apply_view();
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    pub fn clamp_cursor(&mut self) {
        if self.rows.is_empty() {
            self.cursor = 0;
            self.offset = 0;
        } else if self.cursor >= self.rows.len() {
            self.cursor = self.rows.len() - 1;
        }
    }

    pub fn ensure_cursor_visible(&mut self) {
        if self.rows.is_empty() || self.list_height == 0 {
            self.offset = 0;
            return;
        }
        let height = self.list_height;
        let max_offset = self.rows.len().saturating_sub(height);

        // keep the section header above the first game of a group in view
        let top = match self.cursor.checked_sub(1) {
            Some(above) if self.rows[above].game().is_none() => above,
            _ => self.cursor,
        };
        if top < self.offset {
            self.offset = top;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }

        if self.offset > max_offset {
            self.offset = max_offset;
        }
    }

    fn nearest_game(&self, from: usize, direction: isize) -> Option<usize> {
        let len = self.rows.len();
        if len == 0 {
            return None;
        }
        let from = from.min(len - 1);
        let is_game = |index: &usize| self.rows[*index].game().is_some();
        if direction >= 0 {
            (from..len)
                .find(|index| is_game(index))
                .or_else(|| (0..from).rev().find(|index| is_game(index)))
        } else {
            (0..=from)
                .rev()
                .find(|index| is_game(index))
                .or_else(|| (from + 1..len).find(|index| is_game(index)))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPurpose {
    Export,
    Import,
    AddFolder,
    ScummvmPath,
    ArtFolder,
}

impl PromptPurpose {
    pub fn title(self) -> &'static str {
        match self {
            PromptPurpose::Export => "Export Library",
            PromptPurpose::Import => "Import Library",
            PromptPurpose::AddFolder => "Add Game Folder",
            PromptPurpose::ScummvmPath => "ScummVM Executable",
            PromptPurpose::ArtFolder => "Local Cover Art",
        }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            PromptPurpose::Export => "Write library export to",
            PromptPurpose::Import => "Read library export from",
            PromptPurpose::AddFolder => "Folder containing the game",
            PromptPurpose::ScummvmPath => "Command or path used to run ScummVM",
            PromptPurpose::ArtFolder => "Folder with cover images named after each game",
        }
    }
}

/// Single-line path input. `cursor` counts characters, not bytes.
#[derive(Debug, Clone)]
pub struct PathPrompt {
    pub purpose: PromptPurpose,
    pub input: String,
    pub cursor: usize,
    pub default: String,
}

impl PathPrompt {
    pub fn new(purpose: PromptPurpose, default: String) -> Self {
        Self {
            purpose,
            cursor: default.chars().count(),
            input: default.clone(),
            default,
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.input.chars().count() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    pub fn insert(&mut self, ch: char) {
        if self.input.len() >= MAX_PATH_LEN || ch.is_control() {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.input.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.input.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let at = self.byte_index(self.cursor);
            self.input.remove(at);
        }
    }

    pub fn value(&self) -> String {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            self.default.clone()
        } else {
            trimmed.to_string()
        }
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.input
            .char_indices()
            .nth(chars)
            .map(|(index, _)| index)
            .unwrap_or(self.input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: &str, name: &str, engine: &str) -> GameRecord {
        GameRecord {
            engine: engine.to_string(),
            ..GameRecord::new(id, name)
        }
    }

    fn sample() -> UiState {
        let mut state = UiState {
            list_height: 10,
            ..UiState::default()
        };
        state.set_games(vec![
            game("monkey", "The Secret of Monkey Island", "scumm"),
            game("sky", "Beneath a Steel Sky", "sky"),
            game("dig", "The Dig", "scumm"),
        ]);
        state
    }

    #[test]
    fn grouped_rows_start_with_headers() {
        let mut state = sample();
        state.options.group_by_engine = true;
        state.apply_view();

        assert!(matches!(&state.rows[0], Row::Header { label, count: 2 } if label == "scumm"));
        assert_eq!(state.rows.len(), 5);
        assert_eq!(state.game_count(), 3);
        assert_eq!(state.cursor, 1);
        assert!(state.current_game().is_some());
    }

    #[test]
    fn cursor_skips_headers() {
        let mut state = sample();
        state.options.group_by_engine = true;
        state.apply_view();

        state.move_cursor(1);
        assert_eq!(state.current_game().map(|g| g.id.as_str()), Some("monkey"));
        state.move_cursor(1);
        assert_eq!(state.cursor, 4);
        assert_eq!(state.current_game().map(|g| g.id.as_str()), Some("sky"));
        state.move_cursor(-1);
        assert_eq!(state.cursor, 2);
        state.move_to_start();
        state.move_cursor(-1);
        assert_eq!(state.cursor, 1);
        assert_eq!(state.offset, 0);
    }

    #[test]
    fn selection_survives_reordering() {
        let mut state = sample();
        assert!(state.select_game("sky"));
        state.options.sort = view::SortKey::NameDesc;
        state.apply_view();
        assert_eq!(state.current_game().map(|g| g.id.as_str()), Some("sky"));

        state.options.search = "monkey".to_string();
        state.apply_view();
        assert_eq!(state.current_game().map(|g| g.id.as_str()), Some("monkey"));
    }

    #[test]
    fn prompt_edits_by_character() {
        let mut prompt = PathPrompt::new(PromptPurpose::Export, "/tmp/é.json".to_string());
        assert_eq!(prompt.cursor, 11);
        prompt.move_cursor(-5);
        prompt.backspace();
        assert_eq!(prompt.input, "/tmp/.json");
        prompt.insert('ü');
        assert_eq!(prompt.input, "/tmp/ü.json");
        prompt.move_home();
        prompt.delete();
        assert_eq!(prompt.input, "tmp/ü.json");

        prompt.input = "   ".to_string();
        assert_eq!(prompt.value(), "/tmp/é.json");
    }
}
