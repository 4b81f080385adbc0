use std::{
    collections::HashMap,
    future::Future,
    io,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use chrono::{Local, TimeZone};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use scummtui_core::{
    assets::{self, AssetFetcher},
    catalog,
    config::{AppConfig, Paths},
    launcher::{self, ChildStdio, LaunchRequest, PlayReport},
    library::{self, LibraryStore},
    models::{Compatibility, GameRecord},
    outcome::Outcome,
    prober,
    reconcile::{reconcile, CatalogSummary},
    settings::{Settings, SettingsStore},
    tasks::{TaskHandle, TaskPool},
    transfer, view,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::state::{Mode, PathPrompt, PromptPurpose, Row, UiState};

const TICK_RATE: Duration = Duration::from_millis(250);
const EXPORT_FILE_NAME: &str = "scummtui-library.json";

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    Icon,
    Cover,
    Screenshot,
}

impl AssetKind {
    fn enabled(self, settings: &Settings) -> bool {
        match self {
            AssetKind::Icon => true,
            AssetKind::Cover => settings.fetch_covers,
            AssetKind::Screenshot => settings.fetch_screenshots,
        }
    }
}

/// Load state of one piece of detail-pane content.
#[derive(Debug, Clone)]
enum Slot<T> {
    Loading,
    Ready(T),
    Missing,
    Off,
}

impl<T> Slot<T> {
    fn from_option(value: Option<T>) -> Self {
        value.map(Slot::Ready).unwrap_or(Slot::Missing)
    }

    fn is_loading(&self) -> bool {
        matches!(self, Slot::Loading)
    }
}

#[derive(Debug, Clone)]
struct Details {
    wiki: Slot<String>,
    icon: Slot<PathBuf>,
    cover: Slot<PathBuf>,
    screenshot: Slot<PathBuf>,
}

impl Details {
    fn pending(settings: &Settings) -> Self {
        let slot = |kind: AssetKind| {
            if kind.enabled(settings) {
                Slot::Loading
            } else {
                Slot::Off
            }
        };
        Self {
            wiki: Slot::Loading,
            icon: slot(AssetKind::Icon),
            cover: slot(AssetKind::Cover),
            screenshot: slot(AssetKind::Screenshot),
        }
    }

    fn is_loading(&self) -> bool {
        self.wiki.is_loading()
            || self.icon.is_loading()
            || self.cover.is_loading()
            || self.screenshot.is_loading()
    }

    fn slot_mut(&mut self, kind: AssetKind) -> &mut Slot<PathBuf> {
        match kind {
            AssetKind::Icon => &mut self.icon,
            AssetKind::Cover => &mut self.cover,
            AssetKind::Screenshot => &mut self.screenshot,
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    GamesProbed(Outcome<Vec<GameRecord>>),
    VersionChecked(Option<String>),
    WikiLoaded {
        game_id: String,
        summary: Option<String>,
    },
    AssetFetched {
        game_id: String,
        kind: AssetKind,
        path: Option<PathBuf>,
    },
    SessionEnded(Result<PlayReport>),
}

/// Terminal front end: owns every piece of mutable UI state and talks to
/// background jobs only through [`AppEvent`]s.
pub struct ScummApp {
    config: AppConfig,
    paths: Paths,
    settings_store: SettingsStore,
    settings: Settings,
    library: LibraryStore,
    fetcher: AssetFetcher,
    pool: TaskPool,
    state: UiState,
    probed: Vec<GameRecord>,
    probing: bool,
    version: Option<String>,
    details: HashMap<String, Details>,
    detail_target: Option<String>,
    detail_tasks: Vec<TaskHandle<()>>,
    running: Option<String>,
    prompt: Option<PathPrompt>,
    event_tx: Option<mpsc::UnboundedSender<AppEvent>>,
    theme: Theme,
}

impl ScummApp {
    pub fn new(config: AppConfig) -> Result<Self> {
        let paths = config.paths();
        let fetcher = AssetFetcher::new(&config)?;
        let settings_store = SettingsStore::new(paths.settings_file.clone());
        let settings = settings_store.load();
        let mut state = UiState::default();
        state.options.sort = settings.default_sort;

        Ok(Self {
            pool: TaskPool::new(config.worker_threads),
            library: LibraryStore::new(paths.library_file.clone()),
            config,
            paths,
            settings_store,
            settings,
            fetcher,
            state,
            probed: Vec::new(),
            probing: false,
            version: None,
            details: HashMap::new(),
            detail_target: None,
            detail_tasks: Vec::new(),
            running: None,
            prompt: None,
            event_tx: None,
            theme: Theme::default(),
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.rebuild();
        self.greet();

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        self.start_probe();
        self.check_version();

        let result = self.event_loop(&mut terminal, event_rx).await;

        self.cancel_detail_tasks();
        self.event_tx = None;
        restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        mut event_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> Result<()> {
        loop {
            self.sync_details();
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
        }
        Ok(())
    }

    fn greet(&mut self) {
        if self.settings.welcome_shown {
            self.state
                .set_status(format!("Loaded {} games", self.state.game_count()));
            return;
        }
        self.state.set_status(
            "Welcome to scummtui! Press / to search, Enter to play, f to mark favorites, q to quit.",
        );
        match self.settings_store.update(|settings| settings.welcome_shown = true) {
            Ok(settings) => self.settings = settings,
            Err(err) => warn!(?err, "failed to remember welcome message"),
        }
    }

    /// Run `job` on the pool and post its result back as an event.
    fn submit<F, T, W>(&self, job: F, wrap: W) -> Option<TaskHandle<()>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        W: FnOnce(T) -> AppEvent + Send + 'static,
    {
        let post = self.poster(wrap)?;
        Some(self.pool.spawn_with(job, post))
    }

    /// Like `submit`, for jobs that may run for a long time without holding
    /// a worker slot.
    fn submit_unbounded<F, T, W>(&self, job: F, wrap: W) -> Option<TaskHandle<()>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        W: FnOnce(T) -> AppEvent + Send + 'static,
    {
        let post = self.poster(wrap)?;
        Some(self.pool.spawn_unbounded(job, post))
    }

    fn poster<T, W>(&self, wrap: W) -> Option<impl FnOnce(T) + Send + 'static>
    where
        T: Send + 'static,
        W: FnOnce(T) -> AppEvent + Send + 'static,
    {
        let Some(sender) = self.event_tx.clone() else {
            error!("event_channel_missing");
            return None;
        };
        Some(move |value| {
            if sender.send(wrap(value)).is_err() {
                warn!("event channel closed before background result arrived");
            }
        })
    }

    fn rebuild(&mut self) {
        let document = self.library.load();
        let games = reconcile(catalog::known_games(), &self.probed, &document);
        if let Some(genre) = &self.state.options.genre {
            if !games.iter().any(|game| &game.genre == genre) {
                self.state.options.genre = None;
            }
        }
        self.state.set_games(games);
        info!(
            total = self.state.all_games.len(),
            shown = self.state.game_count(),
            "catalog rebuilt"
        );
    }

    fn start_probe(&mut self) {
        if self.probing {
            self.state.set_status("A scan is already running");
            return;
        }
        let executable = self.settings.scummvm_path.clone();
        let timeout = self.config.probe_timeout();
        let job_executable = executable.clone();
        let submitted = self.submit(
            async move { prober::detect_installed(&job_executable, timeout).await },
            AppEvent::GamesProbed,
        );
        if submitted.is_some() {
            self.probing = true;
            self.state
                .set_status(format!("Scanning {executable} for installed games…"));
        }
    }

    fn check_version(&mut self) {
        let executable = self.settings.scummvm_path.clone();
        let timeout = self.config.version_timeout();
        self.submit(
            async move {
                prober::scummvm_version(&executable, timeout)
                    .await
                    .log_failure("version check failed")
                    .into_option()
            },
            AppEvent::VersionChecked,
        );
    }

    fn handle_probe(&mut self, outcome: Outcome<Vec<GameRecord>>) {
        self.probing = false;
        let message = match &outcome {
            Outcome::Ready(games) => format!("Detected {} installed games", games.len()),
            Outcome::Unavailable => format!(
                "ScummVM not available at '{}'; showing catalog only",
                self.settings.scummvm_path
            ),
            Outcome::Failed(err) => format!("Scan failed: {err}"),
        };
        self.probed = outcome
            .log_failure("installed game scan failed")
            .unwrap_or_default();
        self.rebuild();
        self.state.set_status(message);
    }

    fn sync_details(&mut self) {
        let target = self.state.current_game().map(|game| game.id.clone());
        if target == self.detail_target {
            return;
        }
        self.cancel_detail_tasks();
        self.detail_target = target;
        let Some(game) = self.state.current_game().cloned() else {
            return;
        };
        if !self.details.contains_key(&game.id) {
            self.request_details(game);
        }
    }

    fn cancel_detail_tasks(&mut self) {
        for handle in self.detail_tasks.drain(..) {
            if !handle.is_finished() {
                handle.cancel();
            }
        }
        // a cancelled slot would otherwise stay "loading" forever
        self.details.retain(|_, details| !details.is_loading());
    }

    fn request_details(&mut self, game: GameRecord) {
        self.details
            .insert(game.id.clone(), Details::pending(&self.settings));

        let fetcher = self.fetcher.clone();
        let job_game = game.clone();
        let game_id = game.id.clone();
        let handle = self.submit(
            async move { fetcher.wiki_summary(&job_game).await.into_option() },
            move |summary| AppEvent::WikiLoaded { game_id, summary },
        );
        self.detail_tasks.extend(handle);

        for kind in [AssetKind::Icon, AssetKind::Cover, AssetKind::Screenshot] {
            if !kind.enabled(&self.settings) {
                continue;
            }
            let fetcher = self.fetcher.clone();
            let settings = self.settings.clone();
            let job_game = game.clone();
            let game_id = game.id.clone();
            let handle = self.submit(
                async move {
                    let outcome = match kind {
                        AssetKind::Icon => fetcher.icon(&job_game).await,
                        AssetKind::Cover => fetcher.cover(&job_game, &settings).await,
                        AssetKind::Screenshot => fetcher.screenshot(&job_game, &settings).await,
                    };
                    outcome.into_option()
                },
                move |path| AppEvent::AssetFetched {
                    game_id,
                    kind,
                    path,
                },
            );
            self.detail_tasks.extend(handle);
        }
    }

    /// Forget cached detail state so the selection is fetched again.
    fn reset_details(&mut self) {
        self.cancel_detail_tasks();
        self.details.clear();
        self.detail_target = None;
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                let result = if self.prompt.is_some() {
                    match event {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            self.handle_prompt_key(key)
                        }
                        _ => Ok(()),
                    }
                } else {
                    self.handle_input(event)
                };
                if let Err(err) = result {
                    error!(?err, "command failed");
                    self.state.set_status(format!("Error: {err:#}"));
                }
            }
            Some(AppEvent::Tick) => {}
            Some(AppEvent::GamesProbed(outcome)) => self.handle_probe(outcome),
            Some(AppEvent::VersionChecked(version)) => {
                info!(version = version.as_deref().unwrap_or("unknown"), "scummvm version");
                self.version = version;
            }
            Some(AppEvent::WikiLoaded { game_id, summary }) => {
                if let Some(details) = self.details.get_mut(&game_id) {
                    details.wiki = Slot::from_option(summary);
                }
            }
            Some(AppEvent::AssetFetched {
                game_id,
                kind,
                path,
            }) => {
                if let Some(details) = self.details.get_mut(&game_id) {
                    *details.slot_mut(kind) = Slot::from_option(path);
                }
            }
            Some(AppEvent::SessionEnded(result)) => self.handle_session_end(result),
            None => return false,
        }
        true
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => match self.state.mode {
                Mode::Search => self.handle_search_key(key),
                Mode::Browse => self.handle_browse_key(key),
            },
            _ => Ok(()),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.state.mode = Mode::Browse;
                self.state.options.search.clear();
                self.state.apply_view();
                self.state.set_status("Search cleared");
            }
            KeyCode::Enter => {
                self.state.mode = Mode::Browse;
                self.state.set_status(format!(
                    "Search: {} ({} matches)",
                    self.state.options.search,
                    self.state.game_count()
                ));
            }
            KeyCode::Backspace => {
                self.state.options.search.pop();
                self.state.apply_view();
            }
            KeyCode::Down => self.state.move_cursor(1),
            KeyCode::Up => self.state.move_cursor(-1),
            KeyCode::Char(c) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    self.state.options.search.push(c);
                    self.state.apply_view();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('c') = key.code {
                self.state.should_quit = true;
            }
            return Ok(());
        }
        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1),
            KeyCode::Home => self.state.move_to_start(),
            KeyCode::End => self.state.move_to_end(),
            KeyCode::PageDown => self.state.page_down(),
            KeyCode::PageUp => self.state.page_up(),
            KeyCode::Char('/') => {
                self.state.mode = Mode::Search;
                self.state
                    .set_status("Type to search name, id, company, engine or genre");
            }
            KeyCode::Esc => {
                if !self.state.options.search.is_empty() {
                    self.state.options.search.clear();
                    self.state.apply_view();
                    self.state.set_status("Search cleared");
                }
            }
            KeyCode::Char('i') => {
                self.state.options.installed_only = !self.state.options.installed_only;
                self.state.apply_view();
                let message = if self.state.options.installed_only {
                    "Showing installed games only"
                } else {
                    "Showing all games"
                };
                self.state.set_status(message);
            }
            KeyCode::Char('g') => self.cycle_genre(),
            KeyCode::Char('s') => {
                let sort = self.state.options.sort.next();
                self.state.options.sort = sort;
                self.state.apply_view();
                self.update_settings(|settings| settings.default_sort = sort)?;
                self.state.set_status(format!("Sorted by {}", sort.label()));
            }
            KeyCode::Char('F') => {
                self.state.options.favorites_first = !self.state.options.favorites_first;
                self.state.apply_view();
                let message = if self.state.options.favorites_first {
                    "Favorites first"
                } else {
                    "Favorites mixed in"
                };
                self.state.set_status(message);
            }
            KeyCode::Char('e') => {
                self.state.options.group_by_engine = !self.state.options.group_by_engine;
                self.state.apply_view();
                let message = if self.state.options.group_by_engine {
                    "Grouped by engine"
                } else {
                    "Grouping off"
                };
                self.state.set_status(message);
            }
            KeyCode::Char('f') => self.toggle_favorite()?,
            KeyCode::Enter => self.launch_selected(),
            KeyCode::Char('r') => self.start_probe(),
            KeyCode::Char('w') => {
                let mode = self.settings.launch_mode.toggled();
                self.update_settings(|settings| settings.launch_mode = mode)?;
                self.state
                    .set_status(format!("Games will launch {}", mode.label().to_lowercase()));
            }
            KeyCode::Char('o') => {
                let source = self.settings.art_source.next();
                self.update_settings(|settings| settings.art_source = source)?;
                self.reset_details();
                self.state
                    .set_status(format!("Cover art source: {}", source.label()));
            }
            KeyCode::Char('c') => {
                let enabled = !self.settings.fetch_covers;
                self.update_settings(|settings| settings.fetch_covers = enabled)?;
                self.reset_details();
                self.state
                    .set_status(format!("Cover downloads {}", on_off(enabled)));
            }
            KeyCode::Char('S') => {
                let enabled = !self.settings.fetch_screenshots;
                self.update_settings(|settings| settings.fetch_screenshots = enabled)?;
                self.reset_details();
                self.state
                    .set_status(format!("Screenshot downloads {}", on_off(enabled)));
            }
            KeyCode::Char('p') => self.open_prompt(PromptPurpose::ScummvmPath),
            KeyCode::Char('l') => self.open_prompt(PromptPurpose::ArtFolder),
            KeyCode::Char('x') => self.open_prompt(PromptPurpose::Export),
            KeyCode::Char('m') => self.open_prompt(PromptPurpose::Import),
            KeyCode::Char('a') => self.open_prompt(PromptPurpose::AddFolder),
            KeyCode::Char('C') => {
                let removed = assets::clear_cache(&self.paths)?;
                self.reset_details();
                self.state
                    .set_status(format!("Cleared {removed} cached files"));
            }
            _ => {}
        }
        Ok(())
    }

    fn update_settings(&mut self, apply: impl FnOnce(&mut Settings)) -> Result<()> {
        self.settings = self.settings_store.update(apply)?;
        Ok(())
    }

    fn cycle_genre(&mut self) {
        let genres = view::genres(&self.state.all_games);
        let next = match &self.state.options.genre {
            None => genres.first().cloned(),
            Some(current) => genres
                .iter()
                .position(|genre| genre == current)
                .and_then(|index| genres.get(index + 1))
                .cloned(),
        };
        let message = match &next {
            Some(genre) => format!("Genre: {genre}"),
            None => "All genres".to_string(),
        };
        self.state.options.genre = next;
        self.state.apply_view();
        self.state.set_status(message);
    }

    fn toggle_favorite(&mut self) -> Result<()> {
        let Some(game) = self.state.current_game() else {
            self.state.set_status("No game selected");
            return Ok(());
        };
        let id = game.id.clone();
        let name = game.display_name().to_string();
        let favorite = self.library.toggle_favorite(&id)?;
        self.state.update_game(&id, |game| game.favorite = favorite);
        let message = if favorite {
            format!("Added {name} to favorites")
        } else {
            format!("Removed {name} from favorites")
        };
        self.state.set_status(message);
        Ok(())
    }

    fn launch_selected(&mut self) {
        if let Some(running) = &self.running {
            self.state.set_status(format!("{running} is still running"));
            return;
        }
        let Some(game) = self.state.current_game().cloned() else {
            self.state.set_status("No game selected");
            return;
        };
        let name = game.display_name().to_string();
        if !game.installed {
            self.state
                .set_status(format!("{name} is not installed in ScummVM"));
            return;
        }

        let request = LaunchRequest::from_settings(&self.settings, &game.id, ChildStdio::Null);
        let store = self.library.clone();
        info!(game_id = %game.id, title = %name, "launching game");
        let submitted = self.submit_unbounded(
            async move { launcher::play(&store, &request).await },
            AppEvent::SessionEnded,
        );
        if submitted.is_some() {
            self.state.set_status(format!(
                "Launching {name} ({})…",
                self.settings.launch_mode.label().to_lowercase()
            ));
            self.running = Some(name);
        }
    }

    fn handle_session_end(&mut self, result: Result<PlayReport>) {
        let name = self.running.take().unwrap_or_default();
        match result {
            Ok(report) => {
                self.state.update_game(&report.game_id, |game| {
                    game.last_played = report.state.last_played;
                    game.total_play_time = report.state.total_play_time;
                });
                let verdict = if report.exit_ok {
                    "Finished"
                } else {
                    "ScummVM exited with an error after"
                };
                self.state.set_status(format!(
                    "{verdict} {name} · total play time {}",
                    library::format_play_time(report.state.total_play_time)
                ));
            }
            Err(err) => {
                error!(?err, "game session failed");
                self.state
                    .set_status(format!("Could not launch {name}: {err:#}"));
            }
        }
    }

    fn open_prompt(&mut self, purpose: PromptPurpose) {
        let home = home_dir();
        let default = match purpose {
            PromptPurpose::Export | PromptPurpose::Import => {
                home.join(EXPORT_FILE_NAME).to_string_lossy().into_owned()
            }
            PromptPurpose::AddFolder => home.to_string_lossy().into_owned(),
            PromptPurpose::ScummvmPath => self.settings.scummvm_path.clone(),
            PromptPurpose::ArtFolder if self.settings.art_local_path.trim().is_empty() => {
                home.to_string_lossy().into_owned()
            }
            PromptPurpose::ArtFolder => self.settings.art_local_path.clone(),
        };
        self.prompt = Some(PathPrompt::new(purpose, default));
        self.state.set_status(purpose.instruction());
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        let mut finalize: Option<(PromptPurpose, String)> = None;
        let mut cancel = false;
        if let Some(prompt) = self.prompt.as_mut() {
            match key.code {
                KeyCode::Esc => cancel = true,
                KeyCode::Enter => finalize = Some((prompt.purpose, prompt.value())),
                KeyCode::Left => prompt.move_cursor(-1),
                KeyCode::Right => prompt.move_cursor(1),
                KeyCode::Home => prompt.move_home(),
                KeyCode::End => prompt.move_end(),
                KeyCode::Backspace => prompt.backspace(),
                KeyCode::Delete => prompt.delete(),
                KeyCode::Char(ch) => {
                    if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                        prompt.insert(ch);
                    }
                }
                _ => {}
            }
        }

        if cancel {
            self.prompt = None;
            self.state.set_status("Cancelled");
            return Ok(());
        }

        if let Some((purpose, value)) = finalize {
            self.prompt = None;
            self.complete_prompt(purpose, expand_home(&value))?;
        }
        Ok(())
    }

    fn complete_prompt(&mut self, purpose: PromptPurpose, path: PathBuf) -> Result<()> {
        match purpose {
            PromptPurpose::Export => {
                transfer::export(&path, &self.library.load(), &self.state.all_games)?;
                self.state.set_status(format!(
                    "Exported {} games to {}",
                    self.state.all_games.len(),
                    path.display()
                ));
            }
            PromptPurpose::Import => {
                let games = transfer::import(&path, &self.library)?;
                let found = games.len();
                let added = transfer::merge_imported_games(&self.library, games)?;
                self.rebuild();
                self.state.set_status(format!(
                    "Imported library from {} ({added} of {found} games added)",
                    path.display()
                ));
            }
            PromptPurpose::AddFolder => {
                let Some(game) = library::custom_game_from_folder(&path) else {
                    bail!("{} is not a folder", path.display());
                };
                let id = game.id.clone();
                let name = game.display_name().to_string();
                let added = self.library.add_custom_games([game])?;
                self.rebuild();
                self.state.select_game(&id);
                let message = if added == 0 {
                    format!("{name} is already in the library")
                } else {
                    format!("Added {name}")
                };
                self.state.set_status(message);
            }
            PromptPurpose::ScummvmPath => {
                let executable = path.to_string_lossy().into_owned();
                self.update_settings(|settings| settings.scummvm_path = executable)?;
                info!(scummvm_path = %self.settings.scummvm_path, "scummvm path changed");
                self.version = None;
                self.check_version();
                self.start_probe();
            }
            PromptPurpose::ArtFolder => {
                let folder = path.to_string_lossy().into_owned();
                self.update_settings(|settings| settings.art_local_path = folder)?;
                self.reset_details();
                self.state
                    .set_status(format!("Local cover art: {}", path.display()));
            }
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(5)])
            .split(size);
        let body_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[0]);

        self.render_game_list(frame, body_chunks[0]);
        self.render_game_info(frame, body_chunks[1]);
        self.render_status(frame, chunks[1]);
        if let Some(prompt) = &self.prompt {
            self.render_prompt(frame, prompt);
        }
    }

    fn render_prompt(&self, frame: &mut Frame, prompt: &PathPrompt) {
        let frame_area = frame.size();
        let width = frame_area.width.saturating_sub(4).clamp(24, 80);
        let height = 7_u16.min(frame_area.height.saturating_sub(2)).max(5);
        let area = centered_rect(width, height, frame_area);

        frame.render_widget(Clear, area);

        let inner_width = area.width.saturating_sub(4) as usize;
        let scroll = prompt.cursor.saturating_sub(inner_width);
        let visible: String = prompt.input.chars().skip(scroll).collect();
        let input_line = Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::raw(visible),
        ]);
        let helper = Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" confirm  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]);

        let paragraph = Paragraph::new(vec![
            Line::from(prompt.purpose.instruction()),
            input_line,
            Line::from(""),
            helper,
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(prompt.purpose.title()),
        );
        frame.render_widget(paragraph, area);

        let cursor_x = (area.x + 3 + (prompt.cursor - scroll) as u16)
            .min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 2);
    }

    fn render_game_list(&mut self, frame: &mut Frame, area: Rect) {
        self.state.list_height = area.height.saturating_sub(2) as usize;
        self.state.clamp_cursor();
        self.state.ensure_cursor_visible();

        let mut list_state = ListState::default();
        let height = area.height.saturating_sub(2) as usize;
        let rows = self.state.visible_rows(height);
        if !rows.is_empty() {
            let selected = self
                .state
                .cursor
                .saturating_sub(self.state.offset)
                .min(rows.len().saturating_sub(1));
            list_state.select(Some(selected));
        }
        let items: Vec<ListItem> = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let game = match row {
                    Row::Header { label, count } => {
                        return ListItem::new(Line::from(Span::styled(
                            format!("── {label} ({count})"),
                            Style::default()
                                .fg(self.theme.accent)
                                .add_modifier(Modifier::BOLD),
                        )));
                    }
                    Row::Game(game) => game,
                };
                let is_selected = self.state.cursor == self.state.offset + idx;
                let marker = if is_selected {
                    Span::styled(
                        "▶ ",
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                let favorite = if game.favorite {
                    Span::styled("★ ", Style::default().fg(self.theme.warning))
                } else {
                    Span::raw("  ")
                };
                let title_style = if game.installed {
                    Style::default()
                        .fg(self.theme.primary_fg)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.primary_fg)
                };
                let mut line = vec![
                    marker,
                    favorite,
                    Span::styled(game.display_name().to_string(), title_style),
                ];
                if !game.year.is_empty() {
                    line.push(Span::styled(
                        format!(" · {}", game.year),
                        Style::default().fg(self.theme.muted),
                    ));
                }
                if game.installed {
                    line.push(Span::styled(" ●", Style::default().fg(self.theme.success)));
                }
                ListItem::new(Line::from(line))
            })
            .collect();

        let title = format!("Games ({})", self.state.game_count());
        let block = Block::default().borders(Borders::ALL).title(title);
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_game_info(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Game Details");
        let Some(game) = self.state.current_game() else {
            let message = if self.state.all_games.is_empty() {
                "No games available"
            } else {
                "No games match the current filters"
            };
            frame.render_widget(Paragraph::new(message).block(block), area);
            return;
        };

        let muted = Style::default().fg(self.theme.muted);
        let field = |label: &str, value: String| {
            Line::from(vec![Span::styled(format!("{label}: "), muted), Span::raw(value)])
        };

        let mut lines = vec![Line::from(Span::styled(
            game.display_name().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        for (label, value) in [
            ("Year", &game.year),
            ("Company", &game.company),
            ("Engine", &game.engine),
            ("Platform", &game.platform),
            ("Genre", &game.genre),
        ] {
            if !value.is_empty() {
                lines.push(field(label, value.clone()));
            }
        }
        lines.push(field("ID", game.id.clone()));
        if let Some(compatibility) = game.compatibility() {
            let color = match compatibility {
                Compatibility::Excellent | Compatibility::Good => self.theme.success,
                Compatibility::Fair => self.theme.warning,
                Compatibility::Poor => self.theme.danger,
                Compatibility::Other(_) => self.theme.primary_fg,
            };
            lines.push(Line::from(vec![
                Span::styled("Compatibility: ", muted),
                Span::styled(compatibility.label().to_string(), Style::default().fg(color)),
            ]));
        }
        if let Some(era) = game.era() {
            lines.push(field("Era", era));
        }
        let installed = if !game.installed {
            "no".to_string()
        } else if game.path.is_empty() {
            "yes".to_string()
        } else {
            format!("yes ({})", game.path)
        };
        lines.push(field("Installed", installed));
        lines.push(field(
            "Favorite",
            if game.favorite { "yes" } else { "no" }.to_string(),
        ));
        lines.push(field(
            "Play time",
            library::format_play_time(game.total_play_time),
        ));
        lines.push(field("Last played", format_last_played(game.last_played)));

        let details = self.details.get(&game.id);
        lines.push(Line::from(""));
        lines.push(field("Icon", describe_asset(details.map(|d| &d.icon))));
        lines.push(field("Cover", describe_asset(details.map(|d| &d.cover))));
        lines.push(field(
            "Screenshot",
            describe_asset(details.map(|d| &d.screenshot)),
        ));

        if !game.description.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(game.description.clone()));
        }

        lines.push(Line::from(""));
        let summary = match details.map(|d| &d.wiki) {
            Some(Slot::Ready(text)) => Span::raw(text.clone()),
            Some(Slot::Loading) | None => Span::styled("Loading Wikipedia summary…", muted),
            Some(Slot::Missing) | Some(Slot::Off) => {
                Span::styled("No Wikipedia summary available", muted)
            }
        };
        lines.push(Line::from(summary));

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = if self.state.mode == Mode::Search {
            format!("Search: {}▏", self.state.options.search)
        } else {
            self.state.status.clone()
        };

        let summary = CatalogSummary::of(&self.state.all_games);
        let mut facts = vec![
            format!(
                "{} games · {} installed · {} favorites",
                summary.total, summary.installed, summary.favorites
            ),
            format!("sort: {}", self.state.options.sort.label()),
        ];
        if let Some(genre) = &self.state.options.genre {
            facts.push(format!("genre: {genre}"));
        }
        facts.push(format!("launch: {}", self.settings.launch_mode.label()));
        facts.push(format!("art: {}", self.settings.art_source.label()));
        facts.push(format!(
            "covers {} · screenshots {}",
            on_off(self.settings.fetch_covers),
            on_off(self.settings.fetch_screenshots)
        ));
        facts.push(
            self.version
                .clone()
                .unwrap_or_else(|| "ScummVM: not detected".to_string()),
        );
        if let Some(running) = &self.running {
            facts.push(format!("playing: {running}"));
        }

        let help = "/ search  i installed  g genre  s sort  F fav-first  e group  f favorite  \
                    ⏎ play  r rescan  w mode  p scummvm path  o art  l art folder  c covers  \
                    S screenshots  x export  m import  a add  C clear cache  q quit";
        let paragraph = Paragraph::new(vec![
            Line::from(primary),
            Line::from(Span::styled(
                facts.join("  │  "),
                Style::default().fg(self.theme.accent),
            )),
            Line::from(Span::styled(help, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn describe_asset(slot: Option<&Slot<PathBuf>>) -> String {
    match slot {
        Some(Slot::Ready(path)) => format!("cached ({})", path.display()),
        Some(Slot::Loading) | None => "loading…".to_string(),
        Some(Slot::Missing) => "not available".to_string(),
        Some(Slot::Off) => "disabled".to_string(),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn format_last_played(timestamp: i64) -> String {
    if timestamp <= 0 {
        return "never".to_string();
    }
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if raw == "~" => home_dir(),
        None => Path::new(raw).to_path_buf(),
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::UnboundedSender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn test_app(root: &Path) -> Result<ScummApp> {
        let config_path = root.join("config.toml");
        fs::write(
            &config_path,
            format!(
                "config_dir = {:?}\ncache_dir = {:?}\n",
                root.join("cfg").display().to_string(),
                root.join("cache").display().to_string()
            ),
        )?;
        ScummApp::new(AppConfig::load_from(&config_path)?)
    }

    fn press(app: &mut ScummApp, code: KeyCode) {
        let key = KeyEvent::new(code, KeyModifiers::NONE);
        assert!(app.process_app_event(Some(AppEvent::Input(Event::Key(key)))));
    }

    fn enter_path(app: &mut ScummApp, value: &str) {
        let prompt = app.prompt.as_mut().expect("prompt should be open");
        prompt.input = value.to_string();
        prompt.move_end();
        press(app, KeyCode::Enter);
        assert!(app.prompt.is_none());
    }

    fn saved_settings(app: &ScummApp) -> Settings {
        SettingsStore::new(app.paths.settings_file.clone()).load()
    }

    #[test]
    fn home_prefix_is_expanded() {
        assert_eq!(expand_home("~/games/dig"), home_dir().join("games/dig"));
        assert_eq!(expand_home("~"), home_dir());
        assert_eq!(expand_home("/srv/dig"), PathBuf::from("/srv/dig"));
    }

    #[test]
    fn never_played_is_spelled_out() {
        assert_eq!(format_last_played(0), "never");
        assert_eq!(format_last_played(-5), "never");
        assert_ne!(format_last_played(1_700_000_000), "never");
    }

    #[test]
    fn pending_details_respect_fetch_settings() {
        let settings = Settings::default();
        let details = Details::pending(&settings);
        assert!(details.is_loading());
        assert!(matches!(details.cover, Slot::Loading));
        assert!(matches!(details.screenshot, Slot::Off));
        assert_eq!(describe_asset(Some(&details.screenshot)), "disabled");
    }

    #[test]
    fn fetch_toggles_persist_and_refetch_details() -> Result<()> {
        let dir = tempdir()?;
        let mut app = test_app(dir.path())?;
        let defaults = Settings::default();
        app.details
            .insert("dig".to_string(), Details::pending(&app.settings));

        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.settings.fetch_covers, !defaults.fetch_covers);
        assert_eq!(saved_settings(&app).fetch_covers, !defaults.fetch_covers);
        assert!(app.details.is_empty());

        press(&mut app, KeyCode::Char('S'));
        assert_eq!(app.settings.fetch_screenshots, !defaults.fetch_screenshots);
        assert_eq!(
            saved_settings(&app).fetch_screenshots,
            !defaults.fetch_screenshots
        );
        let details = Details::pending(&app.settings);
        assert!(matches!(details.screenshot, Slot::Loading));
        Ok(())
    }

    #[test]
    fn art_folder_prompt_updates_local_path() -> Result<()> {
        let dir = tempdir()?;
        let art = dir.path().join("art");
        fs::create_dir_all(&art)?;
        let mut app = test_app(dir.path())?;

        press(&mut app, KeyCode::Char('l'));
        let prompt = app.prompt.as_ref().expect("prompt should be open");
        assert_eq!(prompt.purpose, PromptPurpose::ArtFolder);
        assert_eq!(prompt.input, home_dir().to_string_lossy());

        let folder = art.to_string_lossy().into_owned();
        enter_path(&mut app, &folder);
        assert_eq!(app.settings.art_local_path, folder);
        assert_eq!(saved_settings(&app).art_local_path, folder);

        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.prompt.as_ref().map(|p| p.input.as_str()), Some(folder.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn scummvm_path_prompt_rescans_with_new_executable() -> Result<()> {
        let dir = tempdir()?;
        let mut app = test_app(dir.path())?;
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        app.event_tx = Some(event_tx);
        app.version = Some("ScummVM 2.8.0".to_string());

        press(&mut app, KeyCode::Char('p'));
        assert_eq!(
            app.prompt.as_ref().map(|p| p.input.clone()),
            Some(Settings::default().scummvm_path)
        );
        let executable = dir.path().join("missing-scummvm");
        let executable = executable.to_string_lossy().into_owned();
        enter_path(&mut app, &executable);

        assert_eq!(app.settings.scummvm_path, executable);
        assert_eq!(saved_settings(&app).scummvm_path, executable);
        assert!(app.probing);
        assert!(app.version.is_none());

        let mut probed = false;
        let mut versioned = false;
        while !(probed && versioned) {
            let event = tokio::time::timeout(Duration::from_secs(5), event_rx.recv()).await?;
            match event {
                Some(AppEvent::GamesProbed(outcome)) => {
                    assert!(!outcome.is_ready());
                    probed = true;
                }
                Some(AppEvent::VersionChecked(version)) => {
                    assert!(version.is_none());
                    versioned = true;
                }
                _ => panic!("unexpected event"),
            }
        }
        Ok(())
    }
}
