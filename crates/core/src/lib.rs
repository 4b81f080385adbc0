#![warn(clippy::all, missing_docs)]

//! Core logic for scummtui, a terminal launcher for ScummVM games.
//!
//! This crate holds the game catalog, reconciliation with what the
//! ScummVM executable reports, the filter/sort/group pipeline, JSON
//! persistence of settings and library state, process launching and
//! asset caching. The terminal UI crate drives it.

pub mod assets;
pub mod catalog;
pub mod config;
pub mod launcher;
pub mod library;
pub mod models;
pub mod outcome;
pub mod prober;
pub mod reconcile;
pub mod settings;
pub mod store;
pub mod tasks;
pub mod transfer;
pub mod view;

pub use assets::{AssetError, AssetFetcher};
pub use config::{AppConfig, Paths};
pub use library::{GameState, LibraryDocument, LibraryStore};
pub use models::GameRecord;
pub use outcome::Outcome;
pub use reconcile::{reconcile, CatalogSummary};
pub use settings::{ArtSource, LaunchMode, Settings, SettingsStore};
pub use tasks::{TaskHandle, TaskPool};
pub use view::{SortKey, View, ViewOptions};
