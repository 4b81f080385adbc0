//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` under the
//! user's config directory, then `SCUMMTUI_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

/// Directory name used under the platform config and cache roots.
pub const APP_DIR: &str = "scummtui";

const CONFIG_FILE: &str = "config.toml";

/// Default location of the icon repository.
pub const DEFAULT_ICON_BASE_URL: &str =
    "https://raw.githubusercontent.com/scummvm/scummvm-icons/main/icons";
/// Default MediaWiki API endpoint for summaries.
pub const DEFAULT_WIKI_API_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Runtime configuration resolved once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory holding `settings.json` and `library.json`.
    pub config_dir: PathBuf,
    /// Root of the asset cache.
    pub cache_dir: PathBuf,
    /// Base URL for `<icon>.png` downloads.
    pub icon_base_url: String,
    /// MediaWiki `api.php` endpoint.
    pub wiki_api_url: String,
    /// Timeout for `--list-targets`.
    pub probe_timeout_secs: u64,
    /// Timeout for `--version`.
    pub version_timeout_secs: u64,
    /// Timeout for each HTTP request.
    pub http_timeout_secs: u64,
    /// Maximum number of concurrent background jobs.
    pub worker_threads: usize,
    /// User agent sent with every HTTP request.
    pub user_agent: String,
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load configuration using `path` as the optional file layer.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_dir = default_data_dir();
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join(APP_DIR);

        let settings = Config::builder()
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .set_default("cache_dir", cache_dir.to_string_lossy().to_string())?
            .set_default("icon_base_url", DEFAULT_ICON_BASE_URL)?
            .set_default("wiki_api_url", DEFAULT_WIKI_API_URL)?
            .set_default("probe_timeout_secs", 10_i64)?
            .set_default("version_timeout_secs", 5_i64)?
            .set_default("http_timeout_secs", 15_i64)?
            .set_default("worker_threads", 4_i64)?
            .set_default(
                "user_agent",
                format!("scummtui/{}", env!("CARGO_PKG_VERSION")),
            )?
            .add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix("SCUMMTUI").try_parsing(true))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("invalid configuration values")?;
        Ok(config)
    }

    /// Resolve every file and directory the application touches.
    pub fn paths(&self) -> Paths {
        Paths::new(&self.config_dir, &self.cache_dir)
    }

    /// Timeout applied to `--list-targets`.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    /// Timeout applied to `--version`.
    pub fn version_timeout(&self) -> Duration {
        Duration::from_secs(self.version_timeout_secs.max(1))
    }

    /// Timeout applied to HTTP requests.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

/// Concrete locations derived from [`AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// User preferences document.
    pub settings_file: PathBuf,
    /// Favorites, play time and custom games.
    pub library_file: PathBuf,
    /// Cached `<icon>.png` files.
    pub icons_dir: PathBuf,
    /// Cached cover art.
    pub covers_dir: PathBuf,
    /// Cached screenshots.
    pub screenshots_dir: PathBuf,
    /// Cached wiki summaries.
    pub wiki_dir: PathBuf,
    /// Log output.
    pub log_dir: PathBuf,
}

impl Paths {
    /// Build the layout rooted at the given config and cache directories.
    pub fn new(config_dir: impl AsRef<Path>, cache_dir: impl AsRef<Path>) -> Self {
        let config_dir = config_dir.as_ref();
        let cache_dir = cache_dir.as_ref();
        Self {
            settings_file: config_dir.join("settings.json"),
            library_file: config_dir.join("library.json"),
            icons_dir: cache_dir.join("icons"),
            covers_dir: cache_dir.join("covers"),
            screenshots_dir: cache_dir.join("screenshots"),
            wiki_dir: cache_dir.join("wiki"),
            log_dir: cache_dir.join("logs"),
        }
    }

    /// Asset cache subdirectories.
    pub fn cache_dirs(&self) -> [&Path; 4] {
        [
            &self.icons_dir,
            &self.covers_dir,
            &self.screenshots_dir,
            &self.wiki_dir,
        ]
    }

    /// Create every directory in the layout.
    pub fn ensure(&self) -> Result<()> {
        let parents = [self.settings_file.parent(), self.library_file.parent()];
        for dir in parents.into_iter().flatten() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        for dir in self.cache_dirs().into_iter().chain([self.log_dir.as_path()]) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Location of `config.toml`.
pub fn default_config_path() -> PathBuf {
    default_data_dir().join(CONFIG_FILE)
}

fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join(APP_DIR)
}

/// Write a commented default `config.toml` if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = default_config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let contents = format!(
        "# scummtui configuration\n\
         # Every key is optional; SCUMMTUI_<KEY> environment variables override this file.\n\
         \n\
         icon_base_url = {icon:?}\n\
         wiki_api_url = {wiki:?}\n\
         probe_timeout_secs = 10\n\
         version_timeout_secs = 5\n\
         http_timeout_secs = 15\n\
         worker_threads = 4\n\
         # config_dir = \"/path/to/settings\"\n\
         # cache_dir = \"/path/to/cache\"\n",
        icon = DEFAULT_ICON_BASE_URL,
        wiki = DEFAULT_WIKI_API_URL,
    );
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_layer_overrides_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            format!(
                "cache_dir = {:?}\nhttp_timeout_secs = 3\n",
                dir.path().join("cache").display().to_string()
            ),
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.cache_dir, dir.path().join("cache"));
        assert_eq!(config.http_timeout(), Duration::from_secs(3));
        assert_eq!(config.probe_timeout(), Duration::from_secs(10));
        assert_eq!(config.icon_base_url, DEFAULT_ICON_BASE_URL);

        let paths = config.paths();
        assert_eq!(paths.icons_dir, dir.path().join("cache").join("icons"));
        assert_eq!(
            paths.library_file,
            config.config_dir.join("library.json")
        );
        Ok(())
    }

    #[test]
    fn default_file_is_loadable() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(CONFIG_FILE);
        write_default_config(&path)?;
        assert!(path.is_file());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.wiki_api_url, DEFAULT_WIKI_API_URL);
        Ok(())
    }

    #[test]
    fn ensure_creates_layout() -> Result<()> {
        let dir = tempdir()?;
        let paths = Paths::new(dir.path().join("cfg"), dir.path().join("cache"));
        paths.ensure()?;
        for sub in paths.cache_dirs() {
            assert!(sub.is_dir());
        }
        assert!(paths.log_dir.is_dir());
        assert!(dir.path().join("cfg").is_dir());
        Ok(())
    }
}
