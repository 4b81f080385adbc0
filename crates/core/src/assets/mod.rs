//! Downloads and caches icons, cover art, screenshots and wiki summaries.
//!
//! Every fetch checks the on-disk cache first. Network and filesystem
//! problems never reach the caller as errors; they come back as
//! [`Outcome::Unavailable`] or [`Outcome::Failed`].

mod covers;
mod wiki;

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::{
    config::{AppConfig, Paths},
    models::GameRecord,
    outcome::Outcome,
    settings::{ArtSource, Settings},
};

pub use covers::{
    find_local_cover, first_cover_url, first_screenshot_url, thegamesdb_cover_url,
    COVER_EXTENSIONS,
};
pub use wiki::{parse_extract, sanitize_file_name};

const MOBYGAMES_SEARCH_URL: &str = "https://www.mobygames.com/search/";

/// Failure while fetching a single asset.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Transport-level failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Server answered with something other than success or 404.
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    /// Cache read or write failed.
    #[error("asset cache I/O failed: {0}")]
    Io(#[from] io::Error),
    /// A scraped page had no usable link.
    #[error("no matching asset on {0}")]
    NoMatch(String),
}

type AssetResult<T> = std::result::Result<Option<T>, AssetError>;

fn settle<T>(result: AssetResult<T>) -> Outcome<T> {
    match result {
        Ok(Some(value)) => Outcome::Ready(value),
        Ok(None) => Outcome::Unavailable,
        Err(AssetError::NoMatch(page)) => {
            debug!(%page, "no asset link found");
            Outcome::Unavailable
        }
        Err(err) => Outcome::Failed(err.into()),
    }
}

/// Shared, cheaply clonable asset downloader.
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: Client,
    paths: Paths,
    icon_base_url: String,
    wiki_api_url: String,
    in_flight: Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>,
}

impl AssetFetcher {
    /// Build a fetcher with the configured user agent and timeout.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::with_client(
            client,
            config.paths(),
            &config.icon_base_url,
            &config.wiki_api_url,
        ))
    }

    /// Build a fetcher around an existing client.
    pub fn with_client(
        client: Client,
        paths: Paths,
        icon_base_url: &str,
        wiki_api_url: &str,
    ) -> Self {
        Self {
            client,
            paths,
            icon_base_url: icon_base_url.trim_end_matches('/').to_string(),
            wiki_api_url: wiki_api_url.to_string(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Cache layout used by this fetcher.
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// `<icons>/<icon_name>.png`, downloaded from the icon repository.
    pub async fn icon(&self, game: &GameRecord) -> Outcome<PathBuf> {
        let icon = game.icon_name();
        if icon.is_empty() {
            return Outcome::Unavailable;
        }
        let dest = self
            .paths
            .icons_dir
            .join(format!("{}.png", sanitize_file_name(icon)));
        let url = format!("{}/{}.png", self.icon_base_url, icon);
        settle(self.download(&url, &dest).await).log_failure("icon download failed")
    }

    /// Plain-text introduction of the game's encyclopedia article.
    pub async fn wiki_summary(&self, game: &GameRecord) -> Outcome<String> {
        let title = game.wiki_title();
        if title.is_empty() {
            return Outcome::Unavailable;
        }
        settle(self.fetch_wiki(title).await).log_failure("wiki summary failed")
    }

    /// Cover art from the source chosen in settings.
    pub async fn cover(&self, game: &GameRecord, settings: &Settings) -> Outcome<PathBuf> {
        if !settings.fetch_covers {
            return Outcome::Unavailable;
        }
        let outcome = match settings.art_source {
            ArtSource::Scummvm => self.icon(game).await,
            ArtSource::Igdb => Outcome::Unavailable,
            ArtSource::Local => settle(
                find_local_cover(Path::new(&settings.art_local_path), game)
                    .map_err(AssetError::from),
            ),
            ArtSource::TheGamesDb => {
                let url = thegamesdb_cover_url(&game.id);
                let dest = self.paths.covers_dir.join(cached_name(&game.id, &url));
                settle(self.download(&url, &dest).await)
            }
            ArtSource::MobyGames => settle(
                self.scrape(game, &self.paths.covers_dir, first_cover_url)
                    .await,
            ),
        };
        outcome.log_failure("cover fetch failed")
    }

    /// First MobyGames screenshot, when screenshots are enabled.
    pub async fn screenshot(&self, game: &GameRecord, settings: &Settings) -> Outcome<PathBuf> {
        if !settings.fetch_screenshots {
            return Outcome::Unavailable;
        }
        settle(
            self.scrape(game, &self.paths.screenshots_dir, first_screenshot_url)
                .await,
        )
        .log_failure("screenshot fetch failed")
    }

    async fn fetch_wiki(&self, title: &str) -> AssetResult<String> {
        let cached = self
            .paths
            .wiki_dir
            .join(format!("{}.txt", sanitize_file_name(title)));
        if cached.is_file() {
            let text = tokio::fs::read_to_string(&cached).await?;
            return Ok(Some(text));
        }

        let response = self
            .client
            .get(&self.wiki_api_url)
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("format", "json"),
                ("titles", title),
            ])
            .send()
            .await?;
        let Some(response) = check_status(response)? else {
            return Ok(None);
        };
        let body: serde_json::Value = response.json().await?;
        let Some(extract) = parse_extract(&body) else {
            debug!(title, "wiki returned no extract");
            return Ok(None);
        };

        write_cache(&cached, extract.as_bytes()).await?;
        Ok(Some(extract))
    }

    async fn scrape(
        &self,
        game: &GameRecord,
        dir: &Path,
        pick: fn(&str) -> Option<String>,
    ) -> AssetResult<PathBuf> {
        if let Some(existing) = cached_asset(dir, &game.id) {
            return Ok(Some(existing));
        }

        let response = self
            .client
            .get(MOBYGAMES_SEARCH_URL)
            .query(&[("q", game.display_name()), ("type", "game")])
            .send()
            .await?;
        let Some(response) = check_status(response)? else {
            return Ok(None);
        };
        let page = response.text().await?;
        let url = pick(&page).ok_or_else(|| AssetError::NoMatch(MOBYGAMES_SEARCH_URL.into()))?;
        let dest = dir.join(cached_name(&game.id, &url));
        self.download(&url, &dest).await
    }

    async fn download(&self, url: &str, dest: &Path) -> AssetResult<PathBuf> {
        if dest.is_file() {
            return Ok(Some(dest.to_path_buf()));
        }
        let lock = self.lock_for(dest);
        let result = {
            let _held = lock.lock().await;
            if dest.is_file() {
                debug!(path = %dest.display(), "reused download from concurrent request");
                Ok(Some(dest.to_path_buf()))
            } else {
                self.fetch_to(url, dest).await
            }
        };
        self.release(dest, &lock);
        result
    }

    async fn fetch_to(&self, url: &str, dest: &Path) -> AssetResult<PathBuf> {
        let response = self.client.get(url).send().await?;
        let Some(response) = check_status(response)? else {
            debug!(url, "asset not found");
            return Ok(None);
        };
        let bytes = response.bytes().await?;
        write_cache(dest, &bytes).await?;
        info!(url, path = %dest.display(), "asset cached");
        Ok(Some(dest.to_path_buf()))
    }

    /// Lock serialising downloads into `dest`.
    fn lock_for(&self, dest: &Path) -> Arc<AsyncMutex<()>> {
        let mut locks = self.in_flight.lock();
        Arc::clone(locks.entry(dest.to_path_buf()).or_default())
    }

    /// Forget the lock for `dest` once no other request holds a clone.
    fn release(&self, dest: &Path, lock: &Arc<AsyncMutex<()>>) {
        let mut locks = self.in_flight.lock();
        let idle = locks
            .get(dest)
            .is_some_and(|entry| Arc::ptr_eq(entry, lock) && Arc::strong_count(entry) == 2);
        if idle {
            locks.remove(dest);
        }
    }
}

fn check_status(
    response: reqwest::Response,
) -> std::result::Result<Option<reqwest::Response>, AssetError> {
    match response.status() {
        status if status.is_success() => Ok(Some(response)),
        StatusCode::NOT_FOUND => Ok(None),
        status => Err(AssetError::Status(status.as_u16())),
    }
}

async fn write_cache(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let partial = dest.with_extension("part");
    tokio::fs::write(&partial, bytes).await?;
    tokio::fs::rename(&partial, dest).await
}

/// `<id>.<ext>` where the extension comes from the source URL.
fn cached_name(id: &str, url: &str) -> String {
    let ext = url
        .rsplit('/')
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| COVER_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "jpg".to_string());
    format!("{}.{ext}", sanitize_file_name(id))
}

fn cached_asset(dir: &Path, id: &str) -> Option<PathBuf> {
    let stem = sanitize_file_name(id);
    COVER_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|path| path.is_file())
}

/// Empty every asset cache directory and recreate it.
///
/// Returns the number of files removed.
pub fn clear_cache(paths: &Paths) -> Result<usize> {
    let mut removed = 0;
    for dir in paths.cache_dirs() {
        if dir.exists() {
            removed += walkdir::WalkDir::new(dir)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .count();
            fs::remove_dir_all(dir)
                .with_context(|| format!("failed to remove {}", dir.display()))?;
        }
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    info!(removed, "asset cache cleared");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::{Read, Write},
        net::TcpListener,
        sync::atomic::{AtomicUsize, Ordering},
        thread,
        time::Duration,
    };
    use tempfile::tempdir;

    fn fetcher(root: &Path) -> AssetFetcher {
        AssetFetcher::with_client(
            Client::new(),
            Paths::new(root.join("cfg"), root.join("cache")),
            "http://127.0.0.1:9/icons/",
            "http://127.0.0.1:9/w/api.php",
        )
    }

    #[test]
    fn cached_name_keeps_known_extensions() {
        assert_eq!(
            cached_name("monkey", "https://cdn.mobygames.com/covers/1234.PNG"),
            "monkey.png"
        );
        assert_eq!(
            cached_name("dig", "https://example.com/boxart/dig-1.jpg"),
            "dig.jpg"
        );
        assert_eq!(cached_name("dig", "https://example.com/image"), "dig.jpg");
        assert_eq!(cached_name("a/b", "https://example.com/x.webp"), "a_b.webp");
    }

    #[test]
    fn clear_cache_counts_removed_files() -> Result<()> {
        let dir = tempdir()?;
        let paths = Paths::new(dir.path().join("cfg"), dir.path().join("cache"));
        paths.ensure()?;
        fs::write(paths.icons_dir.join("monkey.png"), b"png")?;
        fs::write(paths.covers_dir.join("dig.jpg"), b"jpg")?;
        fs::write(paths.wiki_dir.join("The_Dig.txt"), b"text")?;

        assert_eq!(clear_cache(&paths)?, 3);
        for sub in paths.cache_dirs() {
            assert!(sub.is_dir());
            assert_eq!(fs::read_dir(sub)?.count(), 0);
        }
        assert_eq!(clear_cache(&paths)?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn disabled_or_unsupported_sources_are_unavailable() {
        let dir = tempdir().expect("tempdir");
        let fetcher = fetcher(dir.path());
        let game = GameRecord::new("dig", "The Dig");

        let settings = Settings {
            fetch_covers: false,
            ..Settings::default()
        };
        assert!(matches!(
            fetcher.cover(&game, &settings).await,
            Outcome::Unavailable
        ));

        let settings = Settings {
            art_source: ArtSource::Igdb,
            ..Settings::default()
        };
        assert!(matches!(
            fetcher.cover(&game, &settings).await,
            Outcome::Unavailable
        ));

        let settings = Settings {
            fetch_screenshots: false,
            ..Settings::default()
        };
        assert!(matches!(
            fetcher.screenshot(&game, &settings).await,
            Outcome::Unavailable
        ));
    }

    #[tokio::test]
    async fn cached_assets_skip_the_network() -> Result<()> {
        let dir = tempdir()?;
        let fetcher = fetcher(dir.path());
        fetcher.paths().ensure()?;
        let game = GameRecord::new("dig", "The Dig");

        let icon = fetcher.paths().icons_dir.join("dig.png");
        fs::write(&icon, b"png")?;
        let Outcome::Ready(path) = fetcher.icon(&game).await else {
            panic!("expected cached icon");
        };
        assert_eq!(path, icon);

        let summary = fetcher.paths().wiki_dir.join("The_Dig.txt");
        fs::write(&summary, "An adventure game.")?;
        let Outcome::Ready(text) = fetcher.wiki_summary(&game).await else {
            panic!("expected cached summary");
        };
        assert_eq!(text, "An adventure game.");
        Ok(())
    }

    #[tokio::test]
    async fn local_cover_source_reads_art_directory() -> Result<()> {
        let dir = tempdir()?;
        let art = dir.path().join("art");
        fs::create_dir_all(&art)?;
        fs::write(art.join("The Dig.JPG"), b"jpg")?;

        let fetcher = fetcher(dir.path());
        let settings = Settings {
            art_source: ArtSource::Local,
            art_local_path: art.to_string_lossy().into_owned(),
            ..Settings::default()
        };
        let game = GameRecord::new("dig", "The Dig");
        let Outcome::Ready(path) = fetcher.cover(&game, &settings).await else {
            panic!("expected local cover");
        };
        assert_eq!(path, art.join("The Dig.JPG"));
        Ok(())
    }

    /// Serve every connection a fixed PNG body after `delay`, counting hits.
    fn slow_server(delay: Duration) -> Result<(String, Arc<AtomicUsize>)> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let base = format!("http://{}", listener.local_addr()?);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request);
                thread::sleep(delay);
                let _ = stream.write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 3\r\nConnection: close\r\n\r\npng",
                );
            }
        });
        Ok((base, hits))
    }

    #[tokio::test]
    async fn icon_and_scummvm_cover_share_one_download() -> Result<()> {
        let (base, hits) = slow_server(Duration::from_millis(300))?;
        let dir = tempdir()?;
        let fetcher = AssetFetcher::with_client(
            Client::new(),
            Paths::new(dir.path().join("cfg"), dir.path().join("cache")),
            &format!("{base}/icons"),
            "http://127.0.0.1:9/w/api.php",
        );
        let game = GameRecord::new("dig", "The Dig");
        let settings = Settings::default();
        assert_eq!(settings.art_source, ArtSource::Scummvm);

        let (icon, cover) = tokio::join!(fetcher.icon(&game), fetcher.cover(&game, &settings));
        let expected = fetcher.paths().icons_dir.join("dig.png");
        let Outcome::Ready(icon) = icon else {
            panic!("icon should be ready");
        };
        let Outcome::Ready(cover) = cover else {
            panic!("cover should be ready");
        };
        assert_eq!(icon, expected);
        assert_eq!(cover, expected);
        assert_eq!(fs::read(&expected)?, b"png");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(fetcher.in_flight.lock().is_empty());
        Ok(())
    }
}
