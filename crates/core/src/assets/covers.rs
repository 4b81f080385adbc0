//! Cover and screenshot lookup: scraping MobyGames result pages, TheGamesDB
//! box-art URLs and image files in a user-chosen folder.

use std::{
    io,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::models::GameRecord;

/// Image extensions recognised for cached and local art.
pub const COVER_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "gif", "bmp"];

static COVER_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https://cdn\.mobygames\.com/covers/[^"'\s]+\.(?:jpg|jpeg|png|webp)"#)
        .expect("invalid cover url regex")
});

static SCREENSHOT_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https://cdn\.mobygames\.com/screenshots/[^"'\s]+\.(?:jpg|jpeg|png|webp)"#)
        .expect("invalid screenshot url regex")
});

/// First cover image linked from a MobyGames search page.
pub fn first_cover_url(page: &str) -> Option<String> {
    COVER_URL_RE.find(page).map(|m| m.as_str().to_string())
}

/// First screenshot linked from a MobyGames search page.
pub fn first_screenshot_url(page: &str) -> Option<String> {
    SCREENSHOT_URL_RE.find(page).map(|m| m.as_str().to_string())
}

/// Front box art on TheGamesDB's CDN.
pub fn thegamesdb_cover_url(id: &str) -> String {
    format!("https://cdn.thegamesdb.net/images/original/boxart/front/{id}-1.jpg")
}

/// Look directly inside `dir` for an image named after the game.
///
/// Candidates are tried in order: id, icon name, display name. Stems are
/// compared case-insensitively. A missing directory is not an error.
pub fn find_local_cover(dir: &Path, game: &GameRecord) -> io::Result<Option<PathBuf>> {
    if dir.as_os_str().is_empty() || !dir.is_dir() {
        return Ok(None);
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let (Some(stem), Some(ext)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        if COVER_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
        {
            images.push((stem.to_lowercase(), path.to_path_buf()));
        }
    }

    let candidates = [game.id.as_str(), game.icon_name(), game.display_name()];
    Ok(candidates
        .iter()
        .map(|candidate| candidate.trim().to_lowercase())
        .filter(|candidate| !candidate.is_empty())
        .find_map(|candidate| {
            images
                .iter()
                .find(|(stem, _)| *stem == candidate)
                .map(|(_, path)| path.clone())
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SEARCH_PAGE: &str = r#"
        <div class="result">
          <a href="/game/1/the-dig/"><img src="https://cdn.mobygames.com/covers/4112-the-dig-dos-front-cover.jpg" alt=""></a>
          <img src='https://cdn.mobygames.com/screenshots/77-the-dig-dos-screenshot.png'>
          <img src="https://cdn.mobygames.com/covers/9999-other.webp">
        </div>"#;

    #[test]
    fn extracts_first_matching_links() {
        assert_eq!(
            first_cover_url(SEARCH_PAGE).as_deref(),
            Some("https://cdn.mobygames.com/covers/4112-the-dig-dos-front-cover.jpg")
        );
        assert_eq!(
            first_screenshot_url(SEARCH_PAGE).as_deref(),
            Some("https://cdn.mobygames.com/screenshots/77-the-dig-dos-screenshot.png")
        );
        assert_eq!(first_cover_url("<html>no results</html>"), None);
        assert_eq!(
            first_cover_url("https://cdn.mobygames.com/covers/readme.txt"),
            None
        );
    }

    #[test]
    fn thegamesdb_url_uses_game_id() {
        assert_eq!(
            thegamesdb_cover_url("monkey2"),
            "https://cdn.thegamesdb.net/images/original/boxart/front/monkey2-1.jpg"
        );
    }

    #[test]
    fn local_lookup_prefers_id_then_icon_then_name() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("the secret of monkey island.PNG"), b"x")?;
        fs::write(dir.path().join("monkey1.jpg"), b"x")?;
        fs::write(dir.path().join("notes.txt"), b"x")?;
        fs::create_dir_all(dir.path().join("nested"))?;
        fs::write(dir.path().join("nested").join("monkey.png"), b"x")?;

        let mut game = GameRecord::new("monkey", "The Secret of Monkey Island");
        game.icon_name = "monkey1".to_string();
        assert_eq!(
            find_local_cover(dir.path(), &game)?,
            Some(dir.path().join("monkey1.jpg"))
        );

        game.icon_name.clear();
        assert_eq!(
            find_local_cover(dir.path(), &game)?,
            Some(dir.path().join("the secret of monkey island.PNG"))
        );

        let other = GameRecord::new("loom", "Loom");
        assert_eq!(find_local_cover(dir.path(), &other)?, None);
        assert_eq!(find_local_cover(&dir.path().join("missing"), &other)?, None);
        Ok(())
    }
}
