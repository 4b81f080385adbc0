//! Start games through ScummVM and record how long they ran.

use std::{
    io,
    process::{ExitStatus, Stdio},
};

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{info, warn};

use crate::{
    library::{GameState, LibraryStore},
    settings::{LaunchMode, Settings},
};

/// What the child process gets for stdin/stdout/stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStdio {
    /// Share the launcher's terminal.
    Inherit,
    /// Detach; used while a full-screen terminal UI owns the tty.
    Null,
}

impl ChildStdio {
    fn stdio(self) -> Stdio {
        match self {
            ChildStdio::Inherit => Stdio::inherit(),
            ChildStdio::Null => Stdio::null(),
        }
    }
}

/// Everything needed to start one game.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Target id passed to ScummVM.
    pub game_id: String,
    /// Executable to run.
    pub executable: String,
    /// Arguments, ending with the game id.
    pub args: Vec<String>,
    /// Child stdio handling.
    pub stdio: ChildStdio,
}

impl LaunchRequest {
    /// Build `<scummvm_path> [--fullscreen] <id>` from the user's settings.
    pub fn from_settings(settings: &Settings, game_id: &str, stdio: ChildStdio) -> Self {
        let mut args = Vec::new();
        if settings.launch_mode == LaunchMode::Fullscreen {
            args.push("--fullscreen".to_string());
        }
        args.push(game_id.to_string());
        Self {
            game_id: game_id.to_string(),
            executable: settings.scummvm_path.clone(),
            args,
            stdio,
        }
    }
}

/// Result of a finished play session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayReport {
    /// Game that was played.
    pub game_id: String,
    /// Whether ScummVM exited successfully.
    pub exit_ok: bool,
    /// Library state after the session was recorded.
    pub state: GameState,
}

/// Start the game, wait for it to exit and record the session.
///
/// The start is recorded only once the process has spawned, so a missing
/// executable leaves the library untouched and returns an error.
pub async fn play(store: &LibraryStore, request: &LaunchRequest) -> Result<PlayReport> {
    let mut child = Command::new(&request.executable)
        .args(&request.args)
        .stdin(request.stdio.stdio())
        .stdout(request.stdio.stdio())
        .stderr(request.stdio.stdio())
        .spawn()
        .with_context(|| format!("failed to launch {}", request.executable))?;

    info!(game_id = %request.game_id, args = ?request.args, "game launched");
    if let Err(err) = store.record_play_start(&request.game_id) {
        warn!(?err, game_id = %request.game_id, "failed to record play start");
    }

    let waited = child.wait().await;
    finish_session(store, &request.game_id, waited)
}

/// Close the session opened by [`play`], even when waiting on the child
/// failed, so no `play_start` is left behind.
fn finish_session(
    store: &LibraryStore,
    game_id: &str,
    waited: io::Result<ExitStatus>,
) -> Result<PlayReport> {
    let recorded = store.record_play_end(game_id);
    let status = waited.with_context(|| format!("failed to wait for {game_id}"))?;
    recorded.context("failed to record play end")?;
    info!(game_id, %status, "game exited");

    Ok(PlayReport {
        game_id: game_id.to_string(),
        exit_ok: status.success(),
        state: store.state(game_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn arguments_follow_launch_mode() {
        let mut settings = Settings::default();
        let request = LaunchRequest::from_settings(&settings, "dig", ChildStdio::Null);
        assert_eq!(request.executable, "scummvm");
        assert_eq!(request.args, vec!["--fullscreen", "dig"]);

        settings.launch_mode = LaunchMode::Windowed;
        settings.scummvm_path = "/opt/scummvm/bin/scummvm".to_string();
        let request = LaunchRequest::from_settings(&settings, "dig", ChildStdio::Inherit);
        assert_eq!(request.executable, "/opt/scummvm/bin/scummvm");
        assert_eq!(request.args, vec!["dig"]);
    }

    #[tokio::test]
    async fn missing_executable_records_nothing() -> Result<()> {
        let dir = tempdir()?;
        let store = LibraryStore::new(dir.path().join("library.json"));
        let request = LaunchRequest {
            game_id: "dig".to_string(),
            executable: "/nonexistent/scummvm".to_string(),
            args: vec!["dig".to_string()],
            stdio: ChildStdio::Null,
        };

        assert!(play(&store, &request).await.is_err());
        assert_eq!(store.state("dig"), GameState::default());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn finished_session_updates_library() -> Result<()> {
        let dir = tempdir()?;
        let store = LibraryStore::new(dir.path().join("library.json"));
        let request = LaunchRequest {
            game_id: "dig".to_string(),
            executable: "true".to_string(),
            args: vec!["dig".to_string()],
            stdio: ChildStdio::Null,
        };

        let report = play(&store, &request).await?;
        assert!(report.exit_ok);
        assert!(report.state.last_played > 0);
        assert_eq!(report.state.play_start, None);
        Ok(())
    }

    #[test]
    fn failed_wait_still_closes_the_session() -> Result<()> {
        let dir = tempdir()?;
        let store = LibraryStore::new(dir.path().join("library.json"));
        store.record_play_start("dig")?;
        assert!(store.state("dig").play_start.is_some());

        let waited = Err(io::Error::new(io::ErrorKind::Other, "wait interrupted"));
        let err = finish_session(&store, "dig", waited).unwrap_err();
        assert!(err.to_string().contains("failed to wait for dig"));

        let state = LibraryStore::new(dir.path().join("library.json")).state("dig");
        assert_eq!(state.play_start, None);
        assert!(state.last_played > 0);
        Ok(())
    }
}
