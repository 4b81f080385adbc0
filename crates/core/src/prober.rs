//! Ask the ScummVM executable which games are configured.

use std::{io::ErrorKind, process::Stdio, time::Duration};

use anyhow::anyhow;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{models::GameRecord, outcome::Outcome};

/// Lines printed by `--list-targets` before the first target.
const HEADER_LINES: usize = 2;

/// Run `<executable> --list-targets` and turn its output into records.
///
/// A missing executable or a non-zero exit is `Unavailable`; a timeout or
/// I/O error is `Failed`. Either way callers treat it as "nothing
/// installed".
pub async fn detect_installed(executable: &str, timeout: Duration) -> Outcome<Vec<GameRecord>> {
    let outcome = capture(executable, &["--list-targets"], timeout)
        .await
        .map(|stdout| parse_target_list(&stdout));
    if let Outcome::Ready(games) = &outcome {
        info!(count = games.len(), "installed targets detected");
    }
    outcome
}

/// Run `<executable> --version` and return the line naming the product.
pub async fn scummvm_version(executable: &str, timeout: Duration) -> Outcome<String> {
    match capture(executable, &["--version"], timeout).await {
        Outcome::Ready(stdout) => stdout
            .lines()
            .map(str::trim)
            .find(|line| line.contains("ScummVM"))
            .map(|line| Outcome::Ready(line.to_string()))
            .unwrap_or(Outcome::Unavailable),
        Outcome::Unavailable => Outcome::Unavailable,
        Outcome::Failed(err) => Outcome::Failed(err),
    }
}

/// Parse `--list-targets` output.
///
/// The first two lines are a header. Every following line is
/// `<id> <description...>`; lines with fewer than two tokens are skipped.
pub fn parse_target_list(output: &str) -> Vec<GameRecord> {
    output
        .trim()
        .lines()
        .skip(HEADER_LINES)
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let id = tokens.next()?;
            let name = tokens.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return None;
            }
            Some(GameRecord {
                installed: true,
                ..GameRecord::new(id, name)
            })
        })
        .collect()
}

async fn capture(program: &str, args: &[&str], timeout: Duration) -> Outcome<String> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Err(_) => {
            return Outcome::Failed(anyhow!(
                "{program} {} timed out after {timeout:?}",
                args.join(" ")
            ))
        }
        Ok(Err(err)) if err.kind() == ErrorKind::NotFound => {
            debug!(program, "executable not found");
            return Outcome::Unavailable;
        }
        Ok(Err(err)) => {
            return Outcome::Failed(
                anyhow::Error::new(err).context(format!("failed to execute {program}")),
            )
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        debug!(
            program,
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "command exited unsuccessfully"
        );
        return Outcome::Unavailable;
    }

    Outcome::Ready(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Target               Description
-------------------- ------------------------------------------------------------
monkey               The Secret of Monkey Island (CD/DOS/English)
sky                  Beneath a Steel Sky   (Floppy)
lonely
";

    #[test]
    fn parses_targets_after_header() {
        let games = parse_target_list(LISTING);
        let ids: Vec<_> = games.iter().map(|game| game.id.as_str()).collect();
        assert_eq!(ids, vec!["monkey", "sky"]);
        assert_eq!(
            games[0].name,
            "The Secret of Monkey Island (CD/DOS/English)"
        );
        assert_eq!(games[1].name, "Beneath a Steel Sky (Floppy)");
        assert!(games.iter().all(|game| game.installed));
    }

    #[test]
    fn header_only_output_is_empty() {
        assert!(parse_target_list("Target Description\n---- ----\n").is_empty());
        assert!(parse_target_list("").is_empty());
    }

    #[tokio::test]
    async fn missing_executable_is_unavailable() {
        let outcome =
            detect_installed("/nonexistent/scummvm-binary", Duration::from_secs(1)).await;
        assert!(matches!(outcome, Outcome::Unavailable));
        assert!(outcome.unwrap_or_default().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_and_rejects_failures() {
        let script = "printf 'Target Description\\n------ -----\\ndig The Dig\\n'";
        let outcome = capture("sh", &["-c", script], Duration::from_secs(5)).await;
        let Outcome::Ready(stdout) = outcome else {
            panic!("expected output");
        };
        let games = parse_target_list(&stdout);
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].name, "The Dig");

        let failed = capture("sh", &["-c", "exit 3"], Duration::from_secs(5)).await;
        assert!(matches!(failed, Outcome::Unavailable));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_degrades_to_failure() {
        let outcome = capture("sleep", &["5"], Duration::from_millis(100)).await;
        assert!(matches!(outcome, Outcome::Failed(_)));
    }
}
