//! Decides whether a finished terminal command deserves a sound.
//!
//! Only commands that are worth waiting on (builds, tests, interpreters,
//! mutating git operations) produce a cue. Instant read-only commands stay
//! quiet, and anything unrecognised stays quiet too.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::category::SoundCategory;

/// Exit code the shell reports when the command itself could not be found.
pub const COMMAND_NOT_FOUND_EXIT_CODE: i64 = 127;

/// Commands that never trigger a sound. Matched against the trimmed,
/// lowercased command line either exactly or as `<entry> <args...>`.
pub const SILENT_COMMANDS: &[&str] = &[
    // Directory navigation and listing
    "ls", "ll", "la", "l", "cd", "pwd",
    // Screen / output utilities
    "clear", "cls", "cat", "echo",
    // Pagers
    "less", "more",
    // System info
    "which", "whoami", "history", "man", "help",
    // Git read-only sub-commands
    "git status", "git log", "git diff", "git branch", "git fetch", "git stash",
    // Editors
    "code", "nano", "vim", "nvim",
    "npx", "rm", "mkdir", "rmdir",
];

/// Long-running build, test and run commands.
const BUILD_PHRASES: &[&str] = &[
    "npm run build",
    "npm run dev",
    "npm run start",
    "npm test",
    "npm run test",
    "yarn build",
    "yarn test",
    "make",
    "cargo build",
    "cargo test",
    "go build",
    "go test",
    "python",
    "python3",
    "node",
    "flutter build",
    "gradle build",
    "mvn package",
    "docker build",
];

/// Git sub-commands that mutate branch or remote state.
const GIT_PHRASES: &[&str] = &["git push", "git commit", "git merge", "git rebase"];

static ALLOWLIST: Lazy<Vec<Regex>> = Lazy::new(|| {
    BUILD_PHRASES
        .iter()
        .chain(GIT_PHRASES)
        .filter_map(|phrase| phrase_pattern(phrase))
        .collect()
});

/// Builds a case-insensitive pattern that matches `phrase` as whole words.
///
/// Words are separated by any run of whitespace. The phrase must not be glued
/// to a word character, `.` or `-` on either side, so `make_backup.sh` and
/// `make.sh` do not count as `make`.
fn phrase_pattern(phrase: &str) -> Option<Regex> {
    let body = phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let pattern = format!(r"(?i)(?:^|[^\w.\-]){body}(?:$|[^\w.\-])");
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(%pattern, error = %e, "invalid allowlist pattern");
            None
        }
    }
}

/// Outcome of classifying one finished terminal command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandVerdict {
    /// Nothing worth announcing.
    Silent,
    /// A recognised build or mutating git command exited 0.
    Success,
    /// A recognised command failed, the command was not found, or an
    /// unreported command exited nonzero.
    Failure,
    /// The host could not report an exit code; there is no signal at all.
    Unclassified,
}

impl CommandVerdict {
    /// The sound this verdict asks for, if any.
    pub fn category(self) -> Option<SoundCategory> {
        match self {
            CommandVerdict::Success => Some(SoundCategory::Success),
            CommandVerdict::Failure => Some(SoundCategory::Failure),
            CommandVerdict::Silent | CommandVerdict::Unclassified => None,
        }
    }
}

/// Classifies a finished command.
///
/// `command_line` is empty when the terminal has no shell integration and
/// could not report what ran; `exit_code` is `None` when the exit status is
/// unknown.
pub fn classify(command_line: &str, exit_code: Option<i64>) -> CommandVerdict {
    let Some(code) = exit_code else {
        return CommandVerdict::Unclassified;
    };

    let cmd = command_line.trim().to_lowercase();

    if cmd.is_empty() {
        // Without the command text a clean exit is indistinguishable from a no-op.
        return if code == 0 {
            CommandVerdict::Silent
        } else {
            CommandVerdict::Failure
        };
    }

    if code == COMMAND_NOT_FOUND_EXIT_CODE {
        return CommandVerdict::Failure;
    }

    if is_silent(&cmd) {
        return CommandVerdict::Silent;
    }

    if is_allowlisted(&cmd) {
        return if code == 0 {
            CommandVerdict::Success
        } else {
            CommandVerdict::Failure
        };
    }

    CommandVerdict::Silent
}

/// `cmd` must already be trimmed and lowercased.
fn is_silent(cmd: &str) -> bool {
    SILENT_COMMANDS.iter().any(|entry| {
        cmd == *entry
            || cmd
                .strip_prefix(entry)
                .is_some_and(|rest| rest.starts_with(' '))
    })
}

fn is_allowlisted(cmd: &str) -> bool {
    ALLOWLIST.iter().any(|re| re.is_match(cmd))
}
