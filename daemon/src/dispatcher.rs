//! Best-effort audio playback by shelling out to an OS player.
//!
//! Windows goes through PowerShell's `Media.SoundPlayer`, macOS through
//! `afplay`, and Linux through a prioritised list of command-line players.
//! Playback runs on a detached tokio task; no error ever reaches the caller.
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::category::SoundCategory;
use crate::config::{PlayerConfig, PATH_PLACEHOLDER};

/// Anything that can turn a category into sound. The controller only sees
/// this trait, which keeps it free of process spawning.
pub trait SoundOutput {
    fn play(&self, category: SoundCategory);
}

#[derive(Debug, Error)]
pub enum PlayError {
    #[error("sound file not found: {}", .0.display())]
    AssetMissing(PathBuf),
    #[error("no audio player succeeded (tried: {})", .tried.join(", "))]
    NoPlayerSucceeded { tried: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

/// One concrete player invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PlayerCommand {
    fn new(program: &str, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.to_string(),
            args: args.into_iter().collect(),
        }
    }
}

/// Built-in Linux players, in priority order: PulseAudio, mpg123, ffplay.
pub fn default_linux_players() -> Vec<PlayerConfig> {
    let player = |program: &str, args: &[&str]| PlayerConfig {
        program: program.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
    };
    vec![
        player("paplay", &[PATH_PLACEHOLDER]),
        player("mpg123", &["-q", PATH_PLACEHOLDER]),
        player("ffplay", &["-nodisp", "-autoexit", PATH_PLACEHOLDER]),
    ]
}

/// Windows lacks native compressed playback, so it gets the `.wav` variant.
pub fn asset_file_name(category: SoundCategory, platform: Platform) -> String {
    let ext = match platform {
        Platform::Windows => "wav",
        Platform::MacOs | Platform::Linux => "mp3",
    };
    format!("{}.{ext}", category.asset_stem())
}

/// Resolves the ordered list of player invocations for `path`.
///
/// `linux_players` is only consulted on Linux; an empty list means the
/// built-in defaults.
pub fn player_candidates(
    platform: Platform,
    path: &Path,
    linux_players: &[PlayerConfig],
) -> Vec<PlayerCommand> {
    let path_str = path.to_string_lossy();
    match platform {
        Platform::Windows => {
            let script = format!(
                "(New-Object Media.SoundPlayer '{}').PlaySync()",
                path_str.replace('\'', "''")
            );
            vec![PlayerCommand::new("powershell", ["-c".to_string(), script])]
        }
        Platform::MacOs => vec![PlayerCommand::new("afplay", [path_str.into_owned()])],
        Platform::Linux => {
            let defaults;
            let players = if linux_players.is_empty() {
                defaults = default_linux_players();
                &defaults[..]
            } else {
                linux_players
            };
            players
                .iter()
                .map(|p| {
                    PlayerCommand::new(
                        &p.program,
                        p.args.iter().map(|a| a.replace(PATH_PLACEHOLDER, &path_str)),
                    )
                })
                .collect()
        }
    }
}

/// Runs each candidate in turn until one exits successfully. A candidate
/// that cannot be spawned or exits nonzero hands over to the next.
/// Returns the program that played the sound.
pub async fn play_with_fallback(candidates: &[PlayerCommand]) -> Result<String, PlayError> {
    let total = candidates.len();
    for (i, candidate) in candidates.iter().enumerate() {
        debug!(player = %candidate.program, attempt = i + 1, total, "trying audio player");

        let status = Command::new(&candidate.program)
            .args(&candidate.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(s) if s.success() => return Ok(candidate.program.clone()),
            Ok(s) => {
                warn!(player = %candidate.program, status = %s, "audio player failed, falling back");
            }
            Err(e) => {
                warn!(player = %candidate.program, error = %e, "audio player unavailable, falling back");
            }
        }
    }

    Err(PlayError::NoPlayerSucceeded {
        tried: candidates.iter().map(|c| c.program.clone()).collect(),
    })
}

/// The production [`SoundOutput`]: resolves assets under `sounds_dir` and plays
/// them with the platform's player chain.
#[derive(Debug, Clone)]
pub struct AudioDispatcher {
    sounds_dir: PathBuf,
    platform: Platform,
    linux_players: Vec<PlayerConfig>,
}

impl AudioDispatcher {
    pub fn new(sounds_dir: PathBuf, linux_players: Vec<PlayerConfig>) -> Self {
        Self {
            sounds_dir,
            platform: Platform::current(),
            linux_players,
        }
    }

    pub fn set_players(&mut self, linux_players: Vec<PlayerConfig>) {
        self.linux_players = linux_players;
    }

    pub fn sound_path(&self, category: SoundCategory) -> PathBuf {
        self.sounds_dir.join(asset_file_name(category, self.platform))
    }

    /// Resolves the invocation chain for `category`, or reports a missing asset.
    pub fn resolve(&self, category: SoundCategory) -> Result<Vec<PlayerCommand>, PlayError> {
        let path = self.sound_path(category);
        if !path.is_file() {
            return Err(PlayError::AssetMissing(path));
        }
        Ok(player_candidates(self.platform, &path, &self.linux_players))
    }

    /// Logs the contents of the sounds directory once at startup.
    pub fn check_assets(&self) {
        match std::fs::read_dir(&self.sounds_dir) {
            Ok(entries) => {
                let names: Vec<String> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                debug!(dir = %self.sounds_dir.display(), files = ?names, "sounds directory found");
                for category in SoundCategory::ALL {
                    let path = self.sound_path(category);
                    if !path.is_file() {
                        warn!(?category, path = %path.display(), "sound asset missing");
                    }
                }
            }
            Err(e) => {
                error!(dir = %self.sounds_dir.display(), error = %e, "sounds directory unavailable");
            }
        }
    }
}

impl SoundOutput for AudioDispatcher {
    fn play(&self, category: SoundCategory) {
        let candidates = match self.resolve(category) {
            Ok(c) => c,
            Err(e) => {
                warn!(?category, error = %e, "skipping sound");
                return;
            }
        };

        tokio::spawn(async move {
            match play_with_fallback(&candidates).await {
                Ok(player) => info!(?category, %player, "sound played"),
                Err(e) => error!(?category, error = %e, "sound dropped"),
            }
        });
    }
}
