use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::category::SoundCategory;
use crate::event::DaemonEvent;

pub const DEFAULT_SUCCESS_COOLDOWN_MS: u64 = 3_000;
pub const DEFAULT_FAILURE_COOLDOWN_MS: u64 = 3_000;
pub const DEFAULT_ERROR_COOLDOWN_MS: u64 = 5_000;
pub const DEFAULT_FOCUS_COOLDOWN_MS: u64 = 60 * 60_000;

pub const DEFAULT_DEBOUNCE_MS: u64 = 3_000;
pub const MIN_DEBOUNCE_MS: u64 = 100;

pub const DEFAULT_FOCUS_CHECK_INTERVAL_MS: u64 = 60_000;
pub const MIN_FOCUS_CHECK_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_MIN_SESSION_MS: u64 = 60 * 60_000;
pub const DEFAULT_ACTIVITY_WINDOW_MS: u64 = 5 * 60_000;
pub const DEFAULT_FOCUS_ALERT_COOLDOWN_MS: u64 = 60 * 60_000;

/// Placeholder replaced by the absolute sound path in configured player args.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Root configuration structure. Deserialized from `<config dir>/sound-alerts/config.toml`.
///
/// Only tuning lives here. The on/off switches are runtime state and are
/// never read from or written to this file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub sounds: SoundsConfig,
    #[serde(default)]
    pub cooldowns: CooldownConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub focus: FocusConfig,
    #[serde(default)]
    pub shell_integration: ShellIntegrationConfig,
    /// Linux player candidates, tried in order. Empty means the built-in list.
    #[serde(default)]
    pub players: Vec<PlayerConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SoundsConfig {
    /// Directory holding the sound assets. Defaults to `sounds/` next to the binary.
    pub dir: Option<PathBuf>,
    /// Play the success chime once when the daemon starts.
    #[serde(default = "default_true")]
    pub startup_sound: bool,
}

impl Default for SoundsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            startup_sound: true,
        }
    }
}

/// Minimum gap between two plays of the same category, in milliseconds.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CooldownConfig {
    #[serde(default = "default_success_cooldown")]
    pub success_ms: u64,
    #[serde(default = "default_failure_cooldown")]
    pub failure_ms: u64,
    #[serde(default = "default_error_cooldown")]
    pub error_ms: u64,
    #[serde(default = "default_focus_cooldown")]
    pub focus_ms: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            success_ms: DEFAULT_SUCCESS_COOLDOWN_MS,
            failure_ms: DEFAULT_FAILURE_COOLDOWN_MS,
            error_ms: DEFAULT_ERROR_COOLDOWN_MS,
            focus_ms: DEFAULT_FOCUS_COOLDOWN_MS,
        }
    }
}

impl CooldownConfig {
    pub fn for_category(&self, category: SoundCategory) -> Duration {
        let ms = match category {
            SoundCategory::Success => self.success_ms,
            SoundCategory::Failure => self.failure_ms,
            SoundCategory::Error => self.error_ms,
            SoundCategory::FocusReminder => self.focus_ms,
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiagnosticsConfig {
    /// Quiet period after the last diagnostics change before errors are checked.
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl DiagnosticsConfig {
    /// Debounce delay, clamped to at least [`MIN_DEBOUNCE_MS`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.max(MIN_DEBOUNCE_MS))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FocusConfig {
    #[serde(default = "default_focus_check_interval")]
    pub check_interval_ms: u64,
    /// Session age required before a reminder may fire.
    #[serde(default = "default_min_session")]
    pub min_session_ms: u64,
    /// Idle time beyond which the user is treated as away.
    #[serde(default = "default_activity_window")]
    pub activity_window_ms: u64,
    #[serde(default = "default_focus_alert_cooldown")]
    pub alert_cooldown_ms: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: DEFAULT_FOCUS_CHECK_INTERVAL_MS,
            min_session_ms: DEFAULT_MIN_SESSION_MS,
            activity_window_ms: DEFAULT_ACTIVITY_WINDOW_MS,
            alert_cooldown_ms: DEFAULT_FOCUS_ALERT_COOLDOWN_MS,
        }
    }
}

impl FocusConfig {
    /// Tick period, clamped to at least [`MIN_FOCUS_CHECK_INTERVAL_MS`].
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms.max(MIN_FOCUS_CHECK_INTERVAL_MS))
    }

    pub fn min_session(&self) -> Duration {
        Duration::from_millis(self.min_session_ms)
    }

    pub fn activity_window(&self) -> Duration {
        Duration::from_millis(self.activity_window_ms)
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_millis(self.alert_cooldown_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShellIntegrationConfig {
    /// Offer to add the editor's fish integration snippet on startup.
    #[serde(default = "default_true")]
    pub offer: bool,
}

impl Default for ShellIntegrationConfig {
    fn default() -> Self {
        Self { offer: true }
    }
}

/// One external command-line player. `{path}` in `args` is replaced by the sound file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PlayerConfig {
    pub program: String,
    #[serde(default = "default_player_args")]
    pub args: Vec<String>,
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Spawns a file watcher on the parent directory of `path`. Whenever the config
/// file is created or modified, reloads it and sends a `ConfigReloaded` event.
/// A file that fails to parse is logged and the running config is kept.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<DaemonEvent>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            error!(error = %e, "failed to create config watcher");
            return;
        }
    };

    // Watch the parent directory rather than the file directly so we catch
    // editor-style atomic saves (write-new + rename).
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            warn!(path = %path.display(), "config path has no parent directory");
            return;
        }
    };

    if !watch_dir.is_dir() {
        info!(dir = %watch_dir.display(), "config directory absent; hot reload disabled");
        return;
    }

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        error!(error = %e, dir = %watch_dir.display(), "failed to watch config directory");
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );

        if affects_config && is_write {
            match load_or_default(&path) {
                Ok(config) => {
                    if tx.send(DaemonEvent::ConfigReloaded(config)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %format!("{e:#}"), "failed to reload config"),
            }
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_success_cooldown() -> u64 {
    DEFAULT_SUCCESS_COOLDOWN_MS
}

fn default_failure_cooldown() -> u64 {
    DEFAULT_FAILURE_COOLDOWN_MS
}

fn default_error_cooldown() -> u64 {
    DEFAULT_ERROR_COOLDOWN_MS
}

fn default_focus_cooldown() -> u64 {
    DEFAULT_FOCUS_COOLDOWN_MS
}

fn default_debounce() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_focus_check_interval() -> u64 {
    DEFAULT_FOCUS_CHECK_INTERVAL_MS
}

fn default_min_session() -> u64 {
    DEFAULT_MIN_SESSION_MS
}

fn default_activity_window() -> u64 {
    DEFAULT_ACTIVITY_WINDOW_MS
}

fn default_focus_alert_cooldown() -> u64 {
    DEFAULT_FOCUS_ALERT_COOLDOWN_MS
}

fn default_player_args() -> Vec<String> {
    vec![PATH_PLACEHOLDER.to_string()]
}
