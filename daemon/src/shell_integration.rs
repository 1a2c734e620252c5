//! Optional fish shell integration.
//!
//! The editor's terminal only reports command lines when its shell integration
//! script is loaded. bash/zsh/pwsh get it automatically; fish needs a line in
//! `config.fish`. When the user's shell is fish and that line is missing, the
//! daemon asks the user (via a [`HostMessage::Confirm`]) and appends it only
//! after an explicit yes.
//!
//! Nothing here is required: without integration the classifier just falls
//! back to exit-code-only behaviour.
//!
//! [`HostMessage::Confirm`]: crate::protocol::HostMessage::Confirm
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Identifier of the confirmation request sent to the host.
pub const CONFIRM_ID: &str = "fish-shell-integration";

const MARKER: &str = "# sound-alerts: editor shell integration";

const SNIPPET: &str =
    r#"string match -q "$TERM_PROGRAM" "vscode"; and . (code --locate-shell-integration-path fish)"#;

pub const OFFER_MESSAGE: &str = "Sound alerts can tell which terminal command finished only with \
     shell integration. Add the editor's fish integration to config.fish?";

/// True if `shell` (the value of `$SHELL`) names fish.
pub fn is_fish(shell: &str) -> bool {
    Path::new(shell.trim())
        .file_name()
        .is_some_and(|name| name == "fish")
}

/// `<config dir>/fish/config.fish`, if a config dir can be determined.
pub fn fish_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fish").join("config.fish"))
}

/// True if the snippet marker is already present in `rc_path`.
pub fn is_installed(rc_path: &Path) -> bool {
    std::fs::read_to_string(rc_path)
        .map(|content| content.contains(MARKER))
        .unwrap_or(false)
}

/// Whether the daemon should offer to install the snippet.
pub fn needs_offer(shell: Option<&str>, rc_path: &Path) -> bool {
    shell.is_some_and(is_fish) && !is_installed(rc_path)
}

/// Appends the integration snippet to `rc_path`, creating the file and its
/// parent directory if needed. Idempotent: does nothing if already present.
pub fn install(rc_path: &Path) -> Result<()> {
    if is_installed(rc_path) {
        return Ok(());
    }
    if let Some(parent) = rc_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let needs_leading_newline = std::fs::read_to_string(rc_path)
        .map(|c| !c.is_empty() && !c.ends_with('\n'))
        .unwrap_or(false);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(rc_path)
        .with_context(|| format!("Failed to open {}", rc_path.display()))?;

    let mut block = String::new();
    if needs_leading_newline {
        block.push('\n');
    }
    block.push_str(&format!("\n{MARKER}\n{SNIPPET}\n"));

    file.write_all(block.as_bytes())
        .with_context(|| format!("Failed to write {}", rc_path.display()))?;
    tracing::info!(path = %rc_path.display(), "fish shell integration installed");
    Ok(())
}
