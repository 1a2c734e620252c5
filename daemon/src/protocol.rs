//! Wire format between the editor-side bridge and the daemon.
//!
//! The bridge writes one JSON [`EditorEvent`] per line to our stdin and reads
//! one JSON [`HostMessage`] per line from our stdout. Logs never go to stdout.
use serde::{Deserialize, Serialize};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::category::SoundCategory;
use crate::diagnostics::FileDiagnostics;
use crate::event::DaemonEvent;

/// Events forwarded from the editor, plus the user-invoked commands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EditorEvent {
    /// A task process ended. `exit_code` is absent when the host could not tell.
    /// Exit codes are `i64` because Windows reports crashes as unsigned 32-bit
    /// values (0xC0000005 and friends).
    TaskEnded {
        name: String,
        exit_code: Option<i64>,
    },
    /// A shell command finished in an integrated terminal. `command_line` is
    /// absent or empty when shell integration could not report it.
    TerminalCommandEnded {
        #[serde(default)]
        command_line: Option<String>,
        exit_code: Option<i64>,
    },
    DebugSessionTerminated {
        name: String,
        exit_code: Option<i64>,
    },
    /// Some file's diagnostics changed; `files` is the host's full current state.
    DiagnosticsChanged {
        #[serde(default)]
        files: Vec<FileDiagnostics>,
    },
    ActiveEditorChanged,
    SelectionChanged,
    /// "Toggle sound alerts" command. With a category, toggles only that one.
    Toggle {
        #[serde(default)]
        category: Option<SoundCategory>,
    },
    /// The user's answer to a [`HostMessage::Confirm`] about shell integration.
    ShellIntegrationReply { accepted: bool },
}

/// Messages for the editor to show the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostMessage {
    Info {
        message: String,
        timestamp: String,
    },
    Error {
        message: String,
        timestamp: String,
    },
    /// Ask the user a yes/no question; the answer comes back as an event.
    Confirm {
        id: String,
        message: String,
        timestamp: String,
    },
}

impl HostMessage {
    pub fn info(message: impl Into<String>) -> Self {
        HostMessage::Info {
            message: message.into(),
            timestamp: now_rfc3339(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        HostMessage::Error {
            message: message.into(),
            timestamp: now_rfc3339(),
        }
    }

    pub fn confirm(id: impl Into<String>, message: impl Into<String>) -> Self {
        HostMessage::Confirm {
            id: id.into(),
            message: message.into(),
            timestamp: now_rfc3339(),
        }
    }

    #[cfg(test)]
    pub fn message(&self) -> &str {
        match self {
            HostMessage::Info { message, .. }
            | HostMessage::Error { message, .. }
            | HostMessage::Confirm { message, .. } => message,
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Local::now().to_rfc3339()
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<EditorEvent>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// Reads editor events line by line and forwards them to the event loop.
/// Malformed lines, including ones that are not valid UTF-8, are logged and
/// skipped. End of input means the editor has gone away, so a
/// [`DaemonEvent::Shutdown`] is sent; so does an I/O error on the stream.
pub async fn read_events<R>(mut reader: R, tx: mpsc::Sender<DaemonEvent>)
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                info!("editor closed the event stream");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "failed to read event stream");
                break;
            }
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                let lossy = String::from_utf8_lossy(&buf);
                warn!(error = %e, line = %lossy.trim_end(), "ignoring non-UTF-8 event line");
                continue;
            }
        };

        match parse_line(line) {
            Ok(Some(event)) => {
                debug!(?event, "editor event");
                if tx.send(DaemonEvent::Editor(event)).await.is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, line = %line.trim_end(), "ignoring malformed event"),
        }
    }
    let _ = tx.send(DaemonEvent::Shutdown).await;
}

/// Line-oriented JSON writer for [`HostMessage`]s.
///
/// Writes block the calling task. Only toggles and prompts produce messages,
/// one short line each.
pub struct HostSink {
    out: Box<dyn Write + Send>,
}

impl HostSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Writes one message. Failures are logged; the host may simply be gone.
    pub fn send(&mut self, message: &HostMessage) {
        let line = match serde_json::to_string(message) {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "failed to serialize host message");
                return;
            }
        };
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            warn!(error = %e, "failed to write host message");
        }
    }
}
