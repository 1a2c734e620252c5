use crate::config::Config;
use crate::protocol::EditorEvent;

pub enum DaemonEvent {
    /// An event or command forwarded from the editor.
    Editor(EditorEvent),
    /// The diagnostics debounce timer with this generation elapsed.
    DiagnosticsSettled(u64),
    /// Periodic focus check.
    FocusTick,
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded(Config),
    /// Ctrl+C received or the editor closed stdin; cancel timers and exit.
    Shutdown,
}
