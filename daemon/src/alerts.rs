//! The controller that turns editor events into sounds.
//!
//! All mutable notification state lives here and is owned by the single event
//! loop: switches, cooldown clocks, the diagnostics edge flag and snapshot, and
//! the focus session. Handlers run to completion one at a time, so every
//! read-modify-write below is atomic with respect to other events.
use std::time::Instant;
use tracing::{debug, info};

use crate::category::{SoundCategory, SoundSwitches};
use crate::classifier::{self, CommandVerdict};
use crate::config::Config;
use crate::cooldown::CooldownGate;
use crate::diagnostics::{DiagnosticsEdge, DiagnosticsSnapshot};
use crate::dispatcher::SoundOutput;
use crate::focus::FocusMonitor;
use crate::protocol::{EditorEvent, HostMessage};

/// What the event loop has to do after the controller handled an event.
#[derive(Debug, PartialEq)]
pub enum Followup {
    None,
    /// Show this message to the user.
    Reply(HostMessage),
    /// Diagnostics changed; restart the debounce timer.
    DebounceDiagnostics,
    /// The user answered the shell integration prompt.
    ShellIntegration { accepted: bool },
}

pub struct AlertController<S: SoundOutput> {
    switches: SoundSwitches,
    gate: CooldownGate,
    edge: DiagnosticsEdge,
    snapshot: DiagnosticsSnapshot,
    focus: FocusMonitor,
    output: S,
}

impl<S: SoundOutput> AlertController<S> {
    pub fn new(config: &Config, output: S, activation: Instant) -> Self {
        Self {
            switches: SoundSwitches::default(),
            gate: CooldownGate::new(config.cooldowns.clone()),
            edge: DiagnosticsEdge::default(),
            snapshot: DiagnosticsSnapshot::default(),
            focus: FocusMonitor::new(config.focus.clone(), activation),
            output,
        }
    }

    pub fn output(&self) -> &S {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut S {
        &mut self.output
    }

    /// Single exit point for every sound: switches, then cooldown, then play.
    /// A disabled category is dropped without touching its cooldown clock.
    pub fn emit(&mut self, category: SoundCategory, now: Instant) -> bool {
        if !self.switches.is_enabled(category) {
            debug!(?category, "sound disabled");
            return false;
        }
        if !self.gate.try_fire(category, now) {
            debug!(?category, "cooldown active");
            return false;
        }
        self.output.play(category);
        true
    }

    /// Plays the success chime once at activation. Bypasses the cooldown
    /// gate so it never delays a real success cue.
    pub fn play_startup(&self) {
        if self.switches.is_enabled(SoundCategory::Success) {
            self.output.play(SoundCategory::Success);
        }
    }

    pub fn handle(&mut self, event: EditorEvent, now: Instant) -> Followup {
        match event {
            EditorEvent::TaskEnded { name, exit_code } => {
                info!(task = %name, ?exit_code, "task ended");
                match exit_code {
                    Some(0) => {
                        self.emit(SoundCategory::Success, now);
                    }
                    Some(_) => {
                        self.emit(SoundCategory::Failure, now);
                    }
                    None => debug!(task = %name, "task exit code unknown"),
                }
                Followup::None
            }

            EditorEvent::TerminalCommandEnded {
                command_line,
                exit_code,
            } => {
                let command = command_line.unwrap_or_default();
                let verdict = classifier::classify(&command, exit_code);
                info!(command = %command, ?exit_code, ?verdict, "terminal command ended");
                if verdict == CommandVerdict::Unclassified {
                    debug!("exit code unknown; shell integration may be off");
                }
                if let Some(category) = verdict.category() {
                    self.emit(category, now);
                }
                Followup::None
            }

            EditorEvent::DebugSessionTerminated { name, exit_code } => {
                info!(session = %name, ?exit_code, "debug session terminated");
                if matches!(exit_code, Some(code) if code != 0) {
                    self.emit(SoundCategory::Failure, now);
                }
                Followup::None
            }

            EditorEvent::DiagnosticsChanged { files } => {
                self.snapshot.replace(files);
                Followup::DebounceDiagnostics
            }

            EditorEvent::ActiveEditorChanged | EditorEvent::SelectionChanged => {
                self.focus.record_activity(now);
                Followup::None
            }

            EditorEvent::Toggle { category } => Followup::Reply(self.toggle(category)),

            EditorEvent::ShellIntegrationReply { accepted } => {
                Followup::ShellIntegration { accepted }
            }
        }
    }

    /// Called when the diagnostics debounce period elapsed. Returns true if
    /// the error cue was played.
    pub fn diagnostics_settled(&mut self, now: Instant) -> bool {
        let has_errors = self.snapshot.has_errors();
        if !self.edge.observe(has_errors) {
            return false;
        }
        let files: Vec<_> = self.snapshot.error_files().map(|p| p.display().to_string()).collect();
        info!(count = files.len(), ?files, "new errors detected");
        self.emit(SoundCategory::Error, now)
    }

    /// Periodic focus check. Returns true if the reminder was played.
    pub fn focus_tick(&mut self, now: Instant) -> bool {
        if !self.focus.check(now) {
            return false;
        }
        info!("long focus session; reminding to take a break");
        self.emit(SoundCategory::FocusReminder, now)
    }

    /// Flips the master switch (`None`) or one category, and describes the new state.
    pub fn toggle(&mut self, category: Option<SoundCategory>) -> HostMessage {
        let message = match category {
            None => {
                let on = self.switches.toggle_all();
                format!("Sound Alerts {}", on_off(on))
            }
            Some(c) => {
                let on = self.switches.toggle(c);
                format!("{} sounds {}", c.label(), on_off(on))
            }
        };
        info!(%message, "toggled");
        HostMessage::info(message)
    }

    /// Applies reloaded tuning. Switches and clocks are kept.
    pub fn apply_config(&mut self, config: &Config) {
        self.gate.set_cooldowns(config.cooldowns.clone());
        self.focus.set_thresholds(config.focus.clone());
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CooldownConfig, FocusConfig};
    use crate::diagnostics::{FileDiagnostics, Severity};
    use crate::protocol::parse_line;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<SoundCategory>>>);

    impl SoundOutput for Recorder {
        fn play(&self, category: SoundCategory) {
            self.0.borrow_mut().push(category);
        }
    }

    impl Recorder {
        fn played(&self) -> Vec<SoundCategory> {
            self.0.borrow().clone()
        }
    }

    const SEC: Duration = Duration::from_secs(1);
    const MIN: Duration = Duration::from_secs(60);

    fn controller() -> (AlertController<Recorder>, Recorder, Instant) {
        let rec = Recorder::default();
        let t0 = Instant::now();
        (AlertController::new(&Config::default(), rec.clone(), t0), rec, t0)
    }

    fn terminal(cmd: &str, code: Option<i64>) -> EditorEvent {
        EditorEvent::TerminalCommandEnded {
            command_line: Some(cmd.to_string()),
            exit_code: code,
        }
    }

    fn diagnostics(errors: bool) -> EditorEvent {
        let severities = if errors {
            vec![Severity::Error]
        } else {
            vec![Severity::Warning]
        };
        EditorEvent::DiagnosticsChanged {
            files: vec![FileDiagnostics {
                path: PathBuf::from("src/lib.rs"),
                severities,
            }],
        }
    }

    // ── tasks / debug ─────────────────────────────────────────────────────────

    #[test]
    fn task_exit_codes_map_to_success_and_failure() {
        let (mut c, rec, t0) = controller();
        let task = |code| EditorEvent::TaskEnded {
            name: "build".to_string(),
            exit_code: code,
        };
        c.handle(task(Some(0)), t0);
        c.handle(task(Some(2)), t0 + SEC);
        c.handle(task(None), t0 + 10 * SEC);
        assert_eq!(rec.played(), vec![SoundCategory::Success, SoundCategory::Failure]);
    }

    #[test]
    fn windows_crash_exit_code_is_a_failure() {
        let (mut c, rec, t0) = controller();
        let event = parse_line(r#"{"event":"task_ended","name":"build","exit_code":3221225477}"#)
            .unwrap()
            .unwrap();
        c.handle(event, t0);
        let event = parse_line(
            r#"{"event":"debug_session_terminated","name":"Launch","exit_code":3221225477}"#,
        )
        .unwrap()
        .unwrap();
        c.handle(event, t0 + 10 * SEC);
        assert_eq!(rec.played(), vec![SoundCategory::Failure, SoundCategory::Failure]);
    }

    #[test]
    fn debug_only_sounds_on_known_nonzero_exit() {
        let (mut c, rec, t0) = controller();
        let session = |code| EditorEvent::DebugSessionTerminated {
            name: "Launch".to_string(),
            exit_code: code,
        };
        c.handle(session(None), t0);
        c.handle(session(Some(0)), t0 + 10 * SEC);
        assert!(rec.played().is_empty());
        c.handle(session(Some(1)), t0 + 20 * SEC);
        assert_eq!(rec.played(), vec![SoundCategory::Failure]);
    }

    // ── terminal ──────────────────────────────────────────────────────────────

    #[test]
    fn terminal_commands_follow_classifier() {
        let (mut c, rec, t0) = controller();
        c.handle(terminal("ls -la", Some(0)), t0);
        c.handle(terminal("git status", Some(0)), t0 + 10 * SEC);
        c.handle(terminal("cargo test", None), t0 + 20 * SEC);
        assert!(rec.played().is_empty());

        c.handle(terminal("cargo test", Some(0)), t0 + 30 * SEC);
        c.handle(terminal("frobnicate", Some(127)), t0 + 40 * SEC);
        assert_eq!(rec.played(), vec![SoundCategory::Success, SoundCategory::Failure]);
    }

    #[test]
    fn missing_command_line_only_reports_failures() {
        let (mut c, rec, t0) = controller();
        let bare = |code| EditorEvent::TerminalCommandEnded {
            command_line: None,
            exit_code: Some(code),
        };
        c.handle(bare(0), t0);
        c.handle(bare(1), t0 + SEC);
        assert_eq!(rec.played(), vec![SoundCategory::Failure]);
    }

    // ── cooldown ──────────────────────────────────────────────────────────────

    #[test]
    fn same_category_inside_cooldown_is_dropped() {
        let (mut c, rec, t0) = controller();
        c.handle(terminal("npm run build", Some(0)), t0);
        // Success is still cooling down; failure has its own clock.
        c.handle(terminal("npm run build", Some(0)), t0 + 2 * SEC);
        c.handle(terminal("npm run build", Some(1)), t0 + 2 * SEC);
        c.handle(terminal("npm run build", Some(1)), t0 + 4 * SEC);
        // Past the 3 s success cooldown.
        c.handle(terminal("npm run build", Some(0)), t0 + 5 * SEC);
        assert_eq!(
            rec.played(),
            vec![
                SoundCategory::Success,
                SoundCategory::Failure,
                SoundCategory::Success
            ]
        );
    }

    // ── switches ──────────────────────────────────────────────────────────────

    #[test]
    fn master_switch_off_silences_everything() {
        let (mut c, rec, t0) = controller();
        let reply = c.handle(EditorEvent::Toggle { category: None }, t0);
        assert_eq!(reply_text(&reply), "Sound Alerts OFF");

        c.handle(terminal("make", Some(0)), t0);
        c.handle(terminal("make", Some(2)), t0);
        c.handle(diagnostics(true), t0);
        assert!(!c.diagnostics_settled(t0 + 3 * SEC));
        c.focus.record_activity(t0 + 60 * MIN);
        assert!(!c.focus_tick(t0 + 61 * MIN));
        c.play_startup();
        assert!(rec.played().is_empty());
    }

    #[test]
    fn disabled_category_does_not_consume_cooldown() {
        let (mut c, rec, t0) = controller();
        c.toggle(Some(SoundCategory::Success));
        c.handle(terminal("cargo build", Some(0)), t0);
        let reply = c.toggle(Some(SoundCategory::Success));
        assert_eq!(reply.message(), "Success sounds ON");
        c.handle(terminal("cargo build", Some(0)), t0 + SEC);
        assert_eq!(rec.played(), vec![SoundCategory::Success]);
    }

    #[test]
    fn category_toggle_leaves_others_enabled() {
        let (mut c, rec, t0) = controller();
        let reply = c.toggle(Some(SoundCategory::Failure));
        assert_eq!(reply.message(), "Failure sounds OFF");
        c.handle(terminal("cargo build", Some(1)), t0);
        c.handle(terminal("cargo build", Some(0)), t0);
        assert_eq!(rec.played(), vec![SoundCategory::Success]);
    }

    // ── diagnostics ───────────────────────────────────────────────────────────

    #[test]
    fn diagnostics_sound_only_on_clean_to_broken() {
        let (mut c, rec, t0) = controller();
        let mut fired = Vec::new();
        for (i, errors) in [false, true, true, false, true].into_iter().enumerate() {
            assert_eq!(c.handle(diagnostics(errors), t0), Followup::DebounceDiagnostics);
            fired.push(c.diagnostics_settled(t0 + (i as u32 + 1) * 10 * SEC));
        }
        assert_eq!(fired, vec![false, true, false, false, true]);
        assert_eq!(rec.played(), vec![SoundCategory::Error, SoundCategory::Error]);
    }

    #[test]
    fn diagnostics_rising_edge_inside_cooldown_is_swallowed() {
        let (mut c, rec, t0) = controller();
        c.handle(diagnostics(true), t0);
        assert!(c.diagnostics_settled(t0));
        c.handle(diagnostics(false), t0);
        c.diagnostics_settled(t0 + SEC);
        c.handle(diagnostics(true), t0);
        // Edge seen, but the 5 s error cooldown still applies.
        assert!(!c.diagnostics_settled(t0 + 2 * SEC));
        assert_eq!(rec.played(), vec![SoundCategory::Error]);
    }

    #[test]
    fn repeated_identical_snapshots_fire_once() {
        let (mut c, rec, t0) = controller();
        for i in 0..5u32 {
            c.handle(diagnostics(true), t0);
            c.diagnostics_settled(t0 + i * 30 * SEC);
        }
        assert_eq!(rec.played(), vec![SoundCategory::Error]);
    }

    // ── focus ─────────────────────────────────────────────────────────────────

    #[test]
    fn focus_reminder_after_an_hour_of_activity() {
        let (mut c, rec, t0) = controller();
        assert!(!c.focus_tick(t0 + 30 * MIN));
        c.handle(EditorEvent::SelectionChanged, t0 + 59 * MIN);
        assert!(c.focus_tick(t0 + 61 * MIN));
        c.handle(EditorEvent::ActiveEditorChanged, t0 + 62 * MIN);
        assert!(!c.focus_tick(t0 + 63 * MIN));
        assert_eq!(rec.played(), vec![SoundCategory::FocusReminder]);
    }

    #[test]
    fn idle_reader_gets_no_focus_reminder() {
        let (mut c, rec, t0) = controller();
        c.handle(EditorEvent::SelectionChanged, t0 + 10 * MIN);
        assert!(!c.focus_tick(t0 + 61 * MIN));
        assert!(rec.played().is_empty());
    }

    // ── misc ──────────────────────────────────────────────────────────────────

    #[test]
    fn startup_chime_bypasses_cooldown() {
        let (mut c, rec, t0) = controller();
        c.play_startup();
        c.handle(terminal("make", Some(0)), t0);
        assert_eq!(rec.played(), vec![SoundCategory::Success, SoundCategory::Success]);
    }

    #[test]
    fn shell_integration_reply_is_passed_through() {
        let (mut c, _rec, t0) = controller();
        assert_eq!(
            c.handle(EditorEvent::ShellIntegrationReply { accepted: true }, t0),
            Followup::ShellIntegration { accepted: true }
        );
    }

    #[test]
    fn reloaded_config_changes_cooldowns_and_focus() {
        let (mut c, rec, t0) = controller();
        let config = Config {
            cooldowns: CooldownConfig {
                failure_ms: 0,
                ..CooldownConfig::default()
            },
            focus: FocusConfig {
                min_session_ms: 0,
                ..FocusConfig::default()
            },
            ..Config::default()
        };
        c.apply_config(&config);
        c.handle(terminal("make", Some(1)), t0);
        c.handle(terminal("make", Some(1)), t0);
        assert!(c.focus_tick(t0 + MIN));
        assert_eq!(
            rec.played(),
            vec![
                SoundCategory::Failure,
                SoundCategory::Failure,
                SoundCategory::FocusReminder
            ]
        );
    }

    fn reply_text(f: &Followup) -> &str {
        match f {
            Followup::Reply(m) => m.message(),
            other => panic!("expected reply, got {other:?}"),
        }
    }
}
