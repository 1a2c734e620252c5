mod alerts;
mod category;
mod classifier;
mod config;
mod cooldown;
mod debounce;
mod diagnostics;
mod dispatcher;
mod event;
mod focus;
mod paths;
mod protocol;
mod shell_integration;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::BufReader;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::alerts::{AlertController, Followup};
use crate::debounce::Debouncer;
use crate::dispatcher::AudioDispatcher;
use crate::protocol::{HostMessage, HostSink};

/// Plays short audio cues for editor build, terminal, debug, diagnostics and focus events.
///
/// Editor events arrive as JSON lines on stdin; user-facing messages leave as
/// JSON lines on stdout. Logs go to stderr (`RUST_LOG` controls verbosity).
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file to use instead of the per-user default.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding the sound assets.
    #[arg(long)]
    sounds_dir: Option<PathBuf>,
    /// Skip the confirmation chime at startup.
    #[arg(long)]
    no_startup_sound: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = cli.config.clone().unwrap_or_else(paths::config_file_path);
    let initial_config = config::load_or_default(&config_path).unwrap_or_else(|e| {
        error!(error = %format!("{e:#}"), "config error, using defaults");
        config::Config::default()
    });
    let shared_config = Arc::new(RwLock::new(initial_config.clone()));

    // ── Controller ────────────────────────────────────────────────────────────
    let sounds_dir = paths::resolve_sounds_dir(
        cli.sounds_dir.as_deref(),
        initial_config.sounds.dir.as_deref(),
    );
    let dispatcher = AudioDispatcher::new(sounds_dir, initial_config.players.clone());
    let mut controller = AlertController::new(&initial_config, dispatcher, Instant::now());
    controller.output().check_assets();

    let mut host = HostSink::stdout();
    let mut debouncer = Debouncer::new(initial_config.diagnostics.debounce());

    let (event_tx, mut event_rx) = mpsc::channel::<event::DaemonEvent>(64);

    // ── Background tasks ──────────────────────────────────────────────────────
    let config_watch = tokio::spawn(config::watch_config(config_path, event_tx.clone()));
    let focus_ticker = tokio::spawn(focus::run(Arc::clone(&shared_config), event_tx.clone()));
    let reader = tokio::spawn(protocol::read_events(
        BufReader::new(tokio::io::stdin()),
        event_tx.clone(),
    ));

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(event::DaemonEvent::Shutdown).await;
            }
        });
    }

    info!(version = env!("CARGO_PKG_VERSION"), "sound alerts activated");

    if initial_config.sounds.startup_sound && !cli.no_startup_sound {
        controller.play_startup();
    }

    // ── Shell integration offer ───────────────────────────────────────────────
    let fish_rc = shell_integration::fish_config_path();
    if initial_config.shell_integration.offer {
        let shell = std::env::var("SHELL").ok();
        if let Some(rc) = &fish_rc {
            if shell_integration::needs_offer(shell.as_deref(), rc) {
                host.send(&HostMessage::confirm(
                    shell_integration::CONFIRM_ID,
                    shell_integration::OFFER_MESSAGE,
                ));
            }
        }
    }

    // ── Event loop ────────────────────────────────────────────────────────────
    while let Some(evt) = event_rx.recv().await {
        let now = Instant::now();
        match evt {
            event::DaemonEvent::Editor(editor_event) => {
                match controller.handle(editor_event, now) {
                    Followup::None => {}
                    Followup::Reply(message) => host.send(&message),
                    Followup::DebounceDiagnostics => {
                        debouncer.schedule(&event_tx);
                    }
                    Followup::ShellIntegration { accepted } => {
                        handle_shell_integration_reply(accepted, fish_rc.as_deref(), &mut host);
                    }
                }
            }

            event::DaemonEvent::DiagnosticsSettled(generation) => {
                // A superseded timer may still deliver; only the latest counts.
                if debouncer.settle(generation) {
                    controller.diagnostics_settled(now);
                }
            }

            event::DaemonEvent::FocusTick => {
                controller.focus_tick(now);
            }

            event::DaemonEvent::ConfigReloaded(new_config) => {
                info!("config reloaded");
                controller.apply_config(&new_config);
                controller.output_mut().set_players(new_config.players.clone());
                debouncer.set_delay(new_config.diagnostics.debounce());
                *shared_config.write().await = new_config;
            }

            event::DaemonEvent::Shutdown => {
                info!("shutting down");
                break;
            }
        }
    }

    // Cancel every timer so nothing fires after teardown.
    debouncer.cancel();
    focus_ticker.abort();
    config_watch.abort();
    reader.abort();

    // The stdin reader may be parked in a blocking read that abort cannot
    // interrupt; exit explicitly rather than waiting on it.
    std::process::exit(0);
}

fn handle_shell_integration_reply(
    accepted: bool,
    rc_path: Option<&std::path::Path>,
    host: &mut HostSink,
) {
    if !accepted {
        info!("shell integration declined");
        return;
    }
    let Some(rc_path) = rc_path else {
        warn!("no config directory for fish");
        host.send(&HostMessage::error(
            "Could not locate the fish config directory for shell integration.",
        ));
        return;
    };
    match shell_integration::install(rc_path) {
        Ok(()) => host.send(&HostMessage::info(format!(
            "Shell integration added to {}. Restart the terminal to apply.",
            rc_path.display()
        ))),
        Err(e) => {
            error!(error = %format!("{e:#}"), "failed to install shell integration");
            host.send(&HostMessage::error(format!(
                "Failed to add shell integration: {e:#}"
            )));
        }
    }
}
