use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

use crate::config::{Config, FocusConfig};
use crate::event::DaemonEvent;

/// Tracks how long the user has been working and decides when a
/// "take a break" reminder is due.
///
/// Session age is measured from activation and is never reset by activity;
/// activity only resets idle time.
#[derive(Debug)]
pub struct FocusMonitor {
    thresholds: FocusConfig,
    activation: Instant,
    last_activity: Instant,
    last_alert: Option<Instant>,
}

impl FocusMonitor {
    pub fn new(thresholds: FocusConfig, activation: Instant) -> Self {
        Self {
            thresholds,
            activation,
            last_activity: activation,
            last_alert: None,
        }
    }

    /// Marks user activity (editor switch, selection change).
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now.max(self.activation);
    }

    /// Returns true and records the alert if a reminder is due at `now`.
    ///
    /// Due means: the session is at least `min_session` old, the user was
    /// active within `activity_window`, and no reminder went out within
    /// `alert_cooldown`.
    pub fn check(&mut self, now: Instant) -> bool {
        let session = now.saturating_duration_since(self.activation);
        let idle = now.saturating_duration_since(self.last_activity);
        let cooled_down = match self.last_alert {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.thresholds.alert_cooldown(),
        };

        let due = session >= self.thresholds.min_session()
            && idle < self.thresholds.activity_window()
            && cooled_down;

        tracing::debug!(
            session_min = session.as_secs() / 60,
            idle_min = idle.as_secs() / 60,
            due,
            "focus check"
        );

        if due {
            self.last_alert = Some(now);
        }
        due
    }

    pub fn set_thresholds(&mut self, thresholds: FocusConfig) {
        self.thresholds = thresholds;
    }

    #[cfg(test)]
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }
}

/// Posts [`DaemonEvent::FocusTick`] every `check_interval`. The period is
/// read once at start; the loop ends when the event loop goes away.
pub async fn run(config: Arc<RwLock<Config>>, tx: mpsc::Sender<DaemonEvent>) {
    let period = config.read().await.focus.check_interval();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; a session is never due at activation.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if tx.send(DaemonEvent::FocusTick).await.is_err() {
            break;
        }
    }
}
