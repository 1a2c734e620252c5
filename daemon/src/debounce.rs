use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::DaemonEvent;

/// Cancel-and-reschedule timer for diagnostics re-evaluation.
///
/// Every [`schedule`](Debouncer::schedule) aborts the pending timer and starts
/// a new one tagged with a fresh generation. The event loop only acts on a
/// [`DaemonEvent::DiagnosticsSettled`] whose generation is still current, so a
/// timer that raced its own cancellation can never apply stale state.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    /// Restarts the quiet period. Returns the generation of the new timer.
    pub fn schedule(&mut self, tx: &mpsc::Sender<DaemonEvent>) -> u64 {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let delay = self.delay;
        let tx = tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(DaemonEvent::DiagnosticsSettled(generation)).await;
        }));
        generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Marks `generation` as consumed so a duplicate delivery is ignored.
    pub fn settle(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) || self.pending.is_none() {
            return false;
        }
        self.pending = None;
        true
    }

    /// Drops the pending timer, if any. Used on every reschedule and at shutdown.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Applies a new delay to timers scheduled from now on.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settled(evt: DaemonEvent) -> u64 {
        match evt {
            DaemonEvent::DiagnosticsSettled(g) => g,
            _ => panic!("unexpected event"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_quiet_period() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut d = Debouncer::new(Duration::from_secs(3));
        let g = d.schedule(&tx);

        let start = tokio::time::Instant::now();
        let got = settled(rx.recv().await.unwrap());
        assert_eq!(got, g);
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(d.settle(got));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_one_evaluation() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut d = Debouncer::new(Duration::from_secs(3));

        d.schedule(&tx);
        tokio::time::sleep(Duration::from_secs(1)).await;
        d.schedule(&tx);
        tokio::time::sleep(Duration::from_secs(2)).await;
        let last = d.schedule(&tx);

        let got = settled(rx.recv().await.unwrap());
        assert_eq!(got, last);
        assert!(d.settle(got));

        // Nothing else was left pending.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_is_rejected() {
        let (tx, _rx) = mpsc::channel(8);
        let mut d = Debouncer::new(Duration::from_secs(3));
        let first = d.schedule(&tx);
        let second = d.schedule(&tx);
        assert!(!d.is_current(first));
        assert!(!d.settle(first));
        assert!(d.settle(second));
        assert!(!d.settle(second), "duplicate settle must be ignored");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_delivery() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut d = Debouncer::new(Duration::from_secs(3));
        d.schedule(&tx);
        d.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
