//! Repeating click task for one target
//!
//! Each activation spawns a task tagged with a fresh epoch. The task
//! sleeps for the current interval, then clicks only if its epoch is still
//! the live one. Stopping bumps the epoch, so a stale task exits at its
//! next wake-up without clicking and at most one task ever clicks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::debug;

use crate::binding::TargetButton;
use crate::clicker::ClickEmitter;

pub(crate) struct ClickLoop {
    target: TargetButton,
    epoch: Arc<AtomicU64>,
    interval_ms: Arc<AtomicU64>,
    started_at: Option<Instant>,
    task: Option<JoinHandle<()>>,
}

impl ClickLoop {
    pub fn new(target: TargetButton, interval_ms: u64) -> Self {
        Self {
            target,
            epoch: Arc::new(AtomicU64::new(0)),
            interval_ms: Arc::new(AtomicU64::new(interval_ms)),
            started_at: None,
            task: None,
        }
    }

    /// Change the interval. A running task picks it up at its next wait.
    pub fn set_interval(&self, interval_ms: u64) {
        self.interval_ms.store(interval_ms, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Start a new activation, superseding any previous one
    pub fn start(&mut self, emitter: Arc<dyn ClickEmitter>) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let target = self.target;
        let live_epoch = Arc::clone(&self.epoch);
        let interval_ms = Arc::clone(&self.interval_ms);

        self.started_at = Some(Instant::now());
        self.task = Some(tokio::spawn(async move {
            let mut clicks: u64 = 0;
            loop {
                let wait = Duration::from_millis(interval_ms.load(Ordering::SeqCst));
                tokio::time::sleep(wait).await;

                if live_epoch.load(Ordering::SeqCst) != epoch {
                    break;
                }
                emitter.click(target);
                clicks += 1;
            }
            debug!(%target, epoch, clicks, "click loop exited");
        }));

        epoch
    }

    /// End the current activation. Returns how long it ran, or `None` if
    /// nothing was running.
    pub fn stop(&mut self) -> Option<Duration> {
        // Cooperative: the task sees the new epoch when its sleep ends
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.task = None;
        self.started_at.take().map(|started| started.elapsed())
    }
}

impl Drop for ClickLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clicker::RecordingClicker;

    #[tokio::test(start_paused = true)]
    async fn test_loop_clicks_every_interval() {
        let clicker = Arc::new(RecordingClicker::new());
        let mut click_loop = ClickLoop::new(TargetButton::Primary, 10);

        click_loop.start(clicker.clone());
        tokio::time::sleep(Duration::from_millis(55)).await;
        assert_eq!(clicker.count(TargetButton::Primary), 5);

        assert!(click_loop.stop().is_some());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(clicker.count(TargetButton::Primary), 5);
        assert_eq!(clicker.count(TargetButton::Secondary), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_supersedes_previous_task() {
        let clicker = Arc::new(RecordingClicker::new());
        let mut click_loop = ClickLoop::new(TargetButton::Secondary, 10);

        let first = click_loop.start(clicker.clone());
        click_loop.stop();
        let second = click_loop.start(clicker.clone());
        assert!(second > first);

        tokio::time::sleep(Duration::from_millis(105)).await;
        assert_eq!(clicker.count(TargetButton::Secondary), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_applies_to_running_loop() {
        let clicker = Arc::new(RecordingClicker::new());
        let mut click_loop = ClickLoop::new(TargetButton::Primary, 10);

        click_loop.start(clicker.clone());
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(clicker.count(TargetButton::Primary), 2);

        // The sleep already in flight finishes at 30ms, then 100ms waits
        click_loop.set_interval(100);
        tokio::time::sleep(Duration::from_millis(110)).await;
        assert_eq!(clicker.count(TargetButton::Primary), 4);
    }

    #[test]
    fn test_stop_without_start() {
        let mut click_loop = ClickLoop::new(TargetButton::Primary, 10);
        assert!(!click_loop.is_running());
        assert!(click_loop.stop().is_none());
    }
}
