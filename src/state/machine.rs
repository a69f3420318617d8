//! Auto-click controller
//!
//! Owns the live binding table and is the only code that mutates it.
//! Captured triggers and UI commands are processed one at a time on a
//! single task, so Listening/Armed/Active transitions never race.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::binding::{clamp_interval, BindingSetting, TargetButton, Trigger};
use crate::clicker::ClickEmitter;
use crate::events::ControllerEvent;
use crate::hotkey::{is_cancel, TriggerFeed};
use crate::store::BindingStore;

use super::click_loop::ClickLoop;

/// The four states a target can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    /// No trigger bound
    Idle,
    /// Waiting to capture the next trigger
    Listening,
    /// Trigger bound, not clicking
    Armed,
    /// Trigger bound and clicking
    Active,
}

impl TargetState {
    pub fn of(setting: &BindingSetting) -> Self {
        if setting.is_listening {
            TargetState::Listening
        } else if setting.is_active {
            TargetState::Active
        } else if setting.trigger.is_some() {
            TargetState::Armed
        } else {
            TargetState::Idle
        }
    }
}

impl std::fmt::Display for TargetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetState::Idle => write!(f, "Idle"),
            TargetState::Listening => write!(f, "Listening"),
            TargetState::Armed => write!(f, "Armed"),
            TargetState::Active => write!(f, "Active"),
        }
    }
}

/// Edits relayed from the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Capture the next trigger for a target
    RequestListen(TargetButton),
    /// Unbind a target's trigger
    ClearTrigger(TargetButton),
    /// Change a target's interval; out-of-range values are clamped
    SetInterval(TargetButton, i64),
}

/// What the UI renders: the full binding table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingsSnapshot {
    /// One entry per target, in fixed target order
    pub bindings: Vec<BindingSetting>,
    /// False when the global input hook could not be installed
    pub capture_available: bool,
}

/// The controller that binds triggers and drives click loops
pub struct AutoClickController {
    settings: Vec<BindingSetting>,
    loops: Vec<ClickLoop>,
    store: BindingStore,
    emitter: Arc<dyn ClickEmitter>,
    capture_available: bool,
    snapshot_tx: watch::Sender<BindingsSnapshot>,
    event_tx: broadcast::Sender<ControllerEvent>,
}

impl AutoClickController {
    /// Build a controller from whatever the store holds
    pub async fn load(
        store: BindingStore,
        emitter: Arc<dyn ClickEmitter>,
        event_tx: broadcast::Sender<ControllerEvent>,
    ) -> Self {
        let settings = store.load_all().await;
        let loops = settings
            .iter()
            .map(|setting| ClickLoop::new(setting.target, setting.interval_ms))
            .collect();

        let (snapshot_tx, _) = watch::channel(BindingsSnapshot {
            bindings: settings.clone(),
            capture_available: true,
        });

        for setting in &settings {
            debug!(
                target = %setting.target,
                trigger = ?setting.trigger,
                interval_ms = setting.interval_ms,
                "binding loaded"
            );
        }

        Self {
            settings,
            loops,
            store,
            emitter,
            capture_available: true,
            snapshot_tx,
            event_tx,
        }
    }

    /// Receive a new snapshot every time the binding table changes
    pub fn subscribe_snapshots(&self) -> watch::Receiver<BindingsSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> BindingsSnapshot {
        BindingsSnapshot {
            bindings: self.settings.clone(),
            capture_available: self.capture_available,
        }
    }

    pub fn settings(&self) -> &[BindingSetting] {
        &self.settings
    }

    pub fn setting(&self, target: TargetButton) -> &BindingSetting {
        &self.settings[target.index()]
    }

    pub fn state_of(&self, target: TargetButton) -> TargetState {
        TargetState::of(self.setting(target))
    }

    pub fn is_clicking(&self, target: TargetButton) -> bool {
        self.loops[target.index()].is_running()
    }

    /// Run the controller, processing triggers and commands until the
    /// command channel closes
    pub async fn run(mut self, mut feed: TriggerFeed, mut commands: mpsc::Receiver<Command>) {
        let mut feed_open = feed.is_available();
        if !feed_open {
            self.mark_capture_unavailable();
        }

        info!(capture_available = feed_open, "controller started");

        loop {
            tokio::select! {
                trigger = feed.next(), if feed_open => match trigger {
                    Some(trigger) => self.handle_trigger(trigger).await,
                    None => {
                        warn!("trigger feed closed");
                        feed_open = false;
                        self.mark_capture_unavailable();
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
            }
        }

        self.stop_all();
        info!("controller stopped");
    }

    /// Apply one UI command
    pub async fn handle_command(&mut self, command: Command) {
        debug!(?command, "handling command");
        match command {
            Command::RequestListen(target) => self.request_listen(target),
            Command::ClearTrigger(target) => self.clear_trigger(target).await,
            Command::SetInterval(target, ms) => self.set_interval(target, ms).await,
        }
    }

    /// Process one captured trigger
    pub async fn handle_trigger(&mut self, trigger: Trigger) {
        debug!(%trigger, "trigger received");

        if is_cancel(&trigger) {
            self.cancel_listening();
            return;
        }

        // First listening target in fixed order consumes the trigger
        if let Some(index) = self.settings.iter().position(|s| s.is_listening) {
            self.capture(TargetButton::ALL[index], trigger).await;
            return;
        }

        let matching: Vec<TargetButton> = self
            .settings
            .iter()
            .filter(|s| s.trigger.as_ref() == Some(&trigger))
            .map(|s| s.target)
            .collect();

        if matching.is_empty() {
            return;
        }

        for target in matching {
            self.toggle(target);
        }
        self.publish();
    }

    /// Put a target into capture mode, stopping its clicks first
    pub fn request_listen(&mut self, target: TargetButton) {
        let before = self.state_of(target);
        self.deactivate(target);
        self.settings[target.index()].is_listening = true;

        self.log_transition(target, before);
        self.emit(ControllerEvent::ListeningStarted { target });
        self.publish();
    }

    /// Unbind a target's trigger and persist the change
    pub async fn clear_trigger(&mut self, target: TargetButton) {
        let before = self.state_of(target);
        self.deactivate(target);

        let setting = &mut self.settings[target.index()];
        setting.is_listening = false;
        setting.trigger = None;

        self.log_transition(target, before);
        self.emit(ControllerEvent::TriggerCleared { target });
        self.publish();

        if let Err(e) = self.store.set_trigger(target, None).await {
            error!(%target, ?e, "failed to persist cleared trigger");
        }
    }

    /// Change a target's interval, clamped into range, and persist it
    pub async fn set_interval(&mut self, target: TargetButton, ms: i64) {
        let interval_ms = clamp_interval(ms);
        self.settings[target.index()].interval_ms = interval_ms;
        self.loops[target.index()].set_interval(interval_ms);

        info!(%target, interval_ms, "interval changed");
        self.emit(ControllerEvent::IntervalChanged {
            target,
            interval_ms,
        });
        self.publish();

        if let Err(e) = self.store.set_interval(target, ms).await {
            error!(%target, ?e, "failed to persist interval");
        }
    }

    /// Stop every click loop
    pub fn stop_all(&mut self) {
        for target in TargetButton::ALL {
            self.deactivate(target);
        }
        self.publish();
    }

    fn cancel_listening(&mut self) {
        let mut cancelled = false;
        for setting in &mut self.settings {
            cancelled |= setting.is_listening;
            setting.is_listening = false;
        }

        if cancelled {
            info!("hotkey capture cancelled");
            self.emit(ControllerEvent::ListeningCancelled);
            self.publish();
        }
    }

    async fn capture(&mut self, target: TargetButton, trigger: Trigger) {
        let setting = &mut self.settings[target.index()];
        setting.trigger = Some(trigger.clone());
        setting.is_listening = false;

        info!(%target, %trigger, label = %trigger.label(), "trigger captured");
        self.log_transition(target, TargetState::Listening);
        self.emit(ControllerEvent::TriggerCaptured {
            target,
            trigger: trigger.clone(),
        });
        self.publish();

        if let Err(e) = self.store.set_trigger(target, Some(&trigger)).await {
            error!(%target, ?e, "failed to persist captured trigger");
        }
    }

    fn toggle(&mut self, target: TargetButton) {
        if self.settings[target.index()].is_active {
            self.deactivate(target);
        } else {
            self.activate(target);
        }
    }

    fn activate(&mut self, target: TargetButton) {
        let before = self.state_of(target);
        let setting = &mut self.settings[target.index()];
        setting.is_active = true;
        let interval_ms = setting.interval_ms;

        let epoch = self.loops[target.index()].start(Arc::clone(&self.emitter));

        debug!(%target, epoch, "click loop started");
        self.log_transition(target, before);
        self.emit(ControllerEvent::ClickingStarted {
            target,
            interval_ms,
        });
    }

    fn deactivate(&mut self, target: TargetButton) {
        if !self.settings[target.index()].is_active {
            return;
        }

        let before = self.state_of(target);
        self.settings[target.index()].is_active = false;
        let duration_ms = self.loops[target.index()]
            .stop()
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        self.log_transition(target, before);
        self.emit(ControllerEvent::ClickingStopped {
            target,
            duration_ms,
        });
    }

    fn mark_capture_unavailable(&mut self) {
        if !self.capture_available {
            return;
        }
        warn!("global input capture unavailable - check Accessibility permissions");
        self.capture_available = false;
        self.emit(ControllerEvent::CaptureUnavailable);
        self.publish();
    }

    fn log_transition(&self, target: TargetButton, before: TargetState) {
        let after = self.state_of(target);
        if before != after {
            info!(%target, from = %before, to = %after, "target transition");
        }
    }

    fn emit(&self, event: ControllerEvent) {
        debug!(?event, "emitting controller event");
        let _ = self.event_tx.send(event);
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

/// Cloneable handle the UI side uses to reach a running controller
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<BindingsSnapshot>,
}

/// The controller task has exited
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("controller is no longer running")]
pub struct ControllerClosed;

impl ControllerHandle {
    pub fn new(commands: mpsc::Sender<Command>, snapshots: watch::Receiver<BindingsSnapshot>) -> Self {
        Self {
            commands,
            snapshots,
        }
    }

    pub async fn send(&self, command: Command) -> Result<(), ControllerClosed> {
        self.commands.send(command).await.map_err(|_| ControllerClosed)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> BindingsSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Independent receiver for snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<BindingsSnapshot> {
        self.snapshots.clone()
    }
}
