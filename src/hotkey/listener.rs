//! Global trigger listener using macOS CGEventTap
//!
//! Observes key-down and auxiliary mouse-down events system wide in
//! listen-only mode, so the captured events still reach their destination
//! untouched. Runs on a dedicated thread with its own CFRunLoop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::binding::Trigger;

use super::feed::{HookSlot, InputSource, Teardown, TriggerFeed};

/// How long `subscribe()` waits for the listener thread to report the tap
const INSTALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Run loop slice between checks of the running flag
#[cfg(target_os = "macos")]
const RUN_LOOP_SLICE: Duration = Duration::from_millis(100);

/// Global hotkey listener feeding captured triggers to subscribers
#[derive(Default)]
pub struct HotkeyListener {
    slot: HookSlot,
}

impl HotkeyListener {
    /// Create a listener. Nothing is installed until the first subscribe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the event tap is currently installed
    pub fn is_running(&self) -> bool {
        self.slot.is_installed()
    }
}

impl InputSource for HotkeyListener {
    fn subscribe(&self) -> TriggerFeed {
        self.slot.subscribe_with(install_tap)
    }
}

/// Errors that can occur in the hotkey listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to attach event tap to the run loop")]
    RunLoopSource,

    #[error("global event capture is not supported on this platform")]
    Unsupported,

    #[error("listener thread did not report within {0:?}")]
    InstallTimeout(Duration),

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),
}

/// Spawn the listener thread and wait until the tap is live
fn install_tap(sender: broadcast::Sender<Trigger>) -> Result<Teardown, HotkeyError> {
    let running = Arc::new(AtomicBool::new(true));
    let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);

    let thread_running = Arc::clone(&running);
    let thread = thread::Builder::new()
        .name("hotkey-listener".to_string())
        .spawn(move || {
            info!("hotkey listener thread started");
            run_event_loop(sender, thread_running, ready_tx);
            info!("hotkey listener thread stopped");
        })
        .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

    let outcome = ready_rx
        .recv_timeout(INSTALL_TIMEOUT)
        .unwrap_or(Err(HotkeyError::InstallTimeout(INSTALL_TIMEOUT)));

    if let Err(e) = outcome {
        running.store(false, Ordering::SeqCst);
        let _ = thread.join();
        return Err(e);
    }

    Ok(Box::new(move || {
        running.store(false, Ordering::SeqCst);
        join_listener(thread);
    }))
}

/// Wait for the listener thread to exit. The run loop notices the cleared
/// flag within one slice; inside a tokio runtime that wait moves to the
/// blocking pool so the async worker dropping the last feed is not stalled.
fn join_listener(thread: JoinHandle<()>) {
    let join = move || {
        if thread.join().is_err() {
            error!("hotkey listener thread panicked");
        }
    };

    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(join);
        }
        Err(_) => join(),
    }
}

/// Run the CFRunLoop with the event tap until `running` is cleared
#[cfg(target_os = "macos")]
fn run_event_loop(
    sender: broadcast::Sender<Trigger>,
    running: Arc<AtomicBool>,
    ready: std_mpsc::SyncSender<Result<(), HotkeyError>>,
) {
    use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
    use core_graphics::event::{
        CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
        CGEventTapProxy, CGEventType, EventField,
    };
    use tracing::warn;

    use super::keys::key_trigger;

    // CGEventTap callback - must be fast and non-blocking
    let callback = move |_proxy: CGEventTapProxy,
                         event_type: CGEventType,
                         event: &CGEvent|
                         -> Option<CGEvent> {
        let trigger = match event_type {
            CGEventType::KeyDown => Some(key_trigger(
                event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE),
            )),
            CGEventType::OtherMouseDown => Some(Trigger::mouse(
                event.get_integer_value_field(EventField::MOUSE_EVENT_BUTTON_NUMBER),
            )),
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                warn!("event tap disabled by the system, triggers may be missed");
                None
            }
            _ => None,
        };

        if let Some(trigger) = trigger {
            // No receivers just means nobody is listening right now
            let _ = sender.send(trigger);
        }

        Some(event.clone())
    };

    let tap = match CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown, CGEventType::OtherMouseDown],
        callback,
    ) {
        Ok(tap) => tap,
        Err(()) => {
            error!("failed to create event tap - is Accessibility permission granted?");
            let _ = ready.send(Err(HotkeyError::EventTapCreation));
            return;
        }
    };

    let run_loop_source = match tap.mach_port.create_runloop_source(0) {
        Ok(source) => source,
        Err(()) => {
            let _ = ready.send(Err(HotkeyError::RunLoopSource));
            return;
        }
    };

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }
    tap.enable();

    info!("event tap created and enabled");
    let _ = ready.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, RUN_LOOP_SLICE, true);
        }
    }

    unsafe {
        run_loop.remove_source(&run_loop_source, kCFRunLoopCommonModes);
    }
    // Dropping the tap releases its mach port
    drop(tap);
    info!("event tap removed");
}

#[cfg(not(target_os = "macos"))]
fn run_event_loop(
    _sender: broadcast::Sender<Trigger>,
    _running: Arc<AtomicBool>,
    ready: std_mpsc::SyncSender<Result<(), HotkeyError>>,
) {
    let _ = ready.send(Err(HotkeyError::Unsupported));
}
