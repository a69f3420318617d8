//! Subscription plumbing shared by every trigger source
//!
//! A source installs its hook lazily on the first `subscribe()` and keeps
//! it alive for as long as any [`TriggerFeed`] exists. When the last feed
//! is dropped the hook's teardown runs, exactly once.

use std::sync::{Arc, Mutex, Weak};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::binding::Trigger;

use super::HotkeyError;

/// Buffered triggers per subscriber before it starts lagging
pub const FEED_CAPACITY: usize = 64;

/// Teardown callback run when the last subscriber leaves
pub type Teardown = Box<dyn FnOnce() + Send>;

/// A source of normalized triggers
pub trait InputSource: Send + Sync {
    /// Subscribe to the trigger feed, installing the hook if needed.
    ///
    /// Never fails: if the hook cannot be installed the returned feed is
    /// unavailable and yields nothing.
    fn subscribe(&self) -> TriggerFeed;
}

/// An installed hook. Dropping the last reference tears it down.
pub(crate) struct HookHandle {
    sender: broadcast::Sender<Trigger>,
    teardown: Mutex<Option<Teardown>>,
}

impl Drop for HookHandle {
    fn drop(&mut self) {
        let teardown = match self.teardown.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(teardown) = teardown {
            debug!("last trigger subscriber left, tearing down hook");
            teardown();
        }
    }
}

/// Holds the currently installed hook, if any, without keeping it alive
#[derive(Default)]
pub(crate) struct HookSlot {
    current: Mutex<Weak<HookHandle>>,
}

impl HookSlot {
    /// Join the live hook, or install a new one with `install`
    pub(crate) fn subscribe_with<F>(&self, install: F) -> TriggerFeed
    where
        F: FnOnce(broadcast::Sender<Trigger>) -> Result<Teardown, HotkeyError>,
    {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = current.upgrade() {
            return TriggerFeed::attached(handle);
        }

        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        match install(sender.clone()) {
            Ok(teardown) => {
                let handle = Arc::new(HookHandle {
                    sender,
                    teardown: Mutex::new(Some(teardown)),
                });
                *current = Arc::downgrade(&handle);
                TriggerFeed::attached(handle)
            }
            Err(e) => {
                warn!(?e, "trigger capture unavailable");
                TriggerFeed::unavailable()
            }
        }
    }

    /// Sender of the live hook, if one is installed
    pub(crate) fn sender(&self) -> Option<broadcast::Sender<Trigger>> {
        let current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        current.upgrade().map(|handle| handle.sender.clone())
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.sender().is_some()
    }
}

/// A push feed of captured triggers
pub struct TriggerFeed {
    rx: Option<broadcast::Receiver<Trigger>>,
    _hook: Option<Arc<HookHandle>>,
}

impl TriggerFeed {
    fn attached(hook: Arc<HookHandle>) -> Self {
        Self {
            rx: Some(hook.sender.subscribe()),
            _hook: Some(hook),
        }
    }

    /// A feed that never yields, used when capture could not be installed
    pub fn unavailable() -> Self {
        Self {
            rx: None,
            _hook: None,
        }
    }

    /// Whether the underlying hook is installed
    pub fn is_available(&self) -> bool {
        self.rx.is_some()
    }

    /// Wait for the next trigger. Returns `None` once the feed is closed or
    /// if it was never available.
    pub async fn next(&mut self) -> Option<Trigger> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(trigger) => return Some(trigger),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "trigger feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl std::fmt::Debug for TriggerFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerFeed")
            .field("available", &self.is_available())
            .finish()
    }
}
