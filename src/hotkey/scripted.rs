//! Scripted trigger source for tests and headless runs
//!
//! Behaves like the real listener (lazy install, shared hook, teardown on
//! last unsubscribe) but triggers are pushed by the caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::binding::Trigger;

use super::feed::{HookSlot, InputSource, TriggerFeed};
use super::HotkeyError;

#[derive(Default)]
struct Counters {
    installs: AtomicUsize,
    teardowns: AtomicUsize,
}

/// Trigger source driven by [`ScriptedSource::emit`]
#[derive(Default)]
pub struct ScriptedSource {
    slot: HookSlot,
    counters: Arc<Counters>,
    deny_install: bool,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose hook installation always fails, like a denied permission
    pub fn denied() -> Self {
        Self {
            deny_install: true,
            ..Self::default()
        }
    }

    /// Push a trigger to every subscriber. Returns how many received it.
    pub fn emit(&self, trigger: Trigger) -> usize {
        self.slot
            .sender()
            .and_then(|sender| sender.send(trigger).ok())
            .unwrap_or(0)
    }

    pub fn installs(&self) -> usize {
        self.counters.installs.load(Ordering::SeqCst)
    }

    pub fn teardowns(&self) -> usize {
        self.counters.teardowns.load(Ordering::SeqCst)
    }

    pub fn is_installed(&self) -> bool {
        self.slot.is_installed()
    }
}

impl InputSource for ScriptedSource {
    fn subscribe(&self) -> TriggerFeed {
        let counters = Arc::clone(&self.counters);
        let deny = self.deny_install;
        self.slot.subscribe_with(move |_sender| {
            if deny {
                return Err(HotkeyError::EventTapCreation);
            }
            counters.installs.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(move || {
                counters.teardowns.fetch_add(1, Ordering::SeqCst);
            }))
        })
    }
}
