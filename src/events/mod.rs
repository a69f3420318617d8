//! Events module for controller transitions
//!
//! Structured events emitted whenever a binding is captured, cleared or
//! edited, and whenever a click loop starts or stops.

use serde::{Deserialize, Serialize};

use crate::binding::{TargetButton, Trigger};

/// Events emitted by the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// Target is waiting for its next trigger
    ListeningStarted { target: TargetButton },

    /// A trigger was captured and bound to a target
    TriggerCaptured {
        target: TargetButton,
        trigger: Trigger,
    },

    /// The cancel key stopped capture on every target
    ListeningCancelled,

    /// A target's trigger was removed
    TriggerCleared { target: TargetButton },

    /// A target's interval was changed
    IntervalChanged {
        target: TargetButton,
        interval_ms: u64,
    },

    /// Repeating clicks started for a target
    ClickingStarted {
        target: TargetButton,
        interval_ms: u64,
    },

    /// Repeating clicks stopped for a target
    ClickingStopped {
        target: TargetButton,
        /// Duration in milliseconds the loop was active
        duration_ms: u64,
    },

    /// The global input hook could not be installed
    CaptureUnavailable,
}

impl std::fmt::Display for ControllerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerEvent::ListeningStarted { target } => write!(f, "LISTENING_STARTED {target}"),
            ControllerEvent::TriggerCaptured { target, trigger } => {
                write!(f, "TRIGGER_CAPTURED {target} <- {trigger}")
            }
            ControllerEvent::ListeningCancelled => write!(f, "LISTENING_CANCELLED"),
            ControllerEvent::TriggerCleared { target } => write!(f, "TRIGGER_CLEARED {target}"),
            ControllerEvent::IntervalChanged {
                target,
                interval_ms,
            } => write!(f, "INTERVAL_CHANGED {target} ({interval_ms}ms)"),
            ControllerEvent::ClickingStarted {
                target,
                interval_ms,
            } => write!(f, "CLICKING_STARTED {target} every {interval_ms}ms"),
            ControllerEvent::ClickingStopped {
                target,
                duration_ms,
            } => write!(f, "CLICKING_STOPPED {target} ({duration_ms}ms)"),
            ControllerEvent::CaptureUnavailable => write!(f, "CAPTURE_UNAVAILABLE"),
        }
    }
}
