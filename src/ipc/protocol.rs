//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::binding::{
    clamp_interval, interval_from_f64, parse_interval, TargetButton, DEFAULT_INTERVAL_MS,
};
use crate::events::ControllerEvent;
use crate::state::BindingsSnapshot;

/// Largest frame accepted from a client
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Interval as the UI sends it: a number (a slider may send fractions), or
/// raw text from an input field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalInput {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl IntervalInput {
    /// Resolve to milliseconds. Numbers round and clamp, non-finite numbers
    /// and unparsable text fall back to the default interval.
    pub fn resolve(&self) -> i64 {
        match self {
            IntervalInput::Millis(ms) => clamp_interval(*ms) as i64,
            IntervalInput::Fractional(ms) => {
                interval_from_f64(*ms).unwrap_or(DEFAULT_INTERVAL_MS) as i64
            }
            IntervalInput::Text(text) => parse_interval(text) as i64,
        }
    }
}

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request the current binding table
    GetBindings,

    /// Capture the next trigger for a target
    RequestListen { target: TargetButton },

    /// Unbind a target's trigger
    ClearTrigger { target: TargetButton },

    /// Change a target's click interval
    SetInterval {
        target: TargetButton,
        interval: IntervalInput,
    },

    /// Subscribe to binding and event notifications
    Subscribe,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current binding table
    Bindings { snapshot: BindingsSnapshot },

    /// Command queued for the controller
    Accepted,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// The binding table changed
    BindingsChanged { snapshot: BindingsSnapshot },
    /// Controller event occurred
    Event { event: ControllerEvent },
}
