//! Binding data model
//!
//! Triggers, click targets and the per-target binding setting that the
//! controller mutates and the store persists.

mod setting;
mod trigger;

pub use setting::{
    clamp_interval, interval_from_f64, parse_interval, BindingSetting, TargetButton,
    UnknownTarget, DEFAULT_INTERVAL_MS, MAX_INTERVAL_MS, MIN_INTERVAL_MS,
};
pub use trigger::{encode_optional, ParseTriggerError, Trigger};
