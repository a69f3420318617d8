//! Hotkey module for global input capture
//!
//! Uses macOS CGEventTap to observe key-down and auxiliary mouse-down
//! events and exposes them as a feed of normalized [`Trigger`]s.
//!
//! [`Trigger`]: crate::binding::Trigger

mod feed;
pub mod keys;
mod listener;
mod scripted;

pub use feed::{InputSource, TriggerFeed, FEED_CAPACITY};
pub use keys::{is_cancel, key_name, key_trigger, CANCEL_KEY_CODE};
pub use listener::{HotkeyError, HotkeyListener};
pub use scripted::ScriptedSource;
