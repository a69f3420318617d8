//! autoclicker: toggle repeating mouse clicks from global hotkeys
//!
//! A trigger (keyboard key or auxiliary mouse button) is bound to one of
//! two targets, primary (left button) or secondary (right button).
//! Pressing the trigger starts or stops clicking that target at its
//! configured interval.
//!
//! # Modules
//! - `binding`: triggers, targets and per-target settings
//! - `hotkey`: global key-down / mouse-down capture as a trigger feed
//! - `clicker`: synthetic click injection
//! - `store`: durable binding records
//! - `state`: the controller state machine and click loops
//! - `events`: controller events
//! - `ipc`: Unix socket surface for the settings UI
//! - `config`, `lifecycle`: daemon plumbing

pub mod binding;
pub mod clicker;
pub mod config;
pub mod events;
pub mod hotkey;
pub mod ipc;
pub mod lifecycle;
pub mod state;
pub mod store;

pub use binding::{BindingSetting, TargetButton, Trigger};
pub use state::{AutoClickController, BindingsSnapshot, Command, ControllerHandle};
pub use store::BindingStore;
