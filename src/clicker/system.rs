//! CoreGraphics click injection
//!
//! Posts a mouse-down followed by a mouse-up at the session event tap,
//! at wherever the pointer is when the click fires.

use tracing::debug;

use crate::binding::TargetButton;

use super::{ClickEmitter, ClickError};

/// Clicker backed by the OS input stream
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClicker;

impl SystemClicker {
    pub fn new() -> Self {
        Self
    }
}

impl ClickEmitter for SystemClicker {
    fn click(&self, target: TargetButton) {
        if let Err(e) = post_click(target) {
            debug!(%target, ?e, "synthetic click refused");
        }
    }
}

#[cfg(target_os = "macos")]
fn post_click(target: TargetButton) -> Result<(), ClickError> {
    use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGMouseButton};
    use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

    let (button, down_type, up_type) = match target {
        TargetButton::Primary => (
            CGMouseButton::Left,
            CGEventType::LeftMouseDown,
            CGEventType::LeftMouseUp,
        ),
        TargetButton::Secondary => (
            CGMouseButton::Right,
            CGEventType::RightMouseDown,
            CGEventType::RightMouseUp,
        ),
    };

    let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|_| ClickError::EventSource)?;

    // Read the pointer now, never reuse a position from an earlier click
    let location = CGEvent::new(source.clone())
        .map_err(|_| ClickError::EventCreation("location"))?
        .location();

    let down = CGEvent::new_mouse_event(source.clone(), down_type, location, button)
        .map_err(|_| ClickError::EventCreation("mouse down"))?;
    let up = CGEvent::new_mouse_event(source, up_type, location, button)
        .map_err(|_| ClickError::EventCreation("mouse up"))?;

    down.post(CGEventTapLocation::Session);
    up.post(CGEventTapLocation::Session);
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn post_click(_target: TargetButton) -> Result<(), ClickError> {
    Err(ClickError::Unsupported)
}
