//! Synthetic click injection
//!
//! [`ClickEmitter::click`] is fire-and-forget: a refused injection is
//! logged at debug level and otherwise ignored, so a click loop keeps its
//! schedule even while Accessibility permission is revoked.

mod recording;
mod system;

pub use recording::RecordingClicker;
pub use system::SystemClicker;

use crate::binding::TargetButton;

/// Something that can click a logical target at the current pointer position
pub trait ClickEmitter: Send + Sync {
    fn click(&self, target: TargetButton);
}

/// Errors from a single injection attempt
#[derive(Debug, thiserror::Error)]
pub enum ClickError {
    #[error("could not create an event source")]
    EventSource,

    #[error("could not create the {0} event")]
    EventCreation(&'static str),

    #[error("synthetic clicks are not supported on this platform")]
    Unsupported,
}
