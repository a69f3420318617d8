//! Normalized hotkey triggers and their persisted string form
//!
//! A trigger is either a keyboard key (name + virtual keycode) or an
//! auxiliary mouse button. The compact string form is what the binding
//! store writes to disk: `mouse:<n>` or `keyboard:<name>:<code>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MOUSE_PREFIX: &str = "mouse:";
const KEYBOARD_PREFIX: &str = "keyboard:";

/// A keyboard key or mouse button that can be bound to a click target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Auxiliary mouse button, by OS button number
    Mouse { button: i64 },
    /// Keyboard key, by display name and virtual keycode
    Keyboard { name: String, code: i64 },
}

impl Trigger {
    pub fn mouse(button: i64) -> Self {
        Self::Mouse { button }
    }

    pub fn keyboard(name: impl Into<String>, code: i64) -> Self {
        Self::Keyboard {
            name: name.into(),
            code,
        }
    }

    /// Encode into the persisted `mouse:<n>` / `keyboard:<name>:<code>` form
    pub fn encode(&self) -> String {
        match self {
            Trigger::Mouse { button } => format!("{MOUSE_PREFIX}{button}"),
            Trigger::Keyboard { name, code } => format!("{KEYBOARD_PREFIX}{name}:{code}"),
        }
    }

    /// Decode the persisted form. Returns `None` for anything malformed,
    /// including the empty "unset" value.
    pub fn decode(value: &str) -> Option<Self> {
        if let Some(rest) = value.strip_prefix(MOUSE_PREFIX) {
            let button = rest.parse().ok()?;
            return Some(Self::Mouse { button });
        }

        if let Some(rest) = value.strip_prefix(KEYBOARD_PREFIX) {
            // Key names may themselves contain ':', the code is always last
            let (name, code) = rest.rsplit_once(':')?;
            let code = code.parse().ok()?;
            return Some(Self::keyboard(name, code));
        }

        None
    }

    /// Label shown to the user for this trigger
    pub fn label(&self) -> String {
        match self {
            Trigger::Mouse { button } => format!("Button {button}"),
            Trigger::Keyboard { name, .. } => name.clone(),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Error returned when a persisted trigger string cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid trigger encoding: {0:?}")]
pub struct ParseTriggerError(pub String);

impl FromStr for Trigger {
    type Err = ParseTriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s).ok_or_else(|| ParseTriggerError(s.to_string()))
    }
}

/// Encode an optional trigger, using the empty string for "unset"
pub fn encode_optional(trigger: Option<&Trigger>) -> String {
    trigger.map(Trigger::encode).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_forms() {
        assert_eq!(Trigger::mouse(4).encode(), "mouse:4");
        assert_eq!(Trigger::keyboard("F", 3).encode(), "keyboard:F:3");
        assert_eq!(encode_optional(None), "");
    }

    #[test]
    fn test_decode_roundtrip_awkward_names() {
        let triggers = [
            Trigger::mouse(-1),
            Trigger::keyboard(";", 41),
            Trigger::keyboard("Keypad :", 999),
            Trigger::keyboard("", 0),
            Trigger::keyboard("Page Up", 116),
        ];

        for trigger in triggers {
            assert_eq!(Trigger::decode(&trigger.encode()), Some(trigger));
        }
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(Trigger::decode(""), None);
        assert_eq!(Trigger::decode("mouse:"), None);
        assert_eq!(Trigger::decode("mouse:x"), None);
        assert_eq!(Trigger::decode("keyboard:F"), None);
        assert_eq!(Trigger::decode("keyboard:F:"), None);
        assert_eq!(Trigger::decode("joystick:1"), None);
        assert!("garbage".parse::<Trigger>().is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Trigger::mouse(3).label(), "Button 3");
        assert_eq!(Trigger::keyboard("Escape", 53).label(), "Escape");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&Trigger::keyboard("F", 3)).unwrap();
        assert!(json.contains("\"kind\":\"keyboard\""));
        assert!(json.contains("\"code\":3"));
    }
}
