//! Per-target binding state and interval rules

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Trigger;

/// Interval used when nothing valid is stored or entered
pub const DEFAULT_INTERVAL_MS: u64 = 100;
/// Shortest allowed interval between synthetic clicks
pub const MIN_INTERVAL_MS: u64 = 10;
/// Longest allowed interval between synthetic clicks
pub const MAX_INTERVAL_MS: u64 = 1000;

/// Logical click target. The set is closed: exactly these two exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetButton {
    /// Left mouse button
    Primary,
    /// Right mouse button
    Secondary,
}

impl TargetButton {
    /// All targets in their fixed processing order
    pub const ALL: [TargetButton; 2] = [TargetButton::Primary, TargetButton::Secondary];

    /// Stable identifier used in persisted records
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetButton::Primary => "primary",
            TargetButton::Secondary => "secondary",
        }
    }

    /// Position in [`TargetButton::ALL`]
    pub fn index(&self) -> usize {
        match self {
            TargetButton::Primary => 0,
            TargetButton::Secondary => 1,
        }
    }
}

impl fmt::Display for TargetButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetButton {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(TargetButton::Primary),
            "secondary" => Ok(TargetButton::Secondary),
            other => Err(UnknownTarget(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown click target: {0:?}")]
pub struct UnknownTarget(pub String);

/// Live binding state for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSetting {
    pub target: TargetButton,
    pub trigger: Option<Trigger>,
    pub interval_ms: u64,
    pub is_listening: bool,
    pub is_active: bool,
}

impl BindingSetting {
    /// Unbound setting with the default interval
    pub fn new(target: TargetButton) -> Self {
        Self {
            target,
            trigger: None,
            interval_ms: DEFAULT_INTERVAL_MS,
            is_listening: false,
            is_active: false,
        }
    }

    /// Label for the bound trigger, or a placeholder when unset
    pub fn trigger_label(&self) -> String {
        self.trigger
            .as_ref()
            .map(Trigger::label)
            .unwrap_or_else(|| "Not set".to_string())
    }
}

/// Clamp a requested interval into `[MIN_INTERVAL_MS, MAX_INTERVAL_MS]`
pub fn clamp_interval(ms: i64) -> u64 {
    ms.clamp(MIN_INTERVAL_MS as i64, MAX_INTERVAL_MS as i64) as u64
}

/// Interpret free-form interval text. Anything that is not an integer
/// falls back to [`DEFAULT_INTERVAL_MS`]; integers are clamped.
pub fn parse_interval(text: &str) -> u64 {
    match text.trim().parse::<i64>() {
        Ok(ms) => clamp_interval(ms),
        Err(_) => DEFAULT_INTERVAL_MS,
    }
}

/// Convert a stored floating point interval. Non-finite values are rejected.
pub fn interval_from_f64(ms: f64) -> Option<u64> {
    if !ms.is_finite() {
        return None;
    }
    // Saturating float-to-int cast, then clamp
    Some(clamp_interval(ms.round() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_setting() {
        let setting = BindingSetting::new(TargetButton::Secondary);
        assert_eq!(setting.interval_ms, DEFAULT_INTERVAL_MS);
        assert!(setting.trigger.is_none());
        assert!(!setting.is_listening);
        assert!(!setting.is_active);
        assert_eq!(setting.trigger_label(), "Not set");
    }

    #[test]
    fn test_clamp_interval() {
        assert_eq!(clamp_interval(-5), 10);
        assert_eq!(clamp_interval(10), 10);
        assert_eq!(clamp_interval(11), 11);
        assert_eq!(clamp_interval(999), 999);
        assert_eq!(clamp_interval(1000), 1000);
        assert_eq!(clamp_interval(i64::MAX), 1000);
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("250"), 250);
        assert_eq!(parse_interval(" 5 "), 10);
        assert_eq!(parse_interval("5000"), 1000);
        assert_eq!(parse_interval("fast"), DEFAULT_INTERVAL_MS);
        assert_eq!(parse_interval(""), DEFAULT_INTERVAL_MS);
    }

    #[test]
    fn test_interval_from_f64() {
        assert_eq!(interval_from_f64(100.0), Some(100));
        assert_eq!(interval_from_f64(1e12), Some(1000));
        assert_eq!(interval_from_f64(f64::NAN), None);
    }

    #[test]
    fn test_target_identifiers() {
        for target in TargetButton::ALL {
            assert_eq!(target.as_str().parse::<TargetButton>(), Ok(target));
            assert_eq!(TargetButton::ALL[target.index()], target);
        }
        assert!("middle".parse::<TargetButton>().is_err());
    }
}
