//! Persisted record format
//!
//! The document is a JSON object keyed by target identifier:
//!
//! ```json
//! { "primary": { "target": "primary", "intervalMs": 100, "trigger": "keyboard:F:3" } }
//! ```
//!
//! An empty `trigger` string means unset.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::binding::{encode_optional, interval_from_f64, BindingSetting, TargetButton, Trigger};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredRecord {
    pub target: String,
    pub interval_ms: f64,
    #[serde(default)]
    pub trigger: Option<String>,
}

impl StoredRecord {
    pub fn from_setting(setting: &BindingSetting) -> Self {
        Self {
            target: setting.target.as_str().to_string(),
            interval_ms: setting.interval_ms as f64,
            trigger: Some(encode_optional(setting.trigger.as_ref())),
        }
    }

    /// Validate into a live setting. `None` if any field is unusable.
    pub fn into_setting(self) -> Option<BindingSetting> {
        let target = self.target.parse::<TargetButton>().ok()?;
        let interval_ms = interval_from_f64(self.interval_ms)?;
        let trigger = match self.trigger.as_deref() {
            None | Some("") => None,
            Some(encoded) => Some(Trigger::decode(encoded)?),
        };

        Some(BindingSetting {
            target,
            trigger,
            interval_ms,
            is_listening: false,
            is_active: false,
        })
    }
}

/// Parse the whole document into a JSON object. Anything that is not an
/// object is treated as empty.
pub(crate) fn parse_document(contents: Option<&str>) -> Map<String, Value> {
    let Some(contents) = contents else {
        return Map::new();
    };

    match serde_json::from_str::<Value>(contents) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            warn!("binding document is not an object, using defaults");
            Map::new()
        }
        Err(e) => {
            warn!(?e, "binding document is not valid JSON, using defaults");
            Map::new()
        }
    }
}

/// Decode the record for `target`, falling back to the default setting
pub(crate) fn setting_for(document: &Map<String, Value>, target: TargetButton) -> BindingSetting {
    let Some(value) = document.get(target.as_str()) else {
        return BindingSetting::new(target);
    };

    let setting = serde_json::from_value::<StoredRecord>(value.clone())
        .ok()
        .and_then(StoredRecord::into_setting)
        .filter(|setting| setting.target == target);

    match setting {
        Some(setting) => setting,
        None => {
            warn!(%target, "discarding malformed binding record");
            BindingSetting::new(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_roundtrip_through_setting() {
        let mut setting = BindingSetting::new(TargetButton::Primary);
        setting.trigger = Some(Trigger::keyboard("F", 3));
        setting.interval_ms = 250;

        let record = StoredRecord::from_setting(&setting);
        assert_eq!(record.trigger.as_deref(), Some("keyboard:F:3"));
        assert_eq!(record.into_setting(), Some(setting));
    }

    #[test]
    fn test_record_json_field_names() {
        let record = StoredRecord::from_setting(&BindingSetting::new(TargetButton::Secondary));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            json!({ "target": "secondary", "intervalMs": 100.0, "trigger": "" })
        );
    }

    #[test]
    fn test_setting_for_discards_malformed() {
        let document = parse_document(Some(
            &json!({
                "primary": { "target": "primary", "trigger": "mouse:3" },
                "secondary": { "target": "middle", "intervalMs": 50 },
            })
            .to_string(),
        ));

        assert_eq!(
            setting_for(&document, TargetButton::Primary),
            BindingSetting::new(TargetButton::Primary)
        );
        assert_eq!(
            setting_for(&document, TargetButton::Secondary),
            BindingSetting::new(TargetButton::Secondary)
        );
    }

    #[test]
    fn test_setting_for_rejects_bad_trigger_and_key_mismatch() {
        let document = parse_document(Some(
            &json!({
                "primary": { "target": "primary", "intervalMs": 50, "trigger": "keyboard:F" },
                "secondary": { "target": "primary", "intervalMs": 50, "trigger": "" },
            })
            .to_string(),
        ));

        assert!(setting_for(&document, TargetButton::Primary).trigger.is_none());
        assert_eq!(setting_for(&document, TargetButton::Primary).interval_ms, 100);
        assert_eq!(setting_for(&document, TargetButton::Secondary).interval_ms, 100);
    }

    #[test]
    fn test_setting_for_clamps_and_accepts_missing_trigger() {
        let document = parse_document(Some(
            &json!({ "primary": { "target": "primary", "intervalMs": 5000.0 } }).to_string(),
        ));

        let setting = setting_for(&document, TargetButton::Primary);
        assert_eq!(setting.interval_ms, 1000);
        assert!(setting.trigger.is_none());
    }

    #[test]
    fn test_parse_document_garbage() {
        assert!(parse_document(Some("not json")).is_empty());
        assert!(parse_document(Some("[1, 2]")).is_empty());
        assert!(parse_document(None).is_empty());
    }
}
