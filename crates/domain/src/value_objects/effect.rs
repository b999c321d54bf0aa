//! Active effect descriptors
//!
//! Effects are data: the host's own stat pipeline applies them when it
//! recomputes derived values. The resolver only builds them, and applies them
//! to its private working copy so later steps see the effect.
//!
//! Change modes go over the wire as the host's numeric mode constants
//! (`CUSTOM` 0, `MULTIPLY` 1, `ADD` 2, `DOWNGRADE` 3, `UPGRADE` 4,
//! `OVERRIDE` 5), which is what the host's effect pipeline compares against.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::roll_data::{json_number, RollData};
use crate::common::PropertyPath;
use crate::error::DomainError;

/// How an effect change combines with the existing value.
///
/// Reads either the numeric constant or the mode's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", from = "ModeRepr")]
pub enum EffectMode {
    /// Multiply the existing value
    Multiply,
    /// Add to the existing value
    Add,
    /// Replace the existing value outright
    Override,
    /// Any other host mode; written back as `CUSTOM`, which nothing here applies
    Unknown,
}

impl EffectMode {
    /// The host's numeric constant for this mode.
    pub fn code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Multiply => 1,
            Self::Add => 2,
            Self::Override => 5,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Multiply,
            2 => Self::Add,
            5 => Self::Override,
            _ => Self::Unknown,
        }
    }
}

impl From<EffectMode> for u8 {
    fn from(mode: EffectMode) -> Self {
        mode.code()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Code(i64),
    Name(String),
}

impl From<ModeRepr> for EffectMode {
    fn from(repr: ModeRepr) -> Self {
        match repr {
            ModeRepr::Code(code) => u8::try_from(code).map_or(Self::Unknown, Self::from_code),
            ModeRepr::Name(name) => name.parse().unwrap_or(Self::Unknown),
        }
    }
}

impl std::fmt::Display for EffectMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Multiply => write!(f, "multiply"),
            Self::Add => write!(f, "add"),
            Self::Override => write!(f, "override"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for EffectMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multiply" => Ok(Self::Multiply),
            "add" => Ok(Self::Add),
            "override" => Ok(Self::Override),
            other => Err(DomainError::validation(format!(
                "Unknown effect mode: {}",
                other
            ))),
        }
    }
}

/// A single change carried by an effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectChange {
    pub key: PropertyPath,
    pub mode: EffectMode,
    pub value: Value,
}

impl EffectChange {
    pub fn new(key: PropertyPath, mode: EffectMode, value: Value) -> Self {
        Self { key, mode, value }
    }

    /// An `Override` change, the kind used for flat replacements.
    pub fn override_with(key: PropertyPath, value: Value) -> Self {
        Self::new(key, EffectMode::Override, value)
    }

    /// Apply this change to a working copy of roll data.
    ///
    /// `Add` and `Multiply` need numeric values on both sides; a missing
    /// current value counts as zero.
    pub fn apply(&self, data: &mut RollData) -> Result<(), DomainError> {
        let path = self.key.roll_data_path();
        match self.mode {
            EffectMode::Override => data.set(path, self.value.clone()),
            EffectMode::Add | EffectMode::Multiply => {
                let delta = numeric(&self.value).ok_or_else(|| {
                    DomainError::validation(format!(
                        "Effect change on '{}' needs a numeric value for {}",
                        self.key, self.mode
                    ))
                })?;
                let current = data.number(path).unwrap_or(0.0);
                let result = match self.mode {
                    EffectMode::Add => current + delta,
                    _ => current * delta,
                };
                data.set(path, json_number(result))
            }
            EffectMode::Unknown => Ok(()),
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Serializable description of an active effect to embed on an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEffectDescriptor {
    pub label: String,
    pub icon: String,
    #[serde(default)]
    pub disabled: bool,
    pub changes: Vec<EffectChange>,
}

impl ActiveEffectDescriptor {
    pub fn new(label: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            icon: icon.into(),
            disabled: false,
            changes: Vec::new(),
        }
    }

    pub fn with_change(mut self, change: EffectChange) -> Self {
        self.changes.push(change);
        self
    }

    /// Apply every change in order, unless the effect is disabled.
    pub fn apply(&self, data: &mut RollData) -> Result<(), DomainError> {
        if self.disabled {
            return Ok(());
        }
        self.changes.iter().try_for_each(|change| change.apply(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> PropertyPath {
        PropertyPath::parse(p).unwrap()
    }

    fn data() -> RollData {
        RollData::from(json!({"attributes": {"prof": 2, "ac": {"flat": 12}}}))
    }

    #[test]
    fn test_override_replaces_value() {
        let mut data = data();
        EffectChange::override_with(path("system.attributes.prof"), json!(4))
            .apply(&mut data)
            .unwrap();
        assert_eq!(data.proficiency(), 4.0);
    }

    #[test]
    fn test_add_and_multiply() {
        let mut data = data();
        EffectChange::new(path("system.attributes.ac.flat"), EffectMode::Add, json!("2"))
            .apply(&mut data)
            .unwrap();
        assert_eq!(data.number("attributes.ac.flat"), Some(14.0));

        EffectChange::new(path("system.attributes.ac.flat"), EffectMode::Multiply, json!(0.5))
            .apply(&mut data)
            .unwrap();
        assert_eq!(data.get("attributes.ac.flat"), Some(&json!(7)));
    }

    #[test]
    fn test_add_to_missing_value_starts_from_zero() {
        let mut data = RollData::new();
        EffectChange::new(path("system.bonuses.mwak"), EffectMode::Add, json!(3))
            .apply(&mut data)
            .unwrap();
        assert_eq!(data.number("bonuses.mwak"), Some(3.0));
    }

    #[test]
    fn test_add_requires_numeric_value() {
        let mut data = data();
        let err = EffectChange::new(path("system.attributes.prof"), EffectMode::Add, json!("lots"))
            .apply(&mut data)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(data.proficiency(), 2.0);
    }

    #[test]
    fn test_disabled_effect_is_not_applied() {
        let mut effect = ActiveEffectDescriptor::new("Proficiency", "icons/prof.webp")
            .with_change(EffectChange::override_with(path("system.attributes.prof"), json!(6)));
        effect.disabled = true;

        let mut data = data();
        effect.apply(&mut data).unwrap();
        assert_eq!(data.proficiency(), 2.0);
    }

    #[test]
    fn test_descriptor_serializes_as_effect_document() {
        let effect = ActiveEffectDescriptor::new("Proficiency", "icons/prof.webp")
            .with_change(EffectChange::override_with(path("system.attributes.prof"), json!(3)));
        assert_eq!(
            serde_json::to_value(&effect).unwrap(),
            json!({
                "label": "Proficiency",
                "icon": "icons/prof.webp",
                "disabled": false,
                "changes": [{"key": "system.attributes.prof", "mode": 5, "value": 3}]
            })
        );
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Override".parse::<EffectMode>().unwrap(), EffectMode::Override);
        assert!("upgrade".parse::<EffectMode>().is_err());
        let unknown: EffectMode = serde_json::from_value(json!("downgrade")).unwrap();
        assert_eq!(unknown, EffectMode::Unknown);
    }

    #[test]
    fn test_mode_uses_host_constants() {
        assert_eq!(serde_json::to_value(EffectMode::Override).unwrap(), json!(5));
        assert_eq!(serde_json::to_value(EffectMode::Add).unwrap(), json!(2));
        assert_eq!(serde_json::to_value(EffectMode::Multiply).unwrap(), json!(1));

        let read = |value| serde_json::from_value::<EffectMode>(value).unwrap();
        assert_eq!(read(json!(5)), EffectMode::Override);
        assert_eq!(read(json!(2)), EffectMode::Add);
        assert_eq!(read(json!("override")), EffectMode::Override);
        // Upgrade, custom and out-of-range codes are not applied here
        assert_eq!(read(json!(4)), EffectMode::Unknown);
        assert_eq!(read(json!(0)), EffectMode::Unknown);
        assert_eq!(read(json!(-1)), EffectMode::Unknown);
    }
}
