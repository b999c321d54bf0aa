//! Roll data - the numeric snapshot of a creature that formulas read from.
//!
//! The host computes roll data from a creature's derived statistics and hands
//! it over as a JSON document. Paths mirror the creature's system data:
//! `attributes.prof`, `abilities.str.mod`, `attributes.spelldc`, and for an
//! item's roll data `item.save.dc`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::common::{get_property, set_property};
use crate::error::DomainError;

/// Convert a computed number to JSON, keeping integral values as integers.
///
/// Formulas evaluate in `f64`, but `12.0` must reach the host as `12`.
pub fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Read-only snapshot of a creature's computed attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollData(Value);

impl Default for RollData {
    fn default() -> Self {
        Self::new()
    }
}

impl RollData {
    /// Create empty roll data.
    pub fn new() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Raw value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_property(&self.0, path)
    }

    /// Numeric value at a dotted path.
    ///
    /// Numeric strings count as numbers since hosts often store bonuses as text.
    pub fn number(&self, path: &str) -> Option<f64> {
        match self.get(path)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Non-empty text value at a dotted path.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.get(path)?
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Write a value at a dotted path.
    ///
    /// Only working copies are written to; snapshots handed in by the host
    /// are never mutated.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), DomainError> {
        set_property(&mut self.0, path, value)
    }

    /// Builder form of [`RollData::set`].
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Result<Self, DomainError> {
        self.set(path, value.into())?;
        Ok(self)
    }

    // ──────────────────────────────────────────────────────────────────────────
    // Well-known attributes
    // ──────────────────────────────────────────────────────────────────────────

    /// Proficiency bonus (`attributes.prof`), zero when absent.
    pub fn proficiency(&self) -> f64 {
        self.number("attributes.prof").unwrap_or(0.0)
    }

    /// Ability modifier (`abilities.<ability>.mod`).
    pub fn ability_mod(&self, ability: &str) -> Option<f64> {
        self.number(&format!("abilities.{}.mod", ability))
    }

    /// Ability score (`abilities.<ability>.value`).
    pub fn ability_score(&self, ability: &str) -> Option<f64> {
        self.number(&format!("abilities.{}.value", ability))
    }

    /// Spellcasting ability id (`attributes.spellcasting`), if the creature casts spells.
    pub fn spellcasting_ability(&self) -> Option<&str> {
        self.text("attributes.spellcasting")
    }

    /// General spell save DC (`attributes.spelldc`).
    pub fn spell_dc(&self) -> Option<f64> {
        self.number("attributes.spelldc")
    }

    /// Save DC computed for the item this roll data belongs to (`item.save.dc`).
    pub fn item_save_dc(&self) -> Option<f64> {
        self.number("item.save.dc")
    }
}

impl From<Value> for RollData {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<RollData> for Value {
    fn from(value: RollData) -> Self {
        value.0
    }
}
