//! Summoning configuration - how a summoned creature inherits from its summoner
//!
//! A game master edits this through a configuration dialog; the host stores
//! it as metadata on the summoning item. It is read-only while a summon is
//! being resolved.

use serde::{Deserialize, Serialize};

use crate::common::PropertyPath;
use crate::error::DomainError;
use crate::value_objects::Formula;

/// One arbitrary actor override: a property path and a formula for its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorChange {
    /// Dotted actor property path (e.g. "system.attributes.movement.fly")
    pub key: String,
    /// Formula evaluated against the summoner's roll data
    pub value: String,
}

impl ActorChange {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Rows the dialog adds but the user never fills in.
    pub fn is_blank(&self) -> bool {
        self.key.trim().is_empty()
    }
}

/// Declarative summoning configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummoningConfiguration {
    /// Force the summoned creature's proficiency bonus to the summoner's
    pub match_proficiency: bool,
    /// Adjust attack bonuses so attacks hit like the summoner's
    pub match_to_hit: bool,
    /// Replace save DCs with the summoner's spell DC
    #[serde(rename = "matchSaveDCs")]
    pub match_save_dcs: bool,
    /// Flat armor class formula; blank leaves AC alone
    pub ac_formula: String,
    /// Hit point formula; blank leaves HP alone
    pub hp_formula: String,
    /// Arbitrary overrides, applied in order
    pub actor_changes: Vec<ActorChange>,
}

impl SummoningConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match_proficiency(mut self, enabled: bool) -> Self {
        self.match_proficiency = enabled;
        self
    }

    pub fn with_match_to_hit(mut self, enabled: bool) -> Self {
        self.match_to_hit = enabled;
        self
    }

    pub fn with_match_save_dcs(mut self, enabled: bool) -> Self {
        self.match_save_dcs = enabled;
        self
    }

    pub fn with_ac_formula(mut self, formula: impl Into<String>) -> Self {
        self.ac_formula = formula.into();
        self
    }

    pub fn with_hp_formula(mut self, formula: impl Into<String>) -> Self {
        self.hp_formula = formula.into();
        self
    }

    pub fn with_change(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.actor_changes.push(ActorChange::new(key, value));
        self
    }

    /// Whether resolving this configuration can only produce the summoner stamp.
    pub fn is_inert(&self) -> bool {
        !self.match_proficiency
            && !self.match_to_hit
            && !self.match_save_dcs
            && self.ac_formula.trim().is_empty()
            && self.hp_formula.trim().is_empty()
            && self.actor_changes.iter().all(ActorChange::is_blank)
    }

    /// Append a change row, returning its index.
    pub fn add_change(&mut self, change: ActorChange) -> usize {
        self.actor_changes.push(change);
        self.actor_changes.len() - 1
    }

    /// Remove a change row by index.
    pub fn remove_change(&mut self, index: usize) -> Result<ActorChange, DomainError> {
        if index >= self.actor_changes.len() {
            return Err(DomainError::OutOfRange {
                index,
                len: self.actor_changes.len(),
            });
        }
        Ok(self.actor_changes.remove(index))
    }

    /// Check every formula parses and every non-blank change key is a valid path.
    ///
    /// Blank change rows are allowed; they are skipped when resolving. A blank
    /// value on a keyed row evaluates to zero.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, formula) in [("acFormula", &self.ac_formula), ("hpFormula", &self.hp_formula)] {
            if !formula.trim().is_empty() {
                Formula::parse(formula).map_err(|e| {
                    DomainError::validation(format!("{} is not a valid formula: {}", field, e))
                })?;
            }
        }

        for (index, change) in self.actor_changes.iter().enumerate() {
            if change.is_blank() {
                continue;
            }
            PropertyPath::parse(&change.key)?;
            if change.value.trim().is_empty() {
                continue;
            }
            Formula::parse(&change.value).map_err(|e| {
                DomainError::validation(format!(
                    "actorChanges[{}] '{}' is not a valid formula: {}",
                    index, change.key, e
                ))
            })?;
        }

        Ok(())
    }
}
