//! Game system traits for system-specific summoning rules.
//!
//! The resolver never reaches into ambient game-system globals. Everything it
//! needs to know about a ruleset (how modifiers derive from scores, what the
//! proficiency effect is called) comes through a [`RulesContext`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::RollData;

/// Rules a summon resolution depends on.
#[cfg_attr(test, mockall::automock)]
pub trait RulesContext: Send + Sync {
    /// Unique identifier for this game system (e.g., "dnd5e").
    fn system_id(&self) -> &'static str;

    /// Human-readable display name (e.g., "D&D 5th Edition").
    fn display_name(&self) -> &'static str;

    /// Calculate ability modifier from score.
    fn ability_modifier(&self, score: f64) -> f64;

    /// Recompute the values in a working copy that derive from `changed`,
    /// the roll data path just written.
    ///
    /// A changed ability score also changes its modifier, for example. Paths
    /// in `written` were set directly and are never recomputed.
    fn derive(
        &self,
        data: &mut RollData,
        changed: &str,
        written: &BTreeSet<String>,
    ) -> Result<(), DomainError>;

    /// Ability used for attacks when neither the owner nor the item names one.
    fn default_attack_ability(&self) -> &'static str;

    /// Localized label for the proficiency-matching effect.
    fn proficiency_label(&self) -> String;

    /// Icon for the proficiency-matching effect.
    fn proficiency_icon(&self) -> &'static str;
}

/// Proficiency level an item's wielder has with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    /// Not proficient
    None,
    /// Half proficiency (Jack of All Trades, etc.)
    Half,
    /// Standard proficiency
    #[default]
    Proficient,
    /// Expertise (double proficiency)
    Expert,
}

impl ProficiencyLevel {
    /// Get the multiplier for this proficiency level.
    pub fn multiplier(&self) -> f64 {
        match self {
            ProficiencyLevel::None => 0.0,
            ProficiencyLevel::Half => 0.5,
            ProficiencyLevel::Proficient => 1.0,
            ProficiencyLevel::Expert => 2.0,
        }
    }

    /// Flat bonus for a proficiency bonus, rounding down.
    pub fn bonus(&self, proficiency: f64) -> f64 {
        (proficiency * self.multiplier()).floor()
    }
}
