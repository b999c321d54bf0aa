//! Item descriptor - what the resolver needs to know about an item
//!
//! Items are owned by the host. The resolver sees a read-only descriptor
//! exposing whether the item attacks or forces a save, its attack-roll formula
//! parts, and enough about its ability and proficiency to rebuild the item's
//! formula context from its owner's roll data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DomainError;
use crate::game_systems::{ProficiencyLevel, RulesContext};
use crate::value_objects::{json_number, RollData};
use summoner_domain::ItemId;

/// Read-only view of an item on a summoner or a summoned actor.
///
/// The owning actor is not referenced from here; callers pass the owner's
/// roll data alongside the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDescriptor {
    pub id: ItemId,
    pub name: String,
    /// Stable reference the host resolves back to this item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Whether the item makes an attack roll
    #[serde(default)]
    pub has_attack: bool,
    /// Attack roll formula parts, summed (e.g. `["@mod", "@prof", "1"]`)
    #[serde(default)]
    pub attack_parts: Vec<String>,
    /// Whether the item forces a saving throw
    #[serde(default)]
    pub has_save: bool,
    /// Ability the item uses (e.g. "dex"); falls back to the rules default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability: Option<String>,
    /// How proficient the owner is with this item
    #[serde(default)]
    pub proficiency: ProficiencyLevel,
    /// Item-specific save DC, when the item sets one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dc: Option<f64>,
    /// Extra item data exposed to formulas as `@item.*`
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ItemDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            uuid: None,
            has_attack: false,
            attack_parts: Vec::new(),
            has_save: false,
            ability: None,
            proficiency: ProficiencyLevel::default(),
            save_dc: None,
            data: Value::Null,
        }
    }

    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    /// Mark the item as attacking with the given formula parts.
    pub fn with_attack<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.has_attack = true;
        self.attack_parts = parts.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the item as forcing a save, optionally with its own DC.
    pub fn with_save(mut self, dc: Option<f64>) -> Self {
        self.has_save = true;
        self.save_dc = dc;
        self
    }

    pub fn with_ability(mut self, ability: impl Into<String>) -> Self {
        self.ability = Some(ability.into());
        self
    }

    pub fn with_proficiency(mut self, proficiency: ProficiencyLevel) -> Self {
        self.proficiency = proficiency;
        self
    }

    /// Stable reference to this item, synthesized from the id when the host
    /// did not supply one.
    pub fn reference(&self) -> String {
        self.uuid
            .clone()
            .unwrap_or_else(|| format!("Item.{}", self.id))
    }

    /// Whether the item can be affected by summon matching at all.
    pub fn is_matchable(&self) -> bool {
        self.has_attack || self.has_save
    }

    /// Ability this item rolls with.
    pub fn ability_id<'a>(&'a self, rules: &dyn RulesContext) -> &'a str {
        self.ability
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| rules.default_attack_ability())
    }

    /// The attack formula as a single expression, if the item has parts.
    pub fn attack_formula(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .attack_parts
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" + "))
        }
    }

    /// Build this item's formula context from its owner's roll data.
    ///
    /// Adds `@mod` (the item ability's modifier), `@prof` (the owner's
    /// proficiency scaled by this item's proficiency level) and `@item`.
    pub fn roll_data(
        &self,
        owner: &RollData,
        rules: &dyn RulesContext,
    ) -> Result<RollData, DomainError> {
        let mut data = owner.clone();
        for (key, value) in self.context(owner, rules)? {
            data.set(key, value)?;
        }
        Ok(data)
    }

    /// Fill in whatever item context is missing from roll data the host
    /// already computed for this item.
    ///
    /// Keys the host supplied win, so a spell's `@mod` stays the caster's
    /// spellcasting modifier.
    pub fn complete_roll_data(
        &self,
        item_data: &RollData,
        rules: &dyn RulesContext,
    ) -> Result<RollData, DomainError> {
        let mut data = item_data.clone();
        for (key, value) in self.context(item_data, rules)? {
            if data.get(key).map_or(true, Value::is_null) {
                data.set(key, value)?;
            }
        }
        Ok(data)
    }

    fn context(
        &self,
        owner: &RollData,
        rules: &dyn RulesContext,
    ) -> Result<[(&'static str, Value); 3], DomainError> {
        let ability_mod = owner.ability_mod(self.ability_id(rules)).unwrap_or(0.0);
        let proficiency = self.proficiency.bonus(owner.proficiency());

        let mut item = match &self.data {
            Value::Object(map) => Value::Object(map.clone()),
            _ => Value::Object(Map::new()),
        };
        if let Some(dc) = self.save_dc {
            crate::common::set_property(&mut item, "save.dc", json_number(dc))?;
        }

        Ok([
            ("mod", json_number(ability_mod)),
            ("prof", json_number(proficiency)),
            ("item", item),
        ])
    }
}
