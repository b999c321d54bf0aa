//! D&D 5th Edition rules for summoning.

use std::collections::BTreeSet;

use super::traits::RulesContext;
use crate::error::DomainError;
use crate::value_objects::{json_number, RollData};

/// Ability ids as they appear in roll data.
const ABILITIES: [&str; 6] = ["str", "dex", "con", "int", "wis", "cha"];

const SPELL_DC_PATH: &str = "attributes.spelldc";

const PROFICIENCY_ICON: &str = "icons/skills/targeting/crosshair-bars-yellow.webp";

/// D&D 5th Edition rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dnd5eRules;

impl Dnd5eRules {
    /// Create a new D&D 5e rules instance.
    pub fn new() -> Self {
        Self
    }
}

impl RulesContext for Dnd5eRules {
    fn system_id(&self) -> &'static str {
        "dnd5e"
    }

    fn display_name(&self) -> &'static str {
        "D&D 5th Edition"
    }

    fn ability_modifier(&self, score: f64) -> f64 {
        ((score - 10.0) / 2.0).floor()
    }

    fn derive(
        &self,
        data: &mut RollData,
        changed: &str,
        written: &BTreeSet<String>,
    ) -> Result<(), DomainError> {
        let mut touched = vec![changed.to_string()];

        let scored = changed
            .strip_prefix("abilities.")
            .and_then(|rest| rest.strip_suffix(".value"))
            .filter(|ability| ABILITIES.contains(ability));
        if let Some(ability) = scored {
            let mod_path = format!("abilities.{}.mod", ability);
            let score = data.ability_score(ability);
            if let Some(score) = score.filter(|_| !written.contains(&mod_path)) {
                data.set(&mod_path, json_number(self.ability_modifier(score)))?;
                touched.push(mod_path);
            }
        }

        if written.contains(SPELL_DC_PATH) || !touched.iter().any(|p| feeds_spell_dc(data, p)) {
            return Ok(());
        }

        // Spell DC: 8 + proficiency + casting stat modifier
        let casting_mod = data
            .spellcasting_ability()
            .map(str::to_string)
            .and_then(|ability| data.ability_mod(&ability));
        if let Some(modifier) = casting_mod {
            let dc = 8.0 + data.proficiency() + modifier;
            data.set(SPELL_DC_PATH, json_number(dc))?;
        }

        Ok(())
    }

    fn default_attack_ability(&self) -> &'static str {
        "str"
    }

    fn proficiency_label(&self) -> String {
        "Proficiency".to_string()
    }

    fn proficiency_icon(&self) -> &'static str {
        PROFICIENCY_ICON
    }
}

/// Whether the spell DC depends on the roll data at `path`.
fn feeds_spell_dc(data: &RollData, path: &str) -> bool {
    match path {
        "attributes.prof" | "attributes.spellcasting" => true,
        _ => data
            .spellcasting_ability()
            .is_some_and(|ability| path == format!("abilities.{}.mod", ability)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ability_modifier_calculation() {
        let rules = Dnd5eRules::new();
        assert_eq!(rules.ability_modifier(10.0), 0.0);
        assert_eq!(rules.ability_modifier(11.0), 0.0);
        assert_eq!(rules.ability_modifier(12.0), 1.0);
        assert_eq!(rules.ability_modifier(18.0), 4.0);
        assert_eq!(rules.ability_modifier(20.0), 5.0);
        assert_eq!(rules.ability_modifier(9.0), -1.0);
        assert_eq!(rules.ability_modifier(8.0), -1.0);
        assert_eq!(rules.ability_modifier(1.0), -5.0);
    }

    fn written(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn derive_recomputes_modifier_of_changed_score() {
        let rules = Dnd5eRules::new();
        let mut data = RollData::from(json!({
            "abilities": {"str": {"value": 16, "mod": 0}, "dex": {"value": 18, "mod": 2}}
        }));
        rules
            .derive(&mut data, "abilities.str.value", &written(&["abilities.str.value"]))
            .unwrap();
        assert_eq!(data.ability_mod("str"), Some(3.0));
        // Dex was not changed, left alone
        assert_eq!(data.ability_mod("dex"), Some(2.0));
    }

    #[test]
    fn derive_keeps_directly_written_modifier() {
        let rules = Dnd5eRules::new();
        let mut data = RollData::from(json!({
            "abilities": {"str": {"value": 14, "mod": 5}}
        }));
        rules
            .derive(&mut data, "abilities.str.mod", &written(&["abilities.str.mod"]))
            .unwrap();
        assert_eq!(data.ability_mod("str"), Some(5.0));

        // A later score change does not clobber the earlier modifier write
        data.set("abilities.str.value", json!(20)).unwrap();
        let both = written(&["abilities.str.mod", "abilities.str.value"]);
        rules.derive(&mut data, "abilities.str.value", &both).unwrap();
        assert_eq!(data.ability_mod("str"), Some(5.0));
    }

    #[test]
    fn derive_recomputes_spell_dc_from_proficiency() {
        let rules = Dnd5eRules::new();
        let mut data = RollData::from(json!({
            "abilities": {"wis": {"value": 14, "mod": 2}},
            "attributes": {"prof": 4, "spellcasting": "wis", "spelldc": 12}
        }));
        rules
            .derive(&mut data, "attributes.prof", &written(&["attributes.prof"]))
            .unwrap();
        assert_eq!(data.spell_dc(), Some(14.0));
    }

    #[test]
    fn derive_follows_casting_score_into_spell_dc() {
        let rules = Dnd5eRules::new();
        let mut data = RollData::from(json!({
            "abilities": {"wis": {"value": 18, "mod": 2}},
            "attributes": {"prof": 2, "spellcasting": "wis", "spelldc": 12}
        }));
        rules
            .derive(&mut data, "abilities.wis.value", &written(&["abilities.wis.value"]))
            .unwrap();
        assert_eq!(data.ability_mod("wis"), Some(4.0));
        assert_eq!(data.spell_dc(), Some(14.0));
    }

    #[test]
    fn derive_keeps_directly_written_spell_dc() {
        let rules = Dnd5eRules::new();
        let mut data = RollData::from(json!({
            "abilities": {"wis": {"mod": 4}},
            "attributes": {"prof": 2, "spellcasting": "wis", "spelldc": 19}
        }));
        let pinned = written(&["attributes.spelldc", "attributes.prof"]);
        rules.derive(&mut data, "attributes.prof", &pinned).unwrap();
        assert_eq!(data.spell_dc(), Some(19.0));
    }

    #[test]
    fn derive_ignores_unrelated_paths() {
        let rules = Dnd5eRules::new();
        let mut data = RollData::from(json!({
            "abilities": {"wis": {"value": 18, "mod": 0}},
            "attributes": {"prof": 2, "spellcasting": "wis", "spelldc": 12}
        }));
        let before = data.clone();
        rules
            .derive(&mut data, "attributes.movement.fly", &written(&["attributes.movement.fly"]))
            .unwrap();
        assert_eq!(data, before);
    }

    #[test]
    fn derive_leaves_non_casters_alone() {
        let rules = Dnd5eRules::new();
        let mut data = RollData::from(json!({"attributes": {"prof": 2}}));
        rules
            .derive(&mut data, "attributes.prof", &written(&["attributes.prof"]))
            .unwrap();
        assert_eq!(data.spell_dc(), None);
    }

    #[test]
    fn proficiency_effect_presentation() {
        let rules = Dnd5eRules::new();
        assert_eq!(rules.proficiency_label(), "Proficiency");
        assert!(rules.proficiency_icon().ends_with(".webp"));
        assert_eq!(rules.default_attack_ability(), "str");
    }
}
