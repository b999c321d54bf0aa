//! Summon resolution.
//!
//! Computes the property overrides a freshly summoned creature receives so it
//! matches the creature that summoned it: proficiency bonus, armor class, hit
//! points, arbitrary actor properties, and per-item attack bonuses and save
//! DCs. The result is plain data; the host applies it when it creates the
//! summoned actor.
//!
//! Each pass clones the template's roll data into a private working copy.
//! Proficiency matching and actor changes are written into that copy so the
//! item steps that follow see them. After each write the [`RulesContext`]
//! re-derives whatever depends on the written path, except values that were
//! themselves written directly. Inputs are never mutated.

mod to_hit;


pub use to_hit::{determine_summoner_to_hit, determine_to_hit, ToHit, ToHitSource};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use summoner_domain::{
    expand_object, json_number, simplify_bonus, ActiveEffectDescriptor, ActorTemplate,
    DomainError, EffectChange, FormulaError, ItemDescriptor, PropertyPath, RollData,
    RulesContext, RulesRegistry, SummonerStamp, SummoningConfiguration, UpdateInstructions,
    EMBEDDED_ACTIVE_EFFECT, EMBEDDED_ITEM,
};

use crate::infrastructure::ResolverSettings;

const AC_PATH: &str = "system.attributes.ac.flat";
const HP_MAX_PATH: &str = "system.attributes.hp.max";
const HP_VALUE_PATH: &str = "system.attributes.hp.value";
const PROFICIENCY_PATH: &str = "system.attributes.prof";
const ATTACK_BONUS_PATH: &str = "system.attackBonus";
const SAVE_DC_PATH: &str = "system.save.dc";
const SAVE_SCALING_PATH: &str = "system.save.scaling";
const FLAT_SCALING: &str = "flat";

/// Errors from a summon resolution pass.
#[derive(Debug, thiserror::Error)]
pub enum SummonError {
    #[error("Summoning item '{0}' has no summoning configuration")]
    MissingConfiguration(String),
    #[error("Formula for {field} could not be evaluated: {source}")]
    Formula {
        field: String,
        #[source]
        source: FormulaError,
    },
    #[error("No rules registered for game system '{0}'")]
    UnknownGameSystem(String),
    #[error("Failed to serialize {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Everything one summon resolution reads.
///
/// This is the document the runner accepts on its input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummonRequest {
    pub summoning_item: ItemDescriptor,
    /// Roll data of the summoning item, as computed from its owner
    pub roll_data: RollData,
    pub template: ActorTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SummoningConfiguration>,
}

/// Resolves summoning configurations into update instructions.
pub struct SummonResolver {
    rules: Arc<dyn RulesContext>,
    settings: ResolverSettings,
}

impl SummonResolver {
    pub fn new(rules: Arc<dyn RulesContext>, settings: ResolverSettings) -> Self {
        Self { rules, settings }
    }

    /// Build a resolver for the game system named in `settings`.
    pub fn from_registry(
        registry: &RulesRegistry,
        settings: ResolverSettings,
    ) -> Result<Self, SummonError> {
        let rules = registry
            .get(&settings.game_system)
            .ok_or_else(|| SummonError::UnknownGameSystem(settings.game_system.clone()))?;
        Ok(Self::new(rules, settings))
    }

    pub fn rules(&self) -> &dyn RulesContext {
        self.rules.as_ref()
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Resolve a request. A request without configuration yields empty
    /// instructions.
    pub fn resolve(&self, request: &SummonRequest) -> Result<UpdateInstructions, SummonError> {
        self.compute_updates(
            &request.summoning_item,
            &request.template,
            request.config.as_ref(),
            &request.roll_data,
        )
    }

    /// Resolve a request that must carry a configuration.
    pub fn resolve_required(
        &self,
        request: &SummonRequest,
    ) -> Result<UpdateInstructions, SummonError> {
        if request.config.is_none() {
            return Err(SummonError::MissingConfiguration(
                request.summoning_item.reference(),
            ));
        }
        self.resolve(request)
    }

    /// Compute the overrides `template` receives when summoned by
    /// `summoning_item`, whose roll data is `roll_data`.
    pub fn compute_updates(
        &self,
        summoning_item: &ItemDescriptor,
        template: &ActorTemplate,
        config: Option<&SummoningConfiguration>,
        roll_data: &RollData,
    ) -> Result<UpdateInstructions, SummonError> {
        let mut updates = UpdateInstructions::empty();
        let Some(config) = config else {
            tracing::debug!(
                item = %summoning_item.name,
                "Summoning item has no configuration, nothing to override"
            );
            return Ok(updates);
        };

        let mut working = WorkingCopy::new(template.roll_data.clone());

        let to_hit_target = if config.match_to_hit {
            let target = determine_summoner_to_hit(summoning_item, roll_data, self.rules())?;
            tracing::debug!(
                item = %summoning_item.name,
                target = target.value,
                exact = target.is_exact(),
                "Summoner to-hit target"
            );
            Some(target.value)
        } else {
            None
        };

        if config.match_proficiency {
            self.match_proficiency(&mut updates, &mut working, roll_data)?;
        }

        if let Some(ac) = self.evaluate_field("acFormula", &config.ac_formula, roll_data)? {
            if ac != 0.0 {
                updates.set_actor(&path(AC_PATH)?, json_number(ac));
            }
        }

        if let Some(hp) = self.evaluate_field("hpFormula", &config.hp_formula, roll_data)? {
            if hp != 0.0 {
                updates.set_actor(&path(HP_MAX_PATH)?, json_number(hp));
                updates.set_actor(&path(HP_VALUE_PATH)?, json_number(hp));
            }
        }

        self.apply_actor_changes(config, &mut updates, &mut working, roll_data)?;

        let mut matched_items = 0usize;
        for item in &template.items {
            let Some(update) =
                self.item_update(item, config, to_hit_target, &working.data, roll_data)?
            else {
                continue;
            };
            updates.insert_embedded(EMBEDDED_ITEM, item.id.to_string(), update);
            matched_items += 1;
        }

        updates.stamp(
            &self.settings.flag_scope,
            SummonerStamp::new(summoning_item.reference(), roll_data.clone()),
        )?;

        tracing::info!(
            summoner = %summoning_item.name,
            template = %template.name,
            actor_updates = updates.actor.len(),
            matched_items,
            "Resolved summon overrides"
        );

        Ok(updates)
    }

    /// Override the summoned creature's proficiency with the summoner's.
    fn match_proficiency(
        &self,
        updates: &mut UpdateInstructions,
        working: &mut WorkingCopy,
        roll_data: &RollData,
    ) -> Result<(), SummonError> {
        let proficiency = roll_data.proficiency();
        let effect = ActiveEffectDescriptor::new(
            self.rules.proficiency_label(),
            self.rules.proficiency_icon(),
        )
        .with_change(EffectChange::override_with(
            path(PROFICIENCY_PATH)?,
            json_number(proficiency),
        ));

        let value = serde_json::to_value(&effect).map_err(|source| SummonError::Serialization {
            what: "proficiency effect",
            source,
        })?;
        updates.insert_embedded(EMBEDDED_ACTIVE_EFFECT, effect.label.clone(), value);

        effect.apply(&mut working.data)?;
        for change in &effect.changes {
            working.record(change.key.roll_data_path(), self.rules())?;
        }

        tracing::debug!(proficiency, "Matched summoner proficiency");
        Ok(())
    }

    /// Evaluate each actor change against the summoner, record it and write it
    /// into the working copy.
    fn apply_actor_changes(
        &self,
        config: &SummoningConfiguration,
        updates: &mut UpdateInstructions,
        working: &mut WorkingCopy,
        roll_data: &RollData,
    ) -> Result<(), SummonError> {
        for change in config.actor_changes.iter().filter(|c| !c.is_blank()) {
            let key = match PropertyPath::parse(&change.key) {
                Ok(key) => key,
                Err(e) if self.settings.formula_failure_policy.is_strict() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(key = %change.key, error = %e, "Skipping actor change with invalid key");
                    continue;
                }
            };

            let Some(value) = self.evaluate_field(key.as_str(), &change.value, roll_data)? else {
                continue;
            };
            let value = json_number(value);

            updates.set_actor(&key, value.clone());
            if let Err(e) = working.data.set(key.roll_data_path(), value) {
                if self.settings.formula_failure_policy.is_strict() {
                    return Err(e.into());
                }
                tracing::warn!(
                    key = %key,
                    error = %e,
                    "Actor change recorded but not visible to later steps"
                );
                continue;
            }
            working.record(key.roll_data_path(), self.rules())?;
            tracing::debug!(key = %key, "Applied actor change");
        }
        Ok(())
    }

    /// The update one template item receives, if any.
    fn item_update(
        &self,
        item: &ItemDescriptor,
        config: &SummoningConfiguration,
        to_hit_target: Option<f64>,
        working: &RollData,
        roll_data: &RollData,
    ) -> Result<Option<Value>, SummonError> {
        let mut changes: BTreeMap<&str, Value> = BTreeMap::new();

        if let Some(target) = to_hit_target.filter(|_| item.has_attack) {
            let current = determine_to_hit(item, working, self.rules())?;
            changes.insert(ATTACK_BONUS_PATH, json_number(target - current.value));
        }

        if config.match_save_dcs && item.has_save {
            match roll_data.item_save_dc().or_else(|| roll_data.spell_dc()) {
                Some(dc) => {
                    changes.insert(SAVE_DC_PATH, json_number(dc));
                    changes.insert(SAVE_SCALING_PATH, Value::from(FLAT_SCALING));
                }
                None => tracing::debug!(
                    item = %item.name,
                    "Summoner has no save DC, leaving item save alone"
                ),
            }
        }

        if changes.is_empty() {
            return Ok(None);
        }
        changes.insert("_id", Value::from(item.id.to_string()));
        Ok(Some(expand_object(changes)?))
    }

    /// Evaluate an optional formula under the configured failure policy.
    ///
    /// `Ok(None)` means the field is skipped.
    fn evaluate_field(
        &self,
        field: &str,
        formula: &str,
        data: &RollData,
    ) -> Result<Option<f64>, SummonError> {
        match simplify_bonus(formula, data) {
            Ok(value) => Ok(Some(value)),
            Err(source) if self.settings.formula_failure_policy.is_strict() => {
                Err(SummonError::Formula {
                    field: field.to_string(),
                    source,
                })
            }
            Err(e) => {
                tracing::warn!(field, formula, error = %e, "Skipping field with unusable formula");
                Ok(None)
            }
        }
    }
}

/// The template's roll data as the item steps see it.
struct WorkingCopy {
    data: RollData,
    /// Roll data paths written directly, never re-derived
    written: BTreeSet<String>,
}

impl WorkingCopy {
    fn new(data: RollData) -> Self {
        Self {
            data,
            written: BTreeSet::new(),
        }
    }

    /// Note a direct write to `path` and re-derive what depends on it.
    fn record(&mut self, path: &str, rules: &dyn RulesContext) -> Result<(), DomainError> {
        self.written.insert(path.to_string());
        rules.derive(&mut self.data, path, &self.written)
    }
}

fn path(raw: &str) -> Result<PropertyPath, DomainError> {
    PropertyPath::parse(raw)
}
