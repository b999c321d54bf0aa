//! To-hit derivation for a single item.

use serde::{Deserialize, Serialize};
use summoner_domain::{DomainError, Formula, FormulaError, ItemDescriptor, RollData, RulesContext};

/// How a to-hit value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToHitSource {
    /// The attack formula reduced to a single number.
    Evaluated,
    /// Proficiency plus ability modifier, used when the formula could not be
    /// evaluated. Misses any non-constant part of the real formula.
    Approximated,
}

/// Total to-hit bonus of an item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToHit {
    pub value: f64,
    pub source: ToHitSource,
}

impl ToHit {
    pub fn is_exact(&self) -> bool {
        self.source == ToHitSource::Evaluated
    }
}

/// Why an attack formula could not be evaluated.
#[derive(Debug, thiserror::Error)]
enum Unevaluable {
    #[error("item has no attack formula parts")]
    MissingAttackData,
    #[error(transparent)]
    Formula(FormulaError),
}

/// Determine the final to-hit bonus of `item` when owned by a creature with
/// `owner` roll data, or a close approximation of it.
pub fn determine_to_hit(
    item: &ItemDescriptor,
    owner: &RollData,
    rules: &dyn RulesContext,
) -> Result<ToHit, DomainError> {
    let data = item.roll_data(owner, rules)?;
    Ok(to_hit_from(item, &data, owner, rules))
}

/// Determine the to-hit bonus of the summoning item from the roll data the
/// host computed for it.
///
/// Host-supplied `@mod`, `@prof` and `@item` are used as given and only
/// missing ones are filled in.
pub fn determine_summoner_to_hit(
    item: &ItemDescriptor,
    item_data: &RollData,
    rules: &dyn RulesContext,
) -> Result<ToHit, DomainError> {
    let data = item.complete_roll_data(item_data, rules)?;
    Ok(to_hit_from(item, &data, item_data, rules))
}

fn to_hit_from(
    item: &ItemDescriptor,
    data: &RollData,
    owner: &RollData,
    rules: &dyn RulesContext,
) -> ToHit {
    match evaluate_attack(item, data) {
        Ok(value) => ToHit {
            value,
            source: ToHitSource::Evaluated,
        },
        Err(reason) => {
            let ability = owner
                .spellcasting_ability()
                .unwrap_or_else(|| item.ability_id(rules));
            let value = owner.proficiency() + owner.ability_mod(ability).unwrap_or(0.0);
            tracing::debug!(
                item = %item.name,
                reason = %reason,
                ability = %ability,
                value,
                "Approximating to-hit from proficiency and ability modifier"
            );
            ToHit {
                value,
                source: ToHitSource::Approximated,
            }
        }
    }
}

fn evaluate_attack(item: &ItemDescriptor, data: &RollData) -> Result<f64, Unevaluable> {
    let source = item
        .attack_formula()
        .ok_or(Unevaluable::MissingAttackData)?;
    let formula = Formula::parse(&source).map_err(Unevaluable::Formula)?;
    if !formula.is_deterministic() {
        return Err(Unevaluable::Formula(FormulaError::NonDeterministic));
    }
    formula.evaluate(data).map_err(Unevaluable::Formula)
}
