extern crate self as summoner_domain;

pub mod common;
pub mod entities;
pub mod error;
pub mod game_systems;
pub mod ids;
pub mod value_objects;

// Re-export all entities (explicit list in entities/mod.rs)
pub use entities::{ActorChange, ActorTemplate, ItemDescriptor, SummoningConfiguration};

pub use error::DomainError;

// Re-export game system traits and types
pub use game_systems::{Dnd5eRules, ProficiencyLevel, RulesContext, RulesRegistry};

// Re-export ID types
pub use ids::{ActorId, ItemId};

// Re-export path utilities
pub use common::{expand_object, flatten_object, get_property, set_property, PropertyPath};

// Re-export value objects (explicit list in value_objects/mod.rs)
pub use value_objects::{
    json_number, simplify_bonus, ActiveEffectDescriptor, DiceTerm, EffectChange, EffectMode,
    Formula, FormulaError, RollData, SummonerStamp, UpdateInstructions, EMBEDDED_ACTIVE_EFFECT,
    EMBEDDED_ITEM,
};
