//! Value objects - Immutable objects defined by their attributes

mod effect;
mod formula;
mod roll_data;
mod update_instructions;

// Active effects built as data for the host's stat pipeline
pub use effect::{ActiveEffectDescriptor, EffectChange, EffectMode};

// Formula parsing and deterministic evaluation
pub use formula::{simplify_bonus, DiceTerm, Formula, FormulaError};

// Creature snapshots formulas read from
pub use roll_data::{json_number, RollData};

// Resolver output
pub use update_instructions::{
    SummonerStamp, UpdateInstructions, EMBEDDED_ACTIVE_EFFECT, EMBEDDED_ITEM,
};
