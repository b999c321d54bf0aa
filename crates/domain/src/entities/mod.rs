//! Domain entities - Core business objects with identity

mod actor;
mod item;
mod summoning_config;

pub use actor::ActorTemplate;
pub use item::ItemDescriptor;
pub use summoning_config::{ActorChange, SummoningConfiguration};
