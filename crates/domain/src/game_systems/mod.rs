//! Game system rules for summoning.
//!
//! Each system implements [`RulesContext`]; the resolver receives one
//! explicitly instead of looking rules up globally.
//!
//! # Supported Systems
//!
//! - D&D 5th Edition (`dnd5e`)

mod dnd5e;
mod traits;

pub use dnd5e::Dnd5eRules;
pub use traits::{ProficiencyLevel, RulesContext};

#[cfg(test)]
pub use traits::MockRulesContext;

use std::sync::Arc;

/// Registry of available rule systems.
pub struct RulesRegistry {
    systems: Vec<Arc<dyn RulesContext>>,
}

impl Default for RulesRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesRegistry {
    /// Create a new registry with all built-in rule systems.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(Dnd5eRules::new()));
        registry
    }

    /// Create an empty registry without built-in systems.
    pub fn empty() -> Self {
        Self {
            systems: Vec::new(),
        }
    }

    /// Register a rule system.
    pub fn register(&mut self, system: Arc<dyn RulesContext>) {
        self.systems.push(system);
    }

    /// Get a rule system by its ID.
    pub fn get(&self, system_id: &str) -> Option<Arc<dyn RulesContext>> {
        self.systems
            .iter()
            .find(|s| s.system_id() == system_id)
            .cloned()
    }

    /// List all registered system IDs.
    pub fn list_systems(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.system_id()).collect()
    }
}
