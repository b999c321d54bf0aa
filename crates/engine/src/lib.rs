//! Summoner Engine library.
//!
//! Resolves how a summoned creature inherits statistics from its summoner.
//!
//! ## Structure
//!
//! - `use_cases/` - Summon resolution
//! - `infrastructure/` - Environment-driven settings
//! - `runner` - Request input and output for the command-line entry point

pub mod infrastructure;
pub mod runner;
pub mod use_cases;

/// End-to-end tests driving full summon requests through the resolver.
#[cfg(test)]
mod e2e_tests;

pub use infrastructure::{FormulaFailurePolicy, ResolverSettings};
pub use use_cases::summon::{SummonError, SummonRequest, SummonResolver};
