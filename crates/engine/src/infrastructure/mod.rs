//! Infrastructure implementations.
//!
//! Environment-driven configuration for the resolver and the runner.

pub mod settings;

pub use settings::{FormulaFailurePolicy, ResolverSettings, UnknownPolicyError};
