//! Common utility functions shared across the Summoner crates.
//!
//! # Design Principles
//!
//! - **Pure functions only** - no side effects, no I/O
//! - **Minimal dependencies** - only serde_json for document access

pub mod path;

// Re-export commonly used functions at crate root for convenience
pub use path::{expand_object, flatten_object, get_property, set_property, PropertyPath};
