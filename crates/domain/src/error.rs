//! Unified error types for the domain layer
//!
//! Provides a common error type for configuration validation and property
//! path handling, so callers never have to fall back to `String` errors.

use thiserror::Error;

use crate::value_objects::FormulaError;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A dotted property path was malformed
    #[error("Invalid property path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Writing through a path hit a non-object value
    #[error("Cannot set '{path}': segment '{segment}' is not an object")]
    PathConflict { path: String, segment: String },

    /// Formula failed to parse or evaluate
    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    /// Index out of range for an ordered collection
    #[error("Index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
}

impl DomainError {
    /// Creates a validation error for configuration rule violations.
    ///
    /// # Example
    /// ```ignore
    /// if change.key.is_empty() {
    ///     return Err(DomainError::validation("Actor change key cannot be empty"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a path conflict error
    pub fn path_conflict(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::PathConflict {
            path: path.into(),
            segment: segment.into(),
        }
    }
}
