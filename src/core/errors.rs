// src/core/errors.rs

//! Defines the primary error type used across the crate.

use thiserror::Error;

/// The error type surfaced by the commit-gate machinery. Using `thiserror`
/// keeps this declarative, matching the teacher's one-variant-per-failure
/// style for its own error enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitGateError {
    #[error("invalid configuration: {0}")]
    ConfigSyntax(String),
}
