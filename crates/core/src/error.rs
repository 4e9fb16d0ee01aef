//! Error types for the core crate.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Milestone identifier not present in the milestone table.
    #[error("Unknown milestone: {0}")]
    UnknownMilestone(String),

    /// Invalid address format.
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Amount could not be parsed as a non-negative ether value.
    #[error("Invalid ether amount: {0}")]
    InvalidAmount(String),
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
