//! Error types for the guard core.

use thiserror::Error;

/// Errors surfaced by the guard core.
///
/// Operational signals (rate-limit exceeded, injection detected) are not
/// errors; they surface as block verdicts in [`crate::Assessment`].
#[derive(Debug, Error)]
pub enum GuardError {
    /// Malformed input handed to an untyped boundary, e.g. a config patch
    /// that is not valid JSON.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value is out of range or non-finite. The previous
    /// configuration remains in effect.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;
