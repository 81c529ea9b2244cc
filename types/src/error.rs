//! Top-level error type shared across crates.

use thiserror::Error;

/// Errors raised while constructing or validating core values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuildError {
    #[error("rank {0} is outside [0, 10]")]
    InvalidRank(i64),

    #[error("invalid group name: {0}")]
    InvalidName(String),

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("{0}")]
    Other(String),
}
