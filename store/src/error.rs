//! Failures of a conditional write or a lookup.
//!
//! `Conflict` and `Duplicate` describe the data, not the backend: the
//! batch was well formed but the rows it was conditioned on changed, or
//! it would have broken a uniqueness rule. Nothing was written in either
//! case. The remaining variants are backend faults.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A mutation addressed a record that does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A second membership or invitation for one (user, group) pair, a
    /// second edge for one group pair, or a reused email.
    #[error("uniqueness violated: {0}")]
    Duplicate(String),

    /// A precondition of the batch no longer holds.
    #[error("precondition failed: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("record encoding error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    /// Whether the batch was rejected because of the data it touched,
    /// with the store left unchanged and healthy.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Duplicate(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_told_apart_from_faults() {
        assert!(StoreError::Conflict("membership#4 version 2".into()).is_rejection());
        assert!(StoreError::Duplicate("user#1 in group#2".into()).is_rejection());
        assert!(!StoreError::Backend("disk full".into()).is_rejection());
        assert!(!StoreError::NotFound("group#9".into()).is_rejection());
    }
}
