use crate::authz::Denial;
use guild_store::StoreError;
use guild_types::GuildError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("authentication required")]
    Unauthenticated,

    /// Absent, or present but invisible to the actor.
    #[error("{0} not found")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Duplicate record or a concurrent write; retryable.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl GroupError {
    pub fn status(&self) -> StatusClass {
        match self {
            Self::Unauthenticated => StatusClass::Unauthenticated,
            Self::NotFound(_) => StatusClass::NotFound,
            Self::Forbidden(_) => StatusClass::Forbidden,
            Self::InvalidInput(_) => StatusClass::InvalidInput,
            Self::Conflict(_) => StatusClass::Conflict,
            Self::Store(_) => StatusClass::Internal,
        }
    }

    /// Only conflicts may succeed on a plain retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub(crate) fn not_found(what: impl fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }
}

impl From<StoreError> for GroupError {
    fn from(e: StoreError) -> Self {
        if e.is_rejection() {
            GroupError::Conflict(e.to_string())
        } else {
            GroupError::Store(e)
        }
    }
}

impl From<Denial> for GroupError {
    fn from(d: Denial) -> Self {
        match d {
            Denial::InvalidInput(msg) => GroupError::InvalidInput(msg),
            Denial::Forbidden(msg) => GroupError::Forbidden(msg),
        }
    }
}

impl From<GuildError> for GroupError {
    fn from(e: GuildError) -> Self {
        GroupError::InvalidInput(e.to_string())
    }
}

/// Outcome kinds a transport layer renders as its own status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Ok,
    Created,
    NoContent,
    Unauthenticated,
    Forbidden,
    NotFound,
    InvalidInput,
    Conflict,
    /// Backend failure; not an engine decision.
    Internal,
}

impl StatusClass {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Created | Self::NoContent)
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::Created => "created",
            Self::NoContent => "no_content",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::InvalidInput => "invalid_input",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// A successful mutation and how to report it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub status: StatusClass,
    pub value: T,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            status: StatusClass::Ok,
            value,
        }
    }

    pub fn created(value: T) -> Self {
        Self {
            status: StatusClass::Created,
            value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            status: self.status,
            value: f(self.value),
        }
    }
}

impl Outcome<()> {
    pub fn no_content() -> Self {
        Self {
            status: StatusClass::NoContent,
            value: (),
        }
    }
}
