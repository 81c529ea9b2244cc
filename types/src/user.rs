//! Users and the authenticated actor.

use crate::error::GuildError;
use crate::ids::UserId;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    /// Platform-level administrator; bypasses every per-group threshold.
    pub is_global_admin: bool,
    pub created: Timestamp,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor {
            user: self.id,
            is_global_admin: self.is_global_admin,
        }
    }
}

/// Registration input.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub is_global_admin: bool,
}

impl NewUser {
    /// Normalise the email (trimmed, lowercase) and check its shape.
    pub fn normalized_email(&self) -> Result<String, GuildError> {
        let email = self.email.trim().to_lowercase();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
            _ => Err(GuildError::InvalidEmail(self.email.clone())),
        }
    }
}

/// The identity on whose behalf an operation runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user: UserId,
    pub is_global_admin: bool,
}
