//! User directory storage trait.

use crate::StoreError;
use guild_types::{User, UserId};

pub trait UserStore {
    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Look a user up by normalised email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    fn user_count(&self) -> Result<u64, StoreError>;
}
