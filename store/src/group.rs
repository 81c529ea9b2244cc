//! Group storage trait.

use crate::StoreError;
use guild_types::{Group, GroupId};

pub trait GroupStore {
    fn get_group(&self, id: GroupId) -> Result<Option<Group>, StoreError>;

    /// Every group, ordered by id.
    fn iter_groups(&self) -> Result<Vec<Group>, StoreError>;
}
