//! Membership storage trait.
//!
//! Memberships are indexed three ways: by id, by `(user, group)` and by
//! either side alone. The pair index is unique.

use crate::StoreError;
use guild_types::{GroupId, GroupMember, MembershipId, UserId};

pub trait MembershipStore {
    fn get_membership(&self, id: MembershipId) -> Result<Option<GroupMember>, StoreError>;

    /// The membership of `user` in `group`, pending or accepted.
    fn find_membership(
        &self,
        user: UserId,
        group: GroupId,
    ) -> Result<Option<GroupMember>, StoreError>;

    /// Every membership held by `user`, ordered by group id.
    fn memberships_of_user(&self, user: UserId) -> Result<Vec<GroupMember>, StoreError>;

    /// Every membership in `group`, ordered by user id.
    fn memberships_of_group(&self, group: GroupId) -> Result<Vec<GroupMember>, StoreError>;
}
