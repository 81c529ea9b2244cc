//! Invitation storage trait.

use crate::StoreError;
use guild_types::{GroupId, GroupInvitation, InvitationId, UserId};

pub trait InvitationStore {
    fn get_invitation(&self, id: InvitationId) -> Result<Option<GroupInvitation>, StoreError>;

    fn find_invitation(
        &self,
        invitee: UserId,
        group: GroupId,
    ) -> Result<Option<GroupInvitation>, StoreError>;

    fn invitations_of_user(&self, invitee: UserId) -> Result<Vec<GroupInvitation>, StoreError>;

    fn invitations_of_group(&self, group: GroupId) -> Result<Vec<GroupInvitation>, StoreError>;
}
