//! LMDB implementation of InvitationStore.

use heed::RoTxn;

use guild_store::invitation::InvitationStore;
use guild_store::StoreError;
use guild_types::{GroupId, GroupInvitation, InvitationId, UserId};

use crate::environment::LmdbEnvironment;
use crate::keys::{get_indexed, get_record, scan_prefix, RawDb};
use crate::store::LmdbStore;
use crate::LmdbError;

impl LmdbEnvironment {
    pub(crate) fn invitation_in(
        &self,
        txn: &RoTxn,
        id: InvitationId,
    ) -> Result<Option<GroupInvitation>, LmdbError> {
        get_record(&self.invitations_db, txn, id.get())
    }

    pub(crate) fn invitation_id_for(
        &self,
        txn: &RoTxn,
        invitee: UserId,
        group: GroupId,
    ) -> Result<Option<InvitationId>, LmdbError> {
        Ok(
            get_indexed(&self.invitation_by_user_db, txn, invitee.get(), group.get())?
                .map(InvitationId::new),
        )
    }

    pub(crate) fn invitations_via(
        &self,
        txn: &RoTxn,
        index: &RawDb,
        prefix: u64,
    ) -> Result<Vec<GroupInvitation>, LmdbError> {
        let mut rows = Vec::new();
        for id in scan_prefix(index, txn, prefix)? {
            let row = self
                .invitation_in(txn, InvitationId::new(id))?
                .ok_or_else(|| LmdbError::Corruption(format!("dangling index to invitation#{id}")))?;
            rows.push(row);
        }
        Ok(rows)
    }
}

impl InvitationStore for LmdbStore {
    fn get_invitation(&self, id: InvitationId) -> Result<Option<GroupInvitation>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.env.invitation_in(&rtxn, id)?)
    }

    fn find_invitation(
        &self,
        invitee: UserId,
        group: GroupId,
    ) -> Result<Option<GroupInvitation>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        match self.env.invitation_id_for(&rtxn, invitee, group)? {
            Some(id) => Ok(self.env.invitation_in(&rtxn, id)?),
            None => Ok(None),
        }
    }

    fn invitations_of_user(&self, invitee: UserId) -> Result<Vec<GroupInvitation>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self
            .env
            .invitations_via(&rtxn, &self.env.invitation_by_user_db, invitee.get())?)
    }

    fn invitations_of_group(&self, group: GroupId) -> Result<Vec<GroupInvitation>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self
            .env
            .invitations_via(&rtxn, &self.env.invitation_by_group_db, group.get())?)
    }
}
