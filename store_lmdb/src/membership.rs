//! LMDB implementation of MembershipStore.
//!
//! Rows live in `memberships` keyed by id; `member_by_user` and
//! `member_by_group` map the two composite orders back to the id.

use heed::RoTxn;

use guild_store::membership::MembershipStore;
use guild_store::StoreError;
use guild_types::{GroupId, GroupMember, MembershipId, UserId};

use crate::environment::LmdbEnvironment;
use crate::keys::{get_indexed, get_record, scan_prefix, RawDb};
use crate::store::LmdbStore;
use crate::LmdbError;

impl LmdbEnvironment {
    pub(crate) fn membership_in(
        &self,
        txn: &RoTxn,
        id: MembershipId,
    ) -> Result<Option<GroupMember>, LmdbError> {
        get_record(&self.memberships_db, txn, id.get())
    }

    pub(crate) fn membership_id_for(
        &self,
        txn: &RoTxn,
        user: UserId,
        group: GroupId,
    ) -> Result<Option<MembershipId>, LmdbError> {
        Ok(get_indexed(&self.member_by_user_db, txn, user.get(), group.get())?
            .map(MembershipId::new))
    }

    pub(crate) fn memberships_via(
        &self,
        txn: &RoTxn,
        index: &RawDb,
        prefix: u64,
    ) -> Result<Vec<GroupMember>, LmdbError> {
        let mut rows = Vec::new();
        for id in scan_prefix(index, txn, prefix)? {
            let row = self
                .membership_in(txn, MembershipId::new(id))?
                .ok_or_else(|| LmdbError::Corruption(format!("dangling index to membership#{id}")))?;
            rows.push(row);
        }
        Ok(rows)
    }
}

impl MembershipStore for LmdbStore {
    fn get_membership(&self, id: MembershipId) -> Result<Option<GroupMember>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.env.membership_in(&rtxn, id)?)
    }

    fn find_membership(
        &self,
        user: UserId,
        group: GroupId,
    ) -> Result<Option<GroupMember>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        match self.env.membership_id_for(&rtxn, user, group)? {
            Some(id) => Ok(self.env.membership_in(&rtxn, id)?),
            None => Ok(None),
        }
    }

    fn memberships_of_user(&self, user: UserId) -> Result<Vec<GroupMember>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self
            .env
            .memberships_via(&rtxn, &self.env.member_by_user_db, user.get())?)
    }

    fn memberships_of_group(&self, group: GroupId) -> Result<Vec<GroupMember>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self
            .env
            .memberships_via(&rtxn, &self.env.member_by_group_db, group.get())?)
    }
}
