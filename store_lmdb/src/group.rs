//! LMDB implementation of GroupStore.

use heed::RoTxn;

use guild_store::group::GroupStore;
use guild_store::StoreError;
use guild_types::{Group, GroupId};

use crate::environment::LmdbEnvironment;
use crate::keys::{all_records, get_record};
use crate::store::LmdbStore;
use crate::LmdbError;

impl LmdbEnvironment {
    pub(crate) fn group_in(&self, txn: &RoTxn, id: GroupId) -> Result<Option<Group>, LmdbError> {
        get_record(&self.groups_db, txn, id.get())
    }
}

impl GroupStore for LmdbStore {
    fn get_group(&self, id: GroupId) -> Result<Option<Group>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.env.group_in(&rtxn, id)?)
    }

    fn iter_groups(&self) -> Result<Vec<Group>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(all_records(&self.env.groups_db, &rtxn)?)
    }
}
