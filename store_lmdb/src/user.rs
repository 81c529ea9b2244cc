//! LMDB implementation of UserStore.

use heed::RoTxn;

use guild_store::user::UserStore;
use guild_store::StoreError;
use guild_types::{User, UserId};

use crate::environment::LmdbEnvironment;
use crate::keys::{get_record, read_id};
use crate::store::LmdbStore;
use crate::LmdbError;

impl LmdbEnvironment {
    pub(crate) fn user_in(&self, txn: &RoTxn, id: UserId) -> Result<Option<User>, LmdbError> {
        get_record(&self.users_db, txn, id.get())
    }

    pub(crate) fn user_id_by_email_in(
        &self,
        txn: &RoTxn,
        email: &str,
    ) -> Result<Option<UserId>, LmdbError> {
        match self.user_by_email_db.get(txn, email.as_bytes())? {
            Some(bytes) => Ok(Some(UserId::new(read_id(bytes)?))),
            None => Ok(None),
        }
    }
}

impl UserStore for LmdbStore {
    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.env.user_in(&rtxn, id)?)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        match self.env.user_id_by_email_in(&rtxn, email)? {
            Some(id) => Ok(self.env.user_in(&rtxn, id)?),
            None => Ok(None),
        }
    }

    fn user_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let count = self.env.users_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}
