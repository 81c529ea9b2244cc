//! Schema version and the store-wide id counter, kept in `meta`.

use heed::RoTxn;

use guild_store::meta::MetaStore;
use guild_store::StoreError;

use crate::environment::LmdbEnvironment;
use crate::keys::read_id;
use crate::store::LmdbStore;
use crate::LmdbError;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
const NEXT_ID_KEY: &[u8] = b"next_id";

impl LmdbEnvironment {
    /// Hand out the next id. The counter starts at 1 and is bumped in its
    /// own write transaction, so ids are never reused.
    pub(crate) fn allocate_id(&self) -> Result<u64, LmdbError> {
        let mut wtxn = self.env().write_txn()?;
        let next = self.next_id_in(&wtxn)?;
        let following = next
            .checked_add(1)
            .ok_or_else(|| LmdbError::Corruption("id counter exhausted".to_string()))?;
        self.meta_db
            .put(&mut wtxn, NEXT_ID_KEY, &following.to_be_bytes())?;
        wtxn.commit()?;
        Ok(next)
    }

    fn next_id_in(&self, txn: &RoTxn) -> Result<u64, LmdbError> {
        match self.meta_db.get(txn, NEXT_ID_KEY)? {
            Some(bytes) => read_id(bytes),
            None => Ok(1),
        }
    }
}

impl MetaStore for LmdbStore {
    fn get_schema_version(&self) -> Result<u32, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        let val = self
            .env
            .meta_db
            .get(&rtxn, SCHEMA_VERSION_KEY)
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization(
                        "schema_version has unexpected byte length".to_string(),
                    )
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        let bytes = version.to_le_bytes();
        let mut wtxn = self.env.env().write_txn().map_err(LmdbError::from)?;
        self.env
            .meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
