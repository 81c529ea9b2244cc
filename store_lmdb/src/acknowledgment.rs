//! LMDB implementation of AcknowledgmentStore.

use heed::RoTxn;

use guild_store::acknowledgment::AcknowledgmentStore;
use guild_store::StoreError;
use guild_types::{AcknowledgmentId, GroupAcknowledgment, GroupId};

use crate::environment::LmdbEnvironment;
use crate::keys::{get_indexed, get_record, scan_prefix, RawDb};
use crate::store::LmdbStore;
use crate::LmdbError;

impl LmdbEnvironment {
    pub(crate) fn acknowledgment_in(
        &self,
        txn: &RoTxn,
        id: AcknowledgmentId,
    ) -> Result<Option<GroupAcknowledgment>, LmdbError> {
        get_record(&self.acknowledgments_db, txn, id.get())
    }

    pub(crate) fn acknowledgment_id_for(
        &self,
        txn: &RoTxn,
        asking: GroupId,
        validator: GroupId,
    ) -> Result<Option<AcknowledgmentId>, LmdbError> {
        Ok(
            get_indexed(&self.ack_by_asking_db, txn, asking.get(), validator.get())?
                .map(AcknowledgmentId::new),
        )
    }

    pub(crate) fn acknowledgments_via(
        &self,
        txn: &RoTxn,
        index: &RawDb,
        prefix: u64,
    ) -> Result<Vec<GroupAcknowledgment>, LmdbError> {
        let mut rows = Vec::new();
        for id in scan_prefix(index, txn, prefix)? {
            let row = self
                .acknowledgment_in(txn, AcknowledgmentId::new(id))?
                .ok_or_else(|| LmdbError::Corruption(format!("dangling index to ack#{id}")))?;
            rows.push(row);
        }
        Ok(rows)
    }
}

impl AcknowledgmentStore for LmdbStore {
    fn get_acknowledgment(
        &self,
        id: AcknowledgmentId,
    ) -> Result<Option<GroupAcknowledgment>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.env.acknowledgment_in(&rtxn, id)?)
    }

    fn find_acknowledgment(
        &self,
        asking: GroupId,
        validator: GroupId,
    ) -> Result<Option<GroupAcknowledgment>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        match self.env.acknowledgment_id_for(&rtxn, asking, validator)? {
            Some(id) => Ok(self.env.acknowledgment_in(&rtxn, id)?),
            None => Ok(None),
        }
    }

    fn acknowledgments_asked_by(
        &self,
        group: GroupId,
    ) -> Result<Vec<GroupAcknowledgment>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self
            .env
            .acknowledgments_via(&rtxn, &self.env.ack_by_asking_db, group.get())?)
    }

    fn acknowledgments_validated_by(
        &self,
        group: GroupId,
    ) -> Result<Vec<GroupAcknowledgment>, StoreError> {
        let rtxn = self.env.env().read_txn().map_err(LmdbError::from)?;
        Ok(self
            .env
            .acknowledgments_via(&rtxn, &self.env.ack_by_validator_db, group.get())?)
    }
}
