//! The complete LMDB-backed [`Store`].

use std::path::Path;

use guild_store::{Store, StoreError, WriteBatch};

use crate::environment::LmdbEnvironment;
use crate::migration::Migrator;
use crate::LmdbError;

/// Every storage trait over one [`LmdbEnvironment`].
pub struct LmdbStore {
    pub(crate) env: LmdbEnvironment,
}

impl LmdbStore {
    /// Open the environment at `path` and bring its schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        let store = Self {
            env: LmdbEnvironment::open(path, map_size)?,
        };
        Migrator::run(&store)?;
        Ok(store)
    }

    pub fn environment(&self) -> &LmdbEnvironment {
        &self.env
    }
}

impl Store for LmdbStore {
    fn allocate_id(&self) -> Result<u64, StoreError> {
        Ok(self.env.allocate_id()?)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.env.commit_batch(batch)
    }
}
