//! LMDB storage backend for the Guild membership engine.
//!
//! Implements all storage traits from `guild-store` using the `heed` LMDB
//! bindings. Every record family maps to one primary database plus the
//! index databases it needs, all within a single environment. A commit is
//! one LMDB write transaction, which LMDB serialises across threads.

pub mod acknowledgment;
pub mod environment;
pub mod error;
pub mod group;
pub mod integrity;
pub mod invitation;
mod keys;
pub mod membership;
pub mod meta;
pub mod migration;
pub mod store;
pub mod user;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use store::LmdbStore;
