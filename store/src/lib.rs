//! Abstract storage traits for the Guild membership engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The engine depends only on the traits.
//!
//! Reads go through the per-family traits. Writes are expressed as a
//! [`WriteBatch`] of preconditions and mutations handed to
//! [`Store::commit`], which applies all of it atomically or none of it.

pub mod acknowledgment;
pub mod batch;
pub mod error;
pub mod group;
pub mod invitation;
pub mod membership;
pub mod meta;
pub mod user;

pub use acknowledgment::AcknowledgmentStore;
pub use batch::{Mutation, Precondition, WriteBatch};
pub use error::StoreError;
pub use group::GroupStore;
pub use invitation::InvitationStore;
pub use membership::MembershipStore;
pub use meta::MetaStore;
pub use user::UserStore;

/// A complete backend: every read family plus id allocation and atomic
/// conditional commit.
pub trait Store:
    UserStore + GroupStore + MembershipStore + InvitationStore + AcknowledgmentStore + Send + Sync
{
    /// Allocate a fresh record id from the store-wide counter. Ids are
    /// never reused, even if the batch that used them is never committed.
    fn allocate_id(&self) -> Result<u64, StoreError>;

    /// Evaluate every precondition and apply every mutation in one atomic
    /// write. A failed precondition returns [`StoreError::Conflict`] and
    /// leaves the store untouched.
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}
