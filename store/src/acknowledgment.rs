//! Acknowledgment edge storage trait.

use crate::StoreError;
use guild_types::{AcknowledgmentId, GroupAcknowledgment, GroupId};

pub trait AcknowledgmentStore {
    fn get_acknowledgment(
        &self,
        id: AcknowledgmentId,
    ) -> Result<Option<GroupAcknowledgment>, StoreError>;

    fn find_acknowledgment(
        &self,
        asking: GroupId,
        validator: GroupId,
    ) -> Result<Option<GroupAcknowledgment>, StoreError>;

    /// Edges where `group` is the asking side, pending or validated.
    fn acknowledgments_asked_by(
        &self,
        group: GroupId,
    ) -> Result<Vec<GroupAcknowledgment>, StoreError>;

    /// Edges where `group` is the validator side, pending or validated.
    fn acknowledgments_validated_by(
        &self,
        group: GroupId,
    ) -> Result<Vec<GroupAcknowledgment>, StoreError>;
}
