//! Directed recognition edges between groups.

use crate::ids::{AcknowledgmentId, GroupId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// `asking_group` requests recognition from `validator_group`.
///
/// Once validated, accepted members of the validator group can see the
/// asking group. With `delegate_admin`, the validator's administrators may
/// also edit the asking group's information. The relation may contain
/// cycles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAcknowledgment {
    pub id: AcknowledgmentId,
    pub asking_group: GroupId,
    pub validator_group: GroupId,
    pub validated: bool,
    pub delegate_admin: bool,
    pub created: Timestamp,
    pub updated: Timestamp,
}

impl GroupAcknowledgment {
    /// Whether this edge delegates administration of the asking group.
    pub fn delegates_admin(&self) -> bool {
        self.validated && self.delegate_admin
    }
}
