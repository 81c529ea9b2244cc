//! Pre-membership offers and requests.

use crate::ids::{GroupId, InvitationId, UserId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// An invitation for `invitee` to enter `group`.
///
/// `emitted_by_invitee` distinguishes a user asking to join (accepted by a
/// member with invite clearance) from a group offer (accepted by the
/// invitee). At most one exists per (invitee, group).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInvitation {
    pub id: InvitationId,
    pub group: GroupId,
    pub invitee: UserId,
    pub emitted_by_invitee: bool,
    /// The user who created the invitation.
    pub issuer: UserId,
    pub date: Timestamp,
}
