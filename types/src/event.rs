//! Events emitted after a committed state change.

use crate::ids::{AcknowledgmentId, GroupId, InvitationId, MembershipId, UserId};
use crate::rank::Rank;
use serde::{Deserialize, Serialize};

/// A committed change, published to every configured [`Notifier`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GroupEvent {
    GroupCreated {
        group: GroupId,
        by: UserId,
    },
    GroupUpdated {
        group: GroupId,
        by: UserId,
    },
    GroupDeleted {
        group: GroupId,
        by: UserId,
    },
    MemberJoined {
        group: GroupId,
        user: UserId,
        membership: MembershipId,
        rank: Rank,
    },
    JoinRequested {
        group: GroupId,
        user: UserId,
        membership: MembershipId,
    },
    JoinAccepted {
        group: GroupId,
        user: UserId,
        membership: MembershipId,
        by: UserId,
    },
    JoinRejected {
        group: GroupId,
        user: UserId,
        by: UserId,
    },
    RankChanged {
        group: GroupId,
        user: UserId,
        membership: MembershipId,
        from: Rank,
        to: Rank,
        by: UserId,
    },
    /// A kick, or a leave when `by == user`.
    MemberRemoved {
        group: GroupId,
        user: UserId,
        by: UserId,
    },
    InvitationCreated {
        invitation: InvitationId,
        group: GroupId,
        invitee: UserId,
        emitted_by_invitee: bool,
    },
    InvitationConfirmed {
        invitation: InvitationId,
        group: GroupId,
        invitee: UserId,
        membership: MembershipId,
    },
    InvitationDestroyed {
        invitation: InvitationId,
        group: GroupId,
        invitee: UserId,
    },
    AcknowledgmentRequested {
        acknowledgment: AcknowledgmentId,
        asking: GroupId,
        validator: GroupId,
    },
    AcknowledgmentValidated {
        acknowledgment: AcknowledgmentId,
        asking: GroupId,
        validator: GroupId,
    },
    AcknowledgmentRemoved {
        asking: GroupId,
        validator: GroupId,
    },
    UserRegistered {
        user: UserId,
    },
}

impl GroupEvent {
    /// Stable event name, matching the serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GroupCreated { .. } => "group_created",
            Self::GroupUpdated { .. } => "group_updated",
            Self::GroupDeleted { .. } => "group_deleted",
            Self::MemberJoined { .. } => "member_joined",
            Self::JoinRequested { .. } => "join_requested",
            Self::JoinAccepted { .. } => "join_accepted",
            Self::JoinRejected { .. } => "join_rejected",
            Self::RankChanged { .. } => "rank_changed",
            Self::MemberRemoved { .. } => "member_removed",
            Self::InvitationCreated { .. } => "invitation_created",
            Self::InvitationConfirmed { .. } => "invitation_confirmed",
            Self::InvitationDestroyed { .. } => "invitation_destroyed",
            Self::AcknowledgmentRequested { .. } => "acknowledgment_requested",
            Self::AcknowledgmentValidated { .. } => "acknowledgment_validated",
            Self::AcknowledgmentRemoved { .. } => "acknowledgment_removed",
            Self::UserRegistered { .. } => "user_registered",
        }
    }

    /// The group the event concerns, if any.
    pub fn group(&self) -> Option<GroupId> {
        match self {
            Self::GroupCreated { group, .. }
            | Self::GroupUpdated { group, .. }
            | Self::GroupDeleted { group, .. }
            | Self::MemberJoined { group, .. }
            | Self::JoinRequested { group, .. }
            | Self::JoinAccepted { group, .. }
            | Self::JoinRejected { group, .. }
            | Self::RankChanged { group, .. }
            | Self::MemberRemoved { group, .. }
            | Self::InvitationCreated { group, .. }
            | Self::InvitationConfirmed { group, .. }
            | Self::InvitationDestroyed { group, .. } => Some(*group),
            Self::AcknowledgmentRequested { asking, .. }
            | Self::AcknowledgmentValidated { asking, .. }
            | Self::AcknowledgmentRemoved { asking, .. } => Some(*asking),
            Self::UserRegistered { .. } => None,
        }
    }
}

/// Receives events after the state change is durable.
///
/// Called synchronously with no store lock held. Implementations must not
/// block for long; slow delivery belongs on a background task.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &GroupEvent);
}
