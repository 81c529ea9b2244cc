//! Conditional write batches.
//!
//! A [`WriteBatch`] carries the facts a decision was based on
//! ([`Precondition`]s) together with the writes it wants to make
//! ([`Mutation`]s). Backends re-check every precondition inside the same
//! write transaction that applies the mutations, so a decision made on a
//! stale read fails with [`StoreError::Conflict`](crate::StoreError)
//! instead of overwriting a concurrent change.

use std::fmt;

use guild_types::{
    AcknowledgmentId, Group, GroupAcknowledgment, GroupId, GroupInvitation, GroupMember,
    InvitationId, MembershipId, User, UserId,
};

/// A fact that must still hold at commit time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Precondition {
    GroupPresent(GroupId),
    /// The membership exists and has not been updated since it was read.
    MembershipVersion { id: MembershipId, version: u64 },
    MembershipAbsent { user: UserId, group: GroupId },
    InvitationPresent(InvitationId),
    InvitationAbsent { invitee: UserId, group: GroupId },
    /// The edge exists and is not yet validated.
    AcknowledgmentPending(AcknowledgmentId),
    AcknowledgmentPresent(AcknowledgmentId),
    AcknowledgmentAbsent { asking: GroupId, validator: GroupId },
    UserEmailAbsent(String),
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupPresent(id) => write!(f, "{id} exists"),
            Self::MembershipVersion { id, version } => write!(f, "{id} at version {version}"),
            Self::MembershipAbsent { user, group } => write!(f, "no membership of {user} in {group}"),
            Self::InvitationPresent(id) => write!(f, "{id} exists"),
            Self::InvitationAbsent { invitee, group } => {
                write!(f, "no invitation of {invitee} to {group}")
            }
            Self::AcknowledgmentPending(id) => write!(f, "{id} is pending"),
            Self::AcknowledgmentPresent(id) => write!(f, "{id} exists"),
            Self::AcknowledgmentAbsent { asking, validator } => {
                write!(f, "no acknowledgment of {asking} by {validator}")
            }
            Self::UserEmailAbsent(email) => write!(f, "email {email} is free"),
        }
    }
}

/// A single write. Puts insert or replace by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    PutUser(User),
    PutGroup(Group),
    /// Removes the group with its memberships, invitations and
    /// acknowledgment edges on either side.
    DeleteGroup(GroupId),
    PutMembership(GroupMember),
    DeleteMembership(MembershipId),
    PutInvitation(GroupInvitation),
    DeleteInvitation(InvitationId),
    PutAcknowledgment(GroupAcknowledgment),
    DeleteAcknowledgment(AcknowledgmentId),
}

/// Ordered preconditions plus ordered mutations, committed as one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    preconditions: Vec<Precondition>,
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn apply(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn push_precondition(&mut self, precondition: Precondition) {
        self.preconditions.push(precondition);
    }

    pub fn push_mutation(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn preconditions(&self) -> &[Precondition] {
        &self.preconditions
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Precondition>, Vec<Mutation>) {
        (self.preconditions, self.mutations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_order() {
        let batch = WriteBatch::new()
            .require(Precondition::GroupPresent(GroupId::new(1)))
            .require(Precondition::MembershipAbsent {
                user: UserId::new(2),
                group: GroupId::new(1),
            })
            .apply(Mutation::DeleteMembership(MembershipId::new(3)))
            .apply(Mutation::DeleteGroup(GroupId::new(1)));
        assert_eq!(batch.preconditions().len(), 2);
        assert_eq!(
            batch.mutations()[1],
            Mutation::DeleteGroup(GroupId::new(1))
        );
    }

    #[test]
    fn precondition_messages_name_the_records() {
        let p = Precondition::MembershipVersion {
            id: MembershipId::new(9),
            version: 4,
        };
        assert_eq!(p.to_string(), "membership#9 at version 4");
    }

    #[test]
    fn empty_batch_has_no_mutations() {
        let batch = WriteBatch::new().require(Precondition::GroupPresent(GroupId::new(1)));
        assert!(batch.is_empty());
    }
}
