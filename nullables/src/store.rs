//! Nullable store: thread-safe in-memory storage for tests.
//!
//! All tables sit behind one mutex, so a commit is trivially atomic: the
//! batch is checked and applied to a scratch copy, which replaces the live
//! tables only if every step succeeded.

use guild_store::{
    AcknowledgmentStore, GroupStore, InvitationStore, MembershipStore, MetaStore, Mutation,
    Precondition, Store, StoreError, UserStore, WriteBatch,
};
use guild_types::{
    AcknowledgmentId, Group, GroupAcknowledgment, GroupId, GroupInvitation, GroupMember,
    InvitationId, MembershipId, User, UserId,
};
use std::collections::BTreeMap;
use std::sync::Mutex;

type Hook = Box<dyn FnOnce(&NullStore) + Send>;

#[derive(Clone, Default)]
struct Tables {
    next_id: u64,
    schema_version: u32,
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    memberships: BTreeMap<MembershipId, GroupMember>,
    invitations: BTreeMap<InvitationId, GroupInvitation>,
    acknowledgments: BTreeMap<AcknowledgmentId, GroupAcknowledgment>,
}

/// An in-memory implementation of every storage trait.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullStore {
    tables: Mutex<Tables>,
    /// Runs once, just before the next commit evaluates its preconditions.
    before_commit: Mutex<Option<Hook>>,
    fail_next_commit: Mutex<Option<StoreError>>,
    commits: Mutex<u64>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                next_id: 1,
                ..Tables::default()
            }),
            before_commit: Mutex::new(None),
            fail_next_commit: Mutex::new(None),
            commits: Mutex::new(0),
        }
    }

    /// Run `hook` once, right before the next commit checks its
    /// preconditions. The hook may itself commit, which simulates a
    /// concurrent writer landing between an operation's reads and its
    /// write.
    pub fn interleave(&self, hook: impl FnOnce(&NullStore) + Send + 'static) {
        *self.before_commit.lock().unwrap() = Some(Box::new(hook));
    }

    /// Make the next commit fail with `error` without writing anything.
    pub fn fail_next_commit(&self, error: StoreError) {
        *self.fail_next_commit.lock().unwrap() = Some(error);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u64 {
        *self.commits.lock().unwrap()
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Tables {
    fn membership_for(&self, user: UserId, group: GroupId) -> Option<&GroupMember> {
        self.memberships
            .values()
            .find(|m| m.user == user && m.group == group)
    }

    fn invitation_for(&self, invitee: UserId, group: GroupId) -> Option<&GroupInvitation> {
        self.invitations
            .values()
            .find(|i| i.invitee == invitee && i.group == group)
    }

    fn acknowledgment_for(&self, asking: GroupId, validator: GroupId) -> Option<&GroupAcknowledgment> {
        self.acknowledgments
            .values()
            .find(|a| a.asking_group == asking && a.validator_group == validator)
    }

    fn holds(&self, precondition: &Precondition) -> bool {
        match precondition {
            Precondition::GroupPresent(id) => self.groups.contains_key(id),
            Precondition::MembershipVersion { id, version } => self
                .memberships
                .get(id)
                .is_some_and(|m| m.version == *version),
            Precondition::MembershipAbsent { user, group } => {
                self.membership_for(*user, *group).is_none()
            }
            Precondition::InvitationPresent(id) => self.invitations.contains_key(id),
            Precondition::InvitationAbsent { invitee, group } => {
                self.invitation_for(*invitee, *group).is_none()
            }
            Precondition::AcknowledgmentPending(id) => self
                .acknowledgments
                .get(id)
                .is_some_and(|a| !a.validated),
            Precondition::AcknowledgmentPresent(id) => self.acknowledgments.contains_key(id),
            Precondition::AcknowledgmentAbsent { asking, validator } => {
                self.acknowledgment_for(*asking, *validator).is_none()
            }
            Precondition::UserEmailAbsent(email) => {
                !self.users.values().any(|u| &u.email == email)
            }
        }
    }

    fn apply(&mut self, mutation: Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::PutUser(user) => {
                if self
                    .users
                    .values()
                    .any(|u| u.email == user.email && u.id != user.id)
                {
                    return Err(StoreError::Duplicate(format!("email {}", user.email)));
                }
                self.users.insert(user.id, user);
            }
            Mutation::PutGroup(group) => {
                self.groups.insert(group.id, group);
            }
            Mutation::DeleteGroup(id) => {
                if self.groups.remove(&id).is_none() {
                    return Err(StoreError::NotFound(id.to_string()));
                }
                self.memberships.retain(|_, m| m.group != id);
                self.invitations.retain(|_, i| i.group != id);
                self.acknowledgments
                    .retain(|_, a| a.asking_group != id && a.validator_group != id);
                for group in self.groups.values_mut() {
                    if group.resp_group == Some(id) {
                        group.resp_group = None;
                    }
                }
            }
            Mutation::PutMembership(member) => {
                if self
                    .membership_for(member.user, member.group)
                    .is_some_and(|m| m.id != member.id)
                {
                    return Err(StoreError::Duplicate(format!(
                        "membership of {} in {}",
                        member.user, member.group
                    )));
                }
                self.memberships.insert(member.id, member);
            }
            Mutation::DeleteMembership(id) => {
                self.memberships
                    .remove(&id)
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            }
            Mutation::PutInvitation(invitation) => {
                if self
                    .invitation_for(invitation.invitee, invitation.group)
                    .is_some_and(|i| i.id != invitation.id)
                {
                    return Err(StoreError::Duplicate(format!(
                        "invitation of {} to {}",
                        invitation.invitee, invitation.group
                    )));
                }
                self.invitations.insert(invitation.id, invitation);
            }
            Mutation::DeleteInvitation(id) => {
                self.invitations
                    .remove(&id)
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            }
            Mutation::PutAcknowledgment(ack) => {
                if self
                    .acknowledgment_for(ack.asking_group, ack.validator_group)
                    .is_some_and(|a| a.id != ack.id)
                {
                    return Err(StoreError::Duplicate(format!(
                        "acknowledgment of {} by {}",
                        ack.asking_group, ack.validator_group
                    )));
                }
                self.acknowledgments.insert(ack.id, ack);
            }
            Mutation::DeleteAcknowledgment(id) => {
                self.acknowledgments
                    .remove(&id)
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            }
        }
        Ok(())
    }
}

impl Store for NullStore {
    fn allocate_id(&self) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id;
        tables.next_id += 1;
        Ok(id)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let hook = self.before_commit.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(self);
        }
        if let Some(error) = self.fail_next_commit.lock().unwrap().take() {
            return Err(error);
        }

        let mut tables = self.tables.lock().unwrap();
        let (preconditions, mutations) = batch.into_parts();
        if let Some(failed) = preconditions.iter().find(|p| !tables.holds(p)) {
            return Err(StoreError::Conflict(failed.to_string()));
        }
        let mut scratch = tables.clone();
        for mutation in mutations {
            scratch.apply(mutation)?;
        }
        *tables = scratch;
        *self.commits.lock().unwrap() += 1;
        Ok(())
    }
}

impl MetaStore for NullStore {
    fn get_schema_version(&self) -> Result<u32, StoreError> {
        Ok(self.tables.lock().unwrap().schema_version)
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.tables.lock().unwrap().schema_version = version;
        Ok(())
    }
}

impl UserStore for NullStore {
    fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().unwrap().users.get(&id).cloned())
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    fn user_count(&self) -> Result<u64, StoreError> {
        Ok(self.tables.lock().unwrap().users.len() as u64)
    }
}

impl GroupStore for NullStore {
    fn get_group(&self, id: GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.tables.lock().unwrap().groups.get(&id).cloned())
    }

    fn iter_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.tables.lock().unwrap().groups.values().cloned().collect())
    }
}

impl MembershipStore for NullStore {
    fn get_membership(&self, id: MembershipId) -> Result<Option<GroupMember>, StoreError> {
        Ok(self.tables.lock().unwrap().memberships.get(&id).cloned())
    }

    fn find_membership(
        &self,
        user: UserId,
        group: GroupId,
    ) -> Result<Option<GroupMember>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .membership_for(user, group)
            .cloned())
    }

    fn memberships_of_user(&self, user: UserId) -> Result<Vec<GroupMember>, StoreError> {
        let mut rows: Vec<_> = self
            .tables
            .lock()
            .unwrap()
            .memberships
            .values()
            .filter(|m| m.user == user)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.group);
        Ok(rows)
    }

    fn memberships_of_group(&self, group: GroupId) -> Result<Vec<GroupMember>, StoreError> {
        let mut rows: Vec<_> = self
            .tables
            .lock()
            .unwrap()
            .memberships
            .values()
            .filter(|m| m.group == group)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.user);
        Ok(rows)
    }
}

impl InvitationStore for NullStore {
    fn get_invitation(&self, id: InvitationId) -> Result<Option<GroupInvitation>, StoreError> {
        Ok(self.tables.lock().unwrap().invitations.get(&id).cloned())
    }

    fn find_invitation(
        &self,
        invitee: UserId,
        group: GroupId,
    ) -> Result<Option<GroupInvitation>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .invitation_for(invitee, group)
            .cloned())
    }

    fn invitations_of_user(&self, invitee: UserId) -> Result<Vec<GroupInvitation>, StoreError> {
        let mut rows: Vec<_> = self
            .tables
            .lock()
            .unwrap()
            .invitations
            .values()
            .filter(|i| i.invitee == invitee)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.group);
        Ok(rows)
    }

    fn invitations_of_group(&self, group: GroupId) -> Result<Vec<GroupInvitation>, StoreError> {
        let mut rows: Vec<_> = self
            .tables
            .lock()
            .unwrap()
            .invitations
            .values()
            .filter(|i| i.group == group)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.invitee);
        Ok(rows)
    }
}

impl AcknowledgmentStore for NullStore {
    fn get_acknowledgment(
        &self,
        id: AcknowledgmentId,
    ) -> Result<Option<GroupAcknowledgment>, StoreError> {
        Ok(self.tables.lock().unwrap().acknowledgments.get(&id).cloned())
    }

    fn find_acknowledgment(
        &self,
        asking: GroupId,
        validator: GroupId,
    ) -> Result<Option<GroupAcknowledgment>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .acknowledgment_for(asking, validator)
            .cloned())
    }

    fn acknowledgments_asked_by(
        &self,
        group: GroupId,
    ) -> Result<Vec<GroupAcknowledgment>, StoreError> {
        let mut rows: Vec<_> = self
            .tables
            .lock()
            .unwrap()
            .acknowledgments
            .values()
            .filter(|a| a.asking_group == group)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.validator_group);
        Ok(rows)
    }

    fn acknowledgments_validated_by(
        &self,
        group: GroupId,
    ) -> Result<Vec<GroupAcknowledgment>, StoreError> {
        let mut rows: Vec<_> = self
            .tables
            .lock()
            .unwrap()
            .acknowledgments
            .values()
            .filter(|a| a.validator_group == group)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.asking_group);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_types::{NewGroup, Rank, Timestamp};

    fn group(id: u64) -> Group {
        Group::from_new(GroupId::new(id), NewGroup::named("g"), Timestamp::EPOCH).unwrap()
    }

    fn member(id: u64, user: u64, group: u64) -> GroupMember {
        GroupMember::new(
            MembershipId::new(id),
            UserId::new(user),
            GroupId::new(group),
            Rank::MEMBER,
            Timestamp::EPOCH,
        )
    }

    #[test]
    fn ids_start_at_one() {
        let store = NullStore::new();
        assert_eq!(store.allocate_id().unwrap(), 1);
        assert_eq!(store.allocate_id().unwrap(), 2);
    }

    #[test]
    fn failed_mutation_rolls_back_whole_batch() {
        let store = NullStore::new();
        store
            .commit(
                WriteBatch::new()
                    .apply(Mutation::PutGroup(group(1)))
                    .apply(Mutation::PutMembership(member(5, 7, 1))),
            )
            .unwrap();

        let err = store
            .commit(
                WriteBatch::new()
                    .apply(Mutation::PutGroup(group(2)))
                    .apply(Mutation::PutMembership(member(6, 7, 1))),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert!(store.get_group(GroupId::new(2)).unwrap().is_none());
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn interleaved_writer_trips_precondition() {
        let store = NullStore::new();
        store
            .commit(WriteBatch::new().apply(Mutation::PutGroup(group(1))))
            .unwrap();
        store.interleave(|s| {
            s.commit(WriteBatch::new().apply(Mutation::PutMembership(member(5, 7, 1))))
                .unwrap();
        });
        let err = store
            .commit(
                WriteBatch::new()
                    .require(Precondition::MembershipAbsent {
                        user: UserId::new(7),
                        group: GroupId::new(1),
                    })
                    .apply(Mutation::PutMembership(member(6, 7, 1))),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(
            store
                .find_membership(UserId::new(7), GroupId::new(1))
                .unwrap()
                .map(|m| m.id),
            Some(MembershipId::new(5))
        );
    }

    #[test]
    fn delete_group_cascades() {
        let store = NullStore::new();
        store
            .commit(
                WriteBatch::new()
                    .apply(Mutation::PutGroup(group(1)))
                    .apply(Mutation::PutMembership(member(5, 7, 1))),
            )
            .unwrap();
        store
            .commit(WriteBatch::new().apply(Mutation::DeleteGroup(GroupId::new(1))))
            .unwrap();
        assert!(store.memberships_of_user(UserId::new(7)).unwrap().is_empty());
    }

    #[test]
    fn delete_group_clears_responsible_group_links() {
        let store = NullStore::new();
        let child = Group {
            resp_group: Some(GroupId::new(1)),
            ..group(2)
        };
        store
            .commit(
                WriteBatch::new()
                    .apply(Mutation::PutGroup(group(1)))
                    .apply(Mutation::PutGroup(child)),
            )
            .unwrap();
        store
            .commit(WriteBatch::new().apply(Mutation::DeleteGroup(GroupId::new(1))))
            .unwrap();
        let child = store.get_group(GroupId::new(2)).unwrap().unwrap();
        assert_eq!(child.resp_group, None);
    }

    #[test]
    fn injected_failure_writes_nothing() {
        let store = NullStore::new();
        store.fail_next_commit(StoreError::Backend("disk full".into()));
        assert!(store
            .commit(WriteBatch::new().apply(Mutation::PutGroup(group(1))))
            .is_err());
        assert!(store.iter_groups().unwrap().is_empty());
    }
}
