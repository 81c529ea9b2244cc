//! Conditional commit: every precondition is re-read and every mutation
//! applied inside one LMDB write transaction.
//!
//! If a precondition fails, or a mutation errors, the transaction is
//! dropped without committing and nothing is written.

use heed::{RoTxn, RwTxn};

use guild_store::{Mutation, Precondition, StoreError, WriteBatch};
use guild_types::{
    AcknowledgmentId, Group, GroupAcknowledgment, GroupId, GroupInvitation, GroupMember,
    InvitationId, MembershipId, User,
};

use crate::environment::LmdbEnvironment;
use crate::keys::{all_records, encode, pair_key, scan_prefix};
use crate::LmdbError;

impl LmdbEnvironment {
    pub(crate) fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut wtxn = self.env().write_txn().map_err(LmdbError::from)?;
        let (preconditions, mutations) = batch.into_parts();

        for precondition in &preconditions {
            if !self.holds(&wtxn, precondition)? {
                tracing::debug!(%precondition, "write batch rejected");
                return Err(StoreError::Conflict(precondition.to_string()));
            }
        }

        for mutation in mutations {
            self.apply(&mut wtxn, mutation)?;
        }

        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn holds(&self, txn: &RoTxn, precondition: &Precondition) -> Result<bool, LmdbError> {
        Ok(match precondition {
            Precondition::GroupPresent(id) => self.group_in(txn, *id)?.is_some(),
            Precondition::MembershipVersion { id, version } => self
                .membership_in(txn, *id)?
                .is_some_and(|m| m.version == *version),
            Precondition::MembershipAbsent { user, group } => {
                self.membership_id_for(txn, *user, *group)?.is_none()
            }
            Precondition::InvitationPresent(id) => self.invitation_in(txn, *id)?.is_some(),
            Precondition::InvitationAbsent { invitee, group } => {
                self.invitation_id_for(txn, *invitee, *group)?.is_none()
            }
            Precondition::AcknowledgmentPending(id) => self
                .acknowledgment_in(txn, *id)?
                .is_some_and(|a| !a.validated),
            Precondition::AcknowledgmentPresent(id) => self.acknowledgment_in(txn, *id)?.is_some(),
            Precondition::AcknowledgmentAbsent { asking, validator } => self
                .acknowledgment_id_for(txn, *asking, *validator)?
                .is_none(),
            Precondition::UserEmailAbsent(email) => {
                self.user_id_by_email_in(txn, email)?.is_none()
            }
        })
    }

    fn apply(&self, wtxn: &mut RwTxn, mutation: Mutation) -> Result<(), StoreError> {
        match mutation {
            Mutation::PutUser(user) => self.put_user(wtxn, &user),
            Mutation::PutGroup(group) => self.put_group(wtxn, &group),
            Mutation::DeleteGroup(id) => self.delete_group(wtxn, id),
            Mutation::PutMembership(member) => self.put_membership(wtxn, &member),
            Mutation::DeleteMembership(id) => self.delete_membership(wtxn, id),
            Mutation::PutInvitation(invitation) => self.put_invitation(wtxn, &invitation),
            Mutation::DeleteInvitation(id) => self.delete_invitation(wtxn, id),
            Mutation::PutAcknowledgment(ack) => self.put_acknowledgment(wtxn, &ack),
            Mutation::DeleteAcknowledgment(id) => self.delete_acknowledgment(wtxn, id),
        }
    }

    // ── Users ───────────────────────────────────────────────────────────

    fn put_user(&self, wtxn: &mut RwTxn, user: &User) -> Result<(), StoreError> {
        if let Some(owner) = self.user_id_by_email_in(wtxn, &user.email)? {
            if owner != user.id {
                return Err(StoreError::Duplicate(format!("email {}", user.email)));
            }
        }
        if let Some(previous) = self.user_in(wtxn, user.id)? {
            if previous.email != user.email {
                self.user_by_email_db
                    .delete(wtxn, previous.email.as_bytes())
                    .map_err(LmdbError::from)?;
            }
        }
        let bytes = encode(user)?;
        self.users_db
            .put(wtxn, &user.id.to_be_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.user_by_email_db
            .put(wtxn, user.email.as_bytes(), &user.id.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Groups ──────────────────────────────────────────────────────────

    fn put_group(&self, wtxn: &mut RwTxn, group: &Group) -> Result<(), StoreError> {
        let bytes = encode(group)?;
        self.groups_db
            .put(wtxn, &group.id.to_be_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_group(&self, wtxn: &mut RwTxn, id: GroupId) -> Result<(), StoreError> {
        if self.group_in(wtxn, id)?.is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        for membership in scan_prefix(&self.member_by_group_db, wtxn, id.get())? {
            self.delete_membership(wtxn, MembershipId::new(membership))?;
        }
        for invitation in scan_prefix(&self.invitation_by_group_db, wtxn, id.get())? {
            self.delete_invitation(wtxn, InvitationId::new(invitation))?;
        }
        let mut edges = scan_prefix(&self.ack_by_asking_db, wtxn, id.get())?;
        edges.extend(scan_prefix(&self.ack_by_validator_db, wtxn, id.get())?);
        for edge in edges {
            self.delete_acknowledgment(wtxn, AcknowledgmentId::new(edge))?;
        }
        let dependents: Vec<Group> = all_records::<Group>(&self.groups_db, wtxn)?
            .into_iter()
            .filter(|group| group.resp_group == Some(id))
            .collect();
        for mut group in dependents {
            group.resp_group = None;
            self.put_group(wtxn, &group)?;
        }
        self.groups_db
            .delete(wtxn, &id.to_be_bytes())
            .map_err(LmdbError::from)?;
        tracing::debug!(group = %id, "group deleted with dependent rows");
        Ok(())
    }

    // ── Memberships ─────────────────────────────────────────────────────

    fn put_membership(&self, wtxn: &mut RwTxn, member: &GroupMember) -> Result<(), StoreError> {
        if let Some(existing) = self.membership_id_for(wtxn, member.user, member.group)? {
            if existing != member.id {
                return Err(StoreError::Duplicate(format!(
                    "membership of {} in {}",
                    member.user, member.group
                )));
            }
        }
        let bytes = encode(member)?;
        let id = member.id.to_be_bytes();
        self.memberships_db
            .put(wtxn, &id, &bytes)
            .map_err(LmdbError::from)?;
        self.member_by_user_db
            .put(wtxn, &pair_key(member.user.get(), member.group.get()), &id)
            .map_err(LmdbError::from)?;
        self.member_by_group_db
            .put(wtxn, &pair_key(member.group.get(), member.user.get()), &id)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_membership(&self, wtxn: &mut RwTxn, id: MembershipId) -> Result<(), StoreError> {
        let member = self
            .membership_in(wtxn, id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.memberships_db
            .delete(wtxn, &id.to_be_bytes())
            .map_err(LmdbError::from)?;
        self.member_by_user_db
            .delete(wtxn, &pair_key(member.user.get(), member.group.get()))
            .map_err(LmdbError::from)?;
        self.member_by_group_db
            .delete(wtxn, &pair_key(member.group.get(), member.user.get()))
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Invitations ─────────────────────────────────────────────────────

    fn put_invitation(
        &self,
        wtxn: &mut RwTxn,
        invitation: &GroupInvitation,
    ) -> Result<(), StoreError> {
        if let Some(existing) =
            self.invitation_id_for(wtxn, invitation.invitee, invitation.group)?
        {
            if existing != invitation.id {
                return Err(StoreError::Duplicate(format!(
                    "invitation of {} to {}",
                    invitation.invitee, invitation.group
                )));
            }
        }
        let bytes = encode(invitation)?;
        let id = invitation.id.to_be_bytes();
        self.invitations_db
            .put(wtxn, &id, &bytes)
            .map_err(LmdbError::from)?;
        self.invitation_by_user_db
            .put(
                wtxn,
                &pair_key(invitation.invitee.get(), invitation.group.get()),
                &id,
            )
            .map_err(LmdbError::from)?;
        self.invitation_by_group_db
            .put(
                wtxn,
                &pair_key(invitation.group.get(), invitation.invitee.get()),
                &id,
            )
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_invitation(&self, wtxn: &mut RwTxn, id: InvitationId) -> Result<(), StoreError> {
        let invitation = self
            .invitation_in(wtxn, id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.invitations_db
            .delete(wtxn, &id.to_be_bytes())
            .map_err(LmdbError::from)?;
        self.invitation_by_user_db
            .delete(
                wtxn,
                &pair_key(invitation.invitee.get(), invitation.group.get()),
            )
            .map_err(LmdbError::from)?;
        self.invitation_by_group_db
            .delete(
                wtxn,
                &pair_key(invitation.group.get(), invitation.invitee.get()),
            )
            .map_err(LmdbError::from)?;
        Ok(())
    }

    // ── Acknowledgments ─────────────────────────────────────────────────

    fn put_acknowledgment(
        &self,
        wtxn: &mut RwTxn,
        ack: &GroupAcknowledgment,
    ) -> Result<(), StoreError> {
        if let Some(existing) =
            self.acknowledgment_id_for(wtxn, ack.asking_group, ack.validator_group)?
        {
            if existing != ack.id {
                return Err(StoreError::Duplicate(format!(
                    "acknowledgment of {} by {}",
                    ack.asking_group, ack.validator_group
                )));
            }
        }
        let bytes = encode(ack)?;
        let id = ack.id.to_be_bytes();
        self.acknowledgments_db
            .put(wtxn, &id, &bytes)
            .map_err(LmdbError::from)?;
        self.ack_by_asking_db
            .put(
                wtxn,
                &pair_key(ack.asking_group.get(), ack.validator_group.get()),
                &id,
            )
            .map_err(LmdbError::from)?;
        self.ack_by_validator_db
            .put(
                wtxn,
                &pair_key(ack.validator_group.get(), ack.asking_group.get()),
                &id,
            )
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_acknowledgment(
        &self,
        wtxn: &mut RwTxn,
        id: AcknowledgmentId,
    ) -> Result<(), StoreError> {
        let ack = self
            .acknowledgment_in(wtxn, id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.acknowledgments_db
            .delete(wtxn, &id.to_be_bytes())
            .map_err(LmdbError::from)?;
        self.ack_by_asking_db
            .delete(
                wtxn,
                &pair_key(ack.asking_group.get(), ack.validator_group.get()),
            )
            .map_err(LmdbError::from)?;
        self.ack_by_validator_db
            .delete(
                wtxn,
                &pair_key(ack.validator_group.get(), ack.asking_group.get()),
            )
            .map_err(LmdbError::from)?;
        Ok(())
    }
}
