//! Invitations: group offers and invitee-emitted asks.

use guild_store::{Mutation, Precondition, Store, WriteBatch};
use guild_types::{
    Actor, Group, GroupEvent, GroupId, GroupInvitation, GroupMember, InvitationId, UserId,
};

use crate::authz;
use crate::engine::{GroupEngine, Seat};
use crate::error::{GroupError, Outcome};

impl<S: Store> GroupEngine<S> {
    fn load_invitation(&self, id: InvitationId) -> Result<GroupInvitation, GroupError> {
        self.store
            .get_invitation(id)?
            .ok_or_else(|| GroupError::not_found(id))
    }

    /// An invitation, its group and the actor's seat there. Only the
    /// invitee and actors who may invite into the group see it.
    fn addressed_invitation(
        &self,
        actor: &Actor,
        id: InvitationId,
    ) -> Result<(GroupInvitation, Group, Seat), GroupError> {
        let invitation = self.load_invitation(id)?;
        let hidden = || GroupError::not_found(id);
        let (group, seat) = self
            .visible_group(actor, invitation.group)
            .map_err(|e| match e {
                GroupError::NotFound(_) => hidden(),
                other => other,
            })?;
        if invitation.invitee != actor.user && !authz::can_invite(&seat.state(), &group) {
            tracing::debug!(invitation = %id, user = %actor.user, "invitation hidden from actor");
            return Err(hidden());
        }
        Ok((invitation, group, seat))
    }

    /// Record an offer (`emitted_by_invitee == false`, needs invite
    /// clearance) or an ask (the actor asks for themself, and the group
    /// must accept asks).
    pub fn create_invitation(
        &self,
        actor: &Actor,
        group_id: GroupId,
        invitee: UserId,
        emitted_by_invitee: bool,
    ) -> Result<Outcome<GroupInvitation>, GroupError> {
        let (group, seat) = self.visible_group(actor, group_id)?;
        if self.store.get_user(invitee)?.is_none() {
            return Err(GroupError::not_found(invitee));
        }

        if emitted_by_invitee {
            if invitee != actor.user {
                return Err(GroupError::Forbidden(
                    "only the invitee may ask to join".to_string(),
                ));
            }
            if !group.can_anyone_ask && !actor.is_global_admin {
                return Err(GroupError::Forbidden(format!(
                    "{group_id} does not accept join asks"
                )));
            }
        } else if !authz::can_invite(&seat.state(), &group) {
            return Err(GroupError::Forbidden(format!(
                "inviting into {group_id} requires {}",
                group.thresholds.invite
            )));
        }

        if self.store.find_membership(invitee, group_id)?.is_some() {
            return Err(GroupError::Conflict(format!(
                "{invitee} already has a membership in {group_id}"
            )));
        }
        if self.store.find_invitation(invitee, group_id)?.is_some() {
            return Err(GroupError::Conflict(format!(
                "{invitee} already has an invitation to {group_id}"
            )));
        }

        let invitation = GroupInvitation {
            id: self.allocate()?,
            group: group_id,
            invitee,
            emitted_by_invitee,
            issuer: actor.user,
            date: self.now(),
        };
        let mut batch = WriteBatch::new()
            .require(Precondition::GroupPresent(group_id))
            .require(Precondition::MembershipAbsent {
                user: invitee,
                group: group_id,
            })
            .require(Precondition::InvitationAbsent {
                invitee,
                group: group_id,
            });
        if !emitted_by_invitee {
            seat.pin(&mut batch);
        }
        batch.push_mutation(Mutation::PutInvitation(invitation.clone()));
        self.commit(
            batch,
            vec![GroupEvent::InvitationCreated {
                invitation: invitation.id,
                group: group_id,
                invitee,
                emitted_by_invitee,
            }],
        )?;
        tracing::info!(
            group = %group_id,
            user = %invitee,
            invitation = %invitation.id,
            emitted_by_invitee,
            "invitation created"
        );
        Ok(Outcome::created(invitation))
    }

    /// Resolve an invitation into a membership. An ask is confirmed by a
    /// member with invite clearance, an offer by the invitee.
    pub fn confirm_invitation(
        &self,
        actor: &Actor,
        id: InvitationId,
    ) -> Result<Outcome<GroupMember>, GroupError> {
        let (invitation, group, seat) = self.addressed_invitation(actor, id)?;
        let allowed = if invitation.emitted_by_invitee {
            authz::can_invite(&seat.state(), &group)
        } else {
            actor.user == invitation.invitee || actor.is_global_admin
        };
        if !allowed {
            let who = if invitation.emitted_by_invitee {
                "a member with invite clearance"
            } else {
                "the invitee"
            };
            return Err(GroupError::Forbidden(format!("{id} must be confirmed by {who}")));
        }

        let membership = GroupMember::new(
            self.allocate()?,
            invitation.invitee,
            group.id,
            group.join_policy.initial_accepted_rank(),
            self.now(),
        );
        let mut batch = WriteBatch::new()
            .require(Precondition::InvitationPresent(id))
            .require(Precondition::MembershipAbsent {
                user: invitation.invitee,
                group: group.id,
            });
        if invitation.emitted_by_invitee {
            seat.pin(&mut batch);
        }
        batch.push_mutation(Mutation::PutMembership(membership.clone()));
        batch.push_mutation(Mutation::DeleteInvitation(id));
        self.commit(
            batch,
            vec![GroupEvent::InvitationConfirmed {
                invitation: id,
                group: group.id,
                invitee: invitation.invitee,
                membership: membership.id,
            }],
        )?;
        tracing::info!(
            group = %group.id,
            user = %invitation.invitee,
            membership = %membership.id,
            rank = membership.rank.get(),
            "invitation confirmed"
        );
        Ok(Outcome::created(membership))
    }

    /// Withdraw (invitee) or revoke (invite clearance) an invitation.
    pub fn destroy_invitation(
        &self,
        actor: &Actor,
        id: InvitationId,
    ) -> Result<Outcome<()>, GroupError> {
        let (invitation, group, seat) = self.addressed_invitation(actor, id)?;
        let mut batch = WriteBatch::new()
            .require(Precondition::InvitationPresent(id))
            .apply(Mutation::DeleteInvitation(id));
        if invitation.invitee != actor.user {
            seat.pin(&mut batch);
        }
        self.commit(
            batch,
            vec![GroupEvent::InvitationDestroyed {
                invitation: id,
                group: group.id,
                invitee: invitation.invitee,
            }],
        )?;
        tracing::info!(group = %group.id, invitation = %id, by = %actor.user, "invitation destroyed");
        Ok(Outcome::no_content())
    }

    pub fn get_invitation(
        &self,
        actor: &Actor,
        id: InvitationId,
    ) -> Result<GroupInvitation, GroupError> {
        self.addressed_invitation(actor, id).map(|(invitation, ..)| invitation)
    }

    /// The actor's own invitations, offers and asks alike.
    pub fn invitations_for_user(&self, actor: &Actor) -> Result<Vec<GroupInvitation>, GroupError> {
        Ok(self.store.invitations_of_user(actor.user)?)
    }

    pub fn invitations_for_group(
        &self,
        actor: &Actor,
        group_id: GroupId,
    ) -> Result<Vec<GroupInvitation>, GroupError> {
        let (group, seat) = self.visible_group(actor, group_id)?;
        if !authz::can_invite(&seat.state(), &group) {
            return Err(GroupError::Forbidden(format!(
                "listing invitations of {group_id} requires {}",
                group.thresholds.invite
            )));
        }
        Ok(self.store.invitations_of_group(group_id)?)
    }
}
