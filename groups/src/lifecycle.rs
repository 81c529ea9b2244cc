//! Membership lifecycle.
//!
//! Per (user, group): NONE -> REQUESTED (rank 0) -> MEMBER (1..=9) ->
//! ADMIN (10). Accepted members leave NONE-wards by kick or leave; a
//! request goes back to NONE by withdrawal or rejection. Every write pins
//! the version of each membership row the decision read.

use guild_store::{Mutation, Precondition, Store, WriteBatch};
use guild_types::{
    Actor, Group, GroupEvent, GroupId, GroupInvitation, GroupMember, JoinPolicy, MembershipId,
    Rank, UserId,
};
use serde::Serialize;

use crate::authz::{self, MemberCapabilities, MemberState};
use crate::engine::{GroupEngine, Seat};
use crate::error::{GroupError, Outcome};

/// What an invitation turned into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum Invited {
    /// A pending request existed and was accepted on the spot.
    Membership(GroupMember),
    /// An offer the invitee must confirm.
    Invitation(GroupInvitation),
}

fn version_of(m: &GroupMember) -> Precondition {
    Precondition::MembershipVersion {
        id: m.id,
        version: m.version,
    }
}

impl<S: Store> GroupEngine<S> {
    pub(crate) fn load_membership(&self, id: MembershipId) -> Result<GroupMember, GroupError> {
        self.store
            .get_membership(id)?
            .ok_or_else(|| GroupError::not_found(id))
    }

    /// A membership addressed by id, its group and the actor's seat there.
    /// Absent rows and rows in invisible groups are both NotFound, except
    /// that owners always reach their own row.
    fn addressed(
        &self,
        actor: &Actor,
        id: MembershipId,
    ) -> Result<(GroupMember, Group, Seat), GroupError> {
        let target = self.load_membership(id)?;
        if target.user == actor.user {
            let group = self.load_group(target.group)?;
            let seat = self.seat(actor, target.group)?;
            return Ok((target, group, seat));
        }
        let (group, seat) = self
            .visible_group(actor, target.group)
            .map_err(|e| match e {
                GroupError::NotFound(_) => GroupError::not_found(id),
                other => other,
            })?;
        Ok((target, group, seat))
    }

    /// Pending requests are shown to their owner and to whoever may
    /// accept them.
    fn can_see_membership(seat: &Seat, group: &Group, membership: &GroupMember) -> bool {
        membership.is_accepted()
            || membership.user == seat.actor.user
            || authz::can_accept_join_request(&seat.state(), group)
    }

    /// Join a group. A pending offer for the actor is consumed; otherwise
    /// the join policy decides between a request, an instant membership
    /// or refusal.
    pub fn join(&self, actor: &Actor, group_id: GroupId) -> Result<Outcome<GroupMember>, GroupError> {
        let (group, seat) = self.visible_group(actor, group_id)?;
        if seat.membership.is_some() {
            return Err(GroupError::Conflict(format!(
                "{} already has a membership in {group_id}",
                actor.user
            )));
        }

        let now = self.now();
        let mut batch = WriteBatch::new()
            .require(Precondition::GroupPresent(group_id))
            .require(Precondition::MembershipAbsent {
                user: actor.user,
                group: group_id,
            });

        if let Some(invitation) = self.store.find_invitation(actor.user, group_id)? {
            if invitation.emitted_by_invitee {
                return Err(GroupError::Conflict(format!(
                    "a join request to {group_id} is already pending"
                )));
            }
            let membership = GroupMember::new(
                self.allocate()?,
                actor.user,
                group_id,
                group.join_policy.initial_accepted_rank(),
                now,
            );
            batch.push_precondition(Precondition::InvitationPresent(invitation.id));
            batch.push_mutation(Mutation::PutMembership(membership.clone()));
            batch.push_mutation(Mutation::DeleteInvitation(invitation.id));
            self.commit(
                batch,
                vec![GroupEvent::InvitationConfirmed {
                    invitation: invitation.id,
                    group: group_id,
                    invitee: actor.user,
                    membership: membership.id,
                }],
            )?;
            tracing::info!(
                group = %group_id,
                user = %actor.user,
                rank = membership.rank.get(),
                "joined through invitation"
            );
            return Ok(Outcome::created(membership));
        }

        let rank = match group.join_policy {
            JoinPolicy::Closed => {
                return Err(GroupError::InvalidInput(format!(
                    "{group_id} is closed to joining"
                )))
            }
            JoinPolicy::Request => Rank::PENDING,
            JoinPolicy::Open(rank) => rank,
        };
        let membership = GroupMember::new(self.allocate()?, actor.user, group_id, rank, now);
        let event = if rank.is_pending() {
            GroupEvent::JoinRequested {
                group: group_id,
                user: actor.user,
                membership: membership.id,
            }
        } else {
            GroupEvent::MemberJoined {
                group: group_id,
                user: actor.user,
                membership: membership.id,
                rank,
            }
        };
        batch.push_precondition(Precondition::InvitationAbsent {
            invitee: actor.user,
            group: group_id,
        });
        batch.push_mutation(Mutation::PutMembership(membership.clone()));
        self.commit(batch, vec![event])?;
        tracing::info!(
            group = %group_id,
            user = %actor.user,
            rank = rank.get(),
            "membership created by join"
        );
        Ok(Outcome::created(membership))
    }

    /// Invite `target` into a group. A pending request from the target is
    /// accepted on the spot; otherwise an offer is recorded.
    pub fn invite(
        &self,
        actor: &Actor,
        group_id: GroupId,
        target: UserId,
    ) -> Result<Outcome<Invited>, GroupError> {
        let (group, seat) = self.visible_group(actor, group_id)?;
        if self.store.get_user(target)?.is_none() {
            return Err(GroupError::not_found(target));
        }
        if !authz::can_invite(&seat.state(), &group) {
            return Err(GroupError::Forbidden(format!(
                "inviting into {group_id} requires {}",
                group.thresholds.invite
            )));
        }

        let now = self.now();
        let rank = group.join_policy.initial_accepted_rank();
        let mut batch = WriteBatch::new().require(Precondition::GroupPresent(group_id));
        seat.pin(&mut batch);

        if let Some(existing) = self.store.find_membership(target, group_id)? {
            if existing.is_accepted() {
                return Err(GroupError::Conflict(format!(
                    "{target} is already a member of {group_id}"
                )));
            }
            if !authz::can_accept_join_request(&seat.state(), &group) {
                return Err(GroupError::Forbidden(format!(
                    "accepting requests to {group_id} requires {}",
                    group.thresholds.accept_join_requests
                )));
            }
            let accepted = existing.with_rank(rank, now);
            batch.push_precondition(version_of(&existing));
            batch.push_mutation(Mutation::PutMembership(accepted.clone()));
            self.commit(
                batch,
                vec![GroupEvent::JoinAccepted {
                    group: group_id,
                    user: target,
                    membership: accepted.id,
                    by: actor.user,
                }],
            )?;
            tracing::info!(group = %group_id, user = %target, "invite accepted pending request");
            return Ok(Outcome::ok(Invited::Membership(accepted)));
        }

        batch.push_precondition(Precondition::MembershipAbsent {
            user: target,
            group: group_id,
        });

        if let Some(request) = self.store.find_invitation(target, group_id)? {
            if !request.emitted_by_invitee {
                return Err(GroupError::Conflict(format!(
                    "{target} is already invited to {group_id}"
                )));
            }
            let membership = GroupMember::new(self.allocate()?, target, group_id, rank, now);
            batch.push_precondition(Precondition::InvitationPresent(request.id));
            batch.push_mutation(Mutation::PutMembership(membership.clone()));
            batch.push_mutation(Mutation::DeleteInvitation(request.id));
            self.commit(
                batch,
                vec![GroupEvent::InvitationConfirmed {
                    invitation: request.id,
                    group: group_id,
                    invitee: target,
                    membership: membership.id,
                }],
            )?;
            tracing::info!(group = %group_id, user = %target, "invite accepted join request");
            return Ok(Outcome::created(Invited::Membership(membership)));
        }

        let invitation = GroupInvitation {
            id: self.allocate()?,
            group: group_id,
            invitee: target,
            emitted_by_invitee: false,
            issuer: actor.user,
            date: now,
        };
        batch.push_precondition(Precondition::InvitationAbsent {
            invitee: target,
            group: group_id,
        });
        batch.push_mutation(Mutation::PutInvitation(invitation.clone()));
        self.commit(
            batch,
            vec![GroupEvent::InvitationCreated {
                invitation: invitation.id,
                group: group_id,
                invitee: target,
                emitted_by_invitee: false,
            }],
        )?;
        tracing::info!(group = %group_id, user = %target, "invitation offered");
        Ok(Outcome::created(Invited::Invitation(invitation)))
    }

    /// Accept a pending request at rank 1. Permission is checked before
    /// the request's state.
    pub fn accept_join_request(
        &self,
        actor: &Actor,
        id: MembershipId,
    ) -> Result<Outcome<GroupMember>, GroupError> {
        let (target, group, seat) = self.addressed(actor, id)?;
        if !authz::can_accept_join_request(&seat.state(), &group) {
            return Err(GroupError::Forbidden(format!(
                "accepting requests to {} requires {}",
                group.id, group.thresholds.accept_join_requests
            )));
        }
        if target.is_accepted() {
            return Err(GroupError::Conflict(format!("{id} is not a pending request")));
        }

        let accepted = target.with_rank(Rank::MEMBER, self.now());
        let mut batch = WriteBatch::new().require(version_of(&target));
        seat.pin(&mut batch);
        batch.push_mutation(Mutation::PutMembership(accepted.clone()));
        self.commit(
            batch,
            vec![GroupEvent::JoinAccepted {
                group: group.id,
                user: target.user,
                membership: id,
                by: actor.user,
            }],
        )?;
        tracing::info!(group = %group.id, user = %target.user, membership = %id, "join request accepted");
        Ok(Outcome::ok(accepted))
    }

    /// Turn a pending request down; the row is removed.
    pub fn reject_join_request(
        &self,
        actor: &Actor,
        id: MembershipId,
    ) -> Result<Outcome<()>, GroupError> {
        let (target, group, seat) = self.addressed(actor, id)?;
        if !authz::can_accept_join_request(&seat.state(), &group) {
            return Err(GroupError::Forbidden(format!(
                "rejecting requests to {} requires {}",
                group.id, group.thresholds.accept_join_requests
            )));
        }
        if target.is_accepted() {
            return Err(GroupError::Conflict(format!("{id} is not a pending request")));
        }

        let mut batch = WriteBatch::new().require(version_of(&target));
        seat.pin(&mut batch);
        batch.push_mutation(Mutation::DeleteMembership(id));
        self.commit(
            batch,
            vec![GroupEvent::JoinRejected {
                group: group.id,
                user: target.user,
                by: actor.user,
            }],
        )?;
        tracing::info!(group = %group.id, user = %target.user, membership = %id, "join request rejected");
        Ok(Outcome::no_content())
    }

    /// Set a membership's rank. `new_rank` is the raw requested value so
    /// out-of-range input is reported as such.
    pub fn change_rank(
        &self,
        actor: &Actor,
        id: MembershipId,
        new_rank: i64,
    ) -> Result<Outcome<GroupMember>, GroupError> {
        let (target, group, seat) = self.addressed(actor, id)?;
        let new = authz::check_change_rank(
            &seat.state(),
            &MemberState::from(&target),
            &group,
            new_rank,
        )
        .inspect_err(|denial| {
            tracing::debug!(membership = %id, user = %actor.user, ?denial, "rank change denied");
        })?;
        if target.rank.is_pending() {
            return Err(GroupError::Conflict(format!(
                "{id} is a pending request; accept it first"
            )));
        }

        let updated = target.with_rank(new, self.now());
        let mut batch = WriteBatch::new().require(version_of(&target));
        seat.pin(&mut batch);
        batch.push_mutation(Mutation::PutMembership(updated.clone()));
        self.commit(
            batch,
            vec![GroupEvent::RankChanged {
                group: group.id,
                user: target.user,
                membership: id,
                from: target.rank,
                to: new,
                by: actor.user,
            }],
        )?;
        tracing::info!(
            group = %group.id,
            user = %target.user,
            membership = %id,
            rank = new.get(),
            "rank changed"
        );
        Ok(Outcome::ok(updated))
    }

    /// Remove a membership. Removing one's own is always allowed.
    pub fn kick(&self, actor: &Actor, id: MembershipId) -> Result<Outcome<()>, GroupError> {
        let (target, group, seat) = self.addressed(actor, id)?;
        self.remove_member(actor, &target, &group, &seat)
    }

    /// Leave a group, or withdraw a pending request to it. A pending
    /// request can be withdrawn even from a group it does not reveal.
    pub fn leave(&self, actor: &Actor, group_id: GroupId) -> Result<Outcome<()>, GroupError> {
        let group = self.load_group(group_id)?;
        let seat = self.seat(actor, group_id)?;
        let Some(own) = seat.membership.clone() else {
            self.visible_group(actor, group_id)?;
            return Err(GroupError::NotFound(format!(
                "membership of {} in {group_id}",
                actor.user
            )));
        };
        self.remove_member(actor, &own, &group, &seat)
    }

    fn remove_member(
        &self,
        actor: &Actor,
        target: &GroupMember,
        group: &Group,
        seat: &Seat,
    ) -> Result<Outcome<()>, GroupError> {
        if !authz::can_kick(&seat.state(), &MemberState::from(target), group) {
            return Err(GroupError::Forbidden(format!(
                "kicking {} requires a rank above {} and at least {}",
                target.id, target.rank, group.thresholds.kick
            )));
        }

        let mut batch = WriteBatch::new().require(version_of(target));
        seat.pin(&mut batch);
        batch.push_mutation(Mutation::DeleteMembership(target.id));
        self.commit(
            batch,
            vec![GroupEvent::MemberRemoved {
                group: group.id,
                user: target.user,
                by: actor.user,
            }],
        )?;
        tracing::info!(
            group = %group.id,
            user = %target.user,
            membership = %target.id,
            by = %actor.user,
            "membership removed"
        );
        Ok(Outcome::no_content())
    }

    pub fn get_membership(&self, actor: &Actor, id: MembershipId) -> Result<GroupMember, GroupError> {
        let (target, group, seat) = self.addressed(actor, id)?;
        if !Self::can_see_membership(&seat, &group, &target) {
            tracing::debug!(membership = %id, user = %actor.user, "pending membership hidden");
            return Err(GroupError::not_found(id));
        }
        Ok(target)
    }

    /// Members of a visible group. Pending requests the actor may not see
    /// are omitted.
    pub fn list_members(&self, actor: &Actor, group_id: GroupId) -> Result<Vec<GroupMember>, GroupError> {
        let (group, seat) = self.visible_group(actor, group_id)?;
        Ok(self
            .store
            .memberships_of_group(group_id)?
            .into_iter()
            .filter(|m| Self::can_see_membership(&seat, &group, m))
            .collect())
    }

    /// The actor's own capabilities in a group.
    pub fn capabilities(
        &self,
        actor: &Actor,
        group_id: GroupId,
    ) -> Result<MemberCapabilities, GroupError> {
        let (group, seat) = self.visible_group(actor, group_id)?;
        Ok(MemberCapabilities::project(&seat.state(), &group.thresholds))
    }
}
