//! Acknowledgment edges between groups and delegated administration.

use guild_store::{Mutation, Precondition, Store, WriteBatch};
use guild_types::{Actor, GroupAcknowledgment, GroupEvent, GroupId, UserId};

use crate::authz;
use crate::engine::{GroupEngine, Seat};
use crate::error::{GroupError, Outcome};

fn same_group(id: GroupId) -> GroupError {
    GroupError::InvalidInput(format!("{id} cannot acknowledge itself"))
}

impl<S: Store> GroupEngine<S> {
    /// Ask `validator` to recognise `asking`. Needs the modify threshold
    /// on the asking group.
    pub fn request_acknowledgment(
        &self,
        actor: &Actor,
        asking: GroupId,
        validator: GroupId,
        delegate_admin: bool,
    ) -> Result<Outcome<GroupAcknowledgment>, GroupError> {
        if asking == validator {
            return Err(same_group(asking));
        }
        let (asking_group, seat) = self.visible_group(actor, asking)?;
        self.visible_group(actor, validator)?;
        if !authz::can_modify_group_info(&seat.state(), &asking_group) {
            return Err(GroupError::Forbidden(format!(
                "requesting recognition for {asking} requires {}",
                asking_group.thresholds.modify_group_infos
            )));
        }
        if self.store.find_acknowledgment(asking, validator)?.is_some() {
            return Err(GroupError::Conflict(format!(
                "{asking} already has an acknowledgment edge to {validator}"
            )));
        }

        let now = self.now();
        let edge = GroupAcknowledgment {
            id: self.allocate()?,
            asking_group: asking,
            validator_group: validator,
            validated: false,
            delegate_admin,
            created: now,
            updated: now,
        };
        let mut batch = WriteBatch::new()
            .require(Precondition::GroupPresent(asking))
            .require(Precondition::GroupPresent(validator))
            .require(Precondition::AcknowledgmentAbsent { asking, validator });
        seat.pin(&mut batch);
        batch.push_mutation(Mutation::PutAcknowledgment(edge.clone()));
        self.commit(
            batch,
            vec![GroupEvent::AcknowledgmentRequested {
                acknowledgment: edge.id,
                asking,
                validator,
            }],
        )?;
        tracing::info!(asking = %asking, validator = %validator, "acknowledgment requested");
        Ok(Outcome::created(edge))
    }

    /// Validate the edge `asking -> validator`, recording a new validated
    /// edge when none was requested. Needs the modify threshold on the
    /// validator group.
    pub fn validate(
        &self,
        actor: &Actor,
        asking: GroupId,
        validator: GroupId,
    ) -> Result<Outcome<GroupAcknowledgment>, GroupError> {
        if asking == validator {
            return Err(same_group(validator));
        }
        let (validator_group, seat) = self.visible_group(actor, validator)?;
        self.load_group(asking)?;
        if !authz::can_modify_group_info(&seat.state(), &validator_group) {
            return Err(GroupError::Forbidden(format!(
                "validating for {validator} requires {}",
                validator_group.thresholds.modify_group_infos
            )));
        }

        let now = self.now();
        let mut batch = WriteBatch::new()
            .require(Precondition::GroupPresent(asking))
            .require(Precondition::GroupPresent(validator));
        seat.pin(&mut batch);
        let (edge, created) = match self.store.find_acknowledgment(asking, validator)? {
            Some(existing) if existing.validated => {
                return Err(GroupError::Conflict(format!(
                    "{} is already validated",
                    existing.id
                )))
            }
            Some(existing) => {
                batch.push_precondition(Precondition::AcknowledgmentPending(existing.id));
                let edge = GroupAcknowledgment {
                    validated: true,
                    updated: now,
                    ..existing
                };
                (edge, false)
            }
            None => {
                batch.push_precondition(Precondition::AcknowledgmentAbsent { asking, validator });
                let edge = GroupAcknowledgment {
                    id: self.allocate()?,
                    asking_group: asking,
                    validator_group: validator,
                    validated: true,
                    delegate_admin: true,
                    created: now,
                    updated: now,
                };
                (edge, true)
            }
        };
        batch.push_mutation(Mutation::PutAcknowledgment(edge.clone()));
        self.commit(
            batch,
            vec![GroupEvent::AcknowledgmentValidated {
                acknowledgment: edge.id,
                asking,
                validator,
            }],
        )?;
        tracing::info!(asking = %asking, validator = %validator, by = %actor.user, "acknowledgment validated");
        Ok(if created {
            Outcome::created(edge)
        } else {
            Outcome::ok(edge)
        })
    }

    /// Remove an edge. Either side's modify threshold suffices.
    pub fn remove_acknowledgment(
        &self,
        actor: &Actor,
        asking: GroupId,
        validator: GroupId,
    ) -> Result<Outcome<()>, GroupError> {
        let missing = || GroupError::NotFound(format!("acknowledgment {asking} -> {validator}"));
        let edge = self
            .store
            .find_acknowledgment(asking, validator)?
            .ok_or_else(missing)?;

        let mut visible = false;
        let mut authority: Option<Seat> = None;
        for id in [asking, validator] {
            let group = self.load_group(id)?;
            let seat = self.seat(actor, id)?;
            if !self.can_view(&seat, &group)? {
                continue;
            }
            visible = true;
            if authz::can_modify_group_info(&seat.state(), &group) {
                authority = Some(seat);
                break;
            }
        }
        if !visible {
            return Err(missing());
        }
        let Some(seat) = authority else {
            return Err(GroupError::Forbidden(format!(
                "removing {} requires the modify threshold of either group",
                edge.id
            )));
        };

        let mut batch = WriteBatch::new().require(Precondition::AcknowledgmentPresent(edge.id));
        seat.pin(&mut batch);
        batch.push_mutation(Mutation::DeleteAcknowledgment(edge.id));
        self.commit(batch, vec![GroupEvent::AcknowledgmentRemoved { asking, validator }])?;
        tracing::info!(asking = %asking, validator = %validator, by = %actor.user, "acknowledgment removed");
        Ok(Outcome::no_content())
    }

    /// Edges touching a visible group, ordered by id.
    pub fn acknowledgments(
        &self,
        actor: &Actor,
        group: GroupId,
    ) -> Result<Vec<GroupAcknowledgment>, GroupError> {
        self.visible_group(actor, group)?;
        let mut edges = self.store.acknowledgments_asked_by(group)?;
        edges.extend(self.store.acknowledgments_validated_by(group)?);
        edges.sort_by_key(|edge| edge.id);
        Ok(edges)
    }

    /// Whether `user` is an accepted member of `group`, or of a group
    /// reachable from it through validated acknowledgments.
    pub fn is_related_to(&self, user: UserId, group: GroupId) -> Result<bool, GroupError> {
        self.load_group(group)?;
        self.related_through_acknowledgments(user, group)
    }

    /// An administrator of a group that validated `target` through a
    /// direct edge carrying `delegate_admin`. Not transitive.
    pub(crate) fn has_delegated_admin(
        &self,
        actor: &Actor,
        target: GroupId,
    ) -> Result<bool, GroupError> {
        for edge in self.store.acknowledgments_asked_by(target)? {
            if !edge.delegates_admin() {
                continue;
            }
            let admin = self
                .store
                .find_membership(actor.user, edge.validator_group)?
                .is_some_and(|m| m.rank.is_admin());
            if admin {
                tracing::debug!(
                    group = %target,
                    validator = %edge.validator_group,
                    user = %actor.user,
                    "delegated administration"
                );
                return Ok(true);
            }
        }
        Ok(false)
    }
}
