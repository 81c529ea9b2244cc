//! The engine: shared plumbing for every operation family.
//!
//! Each operation follows the same sequence: load, check existence, check
//! visibility, check permission, commit a conditional [`WriteBatch`], then
//! notify. The operation families live in their own modules as further
//! `impl` blocks on [`GroupEngine`].

use std::collections::HashSet;
use std::sync::Arc;

use guild_store::{Precondition, Store, WriteBatch};
use guild_types::{
    Actor, Clock, Group, GroupEvent, GroupId, GroupMember, Notifier, SystemClock, Timestamp,
    UserId,
};

use crate::authz::{self, ActorState, GroupRelations, MemberState};
use crate::config::EngineConfig;
use crate::error::GroupError;
use crate::graph;
use crate::notify::TracingNotifier;

/// The membership and authorization engine over a [`Store`].
pub struct GroupEngine<S> {
    pub(crate) store: S,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    pub(crate) config: EngineConfig,
}

/// An actor together with their membership, if any, in one group.
#[derive(Clone, Debug)]
pub(crate) struct Seat {
    pub actor: Actor,
    pub membership: Option<GroupMember>,
}

impl Seat {
    pub fn state(&self) -> ActorState {
        ActorState {
            user: self.actor.user,
            is_global_admin: self.actor.is_global_admin,
            membership: self.membership.as_ref().map(MemberState::from),
        }
    }

    /// Pin the actor's own membership row, so a concurrent demotion or
    /// kick of the actor invalidates the decision.
    pub fn pin(&self, batch: &mut WriteBatch) {
        if let Some(m) = &self.membership {
            batch.push_precondition(Precondition::MembershipVersion {
                id: m.id,
                version: m.version,
            });
        }
    }
}

impl<S: Store> GroupEngine<S> {
    /// An engine on the wall clock that logs events through `tracing`.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(TracingNotifier),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub(crate) fn allocate<T: From<u64>>(&self) -> Result<T, GroupError> {
        Ok(T::from(self.store.allocate_id()?))
    }

    /// Commit `batch`, then hand `events` to the notifier. Nothing is
    /// notified if the commit fails.
    pub(crate) fn commit(
        &self,
        batch: WriteBatch,
        events: Vec<GroupEvent>,
    ) -> Result<(), GroupError> {
        if let Err(e) = self.store.commit(batch) {
            let err = GroupError::from(e);
            if err.is_retryable() {
                tracing::warn!(error = %err, "write rejected, caller may retry");
            }
            return Err(err);
        }
        for event in &events {
            self.notifier.notify(event);
        }
        Ok(())
    }

    pub(crate) fn load_group(&self, id: GroupId) -> Result<Group, GroupError> {
        self.store
            .get_group(id)?
            .ok_or_else(|| GroupError::not_found(id))
    }

    pub(crate) fn seat(&self, actor: &Actor, group: GroupId) -> Result<Seat, GroupError> {
        Ok(Seat {
            actor: *actor,
            membership: self.store.find_membership(actor.user, group)?,
        })
    }

    /// Visibility, consulting the store only when the cheap checks fail.
    pub(crate) fn can_view(&self, seat: &Seat, group: &Group) -> Result<bool, GroupError> {
        let state = seat.state();
        let mut relations = GroupRelations::default();
        if authz::can_view_group(&state, group, &relations) {
            return Ok(true);
        }
        relations.pending_invitation = self
            .store
            .find_invitation(seat.actor.user, group.id)?
            .is_some();
        if !relations.pending_invitation {
            relations.acknowledged = self.related_through_acknowledgments(seat.actor.user, group.id)?;
        }
        Ok(authz::can_view_group(&state, group, &relations))
    }

    /// Load a group the actor can see, with the actor's seat in it.
    /// Absent and invisible groups are both NotFound.
    pub(crate) fn visible_group(
        &self,
        actor: &Actor,
        id: GroupId,
    ) -> Result<(Group, Seat), GroupError> {
        let group = self.load_group(id)?;
        let seat = self.seat(actor, id)?;
        if !self.can_view(&seat, &group)? {
            tracing::debug!(group = %id, user = %actor.user, "group hidden from actor");
            return Err(GroupError::not_found(id));
        }
        Ok((group, seat))
    }

    /// Groups in which `user` holds an accepted membership.
    pub(crate) fn accepted_groups(&self, user: UserId) -> Result<HashSet<GroupId>, GroupError> {
        Ok(self
            .store
            .memberships_of_user(user)?
            .into_iter()
            .filter(GroupMember::is_accepted)
            .map(|m| m.group)
            .collect())
    }

    /// Whether `user` is an accepted member of `group` or of any group
    /// reachable from it over validated acknowledgment edges.
    pub(crate) fn related_through_acknowledgments(
        &self,
        user: UserId,
        group: GroupId,
    ) -> Result<bool, GroupError> {
        let mine = self.accepted_groups(user)?;
        if mine.is_empty() {
            return Ok(false);
        }
        let reach = graph::reaches(
            group,
            self.config.max_acknowledgment_depth,
            |asking| {
                Ok::<_, GroupError>(
                    self.store
                        .acknowledgments_asked_by(asking)?
                        .into_iter()
                        .filter(|edge| edge.validated)
                        .map(|edge| edge.validator_group)
                        .collect(),
                )
            },
            |candidate| mine.contains(&candidate),
        )?;
        if reach.truncated {
            tracing::debug!(
                group = %group,
                user = %user,
                visited = reach.visited,
                "acknowledgment walk hit the depth cap"
            );
        }
        Ok(reach.found)
    }
}
