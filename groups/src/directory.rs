//! Users: authentication, registration and who may see whom.

use std::collections::HashSet;

use guild_store::{Mutation, Precondition, Store, WriteBatch};
use guild_types::{
    Actor, GroupEvent, GroupId, GroupKind, GroupMember, NewUser, User, UserId,
};

use crate::authz::{self, ActorState, MemberRelations};
use crate::engine::GroupEngine;
use crate::error::{GroupError, Outcome};

impl<S: Store> GroupEngine<S> {
    /// Resolve a claimed user id into an actor. Absent and unknown ids are
    /// both unauthenticated.
    pub fn authenticate(&self, user: Option<UserId>) -> Result<Actor, GroupError> {
        let id = user.ok_or(GroupError::Unauthenticated)?;
        match self.store.get_user(id)? {
            Some(user) => Ok(user.actor()),
            None => {
                tracing::debug!(user = %id, "unknown actor");
                Err(GroupError::Unauthenticated)
            }
        }
    }

    /// Register a user. The first user bootstraps the directory as a
    /// global admin; after that only global admins register users.
    pub fn register_user(
        &self,
        actor: Option<&Actor>,
        new: NewUser,
    ) -> Result<Outcome<User>, GroupError> {
        let bootstrap = self.store.user_count()? == 0;
        if !bootstrap {
            match actor {
                None => return Err(GroupError::Unauthenticated),
                Some(actor) if !actor.is_global_admin => {
                    return Err(GroupError::Forbidden(
                        "only global admins register users".to_string(),
                    ))
                }
                Some(_) => {}
            }
        }

        let email = new.normalized_email()?;
        if self.store.get_user_by_email(&email)?.is_some() {
            return Err(GroupError::Conflict(format!("{email} is already registered")));
        }

        let user = User {
            id: self.allocate()?,
            email: email.clone(),
            display_name: new.display_name.trim().to_string(),
            is_global_admin: bootstrap || new.is_global_admin,
            created: self.now(),
        };
        let batch = WriteBatch::new()
            .require(Precondition::UserEmailAbsent(email))
            .apply(Mutation::PutUser(user.clone()));
        self.commit(batch, vec![GroupEvent::UserRegistered { user: user.id }])?;
        tracing::info!(user = %user.id, bootstrap, global_admin = user.is_global_admin, "user registered");
        Ok(Outcome::created(user))
    }

    pub fn get_user(&self, actor: &Actor, id: UserId) -> Result<User, GroupError> {
        let user = self
            .store
            .get_user(id)?
            .ok_or_else(|| GroupError::not_found(id))?;
        let (relations, _) = self.member_relations(actor, id)?;
        if !authz::can_view_member(&actor_state(actor), id, &relations) {
            tracing::debug!(target_user = %id, user = %actor.user, "user hidden from actor");
            return Err(GroupError::not_found(id));
        }
        Ok(user)
    }

    /// Another user's memberships as the actor may see them. Global admins
    /// and the user themself see everything; cluster peers also see
    /// memberships in public groups; others see only groups they share.
    /// Pending requests are never shown to third parties.
    pub fn user_memberships(
        &self,
        actor: &Actor,
        id: UserId,
    ) -> Result<Vec<GroupMember>, GroupError> {
        self.get_user(actor, id)?;
        let all = self.store.memberships_of_user(id)?;
        if actor.is_global_admin || actor.user == id {
            return Ok(all);
        }

        let (relations, mine) = self.member_relations(actor, id)?;
        let mut visible = Vec::with_capacity(all.len());
        for membership in all {
            if !membership.is_accepted() {
                continue;
            }
            let shown = mine.contains(&membership.group)
                || (relations.shares_cluster
                    && self
                        .store
                        .get_group(membership.group)?
                        .is_some_and(|g| g.is_public()));
            if shown {
                visible.push(membership);
            }
        }
        Ok(visible)
    }

    /// Relations between the actor and another user, plus the actor's
    /// accepted groups.
    fn member_relations(
        &self,
        actor: &Actor,
        other: UserId,
    ) -> Result<(MemberRelations, HashSet<GroupId>), GroupError> {
        let mine = self.accepted_groups(actor.user)?;
        if actor.user == other || mine.is_empty() {
            return Ok((MemberRelations::default(), mine));
        }
        let theirs = self.accepted_groups(other)?;
        let mut relations = MemberRelations::default();
        for group in mine.intersection(&theirs) {
            relations.shares_group = true;
            if self
                .store
                .get_group(*group)?
                .is_some_and(|g| g.kind == GroupKind::Cluster)
            {
                relations.shares_cluster = true;
                break;
            }
        }
        Ok((relations, mine))
    }
}

fn actor_state(actor: &Actor) -> ActorState {
    ActorState {
        user: actor.user,
        is_global_admin: actor.is_global_admin,
        membership: None,
    }
}
