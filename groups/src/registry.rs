//! Group registry: creation, update, deletion and lookup of groups,
//! clusters and schools.

use guild_store::{Mutation, Precondition, Store, WriteBatch};
use guild_types::{
    Actor, Group, GroupEvent, GroupId, GroupKind, GroupMember, GroupPatch, MembershipId,
    NewGroup, Visibility, ADMIN_RANK,
};
use serde::{Deserialize, Serialize};

use crate::authz;
use crate::engine::GroupEngine;
use crate::error::{GroupError, Outcome};

/// Optional narrowing for [`GroupEngine::list_groups`]. Every set field
/// must match.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GroupFilter {
    pub kind: Option<GroupKind>,
    /// Case-insensitive substring of the name.
    pub name_contains: Option<String>,
    pub visibility: Option<Visibility>,
}

impl GroupFilter {
    pub fn matches(&self, group: &Group) -> bool {
        self.kind.map_or(true, |kind| group.kind == kind)
            && self.visibility.map_or(true, |v| group.visibility == v)
            && self.name_contains.as_ref().map_or(true, |needle| {
                group.name.to_lowercase().contains(&needle.to_lowercase())
            })
    }
}

impl<S: Store> GroupEngine<S> {
    /// Create an ordinary group; the creator becomes its administrator.
    pub fn create_group(&self, actor: &Actor, new: NewGroup) -> Result<Outcome<Group>, GroupError> {
        if new.kind.is_special() {
            return Err(GroupError::InvalidInput(format!(
                "{} groups are created through their own operation",
                new.kind.as_str()
            )));
        }
        self.insert_group(actor, new, true)
    }

    /// Create a cluster. Global admins only; the special policy is forced.
    pub fn create_cluster(&self, actor: &Actor, new: NewGroup) -> Result<Outcome<Group>, GroupError> {
        self.create_special(actor, new, GroupKind::Cluster)
    }

    /// Create a school. Global admins only; the special policy is forced.
    pub fn create_school(&self, actor: &Actor, new: NewGroup) -> Result<Outcome<Group>, GroupError> {
        self.create_special(actor, new, GroupKind::School)
    }

    fn create_special(
        &self,
        actor: &Actor,
        new: NewGroup,
        kind: GroupKind,
    ) -> Result<Outcome<Group>, GroupError> {
        if !actor.is_global_admin {
            return Err(GroupError::Forbidden(format!(
                "only global admins create {} groups",
                kind.as_str()
            )));
        }
        self.insert_group(actor, NewGroup { kind, ..new }, false)
    }

    fn insert_group(
        &self,
        actor: &Actor,
        new: NewGroup,
        creator_joins: bool,
    ) -> Result<Outcome<Group>, GroupError> {
        let mut batch = WriteBatch::new();
        if let Some(parent) = new.resp_group {
            self.visible_group(actor, parent)?;
            batch.push_precondition(Precondition::GroupPresent(parent));
        }

        let now = self.now();
        let group = Group::from_new(self.allocate()?, new, now)?;
        batch.push_mutation(Mutation::PutGroup(group.clone()));
        let mut events = vec![GroupEvent::GroupCreated {
            group: group.id,
            by: actor.user,
        }];

        if creator_joins {
            let membership = GroupMember::new(
                self.allocate::<MembershipId>()?,
                actor.user,
                group.id,
                ADMIN_RANK,
                now,
            );
            events.push(GroupEvent::MemberJoined {
                group: group.id,
                user: actor.user,
                membership: membership.id,
                rank: membership.rank,
            });
            batch.push_mutation(Mutation::PutMembership(membership));
        }

        self.commit(batch, events)?;
        tracing::info!(
            group = %group.id,
            user = %actor.user,
            kind = group.kind.as_str(),
            "group created"
        );
        Ok(Outcome::created(group))
    }

    /// Update a group's information and policy. Requires the modify
    /// threshold, or delegated administration through a validator group.
    pub fn update_group(
        &self,
        actor: &Actor,
        id: GroupId,
        patch: GroupPatch,
    ) -> Result<Outcome<Group>, GroupError> {
        let (mut group, seat) = self.visible_group(actor, id)?;
        if !authz::can_modify_group_info(&seat.state(), &group)
            && !self.has_delegated_admin(actor, id)?
        {
            return Err(GroupError::Forbidden(format!(
                "modifying {id} requires {}",
                group.thresholds.modify_group_infos
            )));
        }

        let mut batch = WriteBatch::new().require(Precondition::GroupPresent(id));
        if let Some(Some(parent)) = patch.resp_group {
            if parent == id {
                return Err(GroupError::InvalidInput(
                    "a group cannot be its own responsible group".to_string(),
                ));
            }
            self.visible_group(actor, parent)?;
            batch.push_precondition(Precondition::GroupPresent(parent));
        }

        group.apply_patch(patch, self.now())?;
        batch.push_mutation(Mutation::PutGroup(group.clone()));
        self.commit(
            batch,
            vec![GroupEvent::GroupUpdated {
                group: id,
                by: actor.user,
            }],
        )?;
        tracing::info!(group = %id, user = %actor.user, "group updated");
        Ok(Outcome::ok(group))
    }

    /// Delete a group with everything hanging off it. Protected groups
    /// are never deletable.
    pub fn delete_group(&self, actor: &Actor, id: GroupId) -> Result<Outcome<()>, GroupError> {
        let (group, seat) = self.visible_group(actor, id)?;
        if group.is_protected {
            return Err(GroupError::Forbidden(format!("{id} is protected")));
        }
        if !authz::is_group_admin(&seat.state()) {
            return Err(GroupError::Forbidden(format!(
                "deleting {id} requires {ADMIN_RANK}"
            )));
        }

        let mut batch = WriteBatch::new().require(Precondition::GroupPresent(id));
        seat.pin(&mut batch);
        batch.push_mutation(Mutation::DeleteGroup(id));
        self.commit(
            batch,
            vec![GroupEvent::GroupDeleted {
                group: id,
                by: actor.user,
            }],
        )?;
        tracing::info!(group = %id, user = %actor.user, "group deleted");
        Ok(Outcome::no_content())
    }

    pub fn get_group(&self, actor: &Actor, id: GroupId) -> Result<Group, GroupError> {
        self.visible_group(actor, id).map(|(group, _)| group)
    }

    /// Every group the actor can see that matches `filter`. Invisible
    /// groups are silently omitted.
    pub fn list_groups(&self, actor: &Actor, filter: &GroupFilter) -> Result<Vec<Group>, GroupError> {
        let mut visible = Vec::new();
        for group in self.store.iter_groups()? {
            if !filter.matches(&group) {
                continue;
            }
            let seat = self.seat(actor, group.id)?;
            if self.can_view(&seat, &group)? {
                visible.push(group);
            }
        }
        Ok(visible)
    }
}
