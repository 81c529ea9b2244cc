//! Authorization predicates.
//!
//! Every decision is a pure function over explicit values: the actor's
//! state in the group, the target membership and the group's configuration.
//! Anything that needs the store (pending invitations, acknowledgment
//! chains, shared groups) is computed by the engine and passed in, so each
//! predicate is testable without fixtures.
//!
//! The global-admin flag is consulted first in every predicate. Apart from
//! that and self-leave, capabilities require an accepted membership: a
//! pending request never grants anything, whatever the thresholds say.

use guild_types::{Group, GroupMember, MembershipId, Rank, RankThresholds, UserId};
use serde::Serialize;

/// A membership reduced to what the predicates read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberState {
    pub id: MembershipId,
    pub user: UserId,
    pub rank: Rank,
}

impl From<&GroupMember> for MemberState {
    fn from(m: &GroupMember) -> Self {
        Self {
            id: m.id,
            user: m.user,
            rank: m.rank,
        }
    }
}

/// The acting user as seen from one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActorState {
    pub user: UserId,
    pub is_global_admin: bool,
    pub membership: Option<MemberState>,
}

impl ActorState {
    /// Rank of an accepted membership; `None` for non-members and pending
    /// requests.
    pub fn accepted_rank(&self) -> Option<Rank> {
        self.membership
            .map(|m| m.rank)
            .filter(|rank| rank.is_accepted())
    }

    fn meets(&self, threshold: Rank) -> bool {
        self.is_global_admin || self.accepted_rank().is_some_and(|rank| rank >= threshold)
    }

    fn is_self(&self, target: &MemberState) -> bool {
        self.membership.is_some_and(|m| m.id == target.id)
    }
}

/// Store-derived facts that can make a private group visible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupRelations {
    pub pending_invitation: bool,
    pub acknowledged: bool,
}

/// Store-derived facts relating the actor to another user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemberRelations {
    pub shares_group: bool,
    pub shares_cluster: bool,
}

/// Public groups are visible to all. Otherwise the actor needs an
/// accepted membership, a pending invitation or a validated
/// acknowledgment chain. A pending request does not reveal a group.
pub fn can_view_group(actor: &ActorState, group: &Group, relations: &GroupRelations) -> bool {
    actor.is_global_admin
        || group.is_public()
        || actor.accepted_rank().is_some()
        || relations.pending_invitation
        || relations.acknowledged
}

pub fn can_view_member(actor: &ActorState, target: UserId, relations: &MemberRelations) -> bool {
    actor.is_global_admin
        || actor.user == target
        || relations.shares_group
        || relations.shares_cluster
}

pub fn can_invite(actor: &ActorState, group: &Group) -> bool {
    actor.meets(group.thresholds.invite)
}

pub fn can_accept_join_request(actor: &ActorState, group: &Group) -> bool {
    actor.meets(group.thresholds.accept_join_requests)
}

pub fn can_modify_group_info(actor: &ActorState, group: &Group) -> bool {
    actor.meets(group.thresholds.modify_group_infos)
}

/// Full administration: rank `ADMIN_RANK` or global admin.
pub fn is_group_admin(actor: &ActorState) -> bool {
    actor.is_global_admin || actor.accepted_rank().is_some_and(Rank::is_admin)
}

/// Leaving is always allowed. Kicking someone else needs a strictly higher
/// rank and the kick threshold.
pub fn can_kick(actor: &ActorState, target: &MemberState, group: &Group) -> bool {
    if actor.is_global_admin || actor.is_self(target) {
        return true;
    }
    actor
        .accepted_rank()
        .is_some_and(|rank| rank > target.rank && rank >= group.thresholds.kick)
}

/// Why a rank change was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Denial {
    InvalidInput(String),
    Forbidden(String),
}

/// Validate a rank change and return the new rank.
///
/// Input problems (out of range, unchanged) are reported before any
/// permission check. Self-demotion bypasses the thresholds; everything
/// else needs a rank strictly above both the target's current and new
/// rank, plus the promote or demote threshold for the direction of travel.
pub fn check_change_rank(
    actor: &ActorState,
    target: &MemberState,
    group: &Group,
    new_rank: i64,
) -> Result<Rank, Denial> {
    let new = Rank::try_from(new_rank)
        .ok()
        .filter(|rank| rank.is_accepted())
        .ok_or_else(|| Denial::InvalidInput(format!("rank {new_rank} is outside [1, 10]")))?;
    if new == target.rank {
        return Err(Denial::InvalidInput(format!("membership is already at {new}")));
    }
    if actor.is_global_admin {
        return Ok(new);
    }
    let Some(own) = actor.accepted_rank() else {
        return Err(Denial::Forbidden("not an accepted member".to_string()));
    };
    if actor.is_self(target) && new < own {
        return Ok(new);
    }
    if own <= target.rank || own <= new {
        return Err(Denial::Forbidden(format!(
            "{own} does not outrank both {} and {new}",
            target.rank
        )));
    }
    let t = &group.thresholds;
    if new > target.rank && own < t.promote {
        return Err(Denial::Forbidden(format!("promotion requires {}", t.promote)));
    }
    if new < target.rank && own < t.demote {
        return Err(Denial::Forbidden(format!("demotion requires {}", t.demote)));
    }
    Ok(new)
}

/// Read-only boolean projection of a rank against a group's thresholds.
/// Never stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MemberCapabilities {
    pub is_accepted: bool,
    pub can_invite: bool,
    pub can_kick: bool,
    pub can_accept_join_requests: bool,
    pub can_promote: bool,
    pub can_demote: bool,
    pub can_modify_group_infos: bool,
    pub is_administrator: bool,
}

impl MemberCapabilities {
    pub fn project(actor: &ActorState, thresholds: &RankThresholds) -> Self {
        let meets = |threshold: Rank| actor.meets(threshold);
        Self {
            is_accepted: actor.accepted_rank().is_some(),
            can_invite: meets(thresholds.invite),
            can_kick: meets(thresholds.kick),
            can_accept_join_requests: meets(thresholds.accept_join_requests),
            can_promote: meets(thresholds.promote),
            can_demote: meets(thresholds.demote),
            can_modify_group_infos: meets(thresholds.modify_group_infos),
            is_administrator: is_group_admin(actor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_types::{GroupId, NewGroup, Timestamp, Visibility};

    fn group(thresholds: RankThresholds) -> Group {
        let mut g = Group::from_new(GroupId::new(1), NewGroup::named("g"), Timestamp::EPOCH).unwrap();
        g.thresholds = thresholds;
        g
    }

    fn member(id: u64, rank: u8) -> MemberState {
        MemberState {
            id: MembershipId::new(id),
            user: UserId::new(id),
            rank: Rank::try_from(rank).unwrap(),
        }
    }

    fn actor(id: u64, rank: Option<u8>) -> ActorState {
        ActorState {
            user: UserId::new(id),
            is_global_admin: false,
            membership: rank.map(|r| member(id, r)),
        }
    }

    fn admin() -> ActorState {
        ActorState {
            user: UserId::new(99),
            is_global_admin: true,
            membership: None,
        }
    }

    #[test]
    fn private_group_needs_a_relationship() {
        let g = group(RankThresholds::default());
        let none = GroupRelations::default();
        assert!(!can_view_group(&actor(1, None), &g, &none));
        assert!(!can_view_group(&actor(1, Some(0)), &g, &none));
        assert!(can_view_group(&actor(1, Some(1)), &g, &none));
        assert!(can_view_group(&admin(), &g, &none));
        let invited = GroupRelations {
            pending_invitation: true,
            ..none
        };
        assert!(can_view_group(&actor(1, None), &g, &invited));
        let acked = GroupRelations {
            acknowledged: true,
            ..none
        };
        assert!(can_view_group(&actor(1, None), &g, &acked));
    }

    #[test]
    fn public_group_is_visible_to_everyone() {
        let mut g = group(RankThresholds::default());
        g.visibility = Visibility::Public;
        assert!(can_view_group(&actor(1, None), &g, &GroupRelations::default()));
    }

    #[test]
    fn members_are_visible_to_self_and_peers() {
        let none = MemberRelations::default();
        assert!(can_view_member(&actor(1, None), UserId::new(1), &none));
        assert!(!can_view_member(&actor(1, None), UserId::new(2), &none));
        let cluster = MemberRelations {
            shares_cluster: true,
            ..none
        };
        assert!(can_view_member(&actor(1, None), UserId::new(2), &cluster));
        assert!(can_view_member(&admin(), UserId::new(2), &none));
    }

    #[test]
    fn pending_members_hold_no_capabilities() {
        let g = group(RankThresholds::all(Rank::PENDING));
        assert!(!can_invite(&actor(1, Some(0)), &g));
        assert!(can_invite(&actor(1, Some(1)), &g));
        assert!(!can_invite(&actor(1, None), &g));
    }

    #[test]
    fn kick_scenario_a() {
        let g = group(RankThresholds {
            kick: Rank::clamped(5),
            ..RankThresholds::default()
        });
        let a = actor(1, Some(5));
        let b = actor(2, Some(4));
        assert!(can_kick(&a, &member(2, 4), &g));
        assert!(!can_kick(&b, &member(1, 5), &g));
    }

    #[test]
    fn kick_needs_strictly_higher_rank() {
        let g = group(RankThresholds::all(Rank::MEMBER));
        assert!(!can_kick(&actor(1, Some(4)), &member(2, 4), &g));
        assert!(can_kick(&actor(2, Some(4)), &member(2, 4), &g));
        assert!(can_kick(&actor(3, Some(0)), &member(3, 0), &g));
        assert!(can_kick(&admin(), &member(2, 10), &g));
    }

    #[test]
    fn self_demotion_scenario_d() {
        let g = group(RankThresholds {
            demote: Rank::ADMIN,
            ..RankThresholds::default()
        });
        let me = actor(1, Some(3));
        assert_eq!(check_change_rank(&me, &member(1, 3), &g, 1), Ok(Rank::MEMBER));
    }

    #[test]
    fn self_promotion_is_forbidden() {
        let g = group(RankThresholds::all(Rank::MEMBER));
        let me = actor(1, Some(3));
        assert!(matches!(
            check_change_rank(&me, &member(1, 3), &g, 4),
            Err(Denial::Forbidden(_))
        ));
    }

    #[test]
    fn out_of_range_rank_is_invalid_even_for_admins() {
        let g = group(RankThresholds::default());
        for bad in [0, 11, -1] {
            assert!(matches!(
                check_change_rank(&admin(), &member(2, 3), &g, bad),
                Err(Denial::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn unchanged_rank_is_invalid() {
        let g = group(RankThresholds::default());
        assert!(matches!(
            check_change_rank(&actor(1, Some(10)), &member(2, 3), &g, 3),
            Err(Denial::InvalidInput(_))
        ));
    }

    #[test]
    fn no_privilege_equalisation() {
        let g = group(RankThresholds::all(Rank::MEMBER));
        let a = actor(1, Some(6));
        assert!(check_change_rank(&a, &member(2, 3), &g, 5).is_ok());
        assert!(matches!(
            check_change_rank(&a, &member(2, 3), &g, 6),
            Err(Denial::Forbidden(_))
        ));
        assert!(matches!(
            check_change_rank(&a, &member(2, 6), &g, 2),
            Err(Denial::Forbidden(_))
        ));
    }

    #[test]
    fn direction_thresholds_apply() {
        let g = group(RankThresholds {
            promote: Rank::clamped(8),
            demote: Rank::clamped(5),
            ..RankThresholds::default()
        });
        let a = actor(1, Some(6));
        assert!(matches!(
            check_change_rank(&a, &member(2, 3), &g, 4),
            Err(Denial::Forbidden(_))
        ));
        assert_eq!(check_change_rank(&a, &member(2, 3), &g, 2), Ok(Rank::clamped(2)));
    }

    #[test]
    fn capabilities_follow_thresholds() {
        let g = group(RankThresholds::default());
        let caps = MemberCapabilities::project(&actor(1, Some(1)), &g.thresholds);
        assert!(caps.is_accepted && caps.can_invite && caps.can_accept_join_requests);
        assert!(!caps.can_kick && !caps.is_administrator);

        let pending = MemberCapabilities::project(&actor(1, Some(0)), &g.thresholds);
        assert_eq!(pending, MemberCapabilities::default());

        let top = MemberCapabilities::project(&actor(1, Some(10)), &g.thresholds);
        assert!(top.is_administrator && top.can_modify_group_infos);
    }
}
