use proptest::prelude::*;

use guild_groups::authz::{can_kick, check_change_rank, ActorState, Denial, MemberState};
use guild_types::{
    Group, GroupId, MembershipId, NewGroup, Rank, RankThresholds, Timestamp, UserId,
};

fn any_rank() -> impl Strategy<Value = Rank> {
    (0u8..=10).prop_map(|r| Rank::try_from(r).unwrap())
}

fn any_thresholds() -> impl Strategy<Value = RankThresholds> {
    (any_rank(), any_rank(), any_rank(), any_rank(), any_rank(), any_rank()).prop_map(
        |(invite, kick, accept_join_requests, promote, demote, modify_group_infos)| {
            RankThresholds {
                invite,
                kick,
                accept_join_requests,
                promote,
                demote,
                modify_group_infos,
            }
        },
    )
}

fn group(thresholds: RankThresholds) -> Group {
    let mut g = Group::from_new(GroupId::new(1), NewGroup::named("g"), Timestamp::EPOCH).unwrap();
    g.thresholds = thresholds;
    g
}

fn member(id: u64, rank: Rank) -> MemberState {
    MemberState {
        id: MembershipId::new(id),
        user: UserId::new(id),
        rank,
    }
}

fn actor(rank: Rank) -> ActorState {
    ActorState {
        user: UserId::new(1),
        is_global_admin: false,
        membership: Some(member(1, rank)),
    }
}

proptest! {
    /// Changing someone else's rank needs a rank strictly above both the
    /// current and the requested one, plus the direction's threshold.
    #[test]
    fn change_rank_is_strict(
        own in any_rank(),
        target in any_rank(),
        new in -5i64..=15,
        t in any_thresholds(),
    ) {
        let g = group(t);
        match check_change_rank(&actor(own), &member(2, target), &g, new) {
            Ok(granted) => {
                prop_assert_eq!(i64::from(granted.get()), new);
                prop_assert!(granted.is_accepted());
                prop_assert!(own > target && own > granted);
                if granted > target {
                    prop_assert!(own >= t.promote);
                } else {
                    prop_assert!(own >= t.demote);
                }
            }
            Err(Denial::InvalidInput(_)) => {
                prop_assert!(!(1..=10).contains(&new) || new == i64::from(target.get()));
            }
            Err(Denial::Forbidden(_)) => {}
        }
    }

    /// On one's own membership only demotions pass, whatever the thresholds.
    #[test]
    fn self_rank_change_only_demotes(
        own in 1u8..=10,
        new in 1i64..=10,
        t in any_thresholds(),
    ) {
        let own = Rank::try_from(own).unwrap();
        let result = check_change_rank(&actor(own), &member(1, own), &group(t), new);
        prop_assert_eq!(result.is_ok(), new < i64::from(own.get()));
    }

    /// Kicking another member needs a strictly higher accepted rank and
    /// the kick threshold; leaving is always allowed.
    #[test]
    fn kick_is_strict(own in any_rank(), target in any_rank(), t in any_thresholds()) {
        let g = group(t);
        let allowed = can_kick(&actor(own), &member(2, target), &g);
        prop_assert_eq!(allowed, own.is_accepted() && own > target && own >= t.kick);
        prop_assert!(can_kick(&actor(own), &member(1, own), &g));
    }
}
