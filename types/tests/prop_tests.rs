use proptest::prelude::*;

use guild_types::{
    Group, GroupId, GroupKind, GroupMember, GroupPatch, JoinPolicy, MembershipId, NewGroup, Rank,
    RankThresholds, Timestamp, UserId, ADMIN_RANK,
};

fn any_kind() -> impl Strategy<Value = GroupKind> {
    prop_oneof![
        Just(GroupKind::Basic),
        Just(GroupKind::Cursus),
        Just(GroupKind::Association),
        Just(GroupKind::Promotion),
        Just(GroupKind::School),
        Just(GroupKind::Cluster),
    ]
}

fn thresholds_in_range(t: &RankThresholds) -> bool {
    [
        t.invite,
        t.kick,
        t.accept_join_requests,
        t.promote,
        t.demote,
        t.modify_group_infos,
    ]
    .iter()
    .all(|r| r.get() <= ADMIN_RANK.get())
}

proptest! {
    /// Clamping always lands in [0, 10] and is the identity inside it.
    #[test]
    fn clamped_rank_in_bounds(raw in any::<i64>()) {
        let rank = Rank::clamped(raw);
        prop_assert!(rank <= ADMIN_RANK);
        if (0..=10).contains(&raw) {
            prop_assert_eq!(i64::from(rank.get()), raw);
        }
    }

    /// Checked conversion agrees with the range test.
    #[test]
    fn checked_rank_matches_range(raw in any::<i64>()) {
        prop_assert_eq!(Rank::try_from(raw).is_ok(), (0..=10).contains(&raw));
    }

    /// Join policy integer form roundtrips through bincode.
    #[test]
    fn join_policy_bincode_roundtrip(raw in -128i64..=127) {
        let policy = JoinPolicy::from_default_member_rank(raw);
        let encoded = bincode::serialize(&policy).unwrap();
        let decoded: JoinPolicy = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, policy);
        prop_assert_eq!(policy.can_anyone_join(), raw >= 0);
    }

    /// Whatever the creation input, every threshold is a valid rank and
    /// special groups come out locked down.
    #[test]
    fn created_groups_respect_bounds(
        kind in any_kind(),
        dmr in any::<i64>(),
        ranks in prop::array::uniform6(any::<i64>()),
    ) {
        let new = NewGroup {
            kind,
            default_member_rank: dmr,
            req_rank_invite: ranks[0],
            req_rank_kick: ranks[1],
            req_rank_accept_join_requests: ranks[2],
            req_rank_promote: ranks[3],
            req_rank_demote: ranks[4],
            req_rank_modify_group_infos: ranks[5],
            ..NewGroup::named("g")
        };
        let group = Group::from_new(GroupId::new(1), new, Timestamp::EPOCH).unwrap();
        prop_assert!(thresholds_in_range(&group.thresholds));
        if kind.is_special() {
            prop_assert_eq!(group.thresholds, RankThresholds::all(ADMIN_RANK));
            prop_assert_eq!(group.join_policy, JoinPolicy::Closed);
            prop_assert!(group.is_protected && group.is_public());
        }
    }

    /// No patch can loosen a special group.
    #[test]
    fn patches_keep_special_policy(
        special in prop_oneof![Just(GroupKind::School), Just(GroupKind::Cluster)],
        dmr in prop::option::of(any::<i64>()),
        kick in prop::option::of(any::<i64>()),
    ) {
        let mut group = Group::from_new(
            GroupId::new(1),
            NewGroup { kind: special, ..NewGroup::named("g") },
            Timestamp::EPOCH,
        ).unwrap();
        let patch = GroupPatch {
            default_member_rank: dmr,
            req_rank_kick: kick,
            ..GroupPatch::default()
        };
        group.apply_patch(patch, Timestamp::new(1)).unwrap();
        prop_assert_eq!(group.join_policy, JoinPolicy::Closed);
        prop_assert_eq!(group.thresholds, RankThresholds::all(ADMIN_RANK));
    }

    /// Each update bumps the membership version by exactly one.
    #[test]
    fn rank_updates_bump_version(steps in prop::collection::vec(0i64..=10, 1..20)) {
        let mut member = GroupMember::new(
            MembershipId::new(1),
            UserId::new(1),
            GroupId::new(1),
            Rank::PENDING,
            Timestamp::EPOCH,
        );
        for (i, raw) in steps.iter().enumerate() {
            member = member.with_rank(Rank::clamped(*raw), Timestamp::new(i as u64));
            prop_assert_eq!(member.version, i as u64 + 1);
        }
        prop_assert_eq!(member.join_date.is_some(), steps.iter().any(|r| *r >= 1));
    }
}
