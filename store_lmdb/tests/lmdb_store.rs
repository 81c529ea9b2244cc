use guild_store::{
    AcknowledgmentStore, GroupStore, InvitationStore, MembershipStore, MetaStore, Mutation,
    Precondition, Store, StoreError, UserStore, WriteBatch,
};
use guild_store_lmdb::{check_integrity, LmdbStore, CURRENT_SCHEMA_VERSION};
use guild_types::{
    AcknowledgmentId, Group, GroupAcknowledgment, GroupId, GroupInvitation, GroupMember,
    InvitationId, MembershipId, NewGroup, Rank, Timestamp, User, UserId,
};

const MAP_SIZE: usize = 16 * 1024 * 1024;

fn open(dir: &tempfile::TempDir) -> LmdbStore {
    LmdbStore::open(dir.path(), MAP_SIZE).unwrap()
}

fn group(id: u64) -> Group {
    Group::from_new(GroupId::new(id), NewGroup::named(format!("g{id}")), Timestamp::new(1)).unwrap()
}

fn member(id: u64, user: u64, group: u64, rank: u8) -> GroupMember {
    GroupMember::new(
        MembershipId::new(id),
        UserId::new(user),
        GroupId::new(group),
        Rank::try_from(rank).unwrap(),
        Timestamp::new(2),
    )
}

fn user(id: u64, email: &str) -> User {
    User {
        id: UserId::new(id),
        email: email.to_string(),
        display_name: format!("user {id}"),
        is_global_admin: false,
        created: Timestamp::new(1),
    }
}

fn seed(store: &LmdbStore) {
    store
        .commit(
            WriteBatch::new()
                .apply(Mutation::PutGroup(group(1)))
                .apply(Mutation::PutGroup(group(2)))
                .apply(Mutation::PutMembership(member(10, 100, 1, 10)))
                .apply(Mutation::PutMembership(member(11, 101, 1, 0)))
                .apply(Mutation::PutMembership(member(12, 100, 2, 3))),
        )
        .unwrap();
}

#[test]
fn fresh_store_is_stamped_with_current_schema() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    assert_eq!(store.get_schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn ids_are_monotonic_and_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let last = {
        let store = open(&dir);
        let a = store.allocate_id().unwrap();
        let b = store.allocate_id().unwrap();
        assert_eq!(a, 1);
        assert!(b > a);
        b
    };
    let store = open(&dir);
    assert!(store.allocate_id().unwrap() > last);
}

#[test]
fn memberships_are_reachable_through_every_index() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    seed(&store);

    let found = store
        .find_membership(UserId::new(101), GroupId::new(1))
        .unwrap()
        .unwrap();
    assert_eq!(found.id, MembershipId::new(11));
    assert!(!found.is_accepted());

    let by_user: Vec<_> = store
        .memberships_of_user(UserId::new(100))
        .unwrap()
        .into_iter()
        .map(|m| m.group)
        .collect();
    assert_eq!(by_user, vec![GroupId::new(1), GroupId::new(2)]);

    let by_group: Vec<_> = store
        .memberships_of_group(GroupId::new(1))
        .unwrap()
        .into_iter()
        .map(|m| m.user)
        .collect();
    assert_eq!(by_group, vec![UserId::new(100), UserId::new(101)]);
}

#[test]
fn failed_precondition_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    seed(&store);

    let stale = WriteBatch::new()
        .require(Precondition::MembershipVersion {
            id: MembershipId::new(11),
            version: 7,
        })
        .apply(Mutation::PutGroup(group(3)))
        .apply(Mutation::DeleteMembership(MembershipId::new(11)));
    let err = store.commit(stale).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    assert!(store.get_group(GroupId::new(3)).unwrap().is_none());
    assert!(store.get_membership(MembershipId::new(11)).unwrap().is_some());
}

#[test]
fn version_precondition_accepts_current_row() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    seed(&store);

    let current = store.get_membership(MembershipId::new(11)).unwrap().unwrap();
    let promoted = current.with_rank(Rank::MEMBER, Timestamp::new(5));
    store
        .commit(
            WriteBatch::new()
                .require(Precondition::MembershipVersion {
                    id: current.id,
                    version: current.version,
                })
                .apply(Mutation::PutMembership(promoted)),
        )
        .unwrap();
    let stored = store.get_membership(MembershipId::new(11)).unwrap().unwrap();
    assert_eq!(stored.version, 1);
    assert!(stored.is_accepted());
}

#[test]
fn second_membership_for_a_pair_is_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    seed(&store);

    let err = store
        .commit(WriteBatch::new().apply(Mutation::PutMembership(member(99, 100, 1, 1))))
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
    assert!(store.get_membership(MembershipId::new(99)).unwrap().is_none());
}

#[test]
fn duplicate_email_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    store
        .commit(WriteBatch::new().apply(Mutation::PutUser(user(1, "a@x.org"))))
        .unwrap();

    let err = store
        .commit(WriteBatch::new().apply(Mutation::PutUser(user(2, "a@x.org"))))
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));

    let guarded = WriteBatch::new()
        .require(Precondition::UserEmailAbsent("a@x.org".into()))
        .apply(Mutation::PutUser(user(3, "a@x.org")));
    assert!(matches!(store.commit(guarded), Err(StoreError::Conflict(_))));

    assert_eq!(store.user_count().unwrap(), 1);
    assert_eq!(
        store.get_user_by_email("a@x.org").unwrap().unwrap().id,
        UserId::new(1)
    );
}

#[test]
fn deleting_a_group_cascades() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    seed(&store);
    let invitation = GroupInvitation {
        id: InvitationId::new(20),
        group: GroupId::new(1),
        invitee: UserId::new(102),
        emitted_by_invitee: false,
        issuer: UserId::new(100),
        date: Timestamp::new(3),
    };
    let edge = GroupAcknowledgment {
        id: AcknowledgmentId::new(30),
        asking_group: GroupId::new(2),
        validator_group: GroupId::new(1),
        validated: true,
        delegate_admin: true,
        created: Timestamp::new(3),
        updated: Timestamp::new(3),
    };
    store
        .commit(
            WriteBatch::new()
                .apply(Mutation::PutInvitation(invitation))
                .apply(Mutation::PutAcknowledgment(edge)),
        )
        .unwrap();

    store
        .commit(
            WriteBatch::new()
                .require(Precondition::GroupPresent(GroupId::new(1)))
                .apply(Mutation::DeleteGroup(GroupId::new(1))),
        )
        .unwrap();

    assert!(store.get_group(GroupId::new(1)).unwrap().is_none());
    assert!(store.memberships_of_group(GroupId::new(1)).unwrap().is_empty());
    assert_eq!(store.memberships_of_user(UserId::new(100)).unwrap().len(), 1);
    assert!(store.invitations_of_user(UserId::new(102)).unwrap().is_empty());
    assert!(store
        .acknowledgments_asked_by(GroupId::new(2))
        .unwrap()
        .is_empty());

    let report = check_integrity(store.environment()).unwrap();
    assert!(report.is_healthy(), "{:?}", report.errors);
}

#[test]
fn deleting_a_group_clears_responsible_group_links() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let child = Group {
        resp_group: Some(GroupId::new(1)),
        ..group(2)
    };
    let unrelated = Group {
        resp_group: Some(GroupId::new(2)),
        ..group(3)
    };
    store
        .commit(
            WriteBatch::new()
                .apply(Mutation::PutGroup(group(1)))
                .apply(Mutation::PutGroup(child))
                .apply(Mutation::PutGroup(unrelated)),
        )
        .unwrap();

    store
        .commit(WriteBatch::new().apply(Mutation::DeleteGroup(GroupId::new(1))))
        .unwrap();

    let child = store.get_group(GroupId::new(2)).unwrap().unwrap();
    assert_eq!(child.resp_group, None);
    let unrelated = store.get_group(GroupId::new(3)).unwrap().unwrap();
    assert_eq!(unrelated.resp_group, Some(GroupId::new(2)));
}

#[test]
fn acknowledgment_pending_precondition() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    seed(&store);
    let mut edge = GroupAcknowledgment {
        id: AcknowledgmentId::new(30),
        asking_group: GroupId::new(1),
        validator_group: GroupId::new(2),
        validated: false,
        delegate_admin: false,
        created: Timestamp::new(3),
        updated: Timestamp::new(3),
    };
    store
        .commit(WriteBatch::new().apply(Mutation::PutAcknowledgment(edge.clone())))
        .unwrap();
    edge.validated = true;
    let validate = || {
        WriteBatch::new()
            .require(Precondition::AcknowledgmentPending(edge.id))
            .apply(Mutation::PutAcknowledgment(edge.clone()))
    };
    store.commit(validate()).unwrap();
    assert!(matches!(store.commit(validate()), Err(StoreError::Conflict(_))));

    let validators = store.acknowledgments_asked_by(GroupId::new(1)).unwrap();
    assert_eq!(validators.len(), 1);
    assert!(validators[0].validated);
    assert_eq!(
        store
            .find_acknowledgment(GroupId::new(1), GroupId::new(2))
            .unwrap()
            .map(|a| a.id),
        Some(edge.id)
    );
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open(&dir);
        seed(&store);
    }
    let store = open(&dir);
    assert_eq!(store.iter_groups().unwrap().len(), 2);
    assert!(check_integrity(store.environment()).unwrap().is_healthy());
}
