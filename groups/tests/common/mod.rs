//! Shared fixtures: an engine over the nullable store with a recording
//! notifier and a bootstrap global admin.

#![allow(dead_code)]

use std::sync::Arc;

use guild_groups::{EngineConfig, GroupEngine};
use guild_nullables::{NullClock, NullStore, RecordingNotifier};
use guild_store::{Mutation, Store, WriteBatch};
use guild_types::{
    Actor, Group, GroupId, GroupMember, JoinPolicy, MembershipId, NewGroup, NewUser, Rank,
    RankThresholds, Timestamp, Visibility,
};

pub struct World {
    pub engine: GroupEngine<NullStore>,
    pub events: Arc<RecordingNotifier>,
    pub clock: Arc<NullClock>,
    pub root: Actor,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let events = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(NullClock::default());
        let engine = GroupEngine::new(NullStore::new(), config)
            .with_clock(clock.clone())
            .with_notifier(events.clone());
        let root = engine
            .register_user(None, new_user("root"))
            .expect("bootstrap user")
            .value
            .actor();
        events.clear();
        Self {
            engine,
            events,
            clock,
            root,
        }
    }

    pub fn store(&self) -> &NullStore {
        self.engine.store()
    }

    pub fn user(&self, name: &str) -> Actor {
        self.engine
            .register_user(Some(&self.root), new_user(name))
            .expect("register user")
            .value
            .actor()
    }

    /// A basic group created by `owner`, who becomes its administrator.
    pub fn group(&self, owner: &Actor, new: NewGroup) -> Group {
        self.engine
            .create_group(owner, new)
            .expect("create group")
            .value
    }

    /// Write a membership directly, bypassing every check.
    pub fn seat(&self, group: GroupId, actor: &Actor, rank: u8) -> GroupMember {
        let id = MembershipId::new(self.store().allocate_id().expect("id"));
        let rank = Rank::try_from(rank).expect("rank in range");
        let member = GroupMember::new(id, actor.user, group, rank, Timestamp::new(500));
        self.store()
            .commit(WriteBatch::new().apply(Mutation::PutMembership(member.clone())))
            .expect("seat member");
        member
    }

    pub fn membership(&self, id: MembershipId) -> Option<GroupMember> {
        use guild_store::MembershipStore;
        self.store().get_membership(id).expect("read")
    }
}

pub fn new_user(name: &str) -> NewUser {
    NewUser {
        email: format!("{name}@guild.test"),
        display_name: name.to_string(),
        is_global_admin: false,
    }
}

pub fn private_group(name: &str) -> NewGroup {
    NewGroup::named(name)
}

pub fn public_group(name: &str, policy: JoinPolicy) -> NewGroup {
    NewGroup {
        visibility: Visibility::Public,
        default_member_rank: i64::from(policy.default_member_rank()),
        ..NewGroup::named(name)
    }
}

pub fn with_thresholds(new: NewGroup, t: RankThresholds) -> NewGroup {
    NewGroup {
        req_rank_invite: i64::from(t.invite.get()),
        req_rank_kick: i64::from(t.kick.get()),
        req_rank_accept_join_requests: i64::from(t.accept_join_requests.get()),
        req_rank_promote: i64::from(t.promote.get()),
        req_rank_demote: i64::from(t.demote.get()),
        req_rank_modify_group_infos: i64::from(t.modify_group_infos.get()),
        ..new
    }
}
