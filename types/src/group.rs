//! Group records, their rank thresholds and the special-group policy.

use crate::error::GuildError;
use crate::ids::GroupId;
use crate::rank::{JoinPolicy, Rank, ADMIN_RANK};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Longest accepted group name, in characters.
pub const MAX_NAME_LEN: usize = 254;

/// Who can see a group without any relationship to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

/// The kind of community a group represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    #[default]
    Basic,
    Cursus,
    Association,
    Promotion,
    School,
    Cluster,
}

impl GroupKind {
    /// Clusters and schools carry a fixed policy that callers cannot override.
    pub fn is_special(self) -> bool {
        matches!(self, Self::School | Self::Cluster)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Cursus => "cursus",
            Self::Association => "association",
            Self::Promotion => "promotion",
            Self::School => "school",
            Self::Cluster => "cluster",
        }
    }
}

/// Minimum rank an actor needs for each group action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankThresholds {
    pub invite: Rank,
    pub kick: Rank,
    pub accept_join_requests: Rank,
    pub promote: Rank,
    pub demote: Rank,
    pub modify_group_infos: Rank,
}

impl RankThresholds {
    /// Every action requires the same rank.
    pub fn all(rank: Rank) -> Self {
        Self {
            invite: rank,
            kick: rank,
            accept_join_requests: rank,
            promote: rank,
            demote: rank,
            modify_group_infos: rank,
        }
    }
}

impl Default for RankThresholds {
    fn default() -> Self {
        Self {
            invite: Rank::MEMBER,
            kick: ADMIN_RANK,
            accept_join_requests: Rank::MEMBER,
            promote: ADMIN_RANK,
            demote: ADMIN_RANK,
            modify_group_infos: ADMIN_RANK,
        }
    }
}

/// A group, cluster or school.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub kind: GroupKind,
    /// Protected groups can never be deleted.
    pub is_protected: bool,
    pub join_policy: JoinPolicy,
    /// Whether users may ask to join through an invitee-emitted invitation.
    pub can_anyone_ask: bool,
    pub thresholds: RankThresholds,
    /// Designated responsible parent group.
    pub resp_group: Option<GroupId>,
    pub created: Timestamp,
    pub updated: Timestamp,
}

impl Group {
    /// Build a group from creation input, clamping every rank into range.
    pub fn from_new(
        id: GroupId,
        new: NewGroup,
        now: Timestamp,
    ) -> Result<Self, GuildError> {
        let mut group = Self {
            id,
            name: validate_name(&new.name)?,
            description: new.description,
            visibility: new.visibility,
            kind: new.kind,
            is_protected: new.is_protected,
            join_policy: JoinPolicy::from_default_member_rank(new.default_member_rank),
            can_anyone_ask: new.can_anyone_ask,
            thresholds: RankThresholds {
                invite: Rank::clamped(new.req_rank_invite),
                kick: Rank::clamped(new.req_rank_kick),
                accept_join_requests: Rank::clamped(new.req_rank_accept_join_requests),
                promote: Rank::clamped(new.req_rank_promote),
                demote: Rank::clamped(new.req_rank_demote),
                modify_group_infos: Rank::clamped(new.req_rank_modify_group_infos),
            },
            resp_group: new.resp_group,
            created: now,
            updated: now,
        };
        group.enforce_special_policy();
        Ok(group)
    }

    /// Apply a patch; ranks are clamped and the special policy re-applied.
    pub fn apply_patch(&mut self, patch: GroupPatch, now: Timestamp) -> Result<(), GuildError> {
        if let Some(name) = patch.name {
            self.name = validate_name(&name)?;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(visibility) = patch.visibility {
            self.visibility = visibility;
        }
        if let Some(raw) = patch.default_member_rank {
            self.join_policy = JoinPolicy::from_default_member_rank(raw);
        }
        if let Some(can_anyone_ask) = patch.can_anyone_ask {
            self.can_anyone_ask = can_anyone_ask;
        }
        let t = &mut self.thresholds;
        for (slot, raw) in [
            (&mut t.invite, patch.req_rank_invite),
            (&mut t.kick, patch.req_rank_kick),
            (&mut t.accept_join_requests, patch.req_rank_accept_join_requests),
            (&mut t.promote, patch.req_rank_promote),
            (&mut t.demote, patch.req_rank_demote),
            (&mut t.modify_group_infos, patch.req_rank_modify_group_infos),
        ] {
            if let Some(raw) = raw {
                *slot = Rank::clamped(raw);
            }
        }
        if let Some(resp_group) = patch.resp_group {
            self.resp_group = resp_group;
        }
        self.updated = now;
        self.enforce_special_policy();
        Ok(())
    }

    /// Clusters and schools are public, protected, closed, administered at
    /// `ADMIN_RANK` only and have no responsible group, whatever the input.
    pub fn enforce_special_policy(&mut self) {
        if !self.kind.is_special() {
            return;
        }
        self.visibility = Visibility::Public;
        self.is_protected = true;
        self.join_policy = JoinPolicy::Closed;
        self.thresholds = RankThresholds::all(ADMIN_RANK);
        self.resp_group = None;
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn can_anyone_join(&self) -> bool {
        self.join_policy.can_anyone_join()
    }
}

/// Creation input for a group. Ranks are raw integers, clamped on creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub kind: GroupKind,
    pub is_protected: bool,
    pub default_member_rank: i64,
    pub can_anyone_ask: bool,
    pub req_rank_invite: i64,
    pub req_rank_kick: i64,
    pub req_rank_accept_join_requests: i64,
    pub req_rank_promote: i64,
    pub req_rank_demote: i64,
    pub req_rank_modify_group_infos: i64,
    pub resp_group: Option<GroupId>,
}

impl NewGroup {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for NewGroup {
    fn default() -> Self {
        let t = RankThresholds::default();
        Self {
            name: String::new(),
            description: String::new(),
            visibility: Visibility::default(),
            kind: GroupKind::default(),
            is_protected: false,
            default_member_rank: i64::from(JoinPolicy::default().default_member_rank()),
            can_anyone_ask: false,
            req_rank_invite: i64::from(t.invite.get()),
            req_rank_kick: i64::from(t.kick.get()),
            req_rank_accept_join_requests: i64::from(t.accept_join_requests.get()),
            req_rank_promote: i64::from(t.promote.get()),
            req_rank_demote: i64::from(t.demote.get()),
            req_rank_modify_group_infos: i64::from(t.modify_group_infos.get()),
            resp_group: None,
        }
    }
}

/// Partial update of a group's information and policy.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub default_member_rank: Option<i64>,
    pub can_anyone_ask: Option<bool>,
    pub req_rank_invite: Option<i64>,
    pub req_rank_kick: Option<i64>,
    pub req_rank_accept_join_requests: Option<i64>,
    pub req_rank_promote: Option<i64>,
    pub req_rank_demote: Option<i64>,
    pub req_rank_modify_group_infos: Option<i64>,
    /// `Some(None)` clears the responsible group.
    pub resp_group: Option<Option<GroupId>>,
}

fn validate_name(raw: &str) -> Result<String, GuildError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GuildError::InvalidName("name is empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GuildError::InvalidName(format!(
            "name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(new: NewGroup) -> Group {
        Group::from_new(GroupId::new(1), new, Timestamp::new(10)).unwrap()
    }

    #[test]
    fn defaults_are_private_and_closed() {
        let group = build(NewGroup::named("chess club"));
        assert_eq!(group.visibility, Visibility::Private);
        assert_eq!(group.join_policy, JoinPolicy::Closed);
        assert_eq!(group.thresholds, RankThresholds::default());
        assert!(!group.is_protected);
    }

    #[test]
    fn out_of_range_thresholds_are_clamped() {
        let group = build(NewGroup {
            req_rank_kick: 50,
            req_rank_invite: -3,
            default_member_rank: 14,
            ..NewGroup::named("g")
        });
        assert_eq!(group.thresholds.kick, ADMIN_RANK);
        assert_eq!(group.thresholds.invite, Rank::PENDING);
        assert_eq!(group.join_policy, JoinPolicy::Open(ADMIN_RANK));
    }

    #[test]
    fn cluster_policy_overrides_caller_input() {
        let group = build(NewGroup {
            kind: GroupKind::Cluster,
            visibility: Visibility::Private,
            default_member_rank: 3,
            req_rank_invite: 1,
            resp_group: Some(GroupId::new(9)),
            ..NewGroup::named("campus")
        });
        assert!(group.is_public());
        assert!(group.is_protected);
        assert_eq!(group.join_policy, JoinPolicy::Closed);
        assert_eq!(group.thresholds, RankThresholds::all(ADMIN_RANK));
        assert_eq!(group.resp_group, None);
    }

    #[test]
    fn patch_cannot_loosen_a_school() {
        let mut group = build(NewGroup {
            kind: GroupKind::School,
            ..NewGroup::named("school")
        });
        group
            .apply_patch(
                GroupPatch {
                    name: Some("renamed".into()),
                    default_member_rank: Some(1),
                    req_rank_kick: Some(2),
                    ..GroupPatch::default()
                },
                Timestamp::new(20),
            )
            .unwrap();
        assert_eq!(group.name, "renamed");
        assert_eq!(group.join_policy, JoinPolicy::Closed);
        assert_eq!(group.thresholds.kick, ADMIN_RANK);
        assert_eq!(group.updated, Timestamp::new(20));
    }

    #[test]
    fn patch_clears_responsible_group() {
        let mut group = build(NewGroup {
            resp_group: Some(GroupId::new(4)),
            ..NewGroup::named("g")
        });
        group
            .apply_patch(
                GroupPatch {
                    resp_group: Some(None),
                    ..GroupPatch::default()
                },
                Timestamp::new(11),
            )
            .unwrap();
        assert_eq!(group.resp_group, None);
    }

    #[test]
    fn blank_and_oversized_names_are_rejected() {
        let blank = Group::from_new(GroupId::new(1), NewGroup::named("   "), Timestamp::EPOCH);
        assert!(matches!(blank, Err(GuildError::InvalidName(_))));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        let oversized = Group::from_new(GroupId::new(1), NewGroup::named(long), Timestamp::EPOCH);
        assert!(oversized.is_err());
    }
}
