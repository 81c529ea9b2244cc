//! Membership records.

use crate::ids::{GroupId, MembershipId, UserId};
use crate::rank::Rank;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// One (user, group) membership. At most one exists per pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: MembershipId,
    pub user: UserId,
    pub group: GroupId,
    /// 0 = pending request, 1..=9 member grades, 10 administrator.
    pub rank: Rank,
    pub created: Timestamp,
    /// Set when the membership becomes accepted.
    pub join_date: Option<Timestamp>,
    /// Bumped on every update; the optimistic concurrency token.
    pub version: u64,
}

impl GroupMember {
    /// A fresh membership at `rank`; accepted ranks get a join date.
    pub fn new(
        id: MembershipId,
        user: UserId,
        group: GroupId,
        rank: Rank,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            user,
            group,
            rank,
            created: now,
            join_date: rank.is_accepted().then_some(now),
            version: 0,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.rank.is_accepted()
    }

    /// The next revision of this row at a new rank.
    pub fn with_rank(&self, rank: Rank, now: Timestamp) -> Self {
        let mut next = self.clone();
        next.rank = rank;
        if rank.is_accepted() && next.join_date.is_none() {
            next.join_date = Some(now);
        }
        next.version = self.version + 1;
        next
    }
}
