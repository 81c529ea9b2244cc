//! Ordinal membership ranks and group join policies.
//!
//! A membership's [`Rank`] is the single source of authorization state:
//! 0 is a pending join request, 1..=9 are member grades and
//! [`ADMIN_RANK`] is full administration. Every per-group threshold is a
//! `Rank` too, so all permission checks reduce to integer comparisons.

use crate::error::GuildError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal authorization level, always within `[0, ADMIN_RANK]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rank(u8);

/// The maximum rank: full group administration.
pub const ADMIN_RANK: Rank = Rank(10);

impl Rank {
    /// A join request awaiting acceptance.
    pub const PENDING: Self = Self(0);
    /// The lowest accepted grade.
    pub const MEMBER: Self = Self(1);
    pub const ADMIN: Self = ADMIN_RANK;

    /// Build a rank from any integer, clamping into `[0, ADMIN_RANK]`.
    pub fn clamped(raw: i64) -> Self {
        Self(raw.clamp(0, i64::from(ADMIN_RANK.0)) as u8)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub fn is_pending(self) -> bool {
        self == Self::PENDING
    }

    /// Whether the membership has been accepted (rank >= 1).
    pub fn is_accepted(self) -> bool {
        self >= Self::MEMBER
    }

    pub fn is_admin(self) -> bool {
        self == ADMIN_RANK
    }
}

impl TryFrom<u8> for Rank {
    type Error = GuildError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        if raw > ADMIN_RANK.0 {
            return Err(GuildError::InvalidRank(i64::from(raw)));
        }
        Ok(Self(raw))
    }
}

impl TryFrom<i64> for Rank {
    type Error = GuildError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        if !(0..=i64::from(ADMIN_RANK.0)).contains(&raw) {
            return Err(GuildError::InvalidRank(raw));
        }
        Ok(Self(raw as u8))
    }
}

impl From<Rank> for u8 {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// How users without an invitation may enter a group.
///
/// Stored and transmitted as the integer `default_member_rank`:
/// −1 closed, 0 join-by-request, ≥1 instant join at that rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i8", into = "i8")]
pub enum JoinPolicy {
    /// Nobody may join without an invitation.
    #[default]
    Closed,
    /// Joining creates a pending (rank 0) membership.
    Request,
    /// Joining is immediate at the given rank.
    Open(Rank),
}

impl JoinPolicy {
    /// Interpret a raw `default_member_rank`; negatives close the group and
    /// values above `ADMIN_RANK` are clamped.
    pub fn from_default_member_rank(raw: i64) -> Self {
        match raw {
            i64::MIN..=-1 => Self::Closed,
            0 => Self::Request,
            n => Self::Open(Rank::clamped(n)),
        }
    }

    pub fn default_member_rank(self) -> i8 {
        match self {
            Self::Closed => -1,
            Self::Request => 0,
            Self::Open(rank) => rank.get() as i8,
        }
    }

    pub fn can_anyone_join(self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Rank granted when an invitation or request resolves into a membership.
    pub fn initial_accepted_rank(self) -> Rank {
        match self {
            Self::Open(rank) => rank,
            Self::Closed | Self::Request => Rank::MEMBER,
        }
    }
}

impl From<i8> for JoinPolicy {
    fn from(raw: i8) -> Self {
        Self::from_default_member_rank(i64::from(raw))
    }
}

impl From<JoinPolicy> for i8 {
    fn from(policy: JoinPolicy) -> Self {
        policy.default_member_rank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamping_bounds_both_ends() {
        assert_eq!(Rank::clamped(-4), Rank::PENDING);
        assert_eq!(Rank::clamped(3).get(), 3);
        assert_eq!(Rank::clamped(99), ADMIN_RANK);
    }

    #[test]
    fn checked_conversion_rejects_out_of_range() {
        assert!(Rank::try_from(11u8).is_err());
        assert!(Rank::try_from(-1i64).is_err());
        assert_eq!(Rank::try_from(10i64).unwrap(), ADMIN_RANK);
    }

    #[test]
    fn deserializing_an_oversized_rank_fails() {
        let result: Result<Rank, _> = serde_json::from_str("12");
        assert!(result.is_err());
        let rank: Rank = serde_json::from_str("4").unwrap();
        assert_eq!(rank.get(), 4);
    }

    #[test]
    fn join_policy_integer_form() {
        assert_eq!(JoinPolicy::from_default_member_rank(-1), JoinPolicy::Closed);
        assert_eq!(JoinPolicy::from_default_member_rank(-30), JoinPolicy::Closed);
        assert_eq!(JoinPolicy::from_default_member_rank(0), JoinPolicy::Request);
        assert_eq!(
            JoinPolicy::from_default_member_rank(40),
            JoinPolicy::Open(ADMIN_RANK)
        );
        assert_eq!(JoinPolicy::Open(Rank::clamped(3)).default_member_rank(), 3);
    }

    #[test]
    fn initial_accepted_rank_is_never_pending() {
        assert_eq!(JoinPolicy::Closed.initial_accepted_rank(), Rank::MEMBER);
        assert_eq!(JoinPolicy::Request.initial_accepted_rank(), Rank::MEMBER);
        assert_eq!(
            JoinPolicy::Open(Rank::clamped(4)).initial_accepted_rank().get(),
            4
        );
    }

    #[test]
    fn only_closed_groups_refuse_joins() {
        assert!(!JoinPolicy::Closed.can_anyone_join());
        assert!(JoinPolicy::Request.can_anyone_join());
        assert!(JoinPolicy::Open(Rank::MEMBER).can_anyone_join());
    }
}
