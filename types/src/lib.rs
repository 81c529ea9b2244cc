//! Fundamental types for the Guild membership engine.
//!
//! This crate defines the records shared across every other crate in the
//! workspace: identifiers, ranks and join policies, groups, memberships,
//! invitations, acknowledgments, users, timestamps and the event stream.

pub mod acknowledgment;
pub mod error;
pub mod event;
pub mod group;
pub mod ids;
pub mod invitation;
pub mod member;
pub mod rank;
pub mod time;
pub mod user;

pub use acknowledgment::GroupAcknowledgment;
pub use error::GuildError;
pub use event::{GroupEvent, Notifier};
pub use group::{Group, GroupKind, GroupPatch, NewGroup, RankThresholds, Visibility};
pub use ids::{AcknowledgmentId, GroupId, InvitationId, MembershipId, UserId};
pub use invitation::GroupInvitation;
pub use member::GroupMember;
pub use rank::{JoinPolicy, Rank, ADMIN_RANK};
pub use time::{Clock, SystemClock, Timestamp};
pub use user::{Actor, NewUser, User};
