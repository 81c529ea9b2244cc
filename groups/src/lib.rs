//! Rank-based group membership and authorization.
//!
//! Groups carry per-action rank thresholds; a membership's rank (0 pending,
//! 1..=9 member grades, 10 administrator) is the only authorization state.
//! [`GroupEngine`] runs every operation as load, existence, visibility,
//! permission, then one conditional write through a [`guild_store::Store`].
//! The decisions themselves are the pure predicates in [`authz`].

pub mod acknowledgment;
pub mod authz;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod graph;
pub mod invitation;
pub mod lifecycle;
pub mod notify;
pub mod registry;

pub use authz::MemberCapabilities;
pub use config::EngineConfig;
pub use engine::GroupEngine;
pub use error::{GroupError, Outcome, StatusClass};
pub use lifecycle::Invited;
pub use notify::{FanoutNotifier, TracingNotifier, WebhookNotifier};
pub use registry::GroupFilter;
