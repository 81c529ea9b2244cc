//! Command-line surface of the `guild` binary.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use guild_node::LogFormat;
use guild_types::{
    AcknowledgmentId, GroupId, GroupKind, GroupPatch, InvitationId, MembershipId, NewGroup,
    UserId, Visibility,
};

#[derive(Parser)]
#[command(name = "guild", about = "Rank-based group membership and authorization", version)]
pub struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, global = true, env = "GUILD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory for the LMDB store.
    #[arg(long, global = true, env = "GUILD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, global = true, env = "GUILD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "GUILD_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// The acting user.
    #[arg(long = "as", global = true, env = "GUILD_ACTOR", value_name = "USER_ID")]
    pub actor: Option<UserId>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register and look up users.
    #[command(subcommand)]
    User(UserCommand),
    /// Create, edit and browse groups.
    #[command(subcommand)]
    Group(GroupCommand),
    /// Join, invite, accept, rank and kick.
    #[command(subcommand)]
    Member(MemberCommand),
    /// Invitation offers and join asks.
    #[command(subcommand)]
    Invitation(InvitationCommand),
    /// Acknowledgment edges between groups.
    #[command(subcommand)]
    Ack(AckCommand),
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a user. The first user needs no actor and becomes a
    /// global admin.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        global_admin: bool,
    },
    Show { user: UserId },
    /// A user's memberships, as far as the actor may see them.
    Memberships { user: UserId },
}

#[derive(Subcommand)]
pub enum GroupCommand {
    Create(GroupArgs),
    /// Create a cluster (global admins only).
    CreateCluster(GroupArgs),
    /// Create a school (global admins only).
    CreateSchool(GroupArgs),
    Update {
        group: GroupId,
        #[command(flatten)]
        patch: PatchArgs,
    },
    Delete { group: GroupId },
    Show { group: GroupId },
    List {
        #[arg(long)]
        kind: Option<KindArg>,
        #[arg(long)]
        name_contains: Option<String>,
        #[arg(long)]
        visibility: Option<VisibilityArg>,
    },
    Members { group: GroupId },
    /// The actor's capabilities in a group.
    Capabilities { group: GroupId },
}

#[derive(Subcommand)]
pub enum MemberCommand {
    Join { group: GroupId },
    Leave { group: GroupId },
    Invite { group: GroupId, user: UserId },
    Accept { membership: MembershipId },
    Reject { membership: MembershipId },
    Rank {
        membership: MembershipId,
        #[arg(allow_negative_numbers = true)]
        rank: i64,
    },
    Kick { membership: MembershipId },
    Show { membership: MembershipId },
}

#[derive(Subcommand)]
pub enum InvitationCommand {
    Create {
        group: GroupId,
        user: UserId,
        /// The invitee asks to join instead of being offered a seat.
        #[arg(long)]
        ask: bool,
    },
    Confirm { invitation: InvitationId },
    Destroy { invitation: InvitationId },
    Show { invitation: InvitationId },
    /// The actor's own invitations.
    Mine,
    /// Invitations of a group (invite clearance required).
    Group { group: GroupId },
}

#[derive(Subcommand)]
pub enum AckCommand {
    Request {
        asking: GroupId,
        validator: GroupId,
        /// Do not let the validator's administrators edit the asking group.
        #[arg(long)]
        no_delegate_admin: bool,
    },
    Validate { asking: GroupId, validator: GroupId },
    Remove { asking: GroupId, validator: GroupId },
    List { group: GroupId },
    /// Whether a user is related to a group through acknowledgments.
    Related { user: UserId, group: GroupId },
    /// Look an edge up by id among a group's edges.
    Show { group: GroupId, acknowledgment: AcknowledgmentId },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Basic,
    Cursus,
    Association,
    Promotion,
    School,
    Cluster,
}

impl From<KindArg> for GroupKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Basic => GroupKind::Basic,
            KindArg::Cursus => GroupKind::Cursus,
            KindArg::Association => GroupKind::Association,
            KindArg::Promotion => GroupKind::Promotion,
            KindArg::School => GroupKind::School,
            KindArg::Cluster => GroupKind::Cluster,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum VisibilityArg {
    Public,
    Private,
}

impl From<VisibilityArg> for Visibility {
    fn from(v: VisibilityArg) -> Self {
        match v {
            VisibilityArg::Public => Visibility::Public,
            VisibilityArg::Private => Visibility::Private,
        }
    }
}

/// Creation input. Unset ranks keep the group defaults.
#[derive(Args)]
pub struct GroupArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long)]
    pub public: bool,
    #[arg(long, default_value = "basic")]
    pub kind: KindArg,
    #[arg(long)]
    pub protected: bool,
    /// -1 closed, 0 join by request, 1..=10 instant join at that rank.
    #[arg(long, allow_negative_numbers = true)]
    pub default_member_rank: Option<i64>,
    #[arg(long)]
    pub can_anyone_ask: bool,
    #[command(flatten)]
    pub ranks: RankArgs,
    #[arg(long)]
    pub resp_group: Option<GroupId>,
}

#[derive(Args)]
pub struct RankArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub req_rank_invite: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub req_rank_kick: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub req_rank_accept_join_requests: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub req_rank_promote: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub req_rank_demote: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub req_rank_modify_group_infos: Option<i64>,
}

#[derive(Args)]
pub struct PatchArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub visibility: Option<VisibilityArg>,
    #[arg(long, allow_negative_numbers = true)]
    pub default_member_rank: Option<i64>,
    #[arg(long)]
    pub can_anyone_ask: Option<bool>,
    #[command(flatten)]
    pub ranks: RankArgs,
    #[arg(long, conflicts_with = "clear_resp_group")]
    pub resp_group: Option<GroupId>,
    #[arg(long)]
    pub clear_resp_group: bool,
}

impl From<GroupArgs> for NewGroup {
    fn from(args: GroupArgs) -> Self {
        let defaults = NewGroup::default();
        let r = args.ranks;
        NewGroup {
            name: args.name,
            description: args.description,
            visibility: if args.public {
                Visibility::Public
            } else {
                Visibility::Private
            },
            kind: args.kind.into(),
            is_protected: args.protected,
            default_member_rank: args
                .default_member_rank
                .unwrap_or(defaults.default_member_rank),
            can_anyone_ask: args.can_anyone_ask,
            req_rank_invite: r.req_rank_invite.unwrap_or(defaults.req_rank_invite),
            req_rank_kick: r.req_rank_kick.unwrap_or(defaults.req_rank_kick),
            req_rank_accept_join_requests: r
                .req_rank_accept_join_requests
                .unwrap_or(defaults.req_rank_accept_join_requests),
            req_rank_promote: r.req_rank_promote.unwrap_or(defaults.req_rank_promote),
            req_rank_demote: r.req_rank_demote.unwrap_or(defaults.req_rank_demote),
            req_rank_modify_group_infos: r
                .req_rank_modify_group_infos
                .unwrap_or(defaults.req_rank_modify_group_infos),
            resp_group: args.resp_group,
        }
    }
}

impl From<PatchArgs> for GroupPatch {
    fn from(args: PatchArgs) -> Self {
        let r = args.ranks;
        GroupPatch {
            name: args.name,
            description: args.description,
            visibility: args.visibility.map(Into::into),
            default_member_rank: args.default_member_rank,
            can_anyone_ask: args.can_anyone_ask,
            req_rank_invite: r.req_rank_invite,
            req_rank_kick: r.req_rank_kick,
            req_rank_accept_join_requests: r.req_rank_accept_join_requests,
            req_rank_promote: r.req_rank_promote,
            req_rank_demote: r.req_rank_demote,
            req_rank_modify_group_infos: r.req_rank_modify_group_infos,
            resp_group: if args.clear_resp_group {
                Some(None)
            } else {
                args.resp_group.map(Some)
            },
        }
    }
}
