//! guild: run one membership operation against a local data directory.

mod cli;

use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;

use cli::{AckCommand, Cli, Command, GroupCommand, InvitationCommand, MemberCommand, UserCommand};
use guild_groups::{GroupEngine, GroupError, GroupFilter};
use guild_node::tracing_spans::operation_span;
use guild_node::{init_logging, GuildNode, NodeConfig};
use guild_store_lmdb::LmdbStore;
use guild_types::{Actor, NewUser, UserId};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load config from file if provided, otherwise use defaults.
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    init_logging(config.log_format, &config.log_level)?;

    let node = GuildNode::open(config)?;
    let session = Session {
        engine: node.engine(),
        actor: cli.actor,
    };
    let result = session.dispatch(cli.command);
    node.shutdown().await;

    match result? {
        Ok(json) => {
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}: {e}", e.status());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Rendered JSON on success; engine failures are kept apart from
/// failures of the binary itself.
type Rendered = anyhow::Result<Result<String, GroupError>>;

struct Session<'a> {
    engine: &'a GroupEngine<LmdbStore>,
    actor: Option<UserId>,
}

impl Session<'_> {
    fn me(&self) -> Result<Actor, GroupError> {
        self.engine.authenticate(self.actor)
    }

    fn run<T: Serialize>(
        &self,
        operation: &str,
        op: impl FnOnce() -> Result<T, GroupError>,
    ) -> Rendered {
        let _span = operation_span(operation, self.actor).entered();
        match op() {
            Ok(value) => Ok(Ok(serde_json::to_string_pretty(&value)?)),
            Err(e) => {
                tracing::debug!(status = %e.status(), error = %e, "operation failed");
                Ok(Err(e))
            }
        }
    }

    fn dispatch(&self, command: Command) -> Rendered {
        match command {
            Command::User(cmd) => self.user(cmd),
            Command::Group(cmd) => self.group(cmd),
            Command::Member(cmd) => self.member(cmd),
            Command::Invitation(cmd) => self.invitation(cmd),
            Command::Ack(cmd) => self.ack(cmd),
        }
    }

    fn user(&self, cmd: UserCommand) -> Rendered {
        let engine = self.engine;
        match cmd {
            UserCommand::Register {
                email,
                name,
                global_admin,
            } => self.run("register_user", || {
                // Anonymous registration is only valid on an empty directory.
                let actor = self.actor.map(|id| engine.authenticate(Some(id))).transpose()?;
                engine.register_user(
                    actor.as_ref(),
                    NewUser {
                        email,
                        display_name: name,
                        is_global_admin: global_admin,
                    },
                )
            }),
            UserCommand::Show { user } => {
                self.run("get_user", || engine.get_user(&self.me()?, user))
            }
            UserCommand::Memberships { user } => self.run("user_memberships", || {
                engine.user_memberships(&self.me()?, user)
            }),
        }
    }

    fn group(&self, cmd: GroupCommand) -> Rendered {
        let engine = self.engine;
        match cmd {
            GroupCommand::Create(args) => self.run("create_group", || {
                engine.create_group(&self.me()?, args.into())
            }),
            GroupCommand::CreateCluster(args) => self.run("create_cluster", || {
                engine.create_cluster(&self.me()?, args.into())
            }),
            GroupCommand::CreateSchool(args) => self.run("create_school", || {
                engine.create_school(&self.me()?, args.into())
            }),
            GroupCommand::Update { group, patch } => self.run("update_group", || {
                engine.update_group(&self.me()?, group, patch.into())
            }),
            GroupCommand::Delete { group } => {
                self.run("delete_group", || engine.delete_group(&self.me()?, group))
            }
            GroupCommand::Show { group } => {
                self.run("get_group", || engine.get_group(&self.me()?, group))
            }
            GroupCommand::List {
                kind,
                name_contains,
                visibility,
            } => {
                let filter = GroupFilter {
                    kind: kind.map(Into::into),
                    name_contains,
                    visibility: visibility.map(Into::into),
                };
                self.run("list_groups", || engine.list_groups(&self.me()?, &filter))
            }
            GroupCommand::Members { group } => {
                self.run("list_members", || engine.list_members(&self.me()?, group))
            }
            GroupCommand::Capabilities { group } => {
                self.run("capabilities", || engine.capabilities(&self.me()?, group))
            }
        }
    }

    fn member(&self, cmd: MemberCommand) -> Rendered {
        let engine = self.engine;
        match cmd {
            MemberCommand::Join { group } => {
                self.run("join", || engine.join(&self.me()?, group))
            }
            MemberCommand::Leave { group } => {
                self.run("leave", || engine.leave(&self.me()?, group))
            }
            MemberCommand::Invite { group, user } => {
                self.run("invite", || engine.invite(&self.me()?, group, user))
            }
            MemberCommand::Accept { membership } => self.run("accept_join_request", || {
                engine.accept_join_request(&self.me()?, membership)
            }),
            MemberCommand::Reject { membership } => self.run("reject_join_request", || {
                engine.reject_join_request(&self.me()?, membership)
            }),
            MemberCommand::Rank { membership, rank } => self.run("change_rank", || {
                engine.change_rank(&self.me()?, membership, rank)
            }),
            MemberCommand::Kick { membership } => {
                self.run("kick", || engine.kick(&self.me()?, membership))
            }
            MemberCommand::Show { membership } => self.run("get_membership", || {
                engine.get_membership(&self.me()?, membership)
            }),
        }
    }

    fn invitation(&self, cmd: InvitationCommand) -> Rendered {
        let engine = self.engine;
        match cmd {
            InvitationCommand::Create { group, user, ask } => {
                self.run("create_invitation", || {
                    engine.create_invitation(&self.me()?, group, user, ask)
                })
            }
            InvitationCommand::Confirm { invitation } => self.run("confirm_invitation", || {
                engine.confirm_invitation(&self.me()?, invitation)
            }),
            InvitationCommand::Destroy { invitation } => self.run("destroy_invitation", || {
                engine.destroy_invitation(&self.me()?, invitation)
            }),
            InvitationCommand::Show { invitation } => self.run("get_invitation", || {
                engine.get_invitation(&self.me()?, invitation)
            }),
            InvitationCommand::Mine => self.run("invitations_for_user", || {
                engine.invitations_for_user(&self.me()?)
            }),
            InvitationCommand::Group { group } => self.run("invitations_for_group", || {
                engine.invitations_for_group(&self.me()?, group)
            }),
        }
    }

    fn ack(&self, cmd: AckCommand) -> Rendered {
        let engine = self.engine;
        match cmd {
            AckCommand::Request {
                asking,
                validator,
                no_delegate_admin,
            } => self.run("request_acknowledgment", || {
                engine.request_acknowledgment(&self.me()?, asking, validator, !no_delegate_admin)
            }),
            AckCommand::Validate { asking, validator } => self.run("validate", || {
                engine.validate(&self.me()?, asking, validator)
            }),
            AckCommand::Remove { asking, validator } => self.run("remove_acknowledgment", || {
                engine.remove_acknowledgment(&self.me()?, asking, validator)
            }),
            AckCommand::List { group } => self.run("acknowledgments", || {
                engine.acknowledgments(&self.me()?, group)
            }),
            AckCommand::Related { user, group } => self.run("is_related_to", || {
                // Authenticated even though the relation query itself is not
                // actor-scoped.
                self.me()?;
                engine.is_related_to(user, group)
            }),
            AckCommand::Show {
                group,
                acknowledgment,
            } => self.run("get_acknowledgment", || {
                engine
                    .acknowledgments(&self.me()?, group)?
                    .into_iter()
                    .find(|edge| edge.id == acknowledgment)
                    .ok_or_else(|| GroupError::NotFound(acknowledgment.to_string()))
            }),
        }
    }
}
