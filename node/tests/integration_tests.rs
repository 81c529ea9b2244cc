//! Integration tests exercising the node end to end:
//! config → LMDB store → engine → reopen → readback.

use guild_node::{GuildNode, NodeConfig, NodeError, NotificationConfig};
use guild_store::MembershipStore;
use guild_types::{JoinPolicy, NewGroup, NewUser, Visibility};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn temp_config() -> (tempfile::TempDir, NodeConfig) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = NodeConfig {
        data_dir: dir.path().join("db"),
        map_size_mb: 16,
        ..NodeConfig::default()
    };
    (dir, config)
}

fn user(name: &str) -> NewUser {
    NewUser {
        email: format!("{name}@guild.test"),
        display_name: name.to_string(),
        is_global_admin: false,
    }
}

// ---------------------------------------------------------------------------
// 1. Persistence across reopen
// ---------------------------------------------------------------------------

#[test]
fn state_survives_reopen() {
    let (_dir, config) = temp_config();

    let (root, group) = {
        let node = GuildNode::open(config.clone()).expect("open node");
        let engine = node.engine();
        let root = engine.register_user(None, user("root")).unwrap().value.actor();
        let group = engine
            .create_group(
                &root,
                NewGroup {
                    visibility: Visibility::Public,
                    default_member_rank: 1,
                    ..NewGroup::named("chess")
                },
            )
            .unwrap()
            .value;
        (root, group)
    };

    let node = GuildNode::open(config).expect("reopen node");
    let engine = node.engine();
    let actor = engine.authenticate(Some(root.user)).unwrap();
    assert!(actor.is_global_admin);
    let read = engine.get_group(&actor, group.id).unwrap();
    assert_eq!(read, group);
    assert_eq!(read.join_policy, JoinPolicy::Open(guild_types::Rank::MEMBER));
    assert_eq!(engine.list_members(&actor, group.id).unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// 2. Lifecycle through the LMDB backend
// ---------------------------------------------------------------------------

#[test]
fn join_and_kick_through_lmdb() {
    let (_dir, config) = temp_config();
    let node = GuildNode::open(config).expect("open node");
    let engine = node.engine();

    let root = engine.register_user(None, user("root")).unwrap().value.actor();
    let u = engine.register_user(Some(&root), user("u")).unwrap().value.actor();
    let group = engine
        .create_group(
            &root,
            NewGroup {
                visibility: Visibility::Public,
                default_member_rank: 0,
                ..NewGroup::named("club")
            },
        )
        .unwrap()
        .value;

    let request = engine.join(&u, group.id).unwrap().value;
    assert!(request.rank.is_pending());
    let accepted = engine.accept_join_request(&root, request.id).unwrap().value;
    assert_eq!(accepted.version, 1);

    let stale = engine.join(&u, group.id).unwrap_err();
    assert_eq!(stale.status(), guild_groups::StatusClass::Conflict);

    engine.kick(&root, accepted.id).unwrap();
    let row = engine.store().find_membership(u.user, group.id).unwrap();
    assert!(row.is_none());
}

// ---------------------------------------------------------------------------
// 3. Configuration and data directory checks
// ---------------------------------------------------------------------------

#[test]
fn existing_directory_without_database_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = NodeConfig {
        data_dir: dir.path().to_path_buf(),
        ..NodeConfig::default()
    };
    assert!(matches!(GuildNode::open(config), Err(NodeError::DataDir(_))));
}

#[tokio::test]
async fn webhook_node_drains_on_shutdown() {
    let (_dir, mut config) = temp_config();
    config.notifications = NotificationConfig {
        webhook_url: Some("http://127.0.0.1:9/events".to_string()),
        timeout_secs: 1,
    };
    let node = GuildNode::open(config).expect("open node");
    node.engine().register_user(None, user("root")).unwrap();
    node.shutdown().await;
}
