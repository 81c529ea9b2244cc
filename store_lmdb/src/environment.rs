//! LMDB environment setup.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use heed::{Env, EnvOpenOptions};

use crate::keys::RawDb;
use crate::LmdbError;

/// Named databases inside one environment.
pub const DATABASE_NAMES: &[&str] = &[
    "users",
    "user_by_email",
    "groups",
    "memberships",
    "member_by_user",
    "member_by_group",
    "invitations",
    "invitation_by_user",
    "invitation_by_group",
    "acknowledgments",
    "ack_by_asking",
    "ack_by_validator",
    "meta",
];

const MAX_DBS: u32 = 16;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) users_db: RawDb,
    /// normalised email -> user id
    pub(crate) user_by_email_db: RawDb,
    pub(crate) groups_db: RawDb,
    pub(crate) memberships_db: RawDb,
    /// user ++ group -> membership id
    pub(crate) member_by_user_db: RawDb,
    /// group ++ user -> membership id
    pub(crate) member_by_group_db: RawDb,
    pub(crate) invitations_db: RawDb,
    /// invitee ++ group -> invitation id
    pub(crate) invitation_by_user_db: RawDb,
    /// group ++ invitee -> invitation id
    pub(crate) invitation_by_group_db: RawDb,
    pub(crate) acknowledgments_db: RawDb,
    /// asking ++ validator -> acknowledgment id
    pub(crate) ack_by_asking_db: RawDb,
    /// validator ++ asking -> acknowledgment id
    pub(crate) ack_by_validator_db: RawDb,
    pub(crate) meta_db: RawDb,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        fs::create_dir_all(path)
            .map_err(|e| LmdbError::Heed(format!("create {}: {}", path.display(), e)))?;

        // SAFETY: this process is the only one that maps the environment,
        // and it is opened once per path.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let users_db: RawDb = env.create_database(&mut wtxn, Some("users"))?;
        let user_by_email_db: RawDb = env.create_database(&mut wtxn, Some("user_by_email"))?;
        let groups_db: RawDb = env.create_database(&mut wtxn, Some("groups"))?;
        let memberships_db: RawDb = env.create_database(&mut wtxn, Some("memberships"))?;
        let member_by_user_db: RawDb = env.create_database(&mut wtxn, Some("member_by_user"))?;
        let member_by_group_db: RawDb = env.create_database(&mut wtxn, Some("member_by_group"))?;
        let invitations_db: RawDb = env.create_database(&mut wtxn, Some("invitations"))?;
        let invitation_by_user_db: RawDb =
            env.create_database(&mut wtxn, Some("invitation_by_user"))?;
        let invitation_by_group_db: RawDb =
            env.create_database(&mut wtxn, Some("invitation_by_group"))?;
        let acknowledgments_db: RawDb = env.create_database(&mut wtxn, Some("acknowledgments"))?;
        let ack_by_asking_db: RawDb = env.create_database(&mut wtxn, Some("ack_by_asking"))?;
        let ack_by_validator_db: RawDb =
            env.create_database(&mut wtxn, Some("ack_by_validator"))?;
        let meta_db: RawDb = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            users_db,
            user_by_email_db,
            groups_db,
            memberships_db,
            member_by_user_db,
            member_by_group_db,
            invitations_db,
            invitation_by_user_db,
            invitation_by_group_db,
            acknowledgments_db,
            ack_by_asking_db,
            ack_by_validator_db,
            meta_db,
        })
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }
}
