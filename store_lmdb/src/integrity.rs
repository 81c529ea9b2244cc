//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the engine begins
//! serving requests. Beyond reading every database, the check verifies
//! that each secondary index agrees with its primary records.

use std::path::Path;

use heed::RoTxn;
use serde::de::DeserializeOwned;

use guild_types::{GroupAcknowledgment, GroupInvitation, GroupMember, User};

use crate::environment::{LmdbEnvironment, DATABASE_NAMES};
use crate::keys::{decode, get_indexed, pair_key, read_id, RawDb};
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check LMDB database integrity.
///
/// Read failures and index mismatches are recorded in the report rather
/// than causing a hard error.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.env().read_txn()?;

    for &db_name in DATABASE_NAMES {
        match env
            .env()
            .open_database::<heed::types::Bytes, heed::types::Bytes>(&rtxn, Some(db_name))
        {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }

    check_records::<GroupMember>(&rtxn, &env.memberships_db, &mut report, |m| {
        vec![
            (&env.member_by_user_db, m.user.get(), m.group.get(), m.id.get()),
            (&env.member_by_group_db, m.group.get(), m.user.get(), m.id.get()),
        ]
    })?;
    check_records::<GroupInvitation>(&rtxn, &env.invitations_db, &mut report, |i| {
        vec![
            (&env.invitation_by_user_db, i.invitee.get(), i.group.get(), i.id.get()),
            (&env.invitation_by_group_db, i.group.get(), i.invitee.get(), i.id.get()),
        ]
    })?;
    check_records::<GroupAcknowledgment>(&rtxn, &env.acknowledgments_db, &mut report, |k| {
        let (asking, validator) = (k.asking_group.get(), k.validator_group.get());
        vec![
            (&env.ack_by_asking_db, asking, validator, k.id.get()),
            (&env.ack_by_validator_db, validator, asking, k.id.get()),
        ]
    })?;
    check_user_emails(&rtxn, env, &mut report)?;

    Ok(report)
}

/// Every primary record must be reachable through each of its indexes.
fn check_records<'d, T: DeserializeOwned>(
    txn: &RoTxn,
    primary: &RawDb,
    report: &mut IntegrityReport,
    index_entries: impl Fn(&T) -> Vec<(&'d RawDb, u64, u64, u64)>,
) -> Result<(), LmdbError> {
    for entry in primary.iter(txn)? {
        let (key, val) = entry?;
        let id = read_id(key)?;
        let record: T = match decode(val) {
            Ok(record) => record,
            Err(e) => {
                report.errors.push(format!("record {id} undecodable: {e}"));
                continue;
            }
        };
        for (index, a, b, expected) in index_entries(&record) {
            if get_indexed(index, txn, a, b)? != Some(expected) {
                report
                    .errors
                    .push(format!("record {id} missing index entry {:?}", pair_key(a, b)));
            }
        }
    }
    Ok(())
}

fn check_user_emails(
    txn: &RoTxn,
    env: &LmdbEnvironment,
    report: &mut IntegrityReport,
) -> Result<(), LmdbError> {
    for entry in env.users_db.iter(txn)? {
        let (_key, val) = entry?;
        let user: User = decode(val)?;
        if env.user_id_by_email_in(txn, &user.email)? != Some(user.id) {
            report
                .errors
                .push(format!("{} missing email index entry", user.id));
        }
    }
    Ok(())
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_data_dir_fresh_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(&dir.path().join("absent")).is_ok());
    }

    #[test]
    fn existing_dir_without_data_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(dir.path()).is_err());
    }

    #[test]
    fn unhealthy_report() {
        let report = IntegrityReport {
            databases_checked: 5,
            total_entries: 100,
            errors: vec!["corruption detected".to_string()],
        };
        assert!(!report.is_healthy());
    }
}
