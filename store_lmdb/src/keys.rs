//! Key layout and record codec shared by every family.
//!
//! Primary databases are keyed by the 8-byte big-endian record id. Index
//! databases use the 16-byte composite `a ++ b` and store the 8-byte id of
//! the indexed record, so a range scan over the first 8 bytes enumerates
//! every row for one user or group in id order.

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, RoTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::LmdbError;

pub(crate) type RawDb = Database<Bytes, Bytes>;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

pub(crate) fn pair_key(a: u64, b: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&a.to_be_bytes());
    key[8..].copy_from_slice(&b.to_be_bytes());
    key
}

pub(crate) fn read_id(bytes: &[u8]) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Corruption(format!("id value of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}

pub(crate) fn get_record<T: DeserializeOwned>(
    db: &RawDb,
    txn: &RoTxn,
    id: u64,
) -> Result<Option<T>, LmdbError> {
    match db.get(txn, &id.to_be_bytes())? {
        Some(bytes) => Ok(Some(decode(bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn get_indexed(
    db: &RawDb,
    txn: &RoTxn,
    a: u64,
    b: u64,
) -> Result<Option<u64>, LmdbError> {
    db.get(txn, &pair_key(a, b))?.map(read_id).transpose()
}

/// Ids stored under every index key starting with `prefix`.
pub(crate) fn scan_prefix(db: &RawDb, txn: &RoTxn, prefix: u64) -> Result<Vec<u64>, LmdbError> {
    let lower = prefix.to_be_bytes();
    let upper = prefix.checked_add(1).map(u64::to_be_bytes);
    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (
        Bound::Included(&lower[..]),
        match &upper {
            Some(upper) => Bound::Excluded(&upper[..]),
            None => Bound::Unbounded,
        },
    );
    let mut ids = Vec::new();
    for entry in db.range(txn, &bounds)? {
        let (_key, val) = entry?;
        ids.push(read_id(val)?);
    }
    Ok(ids)
}

pub(crate) fn all_records<T: DeserializeOwned>(
    db: &RawDb,
    txn: &RoTxn,
) -> Result<Vec<T>, LmdbError> {
    let mut records = Vec::new();
    for entry in db.iter(txn)? {
        let (_key, val) = entry?;
        records.push(decode(val)?);
    }
    Ok(records)
}
