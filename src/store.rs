//! Checkpoint and membership storage
//!
//! Provides the durable state shared by the scanner and the payout
//! scheduler: the single checkpoint value and the membership table.
//! Uses RocksDB with column families. The membership table is a set
//! keyed by (contract, member) with empty values, not a log.

use crate::error::{Error, Result};
use crate::keys::{
    decode_member_key, encode_member_key, encode_meta_key, member_key_prefix, META_CHECKPOINT,
};
use alloy_primitives::Address;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use std::path::Path;

/// Durable record of the last fully processed block height.
///
/// Written only by the scanner, immediately after a block fetch succeeds
/// and before that block's events are dispatched. A subsequent read by
/// the same or a restarted process must observe the write.
pub trait CheckpointStore: Send + Sync {
    /// Last fully processed height, or None before the first run.
    fn checkpoint(&self) -> Result<Option<u64>>;

    /// Durably replace the checkpoint.
    fn set_checkpoint(&self, height: u64) -> Result<()>;
}

/// Durable membership table keyed by (contract, member).
pub trait MembershipStore: Send + Sync {
    /// Insert the row if absent. Re-adding an existing member is a no-op.
    fn upsert_member(&self, contract: Address, member: Address) -> Result<()>;

    /// Delete the row if present. Removing a non-member is a no-op.
    fn remove_member(&self, contract: Address, member: Address) -> Result<()>;

    /// All current members of a contract, in key order.
    fn members(&self, contract: Address) -> Result<Vec<Address>>;
}

/// RocksDB-backed implementation of both stores.
///
/// Column families:
/// - meta: singleton values (checkpoint)
/// - members: membership rows (key-only)
pub struct RocksLedgerStore {
    db: DB,
}

impl RocksLedgerStore {
    /// Open or create a RocksDB database at the given path.
    ///
    /// Creates all required column families if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let column_families = vec![
            ColumnFamilyDescriptor::new("meta", Options::default()),
            ColumnFamilyDescriptor::new("members", Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, column_families)
            .map_err(|e| Error::persistence(format!("failed to open database: {}", e)))?;

        Ok(Self { db })
    }

    /// Get a column family handle by name.
    fn get_cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::persistence(format!("column family '{}' not found", name)))
    }
}

impl CheckpointStore for RocksLedgerStore {
    fn checkpoint(&self) -> Result<Option<u64>> {
        let cf = self.get_cf("meta")?;
        let key = encode_meta_key(META_CHECKPOINT);
        match self
            .db
            .get_cf(cf, &key)
            .map_err(|e| Error::persistence(format!("failed to read checkpoint: {}", e)))?
        {
            Some(bytes) => {
                let bytes: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    Error::persistence(format!(
                        "checkpoint must be 8 bytes (u64), got {}",
                        bytes.len()
                    ))
                })?;
                Ok(Some(u64::from_be_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    fn set_checkpoint(&self, height: u64) -> Result<()> {
        let cf = self.get_cf("meta")?;
        let key = encode_meta_key(META_CHECKPOINT);
        self.db
            .put_cf(cf, &key, height.to_be_bytes())
            .map_err(|e| Error::persistence(format!("failed to write checkpoint {}: {}", height, e)))
    }
}

impl MembershipStore for RocksLedgerStore {
    fn upsert_member(&self, contract: Address, member: Address) -> Result<()> {
        let cf = self.get_cf("members")?;
        let key = encode_member_key(contract, member);
        // Put is naturally idempotent for a key-only row.
        self.db.put_cf(cf, &key, &[] as &[u8]).map_err(|e| {
            Error::persistence(format!(
                "failed to upsert member {:?} of {:?}: {}",
                member, contract, e
            ))
        })
    }

    fn remove_member(&self, contract: Address, member: Address) -> Result<()> {
        let cf = self.get_cf("members")?;
        let key = encode_member_key(contract, member);
        self.db.delete_cf(cf, &key).map_err(|e| {
            Error::persistence(format!(
                "failed to remove member {:?} of {:?}: {}",
                member, contract, e
            ))
        })
    }

    fn members(&self, contract: Address) -> Result<Vec<Address>> {
        let cf = self.get_cf("members")?;
        let prefix = member_key_prefix(contract);
        let iter = self.db.iterator_cf(
            cf,
            rocksdb::IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut members = Vec::new();
        for item in iter {
            let (key, _) = item
                .map_err(|e| Error::persistence(format!("failed to iterate members: {}", e)))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let (_, member) = decode_member_key(&key)?;
            members.push(member);
        }
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn addr(byte: u8) -> Address {
        Address::from_slice(&[byte; 20])
    }

    fn open_store() -> (TempDir, RocksLedgerStore) {
        let dir = TempDir::new().unwrap();
        let store = RocksLedgerStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_checkpoint_absent_then_roundtrip() {
        let (_dir, store) = open_store();
        assert_eq!(store.checkpoint().unwrap(), None);
        store.set_checkpoint(95).unwrap();
        assert_eq!(store.checkpoint().unwrap(), Some(95));
        store.set_checkpoint(96).unwrap();
        assert_eq!(store.checkpoint().unwrap(), Some(96));
    }

    #[test]
    fn test_checkpoint_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = RocksLedgerStore::open(dir.path()).unwrap();
            store.set_checkpoint(1234).unwrap();
        }
        let store = RocksLedgerStore::open(dir.path()).unwrap();
        assert_eq!(store.checkpoint().unwrap(), Some(1234));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let (_dir, store) = open_store();
        store.upsert_member(addr(0xaa), addr(0xbb)).unwrap();
        store.upsert_member(addr(0xaa), addr(0xbb)).unwrap();
        assert_eq!(store.members(addr(0xaa)).unwrap(), vec![addr(0xbb)]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let (_dir, store) = open_store();
        store.remove_member(addr(0xaa), addr(0xbb)).unwrap();
        assert!(store.members(addr(0xaa)).unwrap().is_empty());
    }

    #[test]
    fn test_readd_after_remove() {
        let (_dir, store) = open_store();
        store.upsert_member(addr(0xaa), addr(0xbb)).unwrap();
        store.remove_member(addr(0xaa), addr(0xbb)).unwrap();
        assert!(store.members(addr(0xaa)).unwrap().is_empty());
        store.upsert_member(addr(0xaa), addr(0xbb)).unwrap();
        assert_eq!(store.members(addr(0xaa)).unwrap(), vec![addr(0xbb)]);
    }

    #[test]
    fn test_members_scoped_to_contract() {
        let (_dir, store) = open_store();
        store.upsert_member(addr(0xaa), addr(0x01)).unwrap();
        store.upsert_member(addr(0xaa), addr(0x02)).unwrap();
        store.upsert_member(addr(0xab), addr(0x03)).unwrap();
        let members = store.members(addr(0xaa)).unwrap();
        assert_eq!(members, vec![addr(0x01), addr(0x02)]);
        assert_eq!(store.members(addr(0xab)).unwrap(), vec![addr(0x03)]);
        assert!(store.members(addr(0xac)).unwrap().is_empty());
    }
}
