//! Snapshot and read-write transactions.

use std::cell::RefCell;
use std::collections::BTreeSet;

use tessera_foundation::{Error, ErrorKind, Result};

use super::snapshot::{PrefixScan, Snapshot};
use super::{Store, WriteSet};

/// Read access shared by both transaction kinds.
pub trait KvRead {
    /// Gets the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying database fails.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Returns true if `key` is present.
    ///
    /// # Errors
    ///
    /// See [`KvRead::get`].
    fn contains(&self, key: &[u8]) -> Result<bool> {
        self.get(key).map(|value| value.is_some())
    }

    /// Iterates, in ascending key order, over every entry whose key starts
    /// with `prefix`.
    fn scan_prefix(&self, prefix: &[u8]) -> PrefixScan<'_>;
}

/// Read-only snapshot of the keyspace.
pub struct ReadTxn {
    snapshot: Snapshot,
    version: u64,
}

impl std::fmt::Debug for ReadTxn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadTxn")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl ReadTxn {
    pub(super) fn new(snapshot: Snapshot, version: u64) -> Self {
        Self { snapshot, version }
    }

    /// Number of commits since the store was opened, as of this snapshot.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of keys in the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying database fails.
    pub fn len(&self) -> Result<usize> {
        self.scan_prefix(&[])
            .try_fold(0, |count, entry| entry.map(|_| count + 1))
    }

    /// Returns true if the snapshot holds no keys.
    ///
    /// # Errors
    ///
    /// See [`ReadTxn::len`].
    pub fn is_empty(&self) -> Result<bool> {
        self.scan_prefix(&[]).next().transpose().map(|first| first.is_none())
    }
}

impl KvRead for ReadTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.snapshot.get(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> PrefixScan<'_> {
        PrefixScan::committed(&self.snapshot, prefix)
    }
}

/// Keys and prefixes a write transaction has observed.
#[derive(Default)]
pub(crate) struct ReadSet {
    keys: BTreeSet<Vec<u8>>,
    prefixes: BTreeSet<Vec<u8>>,
}

impl ReadSet {
    /// Returns true if a write to `key` would invalidate something read.
    pub(crate) fn touches(&self, key: &[u8]) -> bool {
        self.keys.contains(key) || self.prefixes.iter().any(|p| key.starts_with(p))
    }
}

/// Read-write transaction.
///
/// Reads see the snapshot taken at begin plus this transaction's own
/// writes. Nothing is visible to other transactions until [`WriteTxn::commit`].
/// Dropping the transaction without committing rolls it back.
pub struct WriteTxn {
    store: Store,
    start: u64,
    snapshot: Snapshot,
    writes: WriteSet,
    reads: RefCell<ReadSet>,
}

impl WriteTxn {
    pub(super) fn new(store: Store, snapshot: Snapshot, start: u64) -> Self {
        Self {
            store,
            start,
            snapshot,
            writes: WriteSet::new(),
            reads: RefCell::new(ReadSet::default()),
        }
    }

    /// Stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns `ValueTooLarge` or `TransactionTooLarge` when a store limit
    /// would be exceeded.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        let limit = self.store.options().max_value_bytes;
        if value.len() > limit {
            return Err(Error::new(ErrorKind::ValueTooLarge {
                size: value.len(),
                limit,
            }));
        }
        self.reserve(&key)?;
        self.writes.insert(key, Some(value));
        Ok(())
    }

    /// Removes `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `TransactionTooLarge` when the write limit would be exceeded.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.reserve(key)?;
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    /// Number of distinct keys written so far.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Publishes every write atomically.
    ///
    /// Only what this transaction read is checked for conflicts. Two
    /// transactions that write the same key without reading it both commit,
    /// and the one committing last wins.
    ///
    /// # Errors
    ///
    /// Returns `TransactionConflict` if a transaction that committed after
    /// this one began wrote a key this one read or a key under a prefix this
    /// one scanned, `StoreClosed` if the store was closed, or an I/O error if
    /// the database rejected the commit. Nothing is published on error.
    pub fn commit(mut self) -> Result<()> {
        let writes = std::mem::take(&mut self.writes);
        self.store.commit(self.start, &self.reads.borrow(), writes)
    }

    /// Discards every write.
    pub fn rollback(self) {}

    fn reserve(&self, key: &[u8]) -> Result<()> {
        let limit = self.store.options().max_txn_entries;
        if !self.writes.contains_key(key) && self.writes.len() >= limit {
            return Err(Error::new(ErrorKind::TransactionTooLarge { limit }));
        }
        Ok(())
    }
}

impl KvRead for WriteTxn {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.reads.borrow_mut().keys.insert(key.to_vec());
        match self.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.snapshot.get(key),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> PrefixScan<'_> {
        self.reads.borrow_mut().prefixes.insert(prefix.to_vec());
        PrefixScan::merged(&self.snapshot, prefix, &self.writes)
    }
}

impl Drop for WriteTxn {
    fn drop(&mut self) {
        self.store.finish(self.start);
    }
}
