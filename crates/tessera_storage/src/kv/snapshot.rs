//! Point-in-time views over the entries table and lazy prefix scans.

use std::cmp::Ordering;
use std::collections::{VecDeque, btree_map};
use std::iter::Peekable;
use std::ops::Bound;

use redb::{Database, ReadOnlyTable};
use tessera_foundation::Result;

use super::{ENTRIES, backend};

/// Entries fetched from redb per refill of a scan.
const SCAN_BATCH: usize = 256;

type Table = ReadOnlyTable<&'static [u8], &'static [u8]>;

/// A redb read transaction's view of the entries table.
pub(crate) struct Snapshot {
    table: Table,
}

impl Snapshot {
    pub(crate) fn open(db: &Database) -> Result<Self> {
        let txn = db.begin_read().map_err(backend("beginning read"))?;
        let table = txn.open_table(ENTRIES).map_err(backend("opening table"))?;
        Ok(Self { table })
    }

    pub(crate) fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self
            .table
            .get(key)
            .map_err(backend("reading entry"))?
            .map(|value| value.value().to_vec()))
    }
}

/// Lazy iterator over the entries under a key prefix, in ascending key order.
///
/// Committed entries are pulled from the snapshot in batches. A write
/// transaction's pending writes are merged in, shadowing the snapshot.
/// Borrows its transaction, so the transaction cannot be written while the
/// scan is alive.
pub struct PrefixScan<'a> {
    table: &'a Table,
    prefix: Vec<u8>,
    batch: VecDeque<(Vec<u8>, Vec<u8>)>,
    /// Last key fetched from the table; the next batch starts after it.
    resume: Option<Vec<u8>>,
    drained: bool,
    pending: Option<Peekable<btree_map::Range<'a, Vec<u8>, Option<Vec<u8>>>>>,
    failed: bool,
}

impl<'a> PrefixScan<'a> {
    pub(crate) fn committed(snapshot: &'a Snapshot, prefix: &[u8]) -> Self {
        Self {
            table: &snapshot.table,
            prefix: prefix.to_vec(),
            batch: VecDeque::new(),
            resume: None,
            drained: false,
            pending: None,
            failed: false,
        }
    }

    pub(crate) fn merged(
        snapshot: &'a Snapshot,
        prefix: &[u8],
        writes: &'a super::WriteSet,
    ) -> Self {
        let pending = writes
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .peekable();
        Self {
            pending: Some(pending),
            ..Self::committed(snapshot, prefix)
        }
    }

    fn refill(&mut self) -> Result<()> {
        let mut range = match &self.resume {
            Some(last) => self
                .table
                .range::<&[u8]>((Bound::Excluded(last.as_slice()), Bound::Unbounded)),
            None => self.table.range(self.prefix.as_slice()..),
        }
        .map_err(backend("scanning entries"))?;

        let mut fetched = 0;
        while fetched < SCAN_BATCH {
            let Some(entry) = range.next() else {
                self.drained = true;
                break;
            };
            let (key, value) = entry.map_err(backend("scanning entries"))?;
            let key = key.value();
            if !key.starts_with(&self.prefix) {
                self.drained = true;
                break;
            }
            self.batch.push_back((key.to_vec(), value.value().to_vec()));
            fetched += 1;
        }
        drop(range);
        self.resume = self.batch.back().map(|(key, _)| key.clone());
        Ok(())
    }
}

impl Iterator for PrefixScan<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if self.batch.is_empty() && !self.drained {
                if let Err(err) = self.refill() {
                    self.failed = true;
                    return Some(Err(err));
                }
            }

            let pending_key = self
                .pending
                .as_mut()
                .and_then(|pending| pending.peek())
                .map(|(key, _)| *key)
                .filter(|key| key.starts_with(&self.prefix));
            let Some(pending_key) = pending_key else {
                self.pending = None;
                return self.batch.pop_front().map(Ok);
            };

            let order = self.batch.front().map_or(Ordering::Greater, |(key, _)| {
                key.as_slice().cmp(pending_key.as_slice())
            });
            match order {
                Ordering::Less => return self.batch.pop_front().map(Ok),
                Ordering::Equal => {
                    self.batch.pop_front();
                }
                Ordering::Greater => {}
            }
            let (key, value) = self.pending.as_mut()?.next()?;
            if let Some(value) = value {
                return Some(Ok((key.clone(), value.clone())));
            }
        }
    }
}
