//! Ordered, transactional key-value store.
//!
//! Entries live in a single [`redb`] table mapping byte keys to byte values,
//! either in a database file under a directory or in memory. Readers work on
//! redb read transactions, which are MVCC snapshots. Writers buffer their
//! changes privately over such a snapshot and publish them on commit, after
//! optimistic conflict detection against everything committed since they
//! began. Only the commit itself takes redb's write transaction, so any
//! number of write transactions may be open at once.

mod snapshot;
mod txn;

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use redb::backends::InMemoryBackend;
use redb::{Database, Durability, TableDefinition};
use tessera_foundation::{Error, ErrorKind, Result};
use tracing::{debug, info, trace};

pub use snapshot::PrefixScan;
pub use txn::{KvRead, ReadTxn, WriteTxn};

use snapshot::Snapshot;
use txn::ReadSet;

/// Name of the database file created under [`StoreOptions::dir`].
pub const DB_FILE: &str = "tessera.redb";

/// The one table holding every entry.
pub(crate) const ENTRIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("entries");

/// Pending writes of a transaction: `None` marks a delete.
pub(crate) type WriteSet = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Default cap on pending writes per transaction.
pub const DEFAULT_MAX_TXN_ENTRIES: usize = 100_000;

/// Default cap on a single value, in bytes.
pub const DEFAULT_MAX_VALUE_BYTES: usize = 1 << 20;

/// Options for [`Store::open`].
#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// Directory holding the database file. `None` keeps everything in memory.
    pub dir: Option<PathBuf>,
    /// Maximum number of distinct keys a transaction may write.
    pub max_txn_entries: usize,
    /// Maximum size of a single value.
    pub max_value_bytes: usize,
    /// Whether every commit is made durable before returning.
    pub sync_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            dir: None,
            max_txn_entries: DEFAULT_MAX_TXN_ENTRIES,
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
            sync_writes: true,
        }
    }
}

impl StoreOptions {
    /// Options for a purely in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Options for a store persisted under `dir`.
    #[must_use]
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Sets the per-transaction write limit.
    #[must_use]
    pub fn with_max_txn_entries(mut self, limit: usize) -> Self {
        self.max_txn_entries = limit;
        self
    }

    /// Sets the per-value size limit.
    #[must_use]
    pub fn with_max_value_bytes(mut self, limit: usize) -> Self {
        self.max_value_bytes = limit;
        self
    }

    /// Sets whether commits are made durable before returning.
    #[must_use]
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }
}

/// Wraps a redb failure as an I/O error naming the attempted action.
pub(crate) fn backend<E: Into<redb::Error>>(action: &'static str) -> impl FnOnce(E) -> Error {
    move |err| Error::new(ErrorKind::Io(format!("{action}: {}", err.into())))
}

/// Keys written by one committed transaction.
struct Committed {
    version: u64,
    keys: BTreeSet<Vec<u8>>,
}

struct State {
    /// `None` once the store is closed.
    db: Option<Database>,
    /// Commits since open.
    version: u64,
    /// Commits that some active writer may still conflict with, oldest first.
    committed: VecDeque<Committed>,
    /// Start version of every live write transaction, with multiplicity.
    active: BTreeMap<u64, usize>,
}

impl State {
    fn db(&self) -> Result<&Database> {
        self.db
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::StoreClosed))
    }

    fn prune(&mut self) {
        let horizon = self.active.keys().next().copied().unwrap_or(self.version);
        while self
            .committed
            .front()
            .is_some_and(|c| c.version <= horizon)
        {
            self.committed.pop_front();
        }
    }
}

struct Shared {
    options: StoreOptions,
    state: RwLock<State>,
}

/// Handle to a process-wide keyspace.
///
/// Cloning is O(1); all clones share the same database.
#[derive(Clone)]
pub struct Store {
    shared: Arc<Shared>,
}

impl Store {
    /// Opens a store. With `options.dir` set, the database file under it is
    /// created or reopened; otherwise the store lives in memory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created or the
    /// database cannot be opened (for instance because another handle in
    /// this process still holds it).
    pub fn open(options: StoreOptions) -> Result<Self> {
        let db = match &options.dir {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .map_err(|e| Error::io(format!("creating {}", dir.display()), &e))?;
                let path = dir.join(DB_FILE);
                let db = Database::create(&path).map_err(backend("opening database"))?;
                info!(path = %path.display(), "opened store");
                db
            }
            None => {
                let db = Database::builder()
                    .create_with_backend(InMemoryBackend::new())
                    .map_err(backend("opening in-memory database"))?;
                info!("opened in-memory store");
                db
            }
        };

        // Readers open the table, so it has to exist before the first commit.
        let init = db.begin_write().map_err(backend("creating table"))?;
        init.open_table(ENTRIES).map_err(backend("creating table"))?;
        init.commit().map_err(backend("creating table"))?;

        Ok(Self {
            shared: Arc::new(Shared {
                options,
                state: RwLock::new(State {
                    db: Some(db),
                    version: 0,
                    committed: VecDeque::new(),
                    active: BTreeMap::new(),
                }),
            }),
        })
    }

    /// Opens an empty in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the in-memory database cannot be created.
    pub fn in_memory() -> Result<Self> {
        Self::in_memory_with(StoreOptions::in_memory())
    }

    /// Opens an empty in-memory store with custom limits. `options.dir` is ignored.
    ///
    /// # Errors
    ///
    /// See [`Store::in_memory`].
    pub fn in_memory_with(options: StoreOptions) -> Result<Self> {
        Self::open(StoreOptions { dir: None, ..options })
    }

    /// Returns the options this store was opened with.
    #[must_use]
    pub fn options(&self) -> &StoreOptions {
        &self.shared.options
    }

    /// Begins a read-only snapshot transaction.
    ///
    /// # Errors
    ///
    /// Returns `StoreClosed` after [`Store::close`].
    pub fn begin_read(&self) -> Result<ReadTxn> {
        let state = self.read_state()?;
        let snapshot = Snapshot::open(state.db()?)?;
        Ok(ReadTxn::new(snapshot, state.version))
    }

    /// Begins a read-write transaction.
    ///
    /// # Errors
    ///
    /// Returns `StoreClosed` after [`Store::close`].
    pub fn begin_write(&self) -> Result<WriteTxn> {
        let mut state = self.write_state()?;
        let snapshot = Snapshot::open(state.db()?)?;
        let start = state.version;
        *state.active.entry(start).or_insert(0) += 1;
        Ok(WriteTxn::new(self.clone(), snapshot, start))
    }

    /// Runs `f` inside a read-only snapshot.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or `StoreClosed`.
    pub fn view<T>(&self, f: impl FnOnce(&ReadTxn) -> Result<T>) -> Result<T> {
        let txn = self.begin_read()?;
        f(&txn)
    }

    /// Runs `f` inside a read-write transaction and commits it if `f` succeeds.
    ///
    /// If `f` fails, every write it made is discarded.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or the commit error (e.g. a conflict).
    pub fn update<T>(&self, f: impl FnOnce(&mut WriteTxn) -> Result<T>) -> Result<T> {
        let mut txn = self.begin_write()?;
        let out = f(&mut txn)?;
        txn.commit()?;
        Ok(out)
    }

    /// Number of keys currently committed.
    ///
    /// # Errors
    ///
    /// Returns `StoreClosed` after [`Store::close`], or an I/O error.
    pub fn len(&self) -> Result<usize> {
        self.view(ReadTxn::len)
    }

    /// Returns true if no key is committed.
    ///
    /// # Errors
    ///
    /// See [`Store::len`].
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// Returns true once [`Store::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared
            .state
            .read()
            .map_or(true, |state| state.db.is_none())
    }

    /// Closes the store: makes every commit durable and releases the
    /// database, so it can be reopened.
    ///
    /// Closing an already closed store is a no-op. Transactions still in
    /// flight fail to commit afterwards.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the final flush fails.
    pub fn close(&self) -> Result<()> {
        let mut state = self.write_state()?;
        let Some(db) = state.db.take() else {
            return Ok(());
        };
        if !self.shared.options.sync_writes {
            // An empty durable commit also persists earlier eventual ones.
            let flush = db.begin_write().map_err(backend("flushing on close"))?;
            flush.commit().map_err(backend("flushing on close"))?;
        }
        drop(db);
        info!(version = state.version, "closed store");
        Ok(())
    }

    pub(crate) fn commit(&self, start: u64, reads: &ReadSet, writes: WriteSet) -> Result<()> {
        let mut guard = self.write_state()?;
        let state = &mut *guard;
        let db = state.db()?;
        if writes.is_empty() {
            return Ok(());
        }

        if let Some(clash) = state
            .committed
            .iter()
            .filter(|c| c.version > start)
            .find(|c| c.keys.iter().any(|key| reads.touches(key)))
        {
            debug!(start, conflicting = clash.version, "transaction conflict");
            return Err(Error::new(ErrorKind::TransactionConflict));
        }

        let mut txn = db.begin_write().map_err(backend("beginning commit"))?;
        if !self.shared.options.sync_writes {
            txn.set_durability(Durability::Eventual);
        }
        {
            let mut table = txn.open_table(ENTRIES).map_err(backend("opening table"))?;
            for (key, value) in &writes {
                match value {
                    Some(value) => {
                        table
                            .insert(key.as_slice(), value.as_slice())
                            .map_err(backend("writing entry"))?;
                    }
                    None => {
                        table
                            .remove(key.as_slice())
                            .map_err(backend("removing entry"))?;
                    }
                }
            }
        }
        // Dropping an uncommitted redb transaction aborts it, so a failure
        // anywhere above publishes nothing.
        txn.commit().map_err(backend("committing"))?;

        let version = state.version + 1;
        let keys: BTreeSet<Vec<u8>> = writes.into_keys().collect();
        trace!(version, writes = keys.len(), "committed");
        state.version = version;
        if !state.active.is_empty() {
            state.committed.push_back(Committed { version, keys });
        }
        Ok(())
    }

    /// Deregisters a finished write transaction.
    pub(crate) fn finish(&self, start: u64) {
        let Ok(mut state) = self.shared.state.write() else {
            return;
        };
        if let Some(count) = state.active.get_mut(&start) {
            *count -= 1;
            if *count == 0 {
                state.active.remove(&start);
            }
        }
        state.prune();
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.shared
            .state
            .read()
            .map_err(|_| Error::internal("store lock poisoned"))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.shared
            .state
            .write()
            .map_err(|_| Error::internal("store lock poisoned"))
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("options", &self.shared.options)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
