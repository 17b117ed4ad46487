//! Database- and Table-Level Lock Manager
//!
//! Every statement takes its locks up front and holds them until it
//! finishes:
//!
//! - table statements: database lock shared, then table lock(s) in the mode
//!   the statement needs
//! - CREATE DATABASE / drop database: database lock exclusive
//!
//! Multi-table statements (RENAME) lock their tables in sorted name order so
//! two renames can never wait on each other in a cycle.

use dashmap::DashMap;
use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lock mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Shared lock (read)
    Shared,
    /// Exclusive lock (write)
    Exclusive,
}

type LockRef = Arc<RwLock<()>>;

// Guards are only held for their Drop
#[allow(dead_code)]
enum Guard {
    Shared(ArcRwLockReadGuard<RawRwLock, ()>),
    Exclusive(ArcRwLockWriteGuard<RawRwLock, ()>),
}

impl Guard {
    fn acquire(lock: &LockRef, mode: LockMode) -> Self {
        match mode {
            LockMode::Shared => Guard::Shared(lock.read_arc()),
            LockMode::Exclusive => Guard::Exclusive(lock.write_arc()),
        }
    }
}

/// Locks held by one statement; released on drop
///
/// Dropping the bundle releases the table guards before the database guard,
/// then prunes registry entries no other statement still references.
#[must_use = "locks are released as soon as this value is dropped"]
pub struct StatementLocks<'a> {
    manager: &'a LockManager,
    db: String,
    table_names: Vec<String>,
    tables: Vec<Guard>,
    database: Option<Guard>,
}

impl StatementLocks<'_> {
    /// Number of table locks held
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl Drop for StatementLocks<'_> {
    fn drop(&mut self) {
        self.tables.clear();
        drop(self.database.take());

        for table in self.table_names.drain(..) {
            self.manager.prune_table(&self.db, table);
        }
        self.manager.prune_database(&self.db);
    }
}

/// Registry of database and table locks
pub struct LockManager {
    databases: DashMap<String, LockRef>,
    tables: DashMap<(String, String), LockRef>,
    shared_acquired: AtomicU64,
    exclusive_acquired: AtomicU64,
}

impl LockManager {
    /// Create a new lock manager
    pub fn new() -> Self {
        Self {
            databases: DashMap::new(),
            tables: DashMap::new(),
            shared_acquired: AtomicU64::new(0),
            exclusive_acquired: AtomicU64::new(0),
        }
    }

    fn database_lock(&self, db: &str) -> LockRef {
        self.databases
            .entry(db.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    fn table_lock(&self, db: &str, table: &str) -> LockRef {
        self.tables
            .entry((db.to_string(), table.to_string()))
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    fn acquire(&self, lock: &LockRef, mode: LockMode) -> Guard {
        let guard = Guard::acquire(lock, mode);
        let counter = match mode {
            LockMode::Shared => &self.shared_acquired,
            LockMode::Exclusive => &self.exclusive_acquired,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        guard
    }

    // An entry whose only owner is the registry has no holder and no waiter:
    // every clone is taken under the same shard lock `remove_if` holds.
    fn prune_table(&self, db: &str, table: String) {
        self.tables
            .remove_if(&(db.to_string(), table), |_, lock| Arc::strong_count(lock) == 1);
    }

    fn prune_database(&self, db: &str) {
        self.databases
            .remove_if(db, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Exclusive access to a whole database
    pub fn lock_database(&self, db: &str) -> StatementLocks<'_> {
        let lock = self.database_lock(db);
        StatementLocks {
            manager: self,
            db: db.to_string(),
            table_names: Vec::new(),
            tables: Vec::new(),
            database: Some(self.acquire(&lock, LockMode::Exclusive)),
        }
    }

    /// Lock one table in `mode` (database shared)
    pub fn lock_table(&self, db: &str, table: &str, mode: LockMode) -> StatementLocks<'_> {
        self.lock_tables(db, &[table], mode)
    }

    /// Lock several tables of one database in `mode`, in sorted order
    pub fn lock_tables(&self, db: &str, tables: &[&str], mode: LockMode) -> StatementLocks<'_> {
        let mut names: Vec<&str> = tables.to_vec();
        names.sort_unstable();
        names.dedup();

        let db_lock = self.database_lock(db);
        let database = self.acquire(&db_lock, LockMode::Shared);
        let tables = names
            .iter()
            .map(|table| self.acquire(&self.table_lock(db, table), mode))
            .collect();

        StatementLocks {
            manager: self,
            db: db.to_string(),
            table_names: names.into_iter().map(str::to_string).collect(),
            tables,
            database: Some(database),
        }
    }

    /// Get statistics
    pub fn stats(&self) -> LockManagerStats {
        LockManagerStats {
            database_locks: self.databases.len() as u64,
            table_locks: self.tables.len() as u64,
            shared_acquired: self.shared_acquired.load(Ordering::Relaxed),
            exclusive_acquired: self.exclusive_acquired.load(Ordering::Relaxed),
        }
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock manager statistics
#[derive(Debug, Clone)]
pub struct LockManagerStats {
    pub database_locks: u64,
    pub table_locks: u64,
    pub shared_acquired: u64,
    pub exclusive_acquired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_shared_table_locks_coexist() {
        let lm = LockManager::new();
        let a = lm.lock_table("s", "t", LockMode::Shared);
        let b = lm.lock_table("s", "t", LockMode::Shared);
        assert_eq!(a.table_count(), 1);
        assert_eq!(b.table_count(), 1);

        let stats = lm.stats();
        assert_eq!(stats.table_locks, 1);
        assert_eq!(stats.database_locks, 1);
        assert_eq!(stats.shared_acquired, 4);
    }

    #[test]
    fn test_exclusive_blocks_other_writer() {
        let lm = Arc::new(LockManager::new());
        let held = lm.lock_table("s", "t", LockMode::Exclusive);

        let (tx, rx) = mpsc::channel();
        let lm2 = lm.clone();
        let handle = thread::spawn(move || {
            let _locks = lm2.lock_table("s", "t", LockMode::Exclusive);
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        drop(held);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_different_tables_do_not_block() {
        let lm = LockManager::new();
        let _a = lm.lock_table("s", "a", LockMode::Exclusive);
        let _b = lm.lock_table("s", "b", LockMode::Exclusive);
        assert_eq!(lm.stats().exclusive_acquired, 2);
    }

    #[test]
    fn test_database_lock_waits_for_table_statements() {
        let lm = Arc::new(LockManager::new());
        let held = lm.lock_table("s", "t", LockMode::Shared);

        let (tx, rx) = mpsc::channel();
        let lm2 = lm.clone();
        let handle = thread::spawn(move || {
            let _db = lm2.lock_database("s");
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        drop(held);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_lock_tables_dedups_and_sorts() {
        let lm = LockManager::new();
        let locks = lm.lock_tables("s", &["b", "a", "b"], LockMode::Exclusive);
        assert_eq!(locks.table_count(), 2);
    }

    #[test]
    fn test_opposite_order_renames_do_not_deadlock() {
        let lm = Arc::new(LockManager::new());
        let mut handles = vec![];

        for i in 0..8 {
            let lm = lm.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let pair: [&str; 2] = if i % 2 == 0 { ["a", "b"] } else { ["b", "a"] };
                    let _locks = lm.lock_tables("s", &pair, LockMode::Exclusive);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(lm.stats().exclusive_acquired, 8 * 50 * 2);
    }

    #[test]
    fn test_released_entries_are_pruned() {
        let lm = LockManager::new();
        for i in 0..100 {
            let name = format!("missing{}", i);
            drop(lm.lock_table("s", &name, LockMode::Shared));
        }
        drop(lm.lock_tables("s", &["a", "b"], LockMode::Exclusive));
        drop(lm.lock_database("s"));

        let stats = lm.stats();
        assert_eq!(stats.table_locks, 0);
        assert_eq!(stats.database_locks, 0);
    }

    #[test]
    fn test_held_entry_survives_other_release() {
        let lm = LockManager::new();
        let held = lm.lock_table("s", "t", LockMode::Shared);
        drop(lm.lock_table("s", "t", LockMode::Shared));
        assert_eq!(lm.stats().table_locks, 1);
        assert_eq!(lm.stats().database_locks, 1);

        drop(held);
        assert_eq!(lm.stats().table_locks, 0);
    }

    #[test]
    fn test_pruned_lock_still_excludes_writers() {
        let lm = Arc::new(LockManager::new());
        let (tx, rx) = mpsc::channel();
        let mut handles = vec![];
        for _ in 0..4 {
            let lm = lm.clone();
            let tx = tx.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..200 {
                    let _locks = lm.lock_table("s", "t", LockMode::Exclusive);
                    tx.send(1u32).unwrap();
                }
            }));
        }
        drop(tx);
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(rx.iter().sum::<u32>(), 800);
        assert_eq!(lm.stats().table_locks, 0);
    }
}
