//! Database Core - Database structure and initialization
//!
//! Owns the configuration and every shared component: catalog, backup
//! manager, result cache and lock manager. Statements go through the
//! executor; administrative operations live in `admin`.

use crate::cache::{CacheStats, ResultCache};
use crate::catalog::Catalog;
use crate::config::DBConfig;
use crate::error::Result;
use crate::sql::{QueryExecutor, QueryResult};
use crate::storage::BackupManager;
use crate::txn::{LockManager, LockManagerStats};
use std::sync::Arc;
use tracing::info;

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub cache: CacheStats,
    pub locks: LockManagerStats,
}

/// Tabula instance
pub struct Database {
    pub(crate) config: DBConfig,

    /// Databases and tables on disk
    pub(crate) catalog: Arc<Catalog>,

    /// Pre-mutation snapshots
    pub(crate) backups: Arc<BackupManager>,

    /// SELECT results keyed by query text
    pub(crate) cache: Arc<ResultCache>,

    /// Database and table locks
    pub(crate) locks: Arc<LockManager>,

    pub(crate) executor: QueryExecutor,
}

impl Database {
    /// Open (or create) the data directory described by `config`
    pub fn open(config: DBConfig) -> Result<Self> {
        let catalog = Arc::new(Catalog::new(&config.data_dir, config.durability)?);
        let backups = Arc::new(BackupManager::new(&config.data_dir, config.durability));
        let cache = Arc::new(ResultCache::new(config.result_cache_capacity));
        let locks = Arc::new(LockManager::new());

        let executor = QueryExecutor::new(
            catalog.clone(),
            backups.clone(),
            cache.clone(),
            locks.clone(),
        );

        info!(
            data_dir = %config.data_dir.display(),
            durability = config.durability.description(),
            cache_capacity = config.result_cache_capacity,
            "opened database"
        );

        Ok(Self {
            config,
            catalog,
            backups,
            cache,
            locks,
            executor,
        })
    }

    /// Execute one statement
    pub fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.executor.execute(sql)
    }

    pub fn config(&self) -> &DBConfig {
        &self.config
    }

    /// All databases, sorted by name
    pub fn list_databases(&self) -> Result<Vec<String>> {
        self.catalog.list_databases()
    }

    /// All tables of `db`, sorted by name
    pub fn list_tables(&self, db: &str) -> Result<Vec<String>> {
        self.catalog.list_tables(db)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            cache: self.cache.stats(),
            locks: self.locks.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TabulaError;
    use crate::sql::ResultSource;
    use crate::types::Row;
    use std::thread;

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(DBConfig::for_testing(dir.path())).unwrap();
        (dir, db)
    }

    #[test]
    fn test_round_trip() {
        let (_dir, db) = open();
        db.execute("CREATE DATABASE s").unwrap();
        db.execute("CREATE TABLE s.users (id INT, name VARCHAR(100))").unwrap();
        db.execute("INSERT INTO s.users (id, name) VALUES (1, 'Alice')").unwrap();

        let result = db.execute("SELECT * FROM s.users").unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["rows"], serde_json::json!([{"id": "1", "name": "Alice"}]));
        assert_eq!(json["source"], "executed");
    }

    #[test]
    fn test_listing() {
        let (_dir, db) = open();
        db.execute("CREATE DATABASE b").unwrap();
        db.execute("CREATE DATABASE a").unwrap();
        db.execute("CREATE TABLE a.z (x)").unwrap();
        db.execute("CREATE TABLE a.y (x)").unwrap();

        assert_eq!(db.list_databases().unwrap(), vec!["a", "b"]);
        assert_eq!(db.list_tables("a").unwrap(), vec!["y", "z"]);
        assert!(db.list_tables("b").unwrap().is_empty());
    }

    #[test]
    fn test_reopen_sees_data_with_cold_cache() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = Database::open(DBConfig::for_testing(dir.path())).unwrap();
            db.execute("CREATE DATABASE s").unwrap();
            db.execute("CREATE TABLE s.t (a)").unwrap();
            db.execute("INSERT INTO s.t (a) VALUES (x)").unwrap();
            db.execute("SELECT * FROM s.t").unwrap();
        }
        let db = Database::open(DBConfig::for_testing(dir.path())).unwrap();
        let result = db.execute("SELECT * FROM s.t").unwrap();
        assert_eq!(result.source(), Some(ResultSource::Executed));
        assert_eq!(result.rows().len(), 1);
    }

    #[test]
    fn test_error_payloads() {
        let (_dir, db) = open();
        let err = db.execute("ALTER TABLE s.t ADD c").unwrap_err();
        assert_eq!(serde_json::to_value(err.to_response()).unwrap()["kind"], "unsupported");

        let err = db.execute("UPDATE s.t SET a = 1").unwrap_err();
        assert!(matches!(err, TabulaError::Syntax { kind: crate::sql::StatementKind::Update, .. }));
    }

    #[test]
    fn test_lock_registry_does_not_grow() {
        let (_dir, db) = open();
        db.execute("CREATE DATABASE s").unwrap();
        for i in 0..1000 {
            let sql = format!("SELECT * FROM s.missing{}", i);
            assert!(matches!(db.execute(&sql), Err(TabulaError::NotFound(_))));
        }
        db.execute("CREATE TABLE s.a (x)").unwrap();
        db.execute("RENAME TABLE s.a TO s.b").unwrap();
        db.execute("DROP TABLE s.b").unwrap();

        let stats = db.stats().locks;
        assert_eq!(stats.table_locks, 0);
        assert_eq!(stats.database_locks, 0);
    }

    #[test]
    fn test_concurrent_inserts() {
        let (_dir, db) = open();
        db.execute("CREATE DATABASE s").unwrap();
        db.execute("CREATE TABLE s.events (worker, seq)").unwrap();
        let db = Arc::new(db);

        let mut handles = vec![];
        for worker in 0..8 {
            let db = db.clone();
            handles.push(thread::spawn(move || {
                for seq in 0..25 {
                    db.execute(&format!(
                        "INSERT INTO s.events (worker, seq) VALUES ({}, {})",
                        worker, seq
                    ))
                    .unwrap();
                    // Readers interleave with writers
                    db.execute("SELECT * FROM s.events").unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let result = db.execute("SELECT * FROM s.events").unwrap();
        assert_eq!(result.rows().len(), 8 * 25);
        let expected: Row = [("seq".to_string(), "24".to_string()), ("worker".to_string(), "7".to_string())]
            .into_iter()
            .collect();
        assert!(result.rows().contains(&expected));
    }

    #[test]
    fn test_cached_select_never_stale_under_concurrency() {
        let (_dir, db) = open();
        db.execute("CREATE DATABASE s").unwrap();
        db.execute("CREATE TABLE s.c (n)").unwrap();
        let db = Arc::new(db);

        let writer = {
            let db = db.clone();
            thread::spawn(move || {
                for n in 0..50 {
                    db.execute(&format!("INSERT INTO s.c (n) VALUES ({})", n)).unwrap();
                }
            })
        };
        let reader = {
            let db = db.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    db.execute("SELECT * FROM s.c").unwrap();
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();

        // After all writes, whatever the cache holds must be current
        assert_eq!(db.execute("SELECT * FROM s.c").unwrap().rows().len(), 50);
    }
}
