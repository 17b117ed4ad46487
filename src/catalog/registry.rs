/// Catalog for databases and tables stored as files
///
/// Layout:
/// ```text
/// <data_dir>/<db>/<table>.json            live table
/// <data_dir>/<db>/backups/<table>/*.json  snapshots (see BackupManager)
/// ```
use crate::config::DurabilityLevel;
use crate::error::{Result, TabulaError};
use crate::storage::{read_json, write_json_atomic};
use crate::types::{duplicate_column, TableData};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::naming::{check_name, is_valid_name};

const TABLE_EXT: &str = "json";

/// Catalog of databases (directories) and tables (JSON files)
pub struct Catalog {
    data_dir: PathBuf,
    durability: DurabilityLevel,
}

impl Catalog {
    /// Open a catalog rooted at `data_dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(data_dir: P, durability: DurabilityLevel) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir, durability })
    }

    pub fn database_path(&self, db: &str) -> PathBuf {
        self.data_dir.join(db)
    }

    pub fn table_path(&self, db: &str, table: &str) -> PathBuf {
        self.database_path(db).join(format!("{}.{}", table, TABLE_EXT))
    }

    pub fn database_exists(&self, db: &str) -> bool {
        is_valid_name(db) && self.database_path(db).is_dir()
    }

    pub fn table_exists(&self, db: &str, table: &str) -> bool {
        self.table_path(db, table).is_file()
    }

    /// Create an empty database
    pub fn create_database(&self, name: &str) -> Result<()> {
        check_name("database", name)?;
        let path = self.database_path(name);
        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(TabulaError::Conflict(format!("database '{}' already exists", name)));
            }
            Err(e) => return Err(e.into()),
        }
        info!(database = name, "created database");
        Ok(())
    }

    /// Drop a database with every table and backup it holds
    pub fn drop_database(&self, name: &str) -> Result<()> {
        check_name("database", name)?;
        self.require_database(name)?;
        fs::remove_dir_all(self.database_path(name))?;
        info!(database = name, "dropped database");
        Ok(())
    }

    /// Create a table with a fixed column list and no rows
    pub fn create_table(&self, db: &str, table: &str, columns: Vec<String>) -> Result<()> {
        check_name("database", db)?;
        check_name("table", table)?;
        self.require_database(db)?;

        if let Some(dup) = duplicate_column(&columns) {
            return Err(TabulaError::Schema(format!(
                "duplicate column '{}' in table '{}'",
                dup, table
            )));
        }
        if self.table_exists(db, table) {
            return Err(TabulaError::Conflict(format!(
                "table '{}' already exists in database '{}'",
                table, db
            )));
        }

        self.save_table(db, table, &TableData::new(columns))?;
        info!(database = db, table = table, "created table");
        Ok(())
    }

    /// Load a table; `Ok(None)` when it does not exist
    ///
    /// A table that exists with zero rows is `Ok(Some(_))`.
    pub fn load_table(&self, db: &str, table: &str) -> Result<Option<TableData>> {
        if !is_valid_name(db) || !is_valid_name(table) {
            return Ok(None);
        }
        read_json(&self.table_path(db, table))
    }

    /// Load a table or fail with `NotFound`
    pub fn require_table(&self, db: &str, table: &str) -> Result<TableData> {
        self.load_table(db, table)?.ok_or_else(|| {
            TabulaError::NotFound(format!("table '{}' does not exist in database '{}'", table, db))
        })
    }

    /// Atomically replace the persisted table
    pub fn save_table(&self, db: &str, table: &str, data: &TableData) -> Result<()> {
        check_name("database", db)?;
        check_name("table", table)?;
        self.require_database(db)?;
        write_json_atomic(&self.table_path(db, table), data, self.durability)
    }

    /// Remove a table file
    pub fn drop_table(&self, db: &str, table: &str) -> Result<()> {
        check_name("database", db)?;
        check_name("table", table)?;
        self.require_database(db)?;

        match fs::remove_file(self.table_path(db, table)) {
            Ok(()) => {
                info!(database = db, table = table, "dropped table");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(TabulaError::NotFound(format!(
                "table '{}' does not exist in database '{}'",
                table, db
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Rename a table within its database
    pub fn rename_table(&self, db: &str, table: &str, new_table: &str) -> Result<()> {
        check_name("database", db)?;
        check_name("table", table)?;
        check_name("table", new_table)?;
        self.require_database(db)?;

        let from = self.table_path(db, table);
        let to = self.table_path(db, new_table);
        if !from.is_file() {
            return Err(TabulaError::NotFound(format!(
                "table '{}' does not exist in database '{}'",
                table, db
            )));
        }
        if to.exists() {
            return Err(TabulaError::Conflict(format!(
                "table '{}' already exists in database '{}'",
                new_table, db
            )));
        }

        fs::rename(&from, &to)?;
        if self.durability.requires_sync() {
            #[cfg(unix)]
            fs::File::open(self.database_path(db))?.sync_all()?;
        }
        info!(database = db, from = table, to = new_table, "renamed table");
        Ok(())
    }

    /// All databases, sorted by name
    pub fn list_databases(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if is_valid_name(&name) => names.push(name),
                Ok(name) => warn!(entry = %name, "skipping non-database directory"),
                Err(raw) => warn!(entry = ?raw, "skipping non-UTF-8 directory"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// All tables of `db`, sorted by name (backups and temp files excluded)
    pub fn list_tables(&self, db: &str) -> Result<Vec<String>> {
        check_name("database", db)?;
        self.require_database(db)?;

        let mut names = Vec::new();
        for entry in fs::read_dir(self.database_path(db))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TABLE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if is_valid_name(stem) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn require_database(&self, db: &str) -> Result<()> {
        if self.database_path(db).is_dir() {
            Ok(())
        } else {
            Err(TabulaError::NotFound(format!("database '{}' does not exist", db)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;

    fn catalog() -> (tempfile::TempDir, Catalog) {
        let temp_dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(temp_dir.path(), DurabilityLevel::NoSync).unwrap();
        (temp_dir, catalog)
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_database_conflict_and_name() {
        let (_dir, catalog) = catalog();
        catalog.create_database("shop").unwrap();

        assert!(matches!(catalog.create_database("shop"), Err(TabulaError::Conflict(_))));
        assert!(matches!(catalog.create_database("1shop"), Err(TabulaError::Name(_))));
        assert_eq!(catalog.list_databases().unwrap(), vec!["shop".to_string()]);
    }

    #[test]
    fn test_create_and_load_table() {
        let (_dir, catalog) = catalog();
        catalog.create_database("s").unwrap();
        catalog.create_table("s", "users", cols(&["id", "name"])).unwrap();

        let table = catalog.load_table("s", "users").unwrap().unwrap();
        assert_eq!(table.columns, cols(&["id", "name"]));
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_missing_is_not_empty() {
        let (_dir, catalog) = catalog();
        catalog.create_database("s").unwrap();
        catalog.create_table("s", "empty", cols(&["a"])).unwrap();

        assert!(catalog.load_table("s", "empty").unwrap().is_some());
        assert!(catalog.load_table("s", "missing").unwrap().is_none());
        assert!(matches!(catalog.require_table("s", "missing"), Err(TabulaError::NotFound(_))));
    }

    #[test]
    fn test_create_table_errors() {
        let (_dir, catalog) = catalog();
        assert!(matches!(
            catalog.create_table("nodb", "t", cols(&["a"])),
            Err(TabulaError::NotFound(_))
        ));

        catalog.create_database("s").unwrap();
        assert!(matches!(
            catalog.create_table("s", "9t", cols(&["a"])),
            Err(TabulaError::Name(_))
        ));
        assert!(matches!(
            catalog.create_table("s", "t", cols(&["a", "a"])),
            Err(TabulaError::Schema(_))
        ));

        catalog.create_table("s", "t", cols(&["a"])).unwrap();
        assert!(matches!(
            catalog.create_table("s", "t", cols(&["b"])),
            Err(TabulaError::Conflict(_))
        ));
    }

    #[test]
    fn test_save_table_persists_rows() {
        let (_dir, catalog) = catalog();
        catalog.create_database("s").unwrap();
        catalog.create_table("s", "t", cols(&["a"])).unwrap();

        let mut table = catalog.require_table("s", "t").unwrap();
        table.rows.push(Row::from([("a".to_string(), "x".to_string())]));
        catalog.save_table("s", "t", &table).unwrap();

        assert_eq!(catalog.require_table("s", "t").unwrap().row_count(), 1);
    }

    #[test]
    fn test_drop_table() {
        let (_dir, catalog) = catalog();
        catalog.create_database("s").unwrap();
        catalog.create_table("s", "t", cols(&["a"])).unwrap();

        catalog.drop_table("s", "t").unwrap();
        assert!(!catalog.table_exists("s", "t"));
        assert!(matches!(catalog.drop_table("s", "t"), Err(TabulaError::NotFound(_))));
    }

    #[test]
    fn test_rename_table() {
        let (_dir, catalog) = catalog();
        catalog.create_database("s").unwrap();
        catalog.create_table("s", "a", cols(&["x"])).unwrap();
        catalog.create_table("s", "b", cols(&["y"])).unwrap();

        assert!(matches!(catalog.rename_table("s", "a", "b"), Err(TabulaError::Conflict(_))));
        assert!(matches!(catalog.rename_table("s", "zz", "c"), Err(TabulaError::NotFound(_))));

        catalog.rename_table("s", "a", "c").unwrap();
        assert_eq!(catalog.list_tables("s").unwrap(), cols(&["b", "c"]));
        assert_eq!(catalog.require_table("s", "c").unwrap().columns, cols(&["x"]));
    }

    #[test]
    fn test_list_tables_skips_backups_and_junk() {
        let (dir, catalog) = catalog();
        catalog.create_database("s").unwrap();
        catalog.create_table("s", "t", cols(&["a"])).unwrap();
        fs::create_dir_all(dir.path().join("s").join("backups").join("t")).unwrap();
        fs::write(dir.path().join("s").join("notes.txt"), b"x").unwrap();

        assert_eq!(catalog.list_tables("s").unwrap(), cols(&["t"]));
        assert!(matches!(catalog.list_tables("nodb"), Err(TabulaError::NotFound(_))));
    }

    #[test]
    fn test_drop_database() {
        let (_dir, catalog) = catalog();
        catalog.create_database("s").unwrap();
        catalog.create_table("s", "t", cols(&["a"])).unwrap();

        catalog.drop_database("s").unwrap();
        assert!(!catalog.database_exists("s"));
        assert!(matches!(catalog.drop_database("s"), Err(TabulaError::NotFound(_))));
        assert!(matches!(catalog.drop_database("bad-name"), Err(TabulaError::Name(_))));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        {
            let catalog = Catalog::new(temp_dir.path(), DurabilityLevel::Synchronous).unwrap();
            catalog.create_database("s").unwrap();
            catalog.create_table("s", "persistent", cols(&["id"])).unwrap();
        }
        {
            let catalog = Catalog::new(temp_dir.path(), DurabilityLevel::Synchronous).unwrap();
            assert!(catalog.table_exists("s", "persistent"));
            assert_eq!(catalog.require_table("s", "persistent").unwrap().column_count(), 1);
        }
    }
}
