//! Timestamped table snapshots
//!
//! A snapshot is taken right before every UPDATE or DELETE and is never
//! pruned. Files live in one directory per table:
//!
//! ```text
//! <data_dir>/<db>/backups/<table>/<table>_<YYYYMMDD>_<HHMMSS>.json
//! <data_dir>/<db>/backups/<table>/<table>_<YYYYMMDD>_<HHMMSS>_1.json   (same second)
//! ```
//!
//! Stamps are UTC so names keep increasing across local clock changes.
//! Snapshots are keyed by table name only: they stay in place after the
//! table is dropped or renamed, and a later table with that name lists them.

use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::catalog::{check_name, Catalog};
use crate::config::DurabilityLevel;
use crate::error::{Result, TabulaError};
use crate::storage::{read_json, write_json_new};
use crate::types::TableData;

const BACKUP_DIR: &str = "backups";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Parsed backup file name, ordered by creation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct BackupId {
    date: u32,
    time: u32,
    seq: u32,
}

impl BackupId {
    /// Parse `<table>_<YYYYMMDD>_<HHMMSS>[_<n>].json`
    fn parse(table: &str, file_name: &str) -> Option<Self> {
        let rest = file_name
            .strip_suffix(".json")?
            .strip_prefix(table)?
            .strip_prefix('_')?;

        let mut parts = rest.split('_');
        let date = parts.next().filter(|p| p.len() == 8)?;
        let time = parts.next().filter(|p| p.len() == 6)?;
        let seq = match parts.next() {
            Some(n) if !n.is_empty() && !n.starts_with('0') => n,
            Some(_) => return None,
            None => "0",
        };
        if parts.next().is_some() {
            return None;
        }

        let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !digits(date) || !digits(time) || !digits(seq) {
            return None;
        }
        Some(Self {
            date: date.parse().ok()?,
            time: time.parse().ok()?,
            seq: seq.parse().ok()?,
        })
    }
}

/// Writes, lists and restores table snapshots
pub struct BackupManager {
    data_dir: PathBuf,
    durability: DurabilityLevel,
}

impl BackupManager {
    pub fn new<P: AsRef<Path>>(data_dir: P, durability: DurabilityLevel) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            durability,
        }
    }

    fn table_dir(&self, db: &str, table: &str) -> PathBuf {
        self.data_dir.join(db).join(BACKUP_DIR).join(table)
    }

    /// Write an immutable copy of `data`; returns the backup id (file name)
    pub fn snapshot(&self, db: &str, table: &str, data: &TableData) -> Result<String> {
        check_name("database", db)?;
        check_name("table", table)?;
        let stamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        self.snapshot_with_stamp(db, table, data, &stamp)
    }

    fn snapshot_with_stamp(
        &self,
        db: &str,
        table: &str,
        data: &TableData,
        stamp: &str,
    ) -> Result<String> {
        let dir = self.table_dir(db, table);
        fs::create_dir_all(&dir)?;

        let mut seq = 0u32;
        loop {
            let id = if seq == 0 {
                format!("{}_{}.json", table, stamp)
            } else {
                format!("{}_{}_{}.json", table, stamp, seq)
            };
            if write_json_new(&dir.join(&id), data, self.durability)? {
                info!(database = db, table = table, backup = %id, rows = data.row_count(), "wrote backup");
                return Ok(id);
            }
            seq += 1;
        }
    }

    /// All backup ids of `table`, oldest first
    pub fn list(&self, db: &str, table: &str) -> Result<Vec<String>> {
        check_name("database", db)?;
        check_name("table", table)?;
        if !self.data_dir.join(db).is_dir() {
            return Err(TabulaError::NotFound(format!("database '{}' does not exist", db)));
        }

        let entries = match fs::read_dir(self.table_dir(db, table)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            match BackupId::parse(table, &name) {
                Some(id) => backups.push((id, name)),
                None => warn!(backup_dir = %self.table_dir(db, table).display(), entry = %name, "skipping unrecognized file"),
            }
        }
        backups.sort();
        Ok(backups.into_iter().map(|(_, name)| name).collect())
    }

    /// Read one snapshot
    pub fn load(&self, db: &str, table: &str, backup_id: &str) -> Result<TableData> {
        check_name("database", db)?;
        check_name("table", table)?;
        let not_found = || {
            TabulaError::NotFound(format!(
                "backup '{}' of table '{}.{}' does not exist",
                backup_id, db, table
            ))
        };

        // Plain file names only; anything else could escape the backup directory
        if BackupId::parse(table, backup_id).is_none() {
            return Err(not_found());
        }
        read_json(&self.table_dir(db, table).join(backup_id))?.ok_or_else(not_found)
    }

    /// Overwrite the live table with a snapshot, verbatim
    ///
    /// Returns the restored content. No schema check is made against the
    /// current table, which may even have been dropped.
    pub fn restore(
        &self,
        catalog: &Catalog,
        db: &str,
        table: &str,
        backup_id: &str,
    ) -> Result<TableData> {
        let data = self.load(db, table, backup_id)?;
        catalog.save_table(db, table, &data)?;
        info!(database = db, table = table, backup = backup_id, "restored backup");
        Ok(data)
    }
}
