//! Administrative operations outside the statement language

use super::core::Database;
use crate::catalog::check_name;
use crate::error::Result;
use crate::txn::LockMode;
use crate::types::Row;
use tracing::info;

impl Database {
    /// Backup ids of `db.table`, oldest first
    pub fn list_backups(&self, db: &str, table: &str) -> Result<Vec<String>> {
        self.backups.list(db, table)
    }

    /// Overwrite `db.table` with one of its backups
    ///
    /// A restore is a mutation: the result cache is invalidated.
    pub fn restore_backup(&self, db: &str, table: &str, backup_id: &str) -> Result<()> {
        check_name("database", db)?;
        check_name("table", table)?;
        let _locks = self.locks.lock_table(db, table, LockMode::Exclusive);

        self.backups.restore(&self.catalog, db, table, backup_id)?;
        self.cache.invalidate_all();
        Ok(())
    }

    /// Drop a database with all its tables and backups
    pub fn drop_database(&self, db: &str) -> Result<()> {
        check_name("database", db)?;
        let _locks = self.locks.lock_database(db);

        self.catalog.drop_database(db)?;
        self.cache.invalidate_all();
        Ok(())
    }

    /// Append records to `db.table`, keeping only declared columns
    ///
    /// Returns the number of rows appended.
    pub fn bulk_insert<I>(&self, db: &str, table: &str, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = Row>,
    {
        check_name("database", db)?;
        check_name("table", table)?;
        let _locks = self.locks.lock_table(db, table, LockMode::Exclusive);

        let mut data = self.catalog.require_table(db, table)?;
        let before = data.row_count();
        for record in records {
            let row: Row = record
                .into_iter()
                .filter(|(column, _)| data.has_column(column))
                .collect();
            data.rows.push(row);
        }
        let inserted = data.row_count() - before;
        if inserted == 0 {
            return Ok(0);
        }

        self.catalog.save_table(db, table, &data)?;
        self.cache.invalidate_all();
        info!(database = db, table = table, rows = inserted, "bulk insert");
        Ok(inserted)
    }
}
