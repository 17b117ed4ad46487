/// Query executor - validates intents against table metadata and applies them
use super::ast::*;
use super::parser::parse_statement;
use super::planner::{plan, QueryPlan};
use crate::cache::{CachedResult, ResultCache};
use crate::catalog::{check_name, Catalog};
use crate::error::{Result, TabulaError};
use crate::storage::BackupManager;
use crate::txn::{LockManager, LockMode};
use crate::types::{duplicate_column, Row, TableData};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Where a SELECT result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Cache,
    Executed,
}

/// Query result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    /// SELECT result; `columns` is always the table's declared column set
    Select {
        columns: Vec<String>,
        rows: Vec<Row>,
        source: ResultSource,
    },

    /// INSERT/UPDATE/DELETE result
    Modification {
        message: String,
        affected_rows: usize,
    },

    /// CREATE/DROP/RENAME result
    Definition {
        message: String,
    },
}

impl QueryResult {
    pub fn affected_rows(&self) -> usize {
        match self {
            QueryResult::Modification { affected_rows, .. } => *affected_rows,
            _ => 0,
        }
    }

    /// Message of a DDL/DML result
    pub fn message(&self) -> Option<&str> {
        match self {
            QueryResult::Modification { message, .. } | QueryResult::Definition { message } => {
                Some(message)
            }
            QueryResult::Select { .. } => None,
        }
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            QueryResult::Select { rows, .. } => rows,
            _ => &[],
        }
    }

    pub fn source(&self) -> Option<ResultSource> {
        match self {
            QueryResult::Select { source, .. } => Some(*source),
            _ => None,
        }
    }

    fn from_cache(hit: &CachedResult) -> Self {
        QueryResult::Select {
            columns: hit.columns.clone(),
            rows: hit.rows.clone(),
            source: ResultSource::Cache,
        }
    }
}

fn count_message(n: usize, verb: &str) -> String {
    if n == 1 {
        format!("1 row {}", verb)
    } else {
        format!("{} rows {}", n, verb)
    }
}

/// Executes statements against the catalog
///
/// Every mutation follows the same discipline under its table write lock:
/// validate, snapshot (UPDATE/DELETE only), mutate, persist, then invalidate
/// the result cache. A statement that fails validation touches nothing.
pub struct QueryExecutor {
    catalog: Arc<Catalog>,
    backups: Arc<BackupManager>,
    cache: Arc<ResultCache>,
    locks: Arc<LockManager>,
}

impl QueryExecutor {
    pub fn new(
        catalog: Arc<Catalog>,
        backups: Arc<BackupManager>,
        cache: Arc<ResultCache>,
        locks: Arc<LockManager>,
    ) -> Self {
        Self {
            catalog,
            backups,
            cache,
            locks,
        }
    }

    /// Parse, plan and execute one statement
    pub fn execute(&self, sql: &str) -> Result<QueryResult> {
        let statement = parse_statement(sql)?;
        match plan(sql, statement, &self.cache) {
            QueryPlan::Cached(hit) => Ok(QueryResult::from_cache(&hit)),
            QueryPlan::Execute {
                statement,
                generation,
            } => self.execute_statement(sql, statement, generation),
        }
    }

    fn execute_statement(
        &self,
        sql: &str,
        statement: Statement,
        generation: Option<u64>,
    ) -> Result<QueryResult> {
        let kind = statement.kind();
        let result = match statement {
            Statement::CreateDatabase { name } => self.execute_create_database(&name),
            Statement::CreateTable { table, columns } => self.execute_create_table(&table, columns),
            Statement::DropTable { table } => self.execute_drop_table(&table),
            Statement::RenameTable { table, new_table } => self.execute_rename_table(&table, &new_table),
            Statement::Insert {
                table,
                columns,
                values,
            } => self.execute_insert(&table, &columns, values),
            Statement::Update {
                table,
                set_column,
                set_value,
                condition,
            } => self.execute_update(&table, &set_column, &set_value, &condition),
            Statement::Delete { table, condition } => self.execute_delete(&table, &condition),
            Statement::Select { table, projection } => {
                // Mutations never carry a generation; `plan` always sets one for SELECT
                let generation = generation.unwrap_or_else(|| self.cache.generation());
                self.execute_select(sql, generation, &table, &projection)
            }
        };

        match &result {
            Ok(_) if kind.is_mutation() => debug!(kind = %kind, "cache invalidated"),
            Ok(_) => {}
            Err(e) => debug!(kind = %kind, error = %e, "statement failed"),
        }
        result
    }

    fn execute_create_database(&self, name: &str) -> Result<QueryResult> {
        check_name("database", name)?;
        let _locks = self.locks.lock_database(name);

        self.catalog.create_database(name)?;
        self.cache.invalidate_all();

        Ok(QueryResult::Definition {
            message: format!("Database '{}' created", name),
        })
    }

    fn execute_create_table(&self, table: &TableRef, columns: Vec<String>) -> Result<QueryResult> {
        let (db, name) = table.resolve()?;
        let _locks = self.locks.lock_table(db, name, LockMode::Exclusive);

        self.catalog.create_table(db, name, columns)?;
        self.cache.invalidate_all();

        Ok(QueryResult::Definition {
            message: format!("Table '{}' created in database '{}'", name, db),
        })
    }

    fn execute_drop_table(&self, table: &TableRef) -> Result<QueryResult> {
        let (db, name) = table.resolve()?;
        let _locks = self.locks.lock_table(db, name, LockMode::Exclusive);

        self.catalog.drop_table(db, name)?;
        self.cache.invalidate_all();

        Ok(QueryResult::Definition {
            message: format!("Table '{}' dropped from database '{}'", name, db),
        })
    }

    fn execute_rename_table(&self, table: &TableRef, new_table: &TableRef) -> Result<QueryResult> {
        let (db, name) = table.resolve()?;
        let (new_db, new_name) = new_table.resolve()?;
        if db != new_db {
            return Err(TabulaError::Name(format!(
                "cannot rename '{}' to '{}': both tables must be in the same database",
                table, new_table
            )));
        }

        let _locks = self.locks.lock_tables(db, &[name, new_name], LockMode::Exclusive);

        self.catalog.rename_table(db, name, new_name)?;
        self.cache.invalidate_all();

        Ok(QueryResult::Definition {
            message: format!("Table '{}' renamed to '{}' in database '{}'", name, new_name, db),
        })
    }

    fn execute_insert(
        &self,
        table: &TableRef,
        columns: &[String],
        values: Vec<String>,
    ) -> Result<QueryResult> {
        let (db, name) = table.resolve()?;
        let _locks = self.locks.lock_table(db, name, LockMode::Exclusive);

        let mut data = self.catalog.require_table(db, name)?;
        validate_insert(&data, table, columns, &values)?;

        data.rows.push(columns.iter().cloned().zip(values).collect());
        self.catalog.save_table(db, name, &data)?;
        self.cache.invalidate_all();

        Ok(QueryResult::Modification {
            message: count_message(1, "inserted"),
            affected_rows: 1,
        })
    }

    fn execute_update(
        &self,
        table: &TableRef,
        set_column: &str,
        set_value: &str,
        condition: &Condition,
    ) -> Result<QueryResult> {
        let (db, name) = table.resolve()?;
        let _locks = self.locks.lock_table(db, name, LockMode::Exclusive);

        let mut data = self.catalog.require_table(db, name)?;
        require_column(&data, table, set_column)?;
        require_column(&data, table, &condition.column)?;

        self.backups.snapshot(db, name, &data)?;

        let mut updated = 0;
        for row in data.rows.iter_mut() {
            if TableData::row_matches(row, &condition.column, &condition.value) {
                row.insert(set_column.to_string(), set_value.to_string());
                updated += 1;
            }
        }

        self.catalog.save_table(db, name, &data)?;
        self.cache.invalidate_all();
        info!(database = db, table = name, rows = updated, "update applied");

        Ok(QueryResult::Modification {
            message: count_message(updated, "updated"),
            affected_rows: updated,
        })
    }

    fn execute_delete(&self, table: &TableRef, condition: &Condition) -> Result<QueryResult> {
        let (db, name) = table.resolve()?;
        let _locks = self.locks.lock_table(db, name, LockMode::Exclusive);

        let mut data = self.catalog.require_table(db, name)?;
        require_column(&data, table, &condition.column)?;

        self.backups.snapshot(db, name, &data)?;

        let before = data.rows.len();
        data.rows
            .retain(|row| !TableData::row_matches(row, &condition.column, &condition.value));
        let deleted = before - data.rows.len();

        self.catalog.save_table(db, name, &data)?;
        self.cache.invalidate_all();
        info!(database = db, table = name, rows = deleted, "delete applied");

        Ok(QueryResult::Modification {
            message: count_message(deleted, "deleted"),
            affected_rows: deleted,
        })
    }

    fn execute_select(
        &self,
        sql: &str,
        generation: u64,
        table: &TableRef,
        projection: &Projection,
    ) -> Result<QueryResult> {
        let (db, name) = table.resolve()?;
        let data = {
            let _locks = self.locks.lock_table(db, name, LockMode::Shared);
            self.catalog.require_table(db, name)?
        };

        let rows = match projection {
            Projection::All => data.rows.clone(),
            Projection::Columns(columns) => {
                if let Some(missing) = data.find_undeclared(columns) {
                    return Err(unknown_column(table, missing));
                }
                data.project(columns)
            }
        };

        let result = CachedResult {
            columns: data.columns,
            rows,
        };
        self.cache.store(sql, generation, result.clone());

        Ok(QueryResult::Select {
            columns: result.columns,
            rows: result.rows,
            source: ResultSource::Executed,
        })
    }
}

fn unknown_column(table: &TableRef, column: &str) -> TabulaError {
    TabulaError::Schema(format!("column '{}' does not exist in table '{}'", column, table))
}

fn require_column(data: &TableData, table: &TableRef, column: &str) -> Result<()> {
    if data.has_column(column) {
        Ok(())
    } else {
        Err(unknown_column(table, column))
    }
}

fn validate_insert(
    data: &TableData,
    table: &TableRef,
    columns: &[String],
    values: &[String],
) -> Result<()> {
    if let Some(missing) = data.find_undeclared(columns) {
        return Err(unknown_column(table, missing));
    }
    if let Some(dup) = duplicate_column(columns) {
        return Err(TabulaError::Schema(format!("column '{}' is given more than once", dup)));
    }
    if columns.len() != data.column_count() {
        return Err(TabulaError::Schema(format!(
            "INSERT into '{}' must supply all {} columns, got {}",
            table,
            data.column_count(),
            columns.len()
        )));
    }
    if values.len() != columns.len() {
        return Err(TabulaError::Schema(format!(
            "INSERT into '{}' lists {} columns but {} values",
            table,
            columns.len(),
            values.len()
        )));
    }
    Ok(())
}
