/// Parsed statements (intents)
use serde::Serialize;
use std::fmt;

use crate::catalog::check_name;
use crate::error::{Result, TabulaError};

/// Classification of a statement by its leading keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatementKind {
    CreateDatabase,
    CreateTable,
    DropTable,
    RenameTable,
    Insert,
    Update,
    Delete,
    Select,
    /// Empty input or no recognizable leading keyword
    Unknown,
}

impl StatementKind {
    /// Whether a successful statement of this kind changes stored state
    pub fn is_mutation(&self) -> bool {
        !matches!(self, StatementKind::Select | StatementKind::Unknown)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::CreateDatabase => "CREATE DATABASE",
            StatementKind::CreateTable => "CREATE TABLE",
            StatementKind::DropTable => "DROP TABLE",
            StatementKind::RenameTable => "RENAME TABLE",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Select => "SELECT",
            StatementKind::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Table reference: `db.table` or a bare `table`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub database: Option<String>,
    pub table: String,
}

impl TableRef {
    pub fn qualified(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            table: table.into(),
        }
    }

    pub fn bare(table: impl Into<String>) -> Self {
        Self {
            database: None,
            table: table.into(),
        }
    }

    /// `(db, table)` with both names validated
    ///
    /// A bare reference cannot be persisted anywhere and is a `Name` error.
    pub fn resolve(&self) -> Result<(&str, &str)> {
        let db = self.database.as_deref().ok_or_else(|| {
            TabulaError::Name(format!(
                "table reference '{}' must be qualified as db.table",
                self.table
            ))
        })?;
        check_name("database", db)?;
        check_name("table", &self.table)?;
        Ok((db, self.table.as_str()))
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(db) => write!(f, "{}.{}", db, self.table),
            None => f.write_str(&self.table),
        }
    }
}

/// SELECT column list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `*`
    All,
    Columns(Vec<String>),
}

/// Equality predicate `column = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub value: String,
}

/// Top-level statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateDatabase {
        name: String,
    },
    CreateTable {
        table: TableRef,
        columns: Vec<String>,
    },
    DropTable {
        table: TableRef,
    },
    RenameTable {
        table: TableRef,
        new_table: TableRef,
    },
    Insert {
        table: TableRef,
        columns: Vec<String>,
        values: Vec<String>,
    },
    Update {
        table: TableRef,
        set_column: String,
        set_value: String,
        condition: Condition,
    },
    Delete {
        table: TableRef,
        condition: Condition,
    },
    Select {
        table: TableRef,
        projection: Projection,
    },
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::CreateDatabase { .. } => StatementKind::CreateDatabase,
            Statement::CreateTable { .. } => StatementKind::CreateTable,
            Statement::DropTable { .. } => StatementKind::DropTable,
            Statement::RenameTable { .. } => StatementKind::RenameTable,
            Statement::Insert { .. } => StatementKind::Insert,
            Statement::Update { .. } => StatementKind::Update,
            Statement::Delete { .. } => StatementKind::Delete,
            Statement::Select { .. } => StatementKind::Select,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display_and_mutation() {
        assert_eq!(StatementKind::Update.to_string(), "UPDATE");
        assert_eq!(StatementKind::CreateTable.to_string(), "CREATE TABLE");
        assert!(StatementKind::Insert.is_mutation());
        assert!(StatementKind::CreateDatabase.is_mutation());
        assert!(!StatementKind::Select.is_mutation());
    }

    #[test]
    fn test_resolve_table_ref() {
        assert_eq!(TableRef::qualified("s", "users").resolve().unwrap(), ("s", "users"));
        assert!(matches!(TableRef::bare("users").resolve(), Err(TabulaError::Name(_))));
        assert!(matches!(TableRef::qualified("s", "1x").resolve(), Err(TabulaError::Name(_))));
        assert!(matches!(TableRef::qualified("s-1", "x").resolve(), Err(TabulaError::Name(_))));
    }

    #[test]
    fn test_table_ref_display() {
        assert_eq!(TableRef::qualified("s", "t").to_string(), "s.t");
        assert_eq!(TableRef::bare("t").to_string(), "t");
    }
}
