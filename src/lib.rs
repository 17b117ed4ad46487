//! Tabula
//!
//! A small file-backed relational store driven by a tiny SQL-like command
//! language.
//!
//! ## Architecture
//! - Storage: one JSON file per table, replaced atomically on every write
//! - Backups: timestamped snapshot before every UPDATE and DELETE
//! - Statements: lexer + recursive-descent parser -> planner -> executor
//! - Cache: SELECT results memoized by literal query text, cleared on any
//!   mutation
//! - Concurrency: per-database and per-table reader/writer locks
//!
//! ```no_run
//! use tabula::{DBConfig, Database};
//!
//! let db = Database::open(DBConfig::new("data"))?;
//! db.execute("CREATE DATABASE shop")?;
//! db.execute("CREATE TABLE shop.users (id INT, name VARCHAR(100))")?;
//! db.execute("INSERT INTO shop.users (id, name) VALUES (1, 'Alice')")?;
//! let result = db.execute("SELECT * FROM shop.users")?;
//! println!("{}", serde_json::to_string(&result)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod storage;
pub mod txn;
pub mod types;
pub mod catalog;
pub mod sql;
pub mod cache;
pub mod database;

mod error;

pub use config::{DBConfig, DurabilityLevel};
pub use error::{ErrorKind, ErrorResponse, Result, TabulaError};

pub use database::{Database, DatabaseStats};
pub use catalog::is_valid_name;
pub use sql::{QueryResult, ResultSource, StatementKind};
pub use types::{Row, TableData, Value};
