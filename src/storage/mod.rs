//! Storage layer implementation
//!
//! Tables and backups are JSON files; every write is a temp file + rename.

pub mod atomic;
pub mod backup;

pub use atomic::{read_json, write_json_atomic, write_json_new};
pub use backup::BackupManager;
