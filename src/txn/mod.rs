//! Concurrency control for statements

pub mod lock_manager;

pub use lock_manager::{LockManager, LockManagerStats, LockMode, StatementLocks};
