//! Database Module - composition root
//!
//! # Module Structure
//! - `core`: Database struct, open() and statement execution
//! - `admin`: backup listing/restore, database drop, bulk load

pub mod core;
pub mod admin;

pub use self::core::{Database, DatabaseStats};
