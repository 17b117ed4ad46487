//! Data model for Tabula tables

mod table;

pub use table::{duplicate_column, TableData};

/// Opaque cell value. Every cell is text; comparisons are string equality.
pub type Value = String;

/// A row maps column name -> value
pub type Row = std::collections::BTreeMap<String, Value>;
