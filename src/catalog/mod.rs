//! Catalog: databases, tables and their on-disk layout

pub mod naming;
pub mod registry;

pub use naming::{check_name, is_valid_name};
pub use registry::Catalog;
