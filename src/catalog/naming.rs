/// Identifier validation for database and table names
use crate::error::{Result, TabulaError};

/// Valid iff `name` matches `[A-Za-z_][A-Za-z0-9_]*` in full
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `Err(Name)` unless `name` is a valid identifier; `what` names the role
pub fn check_name(what: &str, name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(TabulaError::Name(format!("invalid {} name '{}'", what, name)))
    }
}
