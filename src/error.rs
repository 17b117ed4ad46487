//! Error types for Tabula

use serde::Serialize;
use thiserror::Error;

use crate::sql::StatementKind;

pub type Result<T> = std::result::Result<T, TabulaError>;

#[derive(Error, Debug)]
pub enum TabulaError {
    /// Statement text doesn't match its keyword's grammar
    #[error("Syntax error in {kind} statement: {message}")]
    Syntax {
        kind: StatementKind,
        message: String,
    },

    /// Invalid database or table identifier
    #[error("Invalid name: {0}")]
    Name(String),

    /// Referenced database, table or backup is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Target of a create/rename already exists
    #[error("Already exists: {0}")]
    Conflict(String),

    /// Column-set mismatch: unknown column, duplicate column, wrong arity
    #[error("Schema error: {0}")]
    Schema(String),

    /// Statement kind outside the recognized set
    #[error("Unsupported statement: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Stable, serializable classification of a [`TabulaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Syntax,
    Name,
    NotFound,
    Conflict,
    Schema,
    Unsupported,
    Storage,
}

/// Structured error as surfaced to callers: `{"kind": ..., "message": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

impl TabulaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TabulaError::Syntax { .. } => ErrorKind::Syntax,
            TabulaError::Name(_) => ErrorKind::Name,
            TabulaError::NotFound(_) => ErrorKind::NotFound,
            TabulaError::Conflict(_) => ErrorKind::Conflict,
            TabulaError::Schema(_) => ErrorKind::Schema,
            TabulaError::Unsupported(_) => ErrorKind::Unsupported,
            TabulaError::Io(_) | TabulaError::Serialization(_) => ErrorKind::Storage,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    pub(crate) fn syntax(kind: StatementKind, message: impl Into<String>) -> Self {
        TabulaError::Syntax {
            kind,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for TabulaError {
    fn from(err: serde_json::Error) -> Self {
        TabulaError::Serialization(err.to_string())
    }
}

impl From<tempfile::PersistError> for TabulaError {
    fn from(err: tempfile::PersistError) -> Self {
        TabulaError::Io(err.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = TabulaError::syntax(StatementKind::Update, "Expected WHERE");
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(err.to_string().contains("UPDATE"));

        let io = TabulaError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_error_response_json() {
        let err = TabulaError::NotFound("table s.users".into());
        let json = serde_json::to_value(err.to_response()).unwrap();
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["message"], "Not found: table s.users");
    }
}
