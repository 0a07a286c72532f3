//! Error types for statement generation

use thiserror::Error;

/// Errors raised while rendering DML
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DdlError {
    #[error("Cannot build an insert from a row with no columns")]
    EmptyRow,

    #[error("Conflict key '{0}' is missing from the row")]
    MissingConflictKey(String),
}
