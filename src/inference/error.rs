//! Error types for schema profiling

use thiserror::Error;

/// Errors that can occur while profiling rows
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// No rows to infer from
    #[error("Cannot infer a schema from zero rows")]
    NoRows,
}
