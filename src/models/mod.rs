//! Models module for the SDK
//!
//! Defines the data structures shared by connectors, strategies and the task runner.

pub mod connection;
pub mod execution;
pub mod statement;
pub mod task;

pub use connection::ConnectionConfig;
pub use execution::{ExecutionStatus, ExecutionUpdate, LogEntry, LogLevel};
pub use statement::SqlStatement;
pub use task::{DEFAULT_STRATEGIES, LoadingStrategies, TaskDefinition};

/// One extracted record: column name to value, in source column order.
///
/// Rows are transient and only live for the duration of a single task run.
pub type Row = serde_json::Map<String, serde_json::Value>;
