//! Data Transfer SDK - task engine for moving data between systems
//!
//! Provides:
//! - Connector adapters for SQL engines, SaaS APIs and flat files
//! - Schema profiling of extracted rows into portable column types
//! - Dialect-specific DDL and DML generation
//! - An ordered, fail-fast loading strategy pipeline
//! - A task runner that persists execution status and logs
//!
//! # Example
//!
//! ```rust
//! use data_transfer_sdk::dialect::DialectKind;
//! use data_transfer_sdk::inference::profile_schema;
//! use serde_json::json;
//!
//! let rows: Vec<_> = [json!({"id": 1, "name": "a"}), json!({"id": 2, "name": "b"})]
//!     .iter()
//!     .filter_map(|v| v.as_object().cloned())
//!     .collect();
//! let columns = profile_schema(&rows, DialectKind::Postgres.dialect()).unwrap();
//! assert_eq!(columns[0].name, "id");
//! assert_eq!(columns[1].sql_type, "VARCHAR(255)");
//! ```

pub mod cli;
#[cfg(feature = "config")]
pub mod config;
pub mod connectors;
pub mod ddl;
pub mod dialect;
pub mod inference;
pub mod models;
pub mod runner;
pub mod strategy;

// Re-export commonly used types
pub use connectors::{
    ConnectionHandle, Connector, ConnectorError, ConnectorKind, ConnectorRegistry,
    ExtractRequest, QueryResult, TestConnectionResult,
};
pub use dialect::{Dialect, DialectKind};
pub use inference::{InferredColumn, PortableType, ProfileError, SchemaProfiler, profile_schema};
pub use models::{
    ConnectionConfig, ExecutionStatus, ExecutionUpdate, LogEntry, LogLevel, Row, SqlStatement,
    TaskDefinition,
};
pub use runner::{
    ConnectorGate, ExecutionLog, MemoryExecutionLog, MemoryTaskStore, RunError, RunReport,
    StaticConnectorGate, TaskRunner, TaskStore,
};
pub use strategy::{PipelineHalted, RowSummary, Strategy, StrategyExecutor, StrategyOutcome};

#[cfg(feature = "config")]
pub use config::{ConfigError, TransferConfig};
