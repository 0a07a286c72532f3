//! Execution-log sinks

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::StoreError;
use crate::models::{LogEntry, LogLevel};

/// Append-only, time-ordered sink of execution log entries
#[async_trait]
pub trait ExecutionLog: Send + Sync {
    async fn append(&self, entry: LogEntry) -> Result<(), StoreError>;
}

/// Writes entries for one execution, never failing the caller.
///
/// Sink errors are reported through `tracing` and otherwise ignored, so a
/// broken log store cannot change the outcome of a run.
#[derive(Clone)]
pub struct ExecutionLogger {
    sink: Arc<dyn ExecutionLog>,
    execution_id: Uuid,
}

impl ExecutionLogger {
    /// Logger for `execution_id` writing to `sink`
    pub fn new(sink: Arc<dyn ExecutionLog>, execution_id: Uuid) -> Self {
        Self { sink, execution_id }
    }

    /// Execution this logger writes for
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// Append one entry
    pub async fn log(&self, level: LogLevel, message: impl Into<String>, context: Option<Value>) {
        let mut entry = LogEntry::new(self.execution_id, level, message);
        if let Some(context) = context {
            entry = entry.with_context(context);
        }
        if let Err(e) = self.sink.append(entry).await {
            warn!(execution_id = %self.execution_id, error = %e, "Failed to write execution log");
        }
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, None).await;
    }

    pub async fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message, None).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, None).await;
    }

    pub async fn success(&self, message: impl Into<String>, context: Option<Value>) {
        self.log(LogLevel::Success, message, context).await;
    }
}

impl std::fmt::Debug for ExecutionLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionLogger")
            .field("execution_id", &self.execution_id)
            .finish_non_exhaustive()
    }
}

/// Keeps entries in memory, in append order
#[derive(Debug, Default)]
pub struct MemoryExecutionLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries written for one execution
    pub fn entries_for(&self, execution_id: Uuid) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.execution_id == execution_id)
            .collect()
    }

    /// All entries
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ExecutionLog for MemoryExecutionLog {
    async fn append(&self, entry: LogEntry) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("log lock poisoned".to_string()))?
            .push(entry);
        Ok(())
    }
}

/// Forwards entries to `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingExecutionLog;

#[async_trait]
impl ExecutionLog for TracingExecutionLog {
    async fn append(&self, entry: LogEntry) -> Result<(), StoreError> {
        let context = entry.context.map(|c| c.to_string()).unwrap_or_default();
        match entry.level {
            LogLevel::Error => error!(execution_id = %entry.execution_id, %context, "{}", entry.message),
            LogLevel::Warning => warn!(execution_id = %entry.execution_id, %context, "{}", entry.message),
            LogLevel::Info | LogLevel::Success => {
                info!(execution_id = %entry.execution_id, level = %entry.level, %context, "{}", entry.message)
            }
        }
        Ok(())
    }
}
