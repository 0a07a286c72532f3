//! Execution status and log entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle status of one task run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
}

impl ExecutionStatus {
    /// Get status name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Whether the run has finished
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Severity of an execution log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl LogLevel {
    /// Get level name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One line of an execution's step-by-step narrative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub execution_id: Uuid,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Create an entry stamped with the current time
    pub fn new(execution_id: Uuid, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            execution_id,
            level,
            message: message.into(),
            context: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach structured context
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Status change persisted for an execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionUpdate {
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_processed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionUpdate {
    /// Run has started
    pub fn running() -> Self {
        Self {
            status: ExecutionStatus::Running,
            records_processed: None,
            error_message: None,
            updated_at: Utc::now(),
        }
    }

    /// Run finished successfully
    pub fn success(records_processed: u64) -> Self {
        Self {
            status: ExecutionStatus::Success,
            records_processed: Some(records_processed),
            error_message: None,
            updated_at: Utc::now(),
        }
    }

    /// Run failed with the first fatal error
    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            records_processed: None,
            error_message: Some(error_message.into()),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::Running).unwrap(),
            "\"running\""
        );
        assert_eq!(
            serde_json::to_string(&LogLevel::Warning).unwrap(),
            "\"warning\""
        );
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
    }

    #[test]
    fn test_log_entry_context() {
        let id = Uuid::new_v4();
        let entry = LogEntry::new(id, LogLevel::Info, "Extracted 3 rows")
            .with_context(serde_json::json!({"rows": 3}));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["level"], "info");
        assert_eq!(value["context"]["rows"], 3);
    }

    #[test]
    fn test_update_constructors() {
        let ok = ExecutionUpdate::success(9);
        assert_eq!(ok.status, ExecutionStatus::Success);
        assert_eq!(ok.records_processed, Some(9));

        let failed = ExecutionUpdate::failed("boom");
        assert_eq!(failed.status, ExecutionStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("boom"));
    }
}
