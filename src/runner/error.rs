//! Error types for task runs

use thiserror::Error;

use crate::connectors::{ConnectorError, ConnectorKind};
use crate::strategy::{PipelineHalted, StrategyError};

/// Failures reported by task stores and execution-log sinks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No task stored under this id
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// No execution stored under this id
    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    /// The backing store rejected the operation
    #[error("Store error: {0}")]
    Backend(String),
}

/// Errors that end a task run
#[derive(Error, Debug)]
pub enum RunError {
    /// Task or execution store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Task configuration is unusable (unknown connector, non-SQL target)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connector kind switched off for this deployment
    #[error("Connector '{0}' is disabled")]
    ConnectorDisabled(ConnectorKind),

    /// Strategy list could not be validated
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    /// Source extraction or target connection failed
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// A strategy failed and halted the pipeline
    #[error(transparent)]
    Pipeline(#[from] PipelineHalted),
}

/// Result type for task runs
pub type RunResult<T> = Result<T, RunError>;

impl RunError {
    /// Whether the run failed before touching any external system
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RunError::Config(_)
                | RunError::ConnectorDisabled(_)
                | RunError::Strategy(StrategyError::UnknownStrategy(_))
                | RunError::Connector(ConnectorError::Config(_))
                | RunError::Connector(ConnectorError::Unsupported(_))
        )
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            RunError::Store(StoreError::TaskNotFound(id)) => format!(
                "Task not found: {id}\n\nHint: Check the task id against the configured tasks."
            ),
            RunError::Config(msg) => format!(
                "Configuration error: {msg}\n\nHint: Check source_type, target_type and target_table in the task."
            ),
            RunError::ConnectorDisabled(kind) => format!(
                "Connector '{kind}' is disabled\n\nHint: Add it to enabled_connectors in the configuration."
            ),
            RunError::Strategy(StrategyError::UnknownStrategy(name)) => format!(
                "Unknown loading strategy '{name}'\n\nHint: Valid strategies are {}.",
                crate::strategy::Strategy::all()
                    .iter()
                    .map(|s| s.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            RunError::Connector(err) => err.user_message(),
            RunError::Pipeline(halted) => format!(
                "{halted}\n\n{} strategies completed before the failure; their changes were not rolled back.",
                halted.completed.len()
            ),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors() {
        assert!(RunError::Config("bad".to_string()).is_configuration());
        assert!(RunError::ConnectorDisabled(ConnectorKind::Oracle).is_configuration());
        assert!(
            RunError::Strategy(StrategyError::UnknownStrategy("x".to_string())).is_configuration()
        );
        assert!(
            !RunError::Connector(ConnectorError::Connection("refused".to_string()))
                .is_configuration()
        );
    }

    #[test]
    fn test_user_message_hints() {
        let msg = RunError::ConnectorDisabled(ConnectorKind::Salesforce).user_message();
        assert!(msg.contains("salesforce"));
        assert!(msg.contains("Hint:"));

        let msg = RunError::Strategy(StrategyError::UnknownStrategy("drop_tabel".to_string()))
            .user_message();
        assert!(msg.contains("drop_table"));
    }
}
