//! Task runner and its external collaborators
//!
//! [`TaskRunner`] loads a task from a [`TaskStore`], checks its connectors
//! against a [`ConnectorGate`], extracts from the source, runs the loading
//! strategies against the target, and persists the final status. Progress is
//! written to an [`ExecutionLog`].

mod error;
mod gate;
mod sink;
mod store;
mod task_runner;

pub use error::{RunError, RunResult, StoreError};
pub use gate::{ConnectorGate, StaticConnectorGate};
pub use sink::{ExecutionLog, ExecutionLogger, MemoryExecutionLog, TracingExecutionLog};
pub use store::{MemoryTaskStore, TaskStore};
pub use task_runner::{RunReport, TaskRunner};
