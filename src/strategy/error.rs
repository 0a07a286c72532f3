//! Error types for strategy execution

use thiserror::Error;

use super::types::{Strategy, StrategyOutcome};
use crate::connectors::ConnectorError;
use crate::ddl::DdlError;
use crate::inference::ProfileError;

/// Errors raised by a single strategy
#[derive(Error, Debug)]
pub enum StrategyError {
    /// Name does not match any strategy
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// Statement against the target failed
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// Source rows could not be profiled
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Statement could not be rendered
    #[error(transparent)]
    Ddl(#[from] DdlError),

    /// Strategy needs a schema but the source returned no rows
    #[error("Cannot create table '{0}': the source returned no rows to infer a schema from")]
    EmptySource(String),

    /// Strategy not available for the target dialect
    #[error("{strategy} is not supported for {dialect} targets")]
    Unsupported {
        strategy: Strategy,
        dialect: &'static str,
    },
}

/// Result type for strategy operations
pub type StrategyResult<T> = Result<T, StrategyError>;

/// A strategy failed; the pipeline stopped there.
///
/// Changes made by `completed` strategies stay applied.
#[derive(Error, Debug)]
#[error("Strategy '{strategy}' failed: {source}")]
pub struct PipelineHalted {
    /// Strategy token that failed (possibly an unknown name)
    pub strategy: String,
    #[source]
    pub source: StrategyError,
    /// Outcomes of the strategies that ran before the failure
    pub completed: Vec<StrategyOutcome>,
}
