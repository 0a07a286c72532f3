//! CLI error type

use thiserror::Error;

use crate::config::ConfigError;
use crate::connectors::ConnectorError;
use crate::inference::ProfileError;
use crate::runner::RunError;

/// Errors surfaced by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cannot render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Message with a hint where one helps
    pub fn user_message(&self) -> String {
        match self {
            CliError::Config(e) => e.user_message(),
            CliError::Run(e) => e.user_message(),
            CliError::Connector(e) => e.user_message(),
            CliError::Profile(ProfileError::NoRows) => format!(
                "{self}\n\nHint: The source query returned no rows; check source_query."
            ),
            _ => self.to_string(),
        }
    }
}
