//! Error types for configuration loading

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or resolving a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A task names a connection that is not defined
    #[error("Task '{task}' references unknown connection '{connection}'")]
    UnknownConnection { task: String, connection: String },

    /// No task with this id
    #[error("Task not found: {0}")]
    UnknownTask(String),

    /// No connection with this name
    #[error("Connection not found: {0}")]
    MissingConnection(String),

    /// `enabled_connectors` lists an unknown kind
    #[error("{0}")]
    UnknownConnector(String),
}

impl ConfigError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Io { path, .. } => format!(
                "{self}\n\nHint: Check that {} exists and is readable.",
                path.display()
            ),
            ConfigError::UnknownConnection { connection, .. } => format!(
                "{self}\n\nHint: Define it under [connections.{connection}]."
            ),
            ConfigError::UnknownTask(id) => {
                format!("{self}\n\nHint: Define it under [tasks.{id}].")
            }
            _ => self.to_string(),
        }
    }
}
