//! TOML configuration of connections and tasks
//!
//! ```toml
//! enabled_connectors = ["csv", "postgres"]
//!
//! [connections.people_file]
//! type = "csv"
//! filePath = "people.csv"
//!
//! [connections.warehouse]
//! type = "postgres"
//! host = "localhost"
//! database = "analytics"
//! username = "loader"
//! password = "secret"
//!
//! [tasks.load_people]
//! source = "people_file"
//! target = "warehouse"
//! target_table = "people"
//! loading_strategies = ["check_exists", "create_table", "append_data"]
//! ```
//!
//! Tasks reference connections by name; [`TransferConfig::task_store`] resolves
//! them into [`TaskDefinition`]s.

mod error;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use error::ConfigError;

use crate::connectors::ConnectorKind;
use crate::models::{ConnectionConfig, LoadingStrategies, TaskDefinition};
use crate::runner::{MemoryTaskStore, StaticConnectorGate};

/// One named connection: its connector type plus connector-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEntry {
    /// Connector token (`postgres`, `csv`, `salesforce`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl ConnectionEntry {
    /// Settings as passed to the connector
    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::from(self.settings.clone())
    }
}

/// A task whose source and target are connection names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEntry {
    #[serde(default)]
    pub name: Option<String>,
    pub source: String,
    #[serde(default)]
    pub source_query: Option<String>,
    #[serde(default)]
    pub source_worksheet: Option<String>,
    pub target: String,
    pub target_table: String,
    #[serde(default)]
    pub target_worksheet: Option<String>,
    #[serde(default)]
    pub loading_strategies: LoadingStrategies,
}

/// Contents of a configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Connector kinds allowed to run; absent allows all
    #[serde(default)]
    pub enabled_connectors: Option<Vec<String>>,
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionEntry>,
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskEntry>,
}

impl TransferConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Look up a connection by name
    pub fn connection(&self, name: &str) -> Result<&ConnectionEntry, ConfigError> {
        self.connections
            .get(name)
            .ok_or_else(|| ConfigError::MissingConnection(name.to_string()))
    }

    /// Resolve one task into a definition
    pub fn task(&self, id: &str) -> Result<TaskDefinition, ConfigError> {
        let entry = self
            .tasks
            .get(id)
            .ok_or_else(|| ConfigError::UnknownTask(id.to_string()))?;
        let resolve = |connection: &str| {
            self.connections
                .get(connection)
                .ok_or_else(|| ConfigError::UnknownConnection {
                    task: id.to_string(),
                    connection: connection.to_string(),
                })
        };
        let source = resolve(&entry.source)?;
        let target = resolve(&entry.target)?;

        Ok(TaskDefinition {
            id: id.to_string(),
            name: entry.name.clone().unwrap_or_else(|| id.to_string()),
            source_type: source.kind.clone(),
            source_config: source.config(),
            source_query: entry.source_query.clone(),
            source_worksheet: entry.source_worksheet.clone(),
            target_type: target.kind.clone(),
            target_config: target.config(),
            target_table: entry.target_table.clone(),
            target_worksheet: entry.target_worksheet.clone(),
            loading_strategies: entry.loading_strategies.clone(),
        })
    }

    /// Store holding every configured task
    pub fn task_store(&self) -> Result<MemoryTaskStore, ConfigError> {
        let store = MemoryTaskStore::new();
        for id in self.tasks.keys() {
            store.insert_task(self.task(id)?);
        }
        Ok(store)
    }

    /// Gate built from `enabled_connectors`
    pub fn gate(&self) -> Result<StaticConnectorGate, ConfigError> {
        match &self.enabled_connectors {
            None => Ok(StaticConnectorGate::allow_all()),
            Some(tokens) => {
                let kinds = tokens
                    .iter()
                    .map(|t| t.parse::<ConnectorKind>().map_err(ConfigError::UnknownConnector))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(StaticConnectorGate::only(kinds))
            }
        }
    }
}
