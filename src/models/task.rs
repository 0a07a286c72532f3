//! Stored task definitions

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::connection::ConnectionConfig;

/// Strategies run when a task does not configure any.
pub const DEFAULT_STRATEGIES: [&str; 3] = ["check_exists", "create_table", "append_data"];

/// A data-movement task as read back from the task store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Task identifier
    #[serde(default)]
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Connector token for the source (e.g. `postgres`, `salesforce`, `csv`)
    pub source_type: String,
    /// Source connection settings
    #[serde(default)]
    pub source_config: ConnectionConfig,
    /// Query, SOQL statement or table spec to extract
    #[serde(default)]
    pub source_query: Option<String>,
    /// Worksheet / top-level key for file sources
    #[serde(default)]
    pub source_worksheet: Option<String>,
    /// Connector token for the target; must be a SQL engine
    pub target_type: String,
    /// Target connection settings
    #[serde(default)]
    pub target_config: ConnectionConfig,
    /// Table to load into
    pub target_table: String,
    /// Worksheet for spreadsheet targets (unused by SQL targets)
    #[serde(default)]
    pub target_worksheet: Option<String>,
    /// Ordered strategy names
    #[serde(default)]
    pub loading_strategies: LoadingStrategies,
}

impl TaskDefinition {
    /// Create a task with the required fields set
    pub fn new(
        id: impl Into<String>,
        source_type: impl Into<String>,
        target_type: impl Into<String>,
        target_table: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            source_type: source_type.into(),
            source_config: ConnectionConfig::default(),
            source_query: None,
            source_worksheet: None,
            target_type: target_type.into(),
            target_config: ConnectionConfig::default(),
            target_table: target_table.into(),
            target_worksheet: None,
            loading_strategies: LoadingStrategies::default(),
        }
    }

    /// Set the source connection settings
    pub fn with_source_config(mut self, config: ConnectionConfig) -> Self {
        self.source_config = config;
        self
    }

    /// Set the source query
    pub fn with_source_query(mut self, query: impl Into<String>) -> Self {
        self.source_query = Some(query.into());
        self
    }

    /// Set the source worksheet / key
    pub fn with_source_worksheet(mut self, worksheet: impl Into<String>) -> Self {
        self.source_worksheet = Some(worksheet.into());
        self
    }

    /// Set the target connection settings
    pub fn with_target_config(mut self, config: ConnectionConfig) -> Self {
        self.target_config = config;
        self
    }

    /// Set the strategy list
    pub fn with_strategies<I, S>(mut self, strategies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loading_strategies =
            LoadingStrategies::from_names(strategies.into_iter().map(Into::into).collect());
        self
    }
}

/// Configured strategy names.
///
/// Stores hand these back either as a list of tokens or as a JSON-encoded string
/// of the same list. Absent or null falls back to [`DEFAULT_STRATEGIES`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LoadingStrategies(Option<Vec<String>>);

impl LoadingStrategies {
    /// Explicit strategy list
    pub fn from_names(names: Vec<String>) -> Self {
        Self(Some(names))
    }

    /// Whether the task configured its own list
    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    /// Names to run, in order
    pub fn names(&self) -> Vec<String> {
        match &self.0 {
            Some(names) => names.clone(),
            None => DEFAULT_STRATEGIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl<'de> Deserialize<'de> for LoadingStrategies {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<String>),
            Encoded(String),
        }

        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(Self(None)),
            Some(Raw::List(names)) => Ok(Self(Some(names))),
            Some(Raw::Encoded(text)) if text.trim().is_empty() => Ok(Self(None)),
            Some(Raw::Encoded(text)) => serde_json::from_str::<Option<Vec<String>>>(&text)
                .map(Self)
                .map_err(|e| de::Error::custom(format!("invalid loading_strategies: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task_json(strategies: serde_json::Value) -> serde_json::Value {
        json!({
            "source_type": "postgres",
            "source_config": {"host": "src"},
            "target_type": "mysql",
            "target_config": "{\"host\":\"dst\"}",
            "target_table": "orders",
            "loading_strategies": strategies,
        })
    }

    #[test]
    fn test_strategies_from_list() {
        let task: TaskDefinition =
            serde_json::from_value(task_json(json!(["drop_table", "create_table"]))).unwrap();
        assert_eq!(task.loading_strategies.names(), vec!["drop_table", "create_table"]);
        assert_eq!(task.target_config.get_str("host"), Some("dst"));
    }

    #[test]
    fn test_strategies_from_encoded_string() {
        let task: TaskDefinition =
            serde_json::from_value(task_json(json!("[\"truncate_table\",\"append_data\"]")))
                .unwrap();
        assert_eq!(
            task.loading_strategies.names(),
            vec!["truncate_table", "append_data"]
        );
    }

    #[test]
    fn test_strategies_default_when_null() {
        let task: TaskDefinition = serde_json::from_value(task_json(json!(null))).unwrap();
        assert!(!task.loading_strategies.is_configured());
        assert_eq!(task.loading_strategies.names(), DEFAULT_STRATEGIES.to_vec());
    }

    #[test]
    fn test_strategies_default_when_absent() {
        let mut value = task_json(json!(null));
        value.as_object_mut().unwrap().remove("loading_strategies");
        let task: TaskDefinition = serde_json::from_value(value).unwrap();
        assert_eq!(task.loading_strategies.names().len(), 3);
    }

    #[test]
    fn test_strategies_invalid_string() {
        let result: Result<TaskDefinition, _> =
            serde_json::from_value(task_json(json!("check_exists,append_data")));
        assert!(result.is_err());
    }

    #[test]
    fn test_builder() {
        let task = TaskDefinition::new("t1", "csv", "postgres", "people")
            .with_source_query("people.csv")
            .with_strategies(["create_table", "append_data"]);
        assert_eq!(task.name, "t1");
        assert_eq!(task.source_query.as_deref(), Some("people.csv"));
        assert_eq!(task.loading_strategies.names(), vec!["create_table", "append_data"]);
    }
}
