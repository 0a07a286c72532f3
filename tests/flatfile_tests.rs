//! File connectors reading from disk

mod common;

use std::io::Write;

use data_transfer_sdk::connectors::{Connector, ConnectorError, ExtractRequest, JsonConnector};
use data_transfer_sdk::models::ConnectionConfig;
use serde_json::json;
use tempfile::NamedTempFile;

fn write_temp(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn file_config(file: &NamedTempFile) -> ConnectionConfig {
    ConnectionConfig::new().with("file_path", file.path().to_string_lossy().to_string())
}

mod json_tests {
    use super::*;

    #[tokio::test]
    async fn test_extract_keyed_document() {
        let file = write_temp(
            ".json",
            r#"{"meta": {"v": 1}, "people": [{"id": 1, "name": "Ada"}, {"id": 2, "name": "Lin"}]}"#,
        );
        let request = ExtractRequest {
            query: None,
            worksheet: Some("people".to_string()),
        };

        let rows = JsonConnector
            .extract_data(&file_config(&file), &request)
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["name"], json!("Lin"));
    }

    #[tokio::test]
    async fn test_extract_json_lines() {
        let file = write_temp(".jsonl", "{\"a\": 1}\n\n{\"a\": 2}\n");
        let rows = JsonConnector
            .extract_data(&file_config(&file), &ExtractRequest::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let config = ConnectionConfig::new().with("file_path", "/nonexistent/people.json");

        let result = JsonConnector
            .extract_data(&config, &ExtractRequest::default())
            .await;
        assert!(matches!(result, Err(ConnectorError::Io(_))));

        let result = JsonConnector.test_connection(&config).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_cannot_be_a_target() {
        let result = JsonConnector.get_connection(&ConnectionConfig::new()).await;
        assert!(matches!(result, Err(ConnectorError::Unsupported(_))));
    }
}

#[cfg(feature = "flat-files")]
mod csv_tests {
    use super::*;
    use std::sync::Arc;

    use crate::common::{MockConnection, MockConnector};
    use data_transfer_sdk::connectors::{ConnectorKind, ConnectorRegistry, CsvConnector};
    use data_transfer_sdk::models::{ExecutionStatus, TaskDefinition};
    use data_transfer_sdk::runner::{MemoryExecutionLog, MemoryTaskStore, TaskRunner};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_extract_with_delimiter_and_coercion() {
        let file = write_temp(".csv", "id;name;active\n1;Ada;true\n2;Lin;false\n");
        let config = file_config(&file)
            .with("delimiter", ";")
            .with("coerce_types", true);

        let rows = CsvConnector
            .extract_data(&config, &ExtractRequest::default())
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], json!(1));
        assert_eq!(rows[1]["active"], json!(false));
    }

    #[tokio::test]
    async fn test_connection_reports_size() {
        let file = write_temp(".csv", "a\n1\n");
        let result = CsvConnector.test_connection(&file_config(&file)).await;
        assert!(result.success);
        assert_eq!(result.details["size"], json!(4));
    }

    #[tokio::test]
    async fn test_csv_into_sql_target() {
        let file = write_temp(".csv", "id,name\n1,Ada\n2,Lin\n3,Kay\n");
        let task = TaskDefinition::new("import", "csv", "mysql", "people")
            .with_source_config(file_config(&file));
        let store = Arc::new(MemoryTaskStore::new().with_task(task));
        let conn = Arc::new(MockConnection::new());
        let registry = ConnectorRegistry::new()
            .with(CsvConnector)
            .with(MockConnector::target(ConnectorKind::MySql, Arc::clone(&conn)));
        let runner = TaskRunner::new(store.clone(), Arc::new(MemoryExecutionLog::new()), registry);
        let execution_id = Uuid::new_v4();

        let report = runner.run("import", execution_id).await.unwrap();

        assert_eq!(report.records_processed, 3);
        assert_eq!(
            store.latest(execution_id).unwrap().status,
            ExecutionStatus::Success
        );
        let inserts = conn.executed_starting_with("INSERT INTO `people`");
        assert_eq!(inserts.len(), 3);
        let create = conn.executed_starting_with("CREATE TABLE");
        assert!(create[0].contains("`name` VARCHAR(255) NOT NULL"));
        assert!(!create[0].contains("AUTO_INCREMENT"));
    }
}
