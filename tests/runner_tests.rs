//! Task runner tests with mock source and target connectors

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{MockConnection, MockConnector, rows};
use data_transfer_sdk::connectors::{ConnectorKind, ConnectorRegistry};
use data_transfer_sdk::models::{ExecutionStatus, ExecutionUpdate, LogLevel, Row, TaskDefinition};
use data_transfer_sdk::runner::{
    MemoryExecutionLog, MemoryTaskStore, RunError, StaticConnectorGate, StoreError, TaskRunner,
    TaskStore,
};
use serde_json::json;
use uuid::Uuid;

fn people(count: usize) -> Vec<Row> {
    rows(
        (1..=count)
            .map(|i| json!({"id": i, "name": format!("person {i}")}))
            .collect(),
    )
}

struct Harness {
    store: Arc<MemoryTaskStore>,
    log: Arc<MemoryExecutionLog>,
    conn: Arc<MockConnection>,
    runner: TaskRunner,
}

fn harness(task: TaskDefinition, source_rows: Vec<Row>, conn: MockConnection) -> Harness {
    let store = Arc::new(MemoryTaskStore::new().with_task(task));
    let log = Arc::new(MemoryExecutionLog::new());
    let conn = Arc::new(conn);
    let registry = ConnectorRegistry::new()
        .with(MockConnector::source(ConnectorKind::Csv, source_rows))
        .with(MockConnector::target(ConnectorKind::Postgres, Arc::clone(&conn)));
    let runner = TaskRunner::new(store.clone(), log.clone(), registry);
    Harness {
        store,
        log,
        conn,
        runner,
    }
}

fn csv_to_postgres() -> TaskDefinition {
    TaskDefinition::new("load_people", "csv", "postgres", "people").with_source_query("people.csv")
}

mod success_tests {
    use super::*;

    #[tokio::test]
    async fn test_default_strategies_with_one_bad_row() {
        let conn = MockConnection::new().failing_when(|sql, params| {
            sql.starts_with("INSERT") && params.first() == Some(&json!(5))
        });
        let h = harness(csv_to_postgres(), people(10), conn);
        let execution_id = Uuid::new_v4();

        let report = h.runner.run("load_people", execution_id).await.unwrap();

        assert_eq!(report.rows_extracted, 10);
        assert_eq!(report.records_processed, 9);
        assert_eq!(report.outcomes.len(), 3);

        let history = h.store.execution_history(execution_id);
        let statuses: Vec<ExecutionStatus> = history.iter().map(|u| u.status).collect();
        assert_eq!(statuses, vec![ExecutionStatus::Running, ExecutionStatus::Success]);
        assert_eq!(history[1].records_processed, Some(9));
        assert!(h.conn.is_closed());

        let messages: Vec<String> = h
            .log
            .entries_for(execution_id)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert!(messages.iter().any(|m| m.starts_with("Extracted 10 rows from csv")));
        assert_eq!(messages.last().map(String::as_str), Some("Task completed"));
    }

    #[tokio::test]
    async fn test_records_fall_back_to_extracted_count() {
        let task = csv_to_postgres().with_strategies(["check_exists", "create_table"]);
        let h = harness(task, people(3), MockConnection::new());
        let execution_id = Uuid::new_v4();

        let report = h.runner.run("load_people", execution_id).await.unwrap();

        assert_eq!(report.records_processed, 3);
        assert_eq!(h.store.latest(execution_id).unwrap().records_processed, Some(3));
    }

    #[tokio::test]
    async fn test_spawn_runs_in_background() {
        let h = harness(csv_to_postgres(), people(2), MockConnection::new());
        let runner = Arc::new(h.runner);
        let execution_id = Uuid::new_v4();

        let report = runner
            .spawn("load_people", execution_id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.records_processed, 2);
        assert_eq!(
            h.store.latest(execution_id).unwrap().status,
            ExecutionStatus::Success
        );
    }
}

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_strategy_failure_marks_failed_and_closes() {
        let conn = MockConnection::new().failing_when(|sql, _| sql.starts_with("CREATE TABLE"));
        let h = harness(csv_to_postgres(), people(2), conn);
        let execution_id = Uuid::new_v4();

        let err = h.runner.run("load_people", execution_id).await.unwrap_err();

        match &err {
            RunError::Pipeline(halted) => {
                assert_eq!(halted.strategy, "create_table");
                assert_eq!(halted.completed.len(), 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let latest = h.store.latest(execution_id).unwrap();
        assert_eq!(latest.status, ExecutionStatus::Failed);
        assert!(latest.error_message.unwrap().contains("create_table"));
        assert!(h.conn.is_closed());
    }

    #[tokio::test]
    async fn test_disabled_connector_fails_before_io() {
        let h = harness(csv_to_postgres(), people(2), MockConnection::new());
        let runner = h
            .runner
            .with_gate(Arc::new(StaticConnectorGate::only([ConnectorKind::Csv])));
        let execution_id = Uuid::new_v4();

        let err = runner.run("load_people", execution_id).await.unwrap_err();

        assert!(matches!(err, RunError::ConnectorDisabled(ConnectorKind::Postgres)));
        assert!(err.is_configuration());
        assert!(h.conn.statements.lock().unwrap().is_empty());
        assert_eq!(
            h.store.latest(execution_id).unwrap().status,
            ExecutionStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_unknown_strategy_rejected_before_io() {
        let task = csv_to_postgres().with_strategies(["check_exists", "drop_table_typo"]);
        let h = harness(task, people(2), MockConnection::new());

        let err = h.runner.run("load_people", Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, RunError::Strategy(_)));
        assert!(h.conn.statements.lock().unwrap().is_empty());
        assert!(!h.conn.is_closed());
    }

    #[tokio::test]
    async fn test_non_sql_target_is_config_error() {
        let task = TaskDefinition::new("to_csv", "csv", "csv", "people");
        let h = harness(task, people(1), MockConnection::new());

        let err = h.runner.run("to_csv", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RunError::Config(ref msg) if msg.contains("not a SQL engine")));
    }

    #[tokio::test]
    async fn test_unregistered_connector_is_rejected() {
        let task = TaskDefinition::new("from_sf", "salesforce", "postgres", "accounts");
        let h = harness(task, people(1), MockConnection::new());

        let err = h.runner.run("from_sf", Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_configuration(), "{err:?}");
    }

    #[tokio::test]
    async fn test_extract_failure_recorded() {
        let store = Arc::new(MemoryTaskStore::new().with_task(csv_to_postgres()));
        let conn = Arc::new(MockConnection::new());
        let registry = ConnectorRegistry::new()
            .with(MockConnector::source(ConnectorKind::Csv, Vec::new()).failing_extract("no such file"))
            .with(MockConnector::target(ConnectorKind::Postgres, Arc::clone(&conn)));
        let runner = TaskRunner::new(store.clone(), Arc::new(MemoryExecutionLog::new()), registry);
        let execution_id = Uuid::new_v4();

        let err = runner.run("load_people", execution_id).await.unwrap_err();

        assert!(matches!(err, RunError::Connector(_)));
        let latest = store.latest(execution_id).unwrap();
        assert!(latest.error_message.unwrap().contains("no such file"));
        assert!(conn.statements.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_task() {
        let h = harness(csv_to_postgres(), Vec::new(), MockConnection::new());
        let execution_id = Uuid::new_v4();

        let err = h.runner.run("nope", execution_id).await.unwrap_err();

        assert!(matches!(err, RunError::Store(StoreError::TaskNotFound(_))));
        assert_eq!(
            h.store.latest(execution_id).unwrap().status,
            ExecutionStatus::Failed
        );
    }
}

mod store_failure_tests {
    use super::*;

    /// Memory store that refuses one kind of status update
    struct RejectingStore {
        inner: MemoryTaskStore,
        rejected: ExecutionStatus,
    }

    #[async_trait]
    impl TaskStore for RejectingStore {
        async fn load_task(&self, task_id: &str) -> Result<TaskDefinition, StoreError> {
            self.inner.load_task(task_id).await
        }

        async fn update_execution(
            &self,
            execution_id: Uuid,
            update: ExecutionUpdate,
        ) -> Result<(), StoreError> {
            if update.status == self.rejected {
                return Err(StoreError::Backend(format!("cannot write {}", update.status)));
            }
            self.inner.update_execution(execution_id, update).await
        }
    }

    fn runner_with(
        rejected: ExecutionStatus,
    ) -> (Arc<RejectingStore>, Arc<MemoryExecutionLog>, TaskRunner) {
        let store = Arc::new(RejectingStore {
            inner: MemoryTaskStore::new().with_task(csv_to_postgres()),
            rejected,
        });
        let log = Arc::new(MemoryExecutionLog::new());
        let registry = ConnectorRegistry::new()
            .with(MockConnector::source(ConnectorKind::Csv, people(2)))
            .with(MockConnector::target(
                ConnectorKind::Postgres,
                Arc::new(MockConnection::new()),
            ));
        let runner = TaskRunner::new(store.clone(), log.clone(), registry);
        (store, log, runner)
    }

    #[tokio::test]
    async fn test_rejected_success_update_marks_failed() {
        let (store, log, runner) = runner_with(ExecutionStatus::Success);
        let execution_id = Uuid::new_v4();

        let err = runner.run("load_people", execution_id).await.unwrap_err();

        assert!(matches!(err, RunError::Store(StoreError::Backend(_))));
        let latest = store.inner.latest(execution_id).unwrap();
        assert_eq!(latest.status, ExecutionStatus::Failed);
        assert!(latest.error_message.unwrap().contains("cannot write success"));
        assert!(
            log.entries_for(execution_id)
                .iter()
                .all(|e| e.message != "Task completed")
        );
    }

    #[tokio::test]
    async fn test_rejected_running_update_is_logged() {
        let (store, log, runner) = runner_with(ExecutionStatus::Running);
        let execution_id = Uuid::new_v4();

        let err = runner.run("load_people", execution_id).await.unwrap_err();

        assert!(matches!(err, RunError::Store(_)));
        assert!(store.inner.latest(execution_id).is_none());
        let entries = log.entries_for(execution_id);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Error);
        assert!(entries[0].message.contains("cannot write running"));
    }
}
