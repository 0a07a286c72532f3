//! Shared mocks for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use data_transfer_sdk::connectors::{
    ConnectionHandle, Connector, ConnectorError, ConnectorKind, ConnectorResult, ExtractRequest,
    QueryResult, TestConnectionResult,
};
use data_transfer_sdk::models::{ConnectionConfig, Row};
use serde_json::{Value, json};

type FailWhen = Box<dyn Fn(&str, &[Value]) -> bool + Send + Sync>;

/// Target connection that records statements and answers catalog queries
pub struct MockConnection {
    pub statements: Mutex<Vec<(String, Vec<Value>)>>,
    table_exists: AtomicBool,
    columns: Mutex<Vec<String>>,
    fail_when: Option<FailWhen>,
    pub exists_queries: AtomicUsize,
    pub closed: AtomicBool,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            table_exists: AtomicBool::new(false),
            columns: Mutex::new(Vec::new()),
            fail_when: None,
            exists_queries: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Pretend the target table already exists with `columns`
    pub fn with_existing_table(self, columns: &[&str]) -> Self {
        self.table_exists.store(true, Ordering::SeqCst);
        *self.columns.lock().unwrap() = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Fail every statement matching `predicate`
    pub fn failing_when(
        mut self,
        predicate: impl Fn(&str, &[Value]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    /// Statements other than catalog lookups, in order
    pub fn executed(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .map(|(sql, _)| sql.clone())
            .filter(|sql| !sql.contains("information_schema"))
            .collect()
    }

    pub fn executed_starting_with(&self, prefix: &str) -> Vec<String> {
        self.executed()
            .into_iter()
            .filter(|sql| sql.starts_with(prefix))
            .collect()
    }

    pub fn exists_query_count(&self) -> usize {
        self.exists_queries.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionHandle for MockConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));

        if let Some(fail) = &self.fail_when {
            if fail(sql, params) {
                return Err(ConnectorError::Query("constraint violation".to_string()));
            }
        }

        if sql.contains("information_schema.tables") {
            self.exists_queries.fetch_add(1, Ordering::SeqCst);
            let count = u64::from(self.table_exists.load(Ordering::SeqCst));
            return Ok(QueryResult::with_rows(vec![row(json!({"table_count": count}))]));
        }
        if sql.contains("information_schema.columns") {
            let rows = self
                .columns
                .lock()
                .unwrap()
                .iter()
                .map(|c| row(json!({"column_name": c})))
                .collect();
            return Ok(QueryResult::with_rows(rows));
        }
        Ok(QueryResult::affected(1))
    }

    async fn close(&self) -> ConnectorResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Handle sharing a [`MockConnection`] with the test
pub struct SharedConnection(pub Arc<MockConnection>);

#[async_trait]
impl ConnectionHandle for SharedConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
        self.0.query(sql, params).await
    }

    async fn close(&self) -> ConnectorResult<()> {
        self.0.close().await
    }
}

/// Connector serving canned rows and handing out one shared connection
pub struct MockConnector {
    kind: ConnectorKind,
    rows: Vec<Row>,
    conn: Arc<MockConnection>,
    extract_error: Option<String>,
}

impl MockConnector {
    pub fn source(kind: ConnectorKind, rows: Vec<Row>) -> Self {
        Self {
            kind,
            rows,
            conn: Arc::new(MockConnection::new()),
            extract_error: None,
        }
    }

    pub fn target(kind: ConnectorKind, conn: Arc<MockConnection>) -> Self {
        Self {
            kind,
            rows: Vec::new(),
            conn,
            extract_error: None,
        }
    }

    pub fn failing_extract(mut self, message: &str) -> Self {
        self.extract_error = Some(message.to_string());
        self
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    async fn test_connection(&self, _config: &ConnectionConfig) -> TestConnectionResult {
        TestConnectionResult::ok("mock")
    }

    async fn extract_data(
        &self,
        _config: &ConnectionConfig,
        _request: &ExtractRequest,
    ) -> ConnectorResult<Vec<Row>> {
        match &self.extract_error {
            Some(message) => Err(ConnectorError::Connection(message.clone())),
            None => Ok(self.rows.clone()),
        }
    }

    async fn get_connection(
        &self,
        _config: &ConnectionConfig,
    ) -> ConnectorResult<Box<dyn ConnectionHandle>> {
        Ok(Box::new(SharedConnection(Arc::clone(&self.conn))))
    }
}

/// Object literal to row
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub fn rows(values: Vec<Value>) -> Vec<Row> {
    values.into_iter().map(row).collect()
}
