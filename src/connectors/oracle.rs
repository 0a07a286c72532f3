//! Oracle via the blocking `oracle` client

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use oracle::sql_type::{OracleType, ToSql};
use oracle::{Connection, SqlValue};
use serde_json::Value;
use tracing::{debug, info};

use super::convert::{float_value, parse_timestamp, timestamp_text, value_as_text};
use super::error::{ConnectorError, ConnectorResult};
use super::settings::{SqlSettings, parse_settings};
use super::{
    CONNECT_TIMEOUT, ConnectionHandle, Connector, ConnectorKind, ExtractRequest, QueryResult,
    TestConnectionResult, blocking, native_sql, returns_rows, with_timeout,
};
use crate::dialect::DialectKind;
use crate::inference::is_timestamp;
use crate::models::{ConnectionConfig, Row};

/// Adapter for Oracle databases
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleConnector;

#[derive(Debug, Clone)]
struct Login {
    username: String,
    password: String,
    connect_string: String,
}

impl OracleConnector {
    fn login(config: &ConnectionConfig) -> ConnectorResult<Login> {
        let settings: SqlSettings = parse_settings(config)?;
        let service = settings
            .service_name
            .clone()
            .or_else(|| settings.database.clone())
            .ok_or_else(|| ConnectorError::Config("serviceName or database is required".to_string()))?;
        Ok(Login {
            username: settings.username().to_string(),
            password: settings.password().to_string(),
            connect_string: format!(
                "//{}:{}/{}",
                settings.host()?,
                settings.port_or(ConnectorKind::Oracle.default_port().unwrap_or(1521)),
                service
            ),
        })
    }

    async fn connect(login: Login) -> ConnectorResult<Connection> {
        blocking(move || {
            let mut conn =
                Connection::connect(&login.username, &login.password, &login.connect_string)
                    .map_err(|e| ConnectorError::Connection(e.to_string()))?;
            conn.set_autocommit(true);
            Ok(conn)
        })
        .await
    }
}

fn to_param(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Null => Box::new(None::<String>),
        Value::Bool(b) => Box::new(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Box::new(i),
            None => Box::new(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) if is_timestamp(s) => match parse_timestamp(s) {
            Some(t) => Box::new(t),
            None => Box::new(s.clone()),
        },
        Value::String(s) => Box::new(s.clone()),
        other => Box::new(value_as_text(other).unwrap_or_default()),
    }
}

fn column_json(value: &SqlValue, oracle_type: &OracleType) -> Value {
    if value.is_null().unwrap_or(true) {
        return Value::Null;
    }
    let converted = match oracle_type {
        OracleType::Number(_, scale) if *scale <= 0 => value
            .get::<i64>()
            .map(Value::from)
            .or_else(|_| value.get::<f64>().map(float_value)),
        OracleType::Number(..)
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble => value.get::<f64>().map(float_value),
        OracleType::Date | OracleType::Timestamp(_) => value
            .get::<NaiveDateTime>()
            .map(|t| Value::String(timestamp_text(&t))),
        OracleType::TimestampTZ(_) | OracleType::TimestampLTZ(_) => value
            .get::<DateTime<Utc>>()
            .map(|t| Value::String(t.to_rfc3339())),
        OracleType::Boolean => value.get::<bool>().map(Value::Bool),
        _ => value.get::<String>().map(Value::String),
    };
    converted.unwrap_or(Value::Null)
}

fn row_to_json(row: &oracle::Row) -> Row {
    row.column_info()
        .iter()
        .zip(row.sql_values())
        .map(|(info, value)| (info.name().to_string(), column_json(value, info.oracle_type())))
        .collect()
}

fn run(conn: &Connection, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
    let rewritten = native_sql(DialectKind::Oracle, sql);
    rewritten.bind(params).map_err(ConnectorError::Bind)?;
    let boxed: Vec<Box<dyn ToSql>> = params.iter().map(to_param).collect();
    let refs: Vec<&dyn ToSql> = boxed.iter().map(|p| p.as_ref()).collect();

    if returns_rows(sql) {
        let rows = conn
            .query(&rewritten.sql, &refs)?
            .map(|row| row.map(|r| row_to_json(&r)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryResult::with_rows(rows))
    } else {
        let statement = conn.execute(&rewritten.sql, &refs)?;
        Ok(QueryResult::affected(statement.row_count()?))
    }
}

#[async_trait]
impl Connector for OracleConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Oracle
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> TestConnectionResult {
        let login = match Self::login(config) {
            Ok(login) => login,
            Err(e) => return TestConnectionResult::failed("Invalid connection settings", e),
        };
        let connect_string = login.connect_string.clone();

        let attempt = tokio::time::timeout(
            CONNECT_TIMEOUT,
            blocking(move || {
                let conn =
                    Connection::connect(&login.username, &login.password, &login.connect_string)
                        .map_err(|e| ConnectorError::Connection(e.to_string()))?;
                let (version, banner) = conn.server_version()?;
                conn.close()?;
                Ok((version.to_string(), banner))
            }),
        )
        .await;

        match attempt {
            Ok(Ok((version, banner))) => TestConnectionResult::ok("Connected to oracle")
                .with_detail("version", version)
                .with_detail("banner", banner),
            Ok(Err(e)) => TestConnectionResult::failed("Connection failed", e)
                .with_detail("connectString", connect_string),
            Err(_) => TestConnectionResult::timed_out().with_detail("connectString", connect_string),
        }
    }

    async fn extract_data(
        &self,
        config: &ConnectionConfig,
        request: &ExtractRequest,
    ) -> ConnectorResult<Vec<Row>> {
        let sql = request.require_query()?.to_string();
        let conn = with_timeout(Self::connect(Self::login(config)?)).await?;
        let rows = blocking(move || {
            let result = run(&conn, &sql, &[]);
            conn.close()?;
            result.map(|r| r.rows)
        })
        .await?;
        debug!(connector = "oracle", rows = rows.len(), "Extracted rows");
        Ok(rows)
    }

    async fn get_connection(
        &self,
        config: &ConnectionConfig,
    ) -> ConnectorResult<Box<dyn ConnectionHandle>> {
        let conn = with_timeout(Self::connect(Self::login(config)?)).await?;
        info!(connector = "oracle", "Opened connection");
        Ok(Box::new(OracleHandle {
            conn: Arc::new(Mutex::new(Some(conn))),
        }))
    }
}

struct OracleHandle {
    conn: Arc<Mutex<Option<Connection>>>,
}

fn poisoned<T>(_: T) -> ConnectorError {
    ConnectorError::Connection("connection lock poisoned".to_string())
}

#[async_trait]
impl ConnectionHandle for OracleHandle {
    async fn query(&self, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let params = params.to_vec();
        blocking(move || {
            let guard = conn.lock().map_err(poisoned)?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| ConnectorError::Connection("connection already closed".to_string()))?;
            run(conn, &sql, &params)
        })
        .await
    }

    async fn close(&self) -> ConnectorResult<()> {
        let conn = Arc::clone(&self.conn);
        blocking(move || {
            if let Some(conn) = conn.lock().map_err(poisoned)?.take() {
                conn.close()?;
            }
            Ok(())
        })
        .await
    }
}
