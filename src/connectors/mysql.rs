//! MySQL and MariaDB

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Timelike};
use mysql_async::consts::ColumnType;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::convert::{
    date_text, float_value, parse_timestamp, timestamp_text, value_as_text,
};
use super::error::{ConnectorError, ConnectorResult};
use super::settings::{SqlSettings, parse_settings};
use super::{
    CONNECT_TIMEOUT, ConnectionHandle, Connector, ConnectorKind, ExtractRequest, QueryResult,
    TestConnectionResult, native_sql, returns_rows, with_timeout,
};
use crate::dialect::DialectKind;
use crate::inference::is_timestamp;
use crate::models::{ConnectionConfig, Row};

/// Adapter for MySQL-protocol servers
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

impl MySqlConnector {
    fn opts(config: &ConnectionConfig) -> ConnectorResult<OptsBuilder> {
        let settings: SqlSettings = parse_settings(config)?;
        let default_port = ConnectorKind::MySql.default_port().unwrap_or(3306);
        Ok(OptsBuilder::default()
            .ip_or_hostname(settings.host()?.to_string())
            .tcp_port(settings.port_or(default_port))
            .user(settings.username.clone())
            .pass(settings.password.clone())
            .db_name(settings.database.clone()))
    }

    async fn connect(config: &ConnectionConfig) -> ConnectorResult<Conn> {
        let opts = Self::opts(config)?;
        with_timeout(async { Conn::new(opts).await.map_err(ConnectorError::from) }).await
    }
}

/// JSON value to a MySQL parameter; ISO timestamps bind as DATETIME
fn to_mysql(value: &Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(b) => mysql_async::Value::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                mysql_async::Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                mysql_async::Value::UInt(u)
            } else {
                mysql_async::Value::Double(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) if is_timestamp(s) => match parse_timestamp(s) {
            Some(t) => mysql_async::Value::Date(
                t.year() as u16,
                t.month() as u8,
                t.day() as u8,
                t.hour() as u8,
                t.minute() as u8,
                t.second() as u8,
                t.nanosecond() / 1_000,
            ),
            None => mysql_async::Value::from(s.clone()),
        },
        Value::String(s) => mysql_async::Value::from(s.clone()),
        other => mysql_async::Value::from(value_as_text(other).unwrap_or_default()),
    }
}

fn bytes_value(bytes: Vec<u8>, column_type: ColumnType) -> Value {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => return Value::String(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    };
    match column_type {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(text)),
        ColumnType::MYSQL_TYPE_FLOAT
        | ColumnType::MYSQL_TYPE_DOUBLE
        | ColumnType::MYSQL_TYPE_DECIMAL
        | ColumnType::MYSQL_TYPE_NEWDECIMAL => match text.parse::<i64>() {
            Ok(i) => Value::from(i),
            Err(_) => text
                .parse::<f64>()
                .map(float_value)
                .unwrap_or(Value::String(text)),
        },
        ColumnType::MYSQL_TYPE_JSON => {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_TIMESTAMP => {
            parse_timestamp(&text)
                .map(|t| Value::String(timestamp_text(&t)))
                .unwrap_or(Value::String(text))
        }
        _ => Value::String(text),
    }
}

/// MySQL value to JSON, typed by the column definition
fn to_json(value: mysql_async::Value, column_type: ColumnType) -> Value {
    match value {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) => bytes_value(bytes, column_type),
        mysql_async::Value::Int(i) => Value::from(i),
        mysql_async::Value::UInt(u) => Value::from(u),
        mysql_async::Value::Float(f) => float_value(f64::from(f)),
        mysql_async::Value::Double(d) => float_value(d),
        mysql_async::Value::Date(y, mo, d, h, mi, s, us) => {
            let Some(date) = NaiveDate::from_ymd_opt(i32::from(y), u32::from(mo), u32::from(d))
            else {
                return Value::Null;
            };
            if matches!(
                column_type,
                ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE
            ) {
                return Value::String(date_text(&date));
            }
            date.and_hms_micro_opt(u32::from(h), u32::from(mi), u32::from(s), us)
                .map_or(Value::Null, |t| Value::String(timestamp_text(&t)))
        }
        mysql_async::Value::Time(negative, days, h, mi, s, _) => {
            let hours = days * 24 + u32::from(h);
            let sign = if negative { "-" } else { "" };
            Value::String(format!("{sign}{hours:02}:{mi:02}:{s:02}"))
        }
    }
}

fn row_to_json(row: &mysql_async::Row) -> Row {
    row.columns_ref()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let value = row.as_ref(i).cloned().unwrap_or(mysql_async::Value::NULL);
            (
                column.name_str().into_owned(),
                to_json(value, column.column_type()),
            )
        })
        .collect()
}

async fn run(conn: &mut Conn, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
    let rewritten = native_sql(DialectKind::MySql, sql);
    let bound: Vec<mysql_async::Value> = rewritten
        .bind(params)
        .map_err(ConnectorError::Bind)?
        .into_iter()
        .map(to_mysql)
        .collect();

    match (returns_rows(sql), bound.is_empty()) {
        (true, true) => {
            let rows: Vec<mysql_async::Row> = conn.query(rewritten.sql.as_str()).await?;
            Ok(QueryResult::with_rows(rows.iter().map(row_to_json).collect()))
        }
        (true, false) => {
            let rows: Vec<mysql_async::Row> = conn.exec(rewritten.sql.as_str(), bound).await?;
            Ok(QueryResult::with_rows(rows.iter().map(row_to_json).collect()))
        }
        (false, true) => {
            conn.query_drop(rewritten.sql.as_str()).await?;
            Ok(QueryResult::affected(conn.affected_rows()))
        }
        (false, false) => {
            conn.exec_drop(rewritten.sql.as_str(), bound).await?;
            Ok(QueryResult::affected(conn.affected_rows()))
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::MySql
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> TestConnectionResult {
        let opts = match Self::opts(config) {
            Ok(opts) => opts,
            Err(e) => return TestConnectionResult::failed("Invalid connection settings", e),
        };

        let attempt = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let mut conn = Conn::new(opts).await?;
            let version: Option<String> = conn.query_first("SELECT VERSION()").await?;
            conn.disconnect().await?;
            Ok::<_, mysql_async::Error>(version.unwrap_or_default())
        })
        .await;

        match attempt {
            Ok(Ok(version)) => {
                TestConnectionResult::ok("Connected to mysql").with_detail("version", version)
            }
            Ok(Err(mysql_async::Error::Server(e))) => {
                TestConnectionResult::failed("Connection failed", &e.message)
                    .with_detail("code", e.code)
                    .with_detail("state", e.state.clone())
            }
            Ok(Err(e)) => TestConnectionResult::failed("Connection failed", e),
            Err(_) => TestConnectionResult::timed_out(),
        }
    }

    async fn extract_data(
        &self,
        config: &ConnectionConfig,
        request: &ExtractRequest,
    ) -> ConnectorResult<Vec<Row>> {
        let sql = request.require_query()?;
        let mut conn = Self::connect(config).await?;
        let result = run(&mut conn, sql, &[]).await;
        conn.disconnect().await?;
        let rows = result?.rows;
        debug!(connector = "mysql", rows = rows.len(), "Extracted rows");
        Ok(rows)
    }

    async fn get_connection(
        &self,
        config: &ConnectionConfig,
    ) -> ConnectorResult<Box<dyn ConnectionHandle>> {
        let conn = Self::connect(config).await?;
        info!(connector = "mysql", "Opened connection");
        Ok(Box::new(MySqlHandle {
            conn: Mutex::new(Some(conn)),
        }))
    }
}

struct MySqlHandle {
    conn: Mutex<Option<Conn>>,
}

#[async_trait]
impl ConnectionHandle for MySqlHandle {
    async fn query(&self, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| ConnectorError::Connection("connection already closed".to_string()))?;
        run(conn, sql, params).await
    }

    async fn close(&self) -> ConnectorResult<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.disconnect().await?;
        }
        Ok(())
    }
}
