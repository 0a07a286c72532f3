//! Embedded DuckDB database files

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;
use duckdb::types::{TimeUnit, Value as DuckValue};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::convert::{date_text, float_value, parse_timestamp, timestamp_text, value_as_text};
use super::error::{ConnectorError, ConnectorResult};
use super::settings::parse_settings;
use super::{
    ConnectionHandle, Connector, ConnectorKind, ExtractRequest, QueryResult, TestConnectionResult,
    blocking, native_sql, returns_rows,
};
use crate::dialect::DialectKind;
use crate::inference::is_timestamp;
use crate::models::{ConnectionConfig, Row};

/// Adapter for DuckDB files (or `:memory:`)
#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDbConnector;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DuckDbSettings {
    #[serde(alias = "file_path", alias = "database", alias = "path")]
    file_path: String,
}

impl DuckDbConnector {
    fn open(config: &ConnectionConfig) -> ConnectorResult<duckdb::Connection> {
        let settings: DuckDbSettings = parse_settings(config)?;
        let conn = if settings.file_path == ":memory:" {
            duckdb::Connection::open_in_memory()
        } else {
            duckdb::Connection::open(&settings.file_path)
        };
        conn.map_err(|e| ConnectorError::Connection(e.to_string()))
    }
}

fn to_duck(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => DuckValue::BigInt(i),
            None => DuckValue::Double(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) if is_timestamp(s) => match parse_timestamp(s) {
            Some(t) => DuckValue::Timestamp(TimeUnit::Microsecond, t.and_utc().timestamp_micros()),
            None => DuckValue::Text(s.clone()),
        },
        Value::String(s) => DuckValue::Text(s.clone()),
        other => DuckValue::Text(value_as_text(other).unwrap_or_default()),
    }
}

fn to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(n) => Value::from(n),
        DuckValue::SmallInt(n) => Value::from(n),
        DuckValue::Int(n) => Value::from(n),
        DuckValue::BigInt(n) => Value::from(n),
        DuckValue::HugeInt(n) => i64::try_from(n)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(n.to_string())),
        DuckValue::UTinyInt(n) => Value::from(n),
        DuckValue::USmallInt(n) => Value::from(n),
        DuckValue::UInt(n) => Value::from(n),
        DuckValue::UBigInt(n) => Value::from(n),
        DuckValue::Float(f) => float_value(f64::from(f)),
        DuckValue::Double(f) => float_value(f),
        DuckValue::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map(float_value)
            .unwrap_or(Value::Null),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Blob(b) => Value::String(String::from_utf8_lossy(&b).into_owned()),
        DuckValue::Timestamp(unit, v) => {
            let micros = match unit {
                TimeUnit::Second => v.saturating_mul(1_000_000),
                TimeUnit::Millisecond => v.saturating_mul(1_000),
                TimeUnit::Microsecond => v,
                TimeUnit::Nanosecond => v / 1_000,
            };
            DateTime::from_timestamp_micros(micros)
                .map_or(Value::Null, |t| Value::String(timestamp_text(&t.naive_utc())))
        }
        DuckValue::Date32(days) => DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map_or(Value::Null, |t| Value::String(date_text(&t.date_naive()))),
        other => Value::String(format!("{:?}", other)),
    }
}

fn run(conn: &duckdb::Connection, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
    let rewritten = native_sql(DialectKind::DuckDb, sql);
    let bound: Vec<DuckValue> = rewritten
        .bind(params)
        .map_err(ConnectorError::Bind)?
        .into_iter()
        .map(to_duck)
        .collect();

    let mut stmt = conn.prepare(&rewritten.sql)?;
    if !returns_rows(sql) {
        let affected = stmt.execute(duckdb::params_from_iter(bound.iter()))?;
        return Ok(QueryResult::affected(affected as u64));
    }

    let mut rows = stmt.query(duckdb::params_from_iter(bound.iter()))?;
    let column_count = rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
    let column_names: Vec<String> = (0..column_count)
        .map(|i| {
            rows.as_ref()
                .and_then(|r| r.column_name(i).ok())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("col{}", i))
        })
        .collect();

    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        let mut obj = Row::new();
        for (i, name) in column_names.iter().enumerate() {
            let value: DuckValue = row.get(i)?;
            obj.insert(name.clone(), to_json(value));
        }
        results.push(obj);
    }
    Ok(QueryResult::with_rows(results))
}

#[async_trait]
impl Connector for DuckDbConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::DuckDb
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> TestConnectionResult {
        let config = config.clone();
        let attempt = blocking(move || {
            let conn = Self::open(&config)?;
            let version: String = conn.query_row("SELECT version()", [], |row| row.get(0))?;
            Ok(version)
        })
        .await;

        match attempt {
            Ok(version) => {
                TestConnectionResult::ok("Opened duckdb database").with_detail("version", version)
            }
            Err(e) => TestConnectionResult::failed("Could not open database", e),
        }
    }

    async fn extract_data(
        &self,
        config: &ConnectionConfig,
        request: &ExtractRequest,
    ) -> ConnectorResult<Vec<Row>> {
        let sql = request.require_query()?.to_string();
        let config = config.clone();
        let rows = blocking(move || {
            let conn = Self::open(&config)?;
            run(&conn, &sql, &[]).map(|r| r.rows)
        })
        .await?;
        debug!(connector = "duckdb", rows = rows.len(), "Extracted rows");
        Ok(rows)
    }

    async fn get_connection(
        &self,
        config: &ConnectionConfig,
    ) -> ConnectorResult<Box<dyn ConnectionHandle>> {
        let config = config.clone();
        let conn = blocking(move || Self::open(&config)).await?;
        info!(connector = "duckdb", "Opened connection");
        Ok(Box::new(DuckDbHandle {
            conn: Arc::new(Mutex::new(Some(conn))),
        }))
    }
}

struct DuckDbHandle {
    conn: Arc<Mutex<Option<duckdb::Connection>>>,
}

fn poisoned<T>(_: T) -> ConnectorError {
    ConnectorError::Connection("connection lock poisoned".to_string())
}

#[async_trait]
impl ConnectionHandle for DuckDbHandle {
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
                conn.close().map_err(|(_, e)| ConnectorError::from(e))?;
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_in_memory() {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        run(&conn, "CREATE TABLE t (id INTEGER, name VARCHAR, seen TIMESTAMP)", &[]).unwrap();
        let inserted = run(
            &conn,
            "INSERT INTO t (id, name, seen) VALUES ($1, $2, $3)",
            &[json!(1), json!("a"), json!("2024-01-01T10:00:00Z")],
        )
        .unwrap();
        assert_eq!(inserted.rows_affected, 1);

        let result = run(&conn, "SELECT id, name, seen FROM t WHERE id = $1", &[json!(1)]).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["id"], json!(1));
        assert_eq!(result.rows[0]["name"], json!("a"));
        assert_eq!(result.rows[0]["seen"], json!("2024-01-01T10:00:00"));
    }

    #[test]
    fn test_missing_parameter_is_bind_error() {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        let err = run(&conn, "SELECT $2", &[json!(1)]).unwrap_err();
        assert!(matches!(err, ConnectorError::Bind(2)));
    }
}
