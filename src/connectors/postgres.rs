//! Postgres-wire engines: PostgreSQL, CockroachDB and Vertica

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::{Config as PgConfig, NoTls};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::convert::{
    date_text, float_value, parse_date, parse_timestamp, timestamp_text, value_as_bool,
    value_as_f64, value_as_i64, value_as_text,
};
use super::error::{ConnectorError, ConnectorResult};
use super::settings::{SqlSettings, parse_settings};
use super::{
    CONNECT_TIMEOUT, ConnectionHandle, Connector, ConnectorKind, ExtractRequest, QueryResult,
    TestConnectionResult, native_sql, returns_rows, with_timeout,
};
use crate::dialect::DialectKind;
use crate::models::{ConnectionConfig, Row};

type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// Adapter for engines speaking the Postgres wire protocol
#[derive(Debug, Clone, Copy)]
pub struct PostgresConnector {
    kind: ConnectorKind,
}

impl PostgresConnector {
    /// Adapter serving `kind` (Postgres, CockroachDB or Vertica)
    pub fn new(kind: ConnectorKind) -> Self {
        Self { kind }
    }

    fn pg_config(&self, config: &ConnectionConfig) -> ConnectorResult<PgConfig> {
        let settings: SqlSettings = parse_settings(config)?;
        let mut pg = PgConfig::new();
        pg.host(settings.host()?);
        pg.port(settings.port_or(self.kind.default_port().unwrap_or(5432)));
        if let Some(database) = settings.database.as_deref() {
            pg.dbname(database);
        }
        if let Some(user) = settings.username.as_deref() {
            pg.user(user);
        }
        if let Some(password) = settings.password.as_deref() {
            pg.password(password);
        }
        pg.connect_timeout(CONNECT_TIMEOUT);
        pg.application_name(env!("CARGO_PKG_NAME"));
        Ok(pg)
    }

    async fn connect(&self, pg: &PgConfig) -> ConnectorResult<tokio_postgres::Client> {
        let (client, connection) = with_timeout(async {
            pg.connect(NoTls)
                .await
                .map_err(|e| ConnectorError::Connection(e.to_string()))
        })
        .await?;

        let kind = self.kind;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(connector = %kind, error = %e, "Connection task ended with error");
            }
        });
        Ok(client)
    }
}

impl Default for PostgresConnector {
    fn default() -> Self {
        Self::new(ConnectorKind::Postgres)
    }
}

/// Failure result carrying the server's SQLSTATE and hint when present
fn failure(err: &tokio_postgres::Error) -> TestConnectionResult {
    let mut result = TestConnectionResult::failed("Connection failed", err);
    if let Some(source) = std::error::Error::source(err) {
        result = result.with_detail("cause", source.to_string());
    }
    if let Some(db) = err.as_db_error() {
        result = result
            .with_detail("code", db.code().code())
            .with_detail("severity", db.severity());
        if let Some(hint) = db.hint() {
            result = result.with_detail("hint", hint);
        }
    }
    result
}

#[async_trait]
impl Connector for PostgresConnector {
    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> TestConnectionResult {
        let pg = match self.pg_config(config) {
            Ok(pg) => pg,
            Err(e) => return TestConnectionResult::failed("Invalid connection settings", e),
        };

        let attempt = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let (client, connection) = pg.connect(NoTls).await?;
            tokio::spawn(connection);
            let row = client.query_one("SELECT version()", &[]).await?;
            Ok::<String, tokio_postgres::Error>(row.try_get(0)?)
        })
        .await;

        match attempt {
            Ok(Ok(version)) => TestConnectionResult::ok(format!("Connected to {}", self.kind))
                .with_detail("version", version),
            Ok(Err(e)) => failure(&e),
            Err(_) => TestConnectionResult::timed_out(),
        }
    }

    async fn extract_data(
        &self,
        config: &ConnectionConfig,
        request: &ExtractRequest,
    ) -> ConnectorResult<Vec<Row>> {
        let sql = request.require_query()?;
        let pg = self.pg_config(config)?;
        let client = self.connect(&pg).await?;

        let rows = client.query(sql, &[]).await?;
        debug!(connector = %self.kind, rows = rows.len(), "Extracted rows");
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn get_connection(
        &self,
        config: &ConnectionConfig,
    ) -> ConnectorResult<Box<dyn ConnectionHandle>> {
        let pg = self.pg_config(config)?;
        let manager = Manager::from_config(
            pg,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(1)
            .build()
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;

        // Fail here rather than on the first statement
        with_timeout(async {
            let client = pool.get().await?;
            client.simple_query("SELECT 1").await?;
            Ok::<(), ConnectorError>(())
        })
        .await?;

        info!(connector = %self.kind, "Opened connection");
        Ok(Box::new(PostgresHandle {
            pool,
            dialect: self.kind.dialect().unwrap_or(DialectKind::Postgres),
        }))
    }
}

struct PostgresHandle {
    pool: Pool,
    dialect: DialectKind,
}

#[async_trait]
impl ConnectionHandle for PostgresHandle {
    async fn query(&self, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
        let rewritten = native_sql(self.dialect, sql);
        let bound = rewritten.bind(params).map_err(ConnectorError::Bind)?;
        let client = self.pool.get().await?;
        let statement = client.prepare_cached(&rewritten.sql).await?;

        let types = statement.params();
        if bound.len() < types.len() {
            return Err(ConnectorError::Bind(bound.len() + 1));
        }
        let boxed = types
            .iter()
            .zip(bound)
            .map(|(ty, value)| bind_param(value, ty))
            .collect::<ConnectorResult<Vec<BoxedParam>>>()?;
        let refs: Vec<&(dyn ToSql + Sync)> = boxed
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        if returns_rows(sql) {
            let rows = client.query(&statement, &refs).await?;
            Ok(QueryResult::with_rows(rows.iter().map(row_to_json).collect()))
        } else {
            let affected = client.execute(&statement, &refs).await?;
            Ok(QueryResult::affected(affected))
        }
    }

    async fn close(&self) -> ConnectorResult<()> {
        self.pool.close();
        Ok(())
    }
}

/// Box a typed parameter; null binds as a typed `NULL`
fn typed<T, F>(value: &Value, ty: &Type, convert: F) -> ConnectorResult<BoxedParam>
where
    T: ToSql + Sync + Send + 'static,
    F: FnOnce(&Value) -> Option<T>,
{
    if value.is_null() {
        return Ok(Box::new(None::<T>));
    }
    convert(value)
        .map(|v| Box::new(Some(v)) as BoxedParam)
        .ok_or_else(|| ConnectorError::Query(format!("cannot bind {value} as {ty}")))
}

fn decimal_of(value: &Value) -> Option<Decimal> {
    let text = value_as_text(value)?;
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Convert a JSON value to the parameter type the server inferred
fn bind_param(value: &Value, ty: &Type) -> ConnectorResult<BoxedParam> {
    match *ty {
        Type::BOOL => typed(value, ty, value_as_bool),
        Type::INT2 => typed(value, ty, |v| {
            value_as_i64(v).and_then(|i| i16::try_from(i).ok())
        }),
        Type::INT4 => typed(value, ty, |v| {
            value_as_i64(v).and_then(|i| i32::try_from(i).ok())
        }),
        Type::INT8 => typed(value, ty, value_as_i64),
        Type::FLOAT4 => typed(value, ty, |v| value_as_f64(v).map(|f| f as f32)),
        Type::FLOAT8 => typed(value, ty, value_as_f64),
        Type::NUMERIC => typed(value, ty, decimal_of),
        Type::JSON | Type::JSONB => typed(value, ty, |v| Some(v.clone())),
        Type::TIMESTAMP => typed(value, ty, |v| v.as_str().and_then(parse_timestamp)),
        Type::TIMESTAMPTZ => typed(value, ty, |v| {
            v.as_str().and_then(parse_timestamp).map(|t| t.and_utc())
        }),
        Type::DATE => typed(value, ty, |v| v.as_str().and_then(parse_date)),
        Type::UUID => typed(value, ty, |v| {
            v.as_str().and_then(|s| Uuid::parse_str(s).ok())
        }),
        _ => typed(value, ty, value_as_text),
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a tokio_postgres::Row, idx: usize) -> Option<T> {
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

fn decimal_value(d: Decimal) -> Value {
    if d.fract().is_zero() {
        if let Some(i) = d.to_i64() {
            return Value::from(i);
        }
    }
    d.to_f64().map_or(Value::Null, float_value)
}

fn column_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Value {
    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx).map(Value::Bool),
        Type::INT2 => get::<i16>(row, idx).map(Value::from),
        Type::INT4 => get::<i32>(row, idx).map(Value::from),
        Type::INT8 => get::<i64>(row, idx).map(Value::from),
        Type::OID => get::<u32>(row, idx).map(Value::from),
        Type::FLOAT4 => get::<f32>(row, idx).map(|f| float_value(f64::from(f))),
        Type::FLOAT8 => get::<f64>(row, idx).map(float_value),
        Type::NUMERIC => get::<Decimal>(row, idx).map(decimal_value),
        Type::DATE => get::<NaiveDate>(row, idx).map(|d| Value::String(date_text(&d))),
        Type::TIMESTAMP => {
            get::<NaiveDateTime>(row, idx).map(|t| Value::String(timestamp_text(&t)))
        }
        Type::TIMESTAMPTZ => {
            get::<DateTime<Utc>>(row, idx).map(|t| Value::String(t.to_rfc3339()))
        }
        Type::UUID => get::<Uuid>(row, idx).map(|u| Value::String(u.to_string())),
        Type::JSON | Type::JSONB => get::<Value>(row, idx),
        _ => get::<String>(row, idx).map(Value::String),
    };
    value.unwrap_or(Value::Null)
}

fn row_to_json(row: &tokio_postgres::Row) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            (
                column.name().to_string(),
                column_value(row, idx, column.type_()),
            )
        })
        .collect()
}
