//! Microsoft SQL Server over TDS

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use tiberius::numeric::Numeric;
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use super::convert::{date_text, float_value, parse_timestamp, timestamp_text, value_as_text};
use super::error::{ConnectorError, ConnectorResult};
use super::settings::{SqlSettings, parse_settings};
use super::{
    CONNECT_TIMEOUT, ConnectionHandle, Connector, ConnectorKind, ExtractRequest, QueryResult,
    TestConnectionResult, native_sql, returns_rows, with_timeout,
};
use crate::dialect::DialectKind;
use crate::inference::is_timestamp;
use crate::models::{ConnectionConfig, Row};

type TdsClient = Client<Compat<TcpStream>>;

/// Adapter for SQL Server and Azure SQL
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerConnector;

impl SqlServerConnector {
    fn tds_config(config: &ConnectionConfig) -> ConnectorResult<Config> {
        let settings: SqlSettings = parse_settings(config)?;
        let mut tds = Config::new();
        tds.host(settings.host()?);
        tds.port(settings.port_or(ConnectorKind::SqlServer.default_port().unwrap_or(1433)));
        if let Some(database) = settings.database.as_deref() {
            tds.database(database);
        }
        tds.authentication(AuthMethod::sql_server(
            settings.username(),
            settings.password(),
        ));
        if settings.trust_server_certificate {
            tds.trust_cert();
        }
        tds.application_name(env!("CARGO_PKG_NAME"));
        Ok(tds)
    }

    async fn connect(tds: Config) -> ConnectorResult<TdsClient> {
        let tcp = TcpStream::connect(tds.get_addr())
            .await
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;
        tcp.set_nodelay(true)?;
        Ok(Client::connect(tds, tcp.compat_write()).await?)
    }
}

/// Bound parameter; ISO timestamps are sent as DATETIME2
enum TdsParam<'v> {
    Json(&'v Value),
    Timestamp(NaiveDateTime),
}

impl<'v> TdsParam<'v> {
    fn new(value: &'v Value) -> Self {
        match value {
            Value::String(s) if is_timestamp(s) => match parse_timestamp(s) {
                Some(t) => Self::Timestamp(t),
                None => Self::Json(value),
            },
            _ => Self::Json(value),
        }
    }
}

impl ToSql for TdsParam<'_> {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            Self::Timestamp(t) => t.to_sql(),
            Self::Json(Value::Null) => ColumnData::String(None),
            Self::Json(Value::Bool(b)) => ColumnData::Bit(Some(*b)),
            Self::Json(Value::Number(n)) => match n.as_i64() {
                Some(i) => ColumnData::I64(Some(i)),
                None => ColumnData::F64(n.as_f64()),
            },
            Self::Json(Value::String(s)) => ColumnData::String(Some(Cow::Borrowed(s.as_str()))),
            Self::Json(other) => ColumnData::String(value_as_text(other).map(Cow::Owned)),
        }
    }
}

fn numeric_value(n: Numeric) -> Value {
    if n.scale() == 0 {
        if let Ok(i) = i64::try_from(n.value()) {
            return Value::from(i);
        }
    }
    float_value(n.value() as f64 / 10f64.powi(i32::from(n.scale())))
}

fn column_json(data: &ColumnData<'static>) -> Value {
    let value = match data {
        ColumnData::U8(v) => v.map(Value::from),
        ColumnData::I16(v) => v.map(Value::from),
        ColumnData::I32(v) => v.map(Value::from),
        ColumnData::I64(v) => v.map(Value::from),
        ColumnData::F32(v) => v.map(|f| float_value(f64::from(f))),
        ColumnData::F64(v) => v.map(float_value),
        ColumnData::Bit(v) => v.map(Value::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| Value::String(s.to_string())),
        ColumnData::Guid(v) => v.map(|g| Value::String(g.to_string())),
        ColumnData::Binary(v) => v
            .as_ref()
            .map(|b| Value::String(String::from_utf8_lossy(b).into_owned())),
        ColumnData::Numeric(v) => v.map(numeric_value),
        ColumnData::Date(_) => NaiveDate::from_sql(data)
            .ok()
            .flatten()
            .map(|d| Value::String(date_text(&d))),
        ColumnData::Time(_) => NaiveTime::from_sql(data)
            .ok()
            .flatten()
            .map(|t| Value::String(t.format("%H:%M:%S%.f").to_string())),
        ColumnData::DateTimeOffset(_) => DateTime::<Utc>::from_sql(data)
            .ok()
            .flatten()
            .map(|t| Value::String(t.to_rfc3339())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)
                .ok()
                .flatten()
                .map(|t| Value::String(timestamp_text(&t)))
        }
        // XML columns are not mapped
        #[allow(unreachable_patterns)]
        _ => None,
    };
    value.unwrap_or(Value::Null)
}

fn row_to_json(row: tiberius::Row) -> Row {
    let names: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    names
        .into_iter()
        .zip(row)
        .map(|(name, data)| (name, column_json(&data)))
        .collect()
}

async fn run(client: &mut TdsClient, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
    let rewritten = native_sql(DialectKind::SqlServer, sql);
    let bound = rewritten.bind(params).map_err(ConnectorError::Bind)?;
    let tds_params: Vec<TdsParam<'_>> = bound.into_iter().map(TdsParam::new).collect();
    let refs: Vec<&dyn ToSql> = tds_params.iter().map(|p| p as &dyn ToSql).collect();

    if returns_rows(sql) {
        let rows = client
            .query(rewritten.sql.as_str(), &refs)
            .await?
            .into_first_result()
            .await?;
        Ok(QueryResult::with_rows(rows.into_iter().map(row_to_json).collect()))
    } else {
        let result = client.execute(rewritten.sql.as_str(), &refs).await?;
        Ok(QueryResult::affected(result.total()))
    }
}

#[async_trait]
impl Connector for SqlServerConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::SqlServer
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> TestConnectionResult {
        let tds = match Self::tds_config(config) {
            Ok(tds) => tds,
            Err(e) => return TestConnectionResult::failed("Invalid connection settings", e),
        };
        let address = tds.get_addr();

        let attempt = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let mut client = Self::connect(tds).await?;
            let row = client
                .simple_query("SELECT @@VERSION")
                .await?
                .into_row()
                .await?;
            let version = row
                .and_then(|r| r.get::<&str, _>(0).map(str::to_string))
                .unwrap_or_default();
            client.close().await?;
            Ok::<_, ConnectorError>(version)
        })
        .await;

        match attempt {
            Ok(Ok(version)) => TestConnectionResult::ok("Connected to mssql")
                .with_detail("version", version.lines().next().unwrap_or_default().trim()),
            Ok(Err(e)) => TestConnectionResult::failed("Connection failed", &e)
                .with_detail("address", address)
                .with_detail("connectivity", e.is_connectivity()),
            Err(_) => TestConnectionResult::timed_out().with_detail("address", address),
        }
    }

    async fn extract_data(
        &self,
        config: &ConnectionConfig,
        request: &ExtractRequest,
    ) -> ConnectorResult<Vec<Row>> {
        let sql = request.require_query()?;
        let tds = Self::tds_config(config)?;
        let mut client = with_timeout(Self::connect(tds)).await?;

        let rows = client.simple_query(sql).await?.into_first_result().await?;
        client.close().await?;

        debug!(connector = "mssql", rows = rows.len(), "Extracted rows");
        Ok(rows.into_iter().map(row_to_json).collect())
    }

    async fn get_connection(
        &self,
        config: &ConnectionConfig,
    ) -> ConnectorResult<Box<dyn ConnectionHandle>> {
        let tds = Self::tds_config(config)?;
        let client = with_timeout(Self::connect(tds)).await?;
        info!(connector = "mssql", "Opened connection");
        Ok(Box::new(SqlServerHandle {
            client: Mutex::new(Some(client)),
        }))
    }
}

struct SqlServerHandle {
    client: Mutex<Option<TdsClient>>,
}

#[async_trait]
impl ConnectionHandle for SqlServerHandle {
    async fn query(&self, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult> {
        let mut guard = self.client.lock().await;
        let client = guard
            .as_mut()
            .ok_or_else(|| ConnectorError::Connection("connection already closed".to_string()))?;
        run(client, sql, params).await
    }

    async fn close(&self) -> ConnectorResult<()> {
        if let Some(client) = self.client.lock().await.take() {
            client.close().await?;
        }
        Ok(())
    }
}
