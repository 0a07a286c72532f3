//! Connector adapters
//!
//! One adapter per external system, all behind the [`Connector`] trait:
//!
//! - Relational engines (Postgres, CockroachDB, Vertica, MySQL, Oracle,
//!   SQL Server, DuckDB) can be sources and load targets.
//! - SaaS APIs (ServiceNow, Salesforce) are sources; their handles run
//!   provider queries.
//! - Flat files (CSV, JSON) are source-only.
//!
//! Statements passed to [`ConnectionHandle::query`] always use canonical `$n`
//! placeholders; each handle rewrites them into its driver's syntax.

mod convert;
mod error;
mod registry;
mod settings;

#[cfg(feature = "flat-files")]
mod csv_file;
#[cfg(feature = "duckdb-backend")]
mod duckdb;
mod json_file;
#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "oracle")]
mod oracle;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "saas")]
mod salesforce;
#[cfg(feature = "saas")]
mod servicenow;
#[cfg(feature = "mssql")]
mod sqlserver;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use convert::{coerce_text, parse_date, parse_timestamp};
pub use error::{ConnectorError, ConnectorResult};
pub use registry::ConnectorRegistry;
pub use settings::{FileSettings, SalesforceSettings, ServiceNowSettings, SqlSettings};

#[cfg(feature = "flat-files")]
pub use csv_file::CsvConnector;
#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDbConnector;
pub use json_file::JsonConnector;
#[cfg(feature = "mysql")]
pub use mysql::MySqlConnector;
#[cfg(feature = "oracle")]
pub use self::oracle::OracleConnector;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnector;
#[cfg(feature = "saas")]
pub use salesforce::SalesforceConnector;
#[cfg(feature = "saas")]
pub use servicenow::ServiceNowConnector;
#[cfg(feature = "mssql")]
pub use sqlserver::SqlServerConnector;

use crate::dialect::{DialectKind, RewrittenSql, rewrite_placeholders};
use crate::models::{ConnectionConfig, Row, SqlStatement};

/// Upper bound on connection tests and connection establishment
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// External systems a task can read from or write to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    Postgres,
    CockroachDb,
    Vertica,
    MySql,
    Oracle,
    SqlServer,
    DuckDb,
    ServiceNow,
    Salesforce,
    Csv,
    Json,
}

impl ConnectorKind {
    /// All connector kinds
    pub fn all() -> Vec<Self> {
        vec![
            Self::Postgres,
            Self::CockroachDb,
            Self::Vertica,
            Self::MySql,
            Self::Oracle,
            Self::SqlServer,
            Self::DuckDb,
            Self::ServiceNow,
            Self::Salesforce,
            Self::Csv,
            Self::Json,
        ]
    }

    /// Canonical token
    pub fn name(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::CockroachDb => "cockroachdb",
            Self::Vertica => "vertica",
            Self::MySql => "mysql",
            Self::Oracle => "oracle",
            Self::SqlServer => "mssql",
            Self::DuckDb => "duckdb",
            Self::ServiceNow => "servicenow",
            Self::Salesforce => "salesforce",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// SQL dialect for load targets; `None` for SaaS and file sources
    pub fn dialect(&self) -> Option<DialectKind> {
        match self {
            Self::Postgres => Some(DialectKind::Postgres),
            Self::CockroachDb => Some(DialectKind::CockroachDb),
            Self::Vertica => Some(DialectKind::Vertica),
            Self::MySql => Some(DialectKind::MySql),
            Self::Oracle => Some(DialectKind::Oracle),
            Self::SqlServer => Some(DialectKind::SqlServer),
            Self::DuckDb => Some(DialectKind::DuckDb),
            Self::ServiceNow | Self::Salesforce | Self::Csv | Self::Json => None,
        }
    }

    /// Port used when the settings leave it out
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Postgres => Some(5432),
            Self::CockroachDb => Some(26257),
            Self::Vertica => Some(5433),
            Self::MySql => Some(3306),
            Self::Oracle => Some(1521),
            Self::SqlServer => Some(1433),
            _ => None,
        }
    }

    /// Cargo feature that compiles the adapter in; `None` when always present
    pub fn feature(&self) -> Option<&'static str> {
        match self {
            Self::Postgres | Self::CockroachDb | Self::Vertica => Some("postgres"),
            Self::MySql => Some("mysql"),
            Self::Oracle => Some("oracle"),
            Self::SqlServer => Some("mssql"),
            Self::DuckDb => Some("duckdb-backend"),
            Self::ServiceNow | Self::Salesforce => Some("saas"),
            Self::Csv => Some("flat-files"),
            Self::Json => None,
        }
    }
}

impl std::fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ConnectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "cockroachdb" | "cockroach" => Ok(Self::CockroachDb),
            "vertica" => Ok(Self::Vertica),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "oracle" => Ok(Self::Oracle),
            "mssql" | "sqlserver" | "sql_server" => Ok(Self::SqlServer),
            "duckdb" => Ok(Self::DuckDb),
            "servicenow" => Ok(Self::ServiceNow),
            "salesforce" => Ok(Self::Salesforce),
            "csv" => Ok(Self::Csv),
            "json" | "jsonl" | "ndjson" => Ok(Self::Json),
            _ => Err(format!("Unknown connector type: {}", s)),
        }
    }
}

/// Outcome of a connection test; failures are data, never errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConnectionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl TestConnectionResult {
    /// Successful test
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            details: Map::new(),
        }
    }

    /// Failed test with the underlying error
    pub fn failed(message: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(error.to_string()),
            details: Map::new(),
        }
    }

    /// Connection test that got no answer within [`CONNECT_TIMEOUT`]
    pub fn timed_out() -> Self {
        Self::failed(
            "Connection timed out",
            format!("no response within {} seconds", CONNECT_TIMEOUT.as_secs()),
        )
        .with_detail("timeoutSeconds", CONNECT_TIMEOUT.as_secs())
    }

    /// Attach an adapter-specific detail (version, error code, path, ...)
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// What to extract from a source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractRequest {
    /// SQL, SOQL, table spec, or file-relative selector
    #[serde(default)]
    pub query: Option<String>,
    /// Worksheet or top-level key for file sources
    #[serde(default)]
    pub worksheet: Option<String>,
}

impl ExtractRequest {
    /// Request running `query`
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            worksheet: None,
        }
    }

    /// Set the worksheet
    pub fn with_worksheet(mut self, worksheet: impl Into<String>) -> Self {
        self.worksheet = Some(worksheet.into());
        self
    }

    /// The query, or an error when absent or blank
    pub fn require_query(&self) -> Result<&str, ConnectorError> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(ConnectorError::MissingParameter("source query"))
    }
}

/// Result of one statement on a connection handle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
}

impl QueryResult {
    /// Result carrying rows
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows_affected: rows.len() as u64,
            rows,
        }
    }

    /// Result of a statement that returns no rows
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            rows_affected,
        }
    }

    /// First value of the first row
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.values().next())
    }
}

/// A live connection owned by a single task run
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// Run one statement with canonical `$n` placeholders
    async fn query(&self, sql: &str, params: &[Value]) -> ConnectorResult<QueryResult>;

    /// Run a prepared statement
    async fn execute(&self, statement: &SqlStatement) -> ConnectorResult<QueryResult> {
        self.query(&statement.sql, &statement.values).await
    }

    /// Release the connection (pool drain, socket close, or logout)
    async fn close(&self) -> ConnectorResult<()>;
}

/// Adapter for one kind of external system
#[async_trait]
pub trait Connector: Send + Sync {
    /// Kind this adapter serves
    fn kind(&self) -> ConnectorKind;

    /// Lightweight round trip; failures are reported in the result
    async fn test_connection(&self, config: &ConnectionConfig) -> TestConnectionResult;

    /// Read every row the request selects
    async fn extract_data(
        &self,
        config: &ConnectionConfig,
        request: &ExtractRequest,
    ) -> ConnectorResult<Vec<Row>>;

    /// Open a persistent handle for running statements
    async fn get_connection(
        &self,
        config: &ConnectionConfig,
    ) -> ConnectorResult<Box<dyn ConnectionHandle>>;

    /// Release a handle obtained from [`Connector::get_connection`]
    async fn close_connection(&self, handle: Box<dyn ConnectionHandle>) -> ConnectorResult<()> {
        handle.close().await
    }
}

/// Whether a statement produces a result set
pub(crate) fn returns_rows(sql: &str) -> bool {
    let head = sql
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        head.as_str(),
        "SELECT" | "WITH" | "SHOW" | "VALUES" | "EXPLAIN" | "DESCRIBE" | "PRAGMA"
    ) || sql.to_ascii_uppercase().contains(" RETURNING ")
}

/// Rewrite canonical `$n` SQL into the placeholder syntax of `dialect`
pub(crate) fn native_sql(dialect: DialectKind, sql: &str) -> RewrittenSql {
    rewrite_placeholders(sql, dialect.dialect().placeholder_style())
}

/// Bound an async operation by [`CONNECT_TIMEOUT`]
pub(crate) async fn with_timeout<T, F>(future: F) -> ConnectorResult<T>
where
    F: Future<Output = ConnectorResult<T>>,
{
    tokio::time::timeout(CONNECT_TIMEOUT, future)
        .await
        .map_err(|_| ConnectorError::Timeout(CONNECT_TIMEOUT.as_secs()))?
}

/// Run blocking client work off the async runtime
#[cfg(any(feature = "oracle", feature = "duckdb-backend"))]
pub(crate) async fn blocking<T, F>(work: F) -> ConnectorResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ConnectorResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ConnectorError::Connection(format!("worker task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_aliases() {
        assert_eq!("PostgreSQL".parse::<ConnectorKind>().unwrap(), ConnectorKind::Postgres);
        assert_eq!("sqlserver".parse::<ConnectorKind>().unwrap(), ConnectorKind::SqlServer);
        assert_eq!("jsonl".parse::<ConnectorKind>().unwrap(), ConnectorKind::Json);
        assert!("excel".parse::<ConnectorKind>().is_err());
        for kind in ConnectorKind::all() {
            assert_eq!(kind.name().parse::<ConnectorKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_dialects_and_ports() {
        assert_eq!(ConnectorKind::Vertica.dialect(), Some(DialectKind::Vertica));
        assert_eq!(ConnectorKind::Salesforce.dialect(), None);
        assert_eq!(ConnectorKind::CockroachDb.default_port(), Some(26257));
        assert_eq!(ConnectorKind::Csv.default_port(), None);
    }

    #[test]
    fn test_native_sql_follows_dialect() {
        let sql = "UPDATE t SET a = $1 WHERE b = $2";
        assert_eq!(native_sql(DialectKind::Vertica, sql).sql, sql);
        assert_eq!(native_sql(DialectKind::CockroachDb, sql).sql, sql);
        assert_eq!(
            native_sql(DialectKind::MySql, sql).sql,
            "UPDATE t SET a = ? WHERE b = ?"
        );
        assert_eq!(
            native_sql(DialectKind::Oracle, sql).sql,
            "UPDATE t SET a = :1 WHERE b = :2"
        );
        assert_eq!(
            native_sql(DialectKind::SqlServer, sql).sql,
            "UPDATE t SET a = @P1 WHERE b = @P2"
        );
    }

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("  select 1"));
        assert!(returns_rows("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(returns_rows("INSERT INTO t (a) VALUES ($1) RETURNING id"));
        assert!(!returns_rows("INSERT INTO t (a) VALUES ($1)"));
        assert!(!returns_rows("MERGE INTO t target USING (SELECT $1 AS a) source ON (1=1)"));
        assert!(!returns_rows("CREATE TABLE t (a INT)"));
    }

    #[test]
    fn test_test_result_serialization() {
        let result = TestConnectionResult::failed("Connection failed", "refused")
            .with_detail("code", "08001");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "refused");
        assert_eq!(value["details"]["code"], "08001");

        let ok = serde_json::to_value(TestConnectionResult::ok("fine")).unwrap();
        assert!(ok.get("details").is_none());
    }

    #[test]
    fn test_require_query() {
        assert!(matches!(
            ExtractRequest::default().require_query(),
            Err(ConnectorError::MissingParameter(_))
        ));
        assert_eq!(ExtractRequest::query(" SELECT 1 ").require_query().unwrap(), "SELECT 1");
    }
}
