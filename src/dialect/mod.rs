//! SQL dialects for load targets
//!
//! Each supported engine implements [`Dialect`]: identifier quoting, placeholder
//! syntax, type names, and the catalog queries used by the loading strategies.
//! Dialects are stateless and looked up by token through [`lookup`] or
//! [`DialectKind::dialect`].

mod duckdb;
mod mysql;
mod oracle;
mod placeholder;
mod postgres;
mod sqlserver;
mod vertica;

use serde::{Deserialize, Serialize};

pub use self::duckdb::DuckDbDialect;
pub use mysql::MySqlDialect;
pub use self::oracle::OracleDialect;
pub use placeholder::{PlaceholderStyle, RewrittenSql, rewrite_placeholders};
pub use postgres::PostgresDialect;
pub use sqlserver::SqlServerDialect;
pub use vertica::VerticaDialect;

use crate::inference::PortableType;
use crate::models::SqlStatement;

static POSTGRES: PostgresDialect = PostgresDialect::new(DialectKind::Postgres);
static COCKROACH: PostgresDialect = PostgresDialect::new(DialectKind::CockroachDb);
static VERTICA: VerticaDialect = VerticaDialect;
static MYSQL: MySqlDialect = MySqlDialect;
static ORACLE: OracleDialect = OracleDialect;
static SQLSERVER: SqlServerDialect = SqlServerDialect;
static DUCKDB: DuckDbDialect = DuckDbDialect;

/// Supported SQL engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    Postgres,
    CockroachDb,
    Vertica,
    MySql,
    Oracle,
    SqlServer,
    DuckDb,
}

impl DialectKind {
    /// All dialects
    pub fn all() -> Vec<Self> {
        vec![
            Self::Postgres,
            Self::CockroachDb,
            Self::Vertica,
            Self::MySql,
            Self::Oracle,
            Self::SqlServer,
            Self::DuckDb,
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
        }
    }

    /// Shared dialect implementation for this engine
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::Postgres => &POSTGRES,
            Self::CockroachDb => &COCKROACH,
            Self::Vertica => &VERTICA,
            Self::MySql => &MYSQL,
            Self::Oracle => &ORACLE,
            Self::SqlServer => &SQLSERVER,
            Self::DuckDb => &DUCKDB,
        }
    }
}

impl std::fmt::Display for DialectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for DialectKind {
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
            _ => Err(format!("Unknown SQL dialect: {}", s)),
        }
    }
}

/// Look up a dialect by token (`postgres`, `mysql`, `oracle`, ...)
pub fn lookup(token: &str) -> Result<&'static dyn Dialect, String> {
    token.parse::<DialectKind>().map(DialectKind::dialect)
}

/// How a dialect expresses insert-or-update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStyle {
    /// `INSERT ... ON CONFLICT (key) DO UPDATE`
    OnConflict,
    /// `INSERT ... ON DUPLICATE KEY UPDATE`
    OnDuplicateKey,
    /// `MERGE INTO ... USING (SELECT ...)`
    Merge,
}

/// Capabilities that vary between SQL engines
pub trait Dialect: Send + Sync + std::fmt::Debug {
    /// Engine this dialect renders for
    fn kind(&self) -> DialectKind;

    /// Quote a table or column name; embedded quote characters are doubled
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Native parameter syntax of the driver
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Native column type for a portable type
    fn native_type(&self, portable: &PortableType) -> String;

    /// Full definition of the generated primary key column
    fn surrogate_key(&self) -> String;

    /// Full definition of the `created_at` audit column
    fn created_at_column(&self) -> String {
        format!(
            "{} TIMESTAMP DEFAULT CURRENT_TIMESTAMP",
            self.quote_identifier("created_at")
        )
    }

    /// Keyword between `ADD` and the column name in `ALTER TABLE`
    fn add_column_keyword(&self) -> Option<&'static str> {
        Some("COLUMN")
    }

    /// Drop statement that tolerates a missing table
    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_identifier(table))
    }

    /// Truncate statement
    fn truncate_table_sql(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {}", self.quote_identifier(table))
    }

    /// Insert-or-update flavour
    fn upsert_style(&self) -> UpsertStyle;

    /// Appended to the `SELECT` feeding a `MERGE` (e.g. `FROM dual`)
    fn merge_source_suffix(&self) -> &'static str {
        ""
    }

    /// Appended to `MERGE` statements
    fn statement_terminator(&self) -> &'static str {
        ""
    }

    /// Query returning one row whose first value is the number of matching tables
    fn table_exists_query(&self, table: &str) -> SqlStatement;

    /// Query returning one row per existing column, name first
    fn list_columns_query(&self, table: &str) -> SqlStatement;
}

/// Pick the first bucket whose limit holds `max_length`
pub(crate) fn sized_string(
    max_length: usize,
    buckets: &[(usize, &'static str)],
    unbounded: &'static str,
) -> String {
    buckets
        .iter()
        .find(|(limit, _)| max_length <= *limit)
        .map_or(unbounded, |(_, name)| *name)
        .to_string()
}
