//! PostgreSQL and CockroachDB

use serde_json::Value;

use super::{Dialect, DialectKind, PlaceholderStyle, UpsertStyle, sized_string};
use crate::inference::{IntegerWidth, PortableType};
use crate::models::SqlStatement;

/// Postgres-wire engines sharing the Postgres type system
#[derive(Debug, Clone, Copy)]
pub struct PostgresDialect {
    kind: DialectKind,
}

impl PostgresDialect {
    /// Dialect for `kind` (Postgres or CockroachDB)
    pub const fn new(kind: DialectKind) -> Self {
        Self { kind }
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        self.kind
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Dollar
    }

    fn native_type(&self, portable: &PortableType) -> String {
        match portable {
            PortableType::Json => "JSONB".to_string(),
            PortableType::Timestamp => "TIMESTAMP".to_string(),
            PortableType::Date => "DATE".to_string(),
            PortableType::Integer { width } => match width {
                IntegerWidth::Small => "SMALLINT",
                IntegerWidth::Medium => "INTEGER",
                IntegerWidth::Big => "BIGINT",
            }
            .to_string(),
            PortableType::Decimal { precision, scale } => format!("NUMERIC({precision},{scale})"),
            PortableType::Boolean => "BOOLEAN".to_string(),
            PortableType::String { max_length } => sized_string(
                *max_length,
                &[(255, "VARCHAR(255)"), (1000, "VARCHAR(1000)")],
                "TEXT",
            ),
        }
    }

    fn surrogate_key(&self) -> String {
        let id = self.quote_identifier("id");
        match self.kind {
            DialectKind::CockroachDb => format!("{id} INT8 DEFAULT unique_rowid() PRIMARY KEY"),
            _ => format!("{id} SERIAL PRIMARY KEY"),
        }
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnConflict
    }

    fn table_exists_query(&self, table: &str) -> SqlStatement {
        SqlStatement::new(
            "SELECT COUNT(*) AS table_count FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1",
            vec![Value::from(table)],
        )
    }

    fn list_columns_query(&self, table: &str) -> SqlStatement {
        SqlStatement::new(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
            vec![Value::from(table)],
        )
    }
}
