//! DuckDB

use serde_json::Value;

use super::{Dialect, DialectKind, PlaceholderStyle, UpsertStyle};
use crate::inference::{IntegerWidth, PortableType};
use crate::models::SqlStatement;

#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDbDialect;

impl Dialect for DuckDbDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::DuckDb
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }

    fn native_type(&self, portable: &PortableType) -> String {
        match portable {
            // JSON values are stored as text; the JSON type needs an extension.
            PortableType::Json => "VARCHAR".to_string(),
            PortableType::Timestamp => "TIMESTAMP".to_string(),
            PortableType::Date => "DATE".to_string(),
            PortableType::Integer { width } => match width {
                IntegerWidth::Small => "SMALLINT",
                IntegerWidth::Medium => "INTEGER",
                IntegerWidth::Big => "BIGINT",
            }
            .to_string(),
            PortableType::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
            PortableType::Boolean => "BOOLEAN".to_string(),
            PortableType::String { .. } => "VARCHAR".to_string(),
        }
    }

    fn surrogate_key(&self) -> String {
        format!(
            "{} UUID DEFAULT gen_random_uuid() PRIMARY KEY",
            self.quote_identifier("id")
        )
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
