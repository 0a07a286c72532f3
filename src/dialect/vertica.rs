//! Vertica

use serde_json::Value;

use super::{Dialect, DialectKind, PlaceholderStyle, UpsertStyle, sized_string};
use crate::inference::{IntegerWidth, PortableType};
use crate::models::SqlStatement;

#[derive(Debug, Clone, Copy, Default)]
pub struct VerticaDialect;

impl Dialect for VerticaDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Vertica
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Dollar
    }

    fn native_type(&self, portable: &PortableType) -> String {
        match portable {
            PortableType::Json => "LONG VARCHAR".to_string(),
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
                &[
                    (255, "VARCHAR(255)"),
                    (1000, "VARCHAR(1000)"),
                    (65_000, "VARCHAR(65000)"),
                ],
                "LONG VARCHAR",
            ),
        }
    }

    fn surrogate_key(&self) -> String {
        format!("{} IDENTITY(1,1) PRIMARY KEY", self.quote_identifier("id"))
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::Merge
    }

    fn table_exists_query(&self, table: &str) -> SqlStatement {
        SqlStatement::new(
            "SELECT COUNT(*) AS table_count FROM v_catalog.tables WHERE table_name = $1",
            vec![Value::from(table)],
        )
    }

    fn list_columns_query(&self, table: &str) -> SqlStatement {
        SqlStatement::new(
            "SELECT column_name FROM v_catalog.columns WHERE table_name = $1 \
             ORDER BY ordinal_position",
            vec![Value::from(table)],
        )
    }
}
