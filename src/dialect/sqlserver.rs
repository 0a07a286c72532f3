//! Microsoft SQL Server (T-SQL)

use serde_json::Value;

use super::{Dialect, DialectKind, PlaceholderStyle, UpsertStyle, sized_string};
use crate::inference::{IntegerWidth, PortableType};
use crate::models::SqlStatement;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::SqlServer
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::AtP
    }

    fn native_type(&self, portable: &PortableType) -> String {
        match portable {
            PortableType::Json => "NVARCHAR(MAX)".to_string(),
            PortableType::Timestamp => "DATETIME2".to_string(),
            PortableType::Date => "DATE".to_string(),
            PortableType::Integer { width } => match width {
                IntegerWidth::Small => "SMALLINT",
                IntegerWidth::Medium => "INT",
                IntegerWidth::Big => "BIGINT",
            }
            .to_string(),
            PortableType::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
            PortableType::Boolean => "BIT".to_string(),
            PortableType::String { max_length } => sized_string(
                *max_length,
                &[
                    (255, "NVARCHAR(255)"),
                    (1000, "NVARCHAR(1000)"),
                    (4000, "NVARCHAR(4000)"),
                ],
                "NVARCHAR(MAX)",
            ),
        }
    }

    fn surrogate_key(&self) -> String {
        format!("{} INT IDENTITY(1,1) PRIMARY KEY", self.quote_identifier("id"))
    }

    fn created_at_column(&self) -> String {
        format!(
            "{} DATETIME2 DEFAULT SYSDATETIME()",
            self.quote_identifier("created_at")
        )
    }

    // T-SQL rejects `ADD COLUMN`.
    fn add_column_keyword(&self) -> Option<&'static str> {
        None
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::Merge
    }

    fn statement_terminator(&self) -> &'static str {
        ";"
    }

    fn table_exists_query(&self, table: &str) -> SqlStatement {
        SqlStatement::new(
            "SELECT COUNT(*) AS table_count FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = SCHEMA_NAME() AND TABLE_NAME = $1",
            vec![Value::from(table)],
        )
    }

    fn list_columns_query(&self, table: &str) -> SqlStatement {
        SqlStatement::new(
            "SELECT COLUMN_NAME AS column_name FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = SCHEMA_NAME() AND TABLE_NAME = $1 \
             ORDER BY ORDINAL_POSITION",
            vec![Value::from(table)],
        )
    }
}
