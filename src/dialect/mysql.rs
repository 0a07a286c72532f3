//! MySQL and MariaDB

use serde_json::Value;

use super::{Dialect, DialectKind, PlaceholderStyle, UpsertStyle, sized_string};
use crate::inference::{IntegerWidth, PortableType};
use crate::models::SqlStatement;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }

    fn native_type(&self, portable: &PortableType) -> String {
        match portable {
            PortableType::Json => "JSON".to_string(),
            PortableType::Timestamp => "DATETIME".to_string(),
            PortableType::Date => "DATE".to_string(),
            PortableType::Integer { width } => match width {
                IntegerWidth::Small => "SMALLINT",
                IntegerWidth::Medium => "INT",
                IntegerWidth::Big => "BIGINT",
            }
            .to_string(),
            PortableType::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
            PortableType::Boolean => "BOOLEAN".to_string(),
            PortableType::String { max_length } => sized_string(
                *max_length,
                &[(255, "VARCHAR(255)"), (1000, "VARCHAR(1000)"), (65_535, "TEXT")],
                "LONGTEXT",
            ),
        }
    }

    fn surrogate_key(&self) -> String {
        format!("{} INT AUTO_INCREMENT PRIMARY KEY", self.quote_identifier("id"))
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnDuplicateKey
    }

    fn table_exists_query(&self, table: &str) -> SqlStatement {
        SqlStatement::new(
            "SELECT COUNT(*) AS table_count FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = $1",
            vec![Value::from(table)],
        )
    }

    fn list_columns_query(&self, table: &str) -> SqlStatement {
        SqlStatement::new(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = $1 \
             ORDER BY ordinal_position",
            vec![Value::from(table)],
        )
    }
}
