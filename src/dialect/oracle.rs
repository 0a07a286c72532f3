//! Oracle

use serde_json::Value;

use super::{Dialect, DialectKind, PlaceholderStyle, UpsertStyle, sized_string};
use crate::inference::{IntegerWidth, PortableType};
use crate::models::SqlStatement;

/// ORA-00942: table or view does not exist
const TABLE_NOT_FOUND: i32 = -942;

#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl OracleDialect {
    /// Run `statement` in a PL/SQL block that ignores a missing table
    fn ignoring_missing_table(&self, statement: &str) -> String {
        format!(
            "BEGIN\n  EXECUTE IMMEDIATE '{}';\nEXCEPTION\n  WHEN OTHERS THEN\n    IF SQLCODE != {} THEN\n      RAISE;\n    END IF;\nEND;",
            statement.replace('\'', "''"),
            TABLE_NOT_FOUND
        )
    }
}

impl Dialect for OracleDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Oracle
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Colon
    }

    fn native_type(&self, portable: &PortableType) -> String {
        match portable {
            PortableType::Json => "CLOB".to_string(),
            PortableType::Timestamp => "TIMESTAMP".to_string(),
            PortableType::Date => "DATE".to_string(),
            PortableType::Integer { width } => match width {
                IntegerWidth::Small => "NUMBER(5)",
                IntegerWidth::Medium => "NUMBER(10)",
                IntegerWidth::Big => "NUMBER(19)",
            }
            .to_string(),
            PortableType::Decimal { precision, scale } => format!("NUMBER({precision},{scale})"),
            PortableType::Boolean => "NUMBER(1)".to_string(),
            PortableType::String { max_length } => sized_string(
                *max_length,
                &[
                    (255, "VARCHAR2(255)"),
                    (1000, "VARCHAR2(1000)"),
                    (4000, "VARCHAR2(4000)"),
                ],
                "CLOB",
            ),
        }
    }

    fn surrogate_key(&self) -> String {
        format!(
            "{} NUMBER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY",
            self.quote_identifier("id")
        )
    }

    fn created_at_column(&self) -> String {
        format!(
            "{} TIMESTAMP DEFAULT SYSTIMESTAMP",
            self.quote_identifier("created_at")
        )
    }

    fn add_column_keyword(&self) -> Option<&'static str> {
        None
    }

    fn drop_table_sql(&self, table: &str) -> String {
        self.ignoring_missing_table(&format!("DROP TABLE {}", self.quote_identifier(table)))
    }

    fn truncate_table_sql(&self, table: &str) -> String {
        self.ignoring_missing_table(&format!("TRUNCATE TABLE {}", self.quote_identifier(table)))
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::Merge
    }

    fn merge_source_suffix(&self) -> &'static str {
        " FROM dual"
    }

    fn table_exists_query(&self, table: &str) -> SqlStatement {
        SqlStatement::new(
            "SELECT COUNT(*) AS table_count FROM user_tables WHERE table_name = $1",
            vec![Value::from(table)],
        )
    }

    fn list_columns_query(&self, table: &str) -> SqlStatement {
        SqlStatement::new(
            "SELECT column_name FROM user_tab_columns WHERE table_name = $1 ORDER BY column_id",
            vec![Value::from(table)],
        )
    }
}
