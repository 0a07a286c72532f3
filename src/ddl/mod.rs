//! DDL and DML generation
//!
//! Renders CREATE/ALTER/DROP/TRUNCATE and per-row INSERT/UPSERT statements for a
//! target [`Dialect`]. Every identifier goes through
//! [`Dialect::quote_identifier`]; every value is bound as a canonical `$n`
//! parameter.
//!
//! # Example
//!
//! ```rust
//! use data_transfer_sdk::ddl::generate_insert;
//! use data_transfer_sdk::dialect::DialectKind;
//! use serde_json::json;
//!
//! let row = json!({"name": "Ada", "age": 36}).as_object().cloned().unwrap();
//! let stmt = generate_insert(DialectKind::MySql.dialect(), "people", &row).unwrap();
//! assert_eq!(stmt.sql, "INSERT INTO `people` (`name`, `age`) VALUES ($1, $2)");
//! assert_eq!(stmt.values, vec![json!("Ada"), json!(36)]);
//! ```

mod error;

pub use error::DdlError;

use crate::dialect::{Dialect, UpsertStyle};
use crate::inference::InferredColumn;
use crate::models::{Row, SqlStatement};

/// Name of the generated primary key column
pub const SURROGATE_KEY_COLUMN: &str = "id";
/// Name of the audit timestamp column
pub const CREATED_AT_COLUMN: &str = "created_at";

fn has_column(columns: &[InferredColumn], name: &str) -> bool {
    columns.iter().any(|c| c.name.eq_ignore_ascii_case(name))
}

fn column_definition(dialect: &dyn Dialect, column: &InferredColumn) -> String {
    let mut def = format!(
        "{} {}",
        dialect.quote_identifier(&column.name),
        dialect.native_type(&column.portable_type)
    );
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    def
}

/// `CREATE TABLE` for a profiled schema.
///
/// A surrogate primary key is prepended unless the schema already has an `id`
/// column (any case), and a `created_at` column is appended unless present.
pub fn generate_create_table(
    dialect: &dyn Dialect,
    table: &str,
    columns: &[InferredColumn],
) -> String {
    let mut defs = Vec::with_capacity(columns.len() + 2);

    if !has_column(columns, SURROGATE_KEY_COLUMN) {
        defs.push(dialect.surrogate_key());
    }
    defs.extend(columns.iter().map(|c| column_definition(dialect, c)));
    if !has_column(columns, CREATED_AT_COLUMN) {
        defs.push(dialect.created_at_column());
    }

    format!(
        "CREATE TABLE {} (\n  {}\n)",
        dialect.quote_identifier(table),
        defs.join(",\n  ")
    )
}

/// One `ALTER TABLE ... ADD` per column; added columns are always nullable
pub fn generate_add_columns(
    dialect: &dyn Dialect,
    table: &str,
    columns: &[InferredColumn],
) -> Vec<String> {
    let table = dialect.quote_identifier(table);
    let add = match dialect.add_column_keyword() {
        Some(keyword) => format!("ADD {keyword}"),
        None => "ADD".to_string(),
    };

    columns
        .iter()
        .map(|c| {
            format!(
                "ALTER TABLE {} {} {} {}",
                table,
                add,
                dialect.quote_identifier(&c.name),
                dialect.native_type(&c.portable_type)
            )
        })
        .collect()
}

/// Drop the table, tolerating its absence
pub fn generate_drop_table(dialect: &dyn Dialect, table: &str) -> String {
    dialect.drop_table_sql(table)
}

/// Remove every row from the table
pub fn generate_truncate_table(dialect: &dyn Dialect, table: &str) -> String {
    dialect.truncate_table_sql(table)
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parameterized single-row `INSERT`
pub fn generate_insert(
    dialect: &dyn Dialect,
    table: &str,
    row: &Row,
) -> Result<SqlStatement, DdlError> {
    if row.is_empty() {
        return Err(DdlError::EmptyRow);
    }

    let columns: Vec<String> = row.keys().map(|k| dialect.quote_identifier(k)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_identifier(table),
        columns.join(", "),
        placeholders(columns.len())
    );
    Ok(SqlStatement::new(sql, row.values().cloned().collect()))
}

/// Parameterized single-row insert-or-update keyed on `conflict_key`
pub fn generate_upsert(
    dialect: &dyn Dialect,
    table: &str,
    row: &Row,
    conflict_key: &str,
) -> Result<SqlStatement, DdlError> {
    if row.is_empty() {
        return Err(DdlError::EmptyRow);
    }
    if !row.contains_key(conflict_key) {
        return Err(DdlError::MissingConflictKey(conflict_key.to_string()));
    }

    let q = |name: &str| dialect.quote_identifier(name);
    let table = q(table);
    let key = q(conflict_key);
    let columns: Vec<String> = row.keys().map(|k| q(k.as_str())).collect();
    let updates: Vec<&String> = row
        .keys()
        .zip(&columns)
        .filter(|(name, _)| name.as_str() != conflict_key)
        .map(|(_, quoted)| quoted)
        .collect();
    let values = row.values().cloned().collect();

    let sql = match dialect.upsert_style() {
        UpsertStyle::OnConflict => {
            let action = if updates.is_empty() {
                "DO NOTHING".to_string()
            } else {
                let sets: Vec<String> = updates
                    .iter()
                    .map(|c| format!("{c} = EXCLUDED.{c}"))
                    .collect();
                format!("DO UPDATE SET {}", sets.join(", "))
            };
            format!(
                "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
                table,
                columns.join(", "),
                placeholders(columns.len()),
                key,
                action
            )
        }
        UpsertStyle::OnDuplicateKey => {
            let sets: Vec<String> = if updates.is_empty() {
                vec![format!("{key} = {key}")]
            } else {
                updates
                    .iter()
                    .map(|c| format!("{c} = VALUES({c})"))
                    .collect()
            };
            format!(
                "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
                table,
                columns.join(", "),
                placeholders(columns.len()),
                sets.join(", ")
            )
        }
        UpsertStyle::Merge => {
            let selected: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, c)| format!("${} AS {}", i + 1, c))
                .collect();
            let mut sql = format!(
                "MERGE INTO {} target USING (SELECT {}{}) source ON (target.{} = source.{})",
                table,
                selected.join(", "),
                dialect.merge_source_suffix(),
                key,
                key
            );
            if !updates.is_empty() {
                let sets: Vec<String> = updates
                    .iter()
                    .map(|c| format!("target.{c} = source.{c}"))
                    .collect();
                sql.push_str(&format!(" WHEN MATCHED THEN UPDATE SET {}", sets.join(", ")));
            }
            let inserted: Vec<String> = columns.iter().map(|c| format!("source.{c}")).collect();
            sql.push_str(&format!(
                " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({}){}",
                columns.join(", "),
                inserted.join(", "),
                dialect.statement_terminator()
            ));
            sql
        }
    };

    Ok(SqlStatement::new(sql, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;
    use crate::inference::{IntegerWidth, PortableType};
    use serde_json::json;

    fn column(name: &str, portable_type: PortableType, nullable: bool) -> InferredColumn {
        InferredColumn {
            name: name.to_string(),
            portable_type,
            sql_type: String::new(),
            nullable,
        }
    }

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_table_adds_surrogate_key_and_audit_column() {
        let columns = vec![
            column("name", PortableType::String { max_length: 10 }, false),
            column("score", PortableType::Decimal { precision: 18, scale: 2 }, true),
        ];
        let sql = generate_create_table(DialectKind::Postgres.dialect(), "people", &columns);
        assert_eq!(
            sql,
            "CREATE TABLE \"people\" (\n  \"id\" SERIAL PRIMARY KEY,\n  \"name\" VARCHAR(255) NOT NULL,\n  \"score\" NUMERIC(18,2),\n  \"created_at\" TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n)"
        );
    }

    #[test]
    fn test_create_table_keeps_existing_id_case_insensitive() {
        let columns = vec![
            column("ID", PortableType::Integer { width: IntegerWidth::Small }, false),
            column("Created_At", PortableType::Timestamp, true),
        ];
        let sql = generate_create_table(DialectKind::MySql.dialect(), "t", &columns);
        assert!(!sql.contains("AUTO_INCREMENT"));
        assert!(!sql.contains("CURRENT_TIMESTAMP"));
        assert!(sql.contains("`ID` SMALLINT NOT NULL"));
    }

    #[test]
    fn test_add_columns_keyword_per_dialect() {
        let columns = vec![column("extra", PortableType::Boolean, false)];
        assert_eq!(
            generate_add_columns(DialectKind::Postgres.dialect(), "t", &columns),
            vec!["ALTER TABLE \"t\" ADD COLUMN \"extra\" BOOLEAN"]
        );
        assert_eq!(
            generate_add_columns(DialectKind::Oracle.dialect(), "t", &columns),
            vec!["ALTER TABLE \"t\" ADD \"extra\" NUMBER(1)"]
        );
        assert_eq!(
            generate_add_columns(DialectKind::SqlServer.dialect(), "t", &columns),
            vec!["ALTER TABLE [t] ADD [extra] BIT"]
        );
    }

    #[test]
    fn test_drop_and_truncate() {
        assert_eq!(
            generate_drop_table(DialectKind::MySql.dialect(), "t"),
            "DROP TABLE IF EXISTS `t`"
        );
        assert_eq!(
            generate_truncate_table(DialectKind::SqlServer.dialect(), "t"),
            "TRUNCATE TABLE [t]"
        );
        assert!(generate_drop_table(DialectKind::Oracle.dialect(), "t").contains("-942"));
    }

    #[test]
    fn test_insert_rejects_empty_row() {
        let result = generate_insert(DialectKind::Postgres.dialect(), "t", &Row::new());
        assert_eq!(result, Err(DdlError::EmptyRow));
    }

    #[test]
    fn test_upsert_on_conflict() {
        let stmt = generate_upsert(
            DialectKind::Postgres.dialect(),
            "t",
            &row(json!({"code": "a", "qty": 2})),
            "code",
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"t\" (\"code\", \"qty\") VALUES ($1, $2) ON CONFLICT (\"code\") DO UPDATE SET \"qty\" = EXCLUDED.\"qty\""
        );
        assert_eq!(stmt.values, vec![json!("a"), json!(2)]);
    }

    #[test]
    fn test_upsert_key_only_does_nothing() {
        let stmt = generate_upsert(
            DialectKind::DuckDb.dialect(),
            "t",
            &row(json!({"code": "a"})),
            "code",
        )
        .unwrap();
        assert!(stmt.sql.ends_with("ON CONFLICT (\"code\") DO NOTHING"));
    }

    #[test]
    fn test_upsert_on_duplicate_key() {
        let stmt = generate_upsert(
            DialectKind::MySql.dialect(),
            "t",
            &row(json!({"code": "a", "qty": 2})),
            "code",
        )
        .unwrap();
        assert!(stmt.sql.ends_with("ON DUPLICATE KEY UPDATE `qty` = VALUES(`qty`)"));
    }

    #[test]
    fn test_upsert_merge_for_sqlserver() {
        let stmt = generate_upsert(
            DialectKind::SqlServer.dialect(),
            "t",
            &row(json!({"code": "a", "qty": 2})),
            "code",
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "MERGE INTO [t] target USING (SELECT $1 AS [code], $2 AS [qty]) source \
             ON (target.[code] = source.[code]) \
             WHEN MATCHED THEN UPDATE SET target.[qty] = source.[qty] \
             WHEN NOT MATCHED THEN INSERT ([code], [qty]) VALUES (source.[code], source.[qty]);"
        );
    }

    #[test]
    fn test_upsert_merge_uses_dual_for_oracle() {
        let stmt = generate_upsert(
            DialectKind::Oracle.dialect(),
            "t",
            &row(json!({"code": "a"})),
            "code",
        )
        .unwrap();
        assert!(stmt.sql.contains("AS \"code\" FROM dual) source"));
        assert!(!stmt.sql.contains("WHEN MATCHED"));
    }

    #[test]
    fn test_upsert_requires_conflict_key() {
        let result = generate_upsert(
            DialectKind::Postgres.dialect(),
            "t",
            &row(json!({"qty": 2})),
            "code",
        );
        assert_eq!(result, Err(DdlError::MissingConflictKey("code".to_string())));
    }
}
