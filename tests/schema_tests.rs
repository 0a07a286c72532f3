//! Profiling rows and rendering the resulting DDL

mod common;

use common::rows;
use data_transfer_sdk::ddl::{generate_add_columns, generate_create_table, generate_insert};
use data_transfer_sdk::dialect::DialectKind;
use data_transfer_sdk::inference::{IntegerWidth, PortableType, profile_schema};
use data_transfer_sdk::models::Row;
use serde_json::json;

fn orders() -> Vec<Row> {
    rows(vec![
        json!({"order_no": 7, "placed_at": null, "total": 12.5, "note": "first"}),
        json!({"order_no": 40000, "placed_at": "2024-01-01T00:00:00Z", "total": 3}),
    ])
}

mod profiler_tests {
    use super::*;

    #[test]
    fn test_columns_in_first_seen_order() {
        let schema = profile_schema(&orders(), DialectKind::Postgres.dialect()).unwrap();
        let names: Vec<&str> = schema.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["order_no", "placed_at", "total", "note"]);
    }

    #[test]
    fn test_resolved_types() {
        let schema = profile_schema(&orders(), DialectKind::Postgres.dialect()).unwrap();

        assert_eq!(
            schema[0].portable_type,
            PortableType::Integer {
                width: IntegerWidth::Medium
            }
        );
        assert_eq!(schema[1].portable_type, PortableType::Timestamp);
        assert!(schema[1].nullable);
        assert_eq!(schema[2].portable_type.token(), "decimal");
        // Absent from the second row
        assert!(schema[3].nullable);
        assert!(!schema[0].nullable);
    }
}

mod ddl_tests {
    use super::*;

    #[test]
    fn test_create_table_postgres() {
        let schema = profile_schema(&orders(), DialectKind::Postgres.dialect()).unwrap();
        let sql = generate_create_table(DialectKind::Postgres.dialect(), "orders", &schema);

        assert!(sql.starts_with("CREATE TABLE \"orders\" (\n  \"id\" SERIAL PRIMARY KEY,"));
        assert!(sql.contains("\"order_no\" INTEGER NOT NULL"));
        assert!(sql.contains("\"placed_at\" TIMESTAMP,"));
        assert!(sql.ends_with("\"created_at\" TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n)"));
    }

    #[test]
    fn test_create_table_mysql() {
        let schema = profile_schema(&orders(), DialectKind::MySql.dialect()).unwrap();
        let sql = generate_create_table(DialectKind::MySql.dialect(), "orders", &schema);

        assert!(sql.contains("`id` INT AUTO_INCREMENT PRIMARY KEY"));
        assert!(sql.contains("`order_no` INT NOT NULL"));
        assert!(sql.contains("`placed_at` DATETIME"));
    }

    #[test]
    fn test_existing_id_suppresses_surrogate_key() {
        let rows = rows(vec![json!({"ID": 1, "name": "a"})]);
        for kind in DialectKind::all() {
            let dialect = kind.dialect();
            let schema = profile_schema(&rows, dialect).unwrap();
            let sql = generate_create_table(dialect, "people", &schema);
            assert!(!sql.contains("PRIMARY KEY"), "{kind}: {sql}");
            assert!(sql.contains("created_at"), "{kind}: {sql}");
        }
    }

    #[test]
    fn test_added_columns_are_nullable() {
        let schema = profile_schema(&orders(), DialectKind::SqlServer.dialect()).unwrap();
        let statements =
            generate_add_columns(DialectKind::SqlServer.dialect(), "orders", &schema[3..]);
        assert_eq!(
            statements,
            vec!["ALTER TABLE [orders] ADD [note] NVARCHAR(255)".to_string()]
        );
    }

    #[test]
    fn test_insert_keeps_row_key_order() {
        let row = &orders()[0];
        let stmt = generate_insert(DialectKind::Oracle.dialect(), "orders", row).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"orders\" (\"order_no\", \"placed_at\", \"total\", \"note\") VALUES ($1, $2, $3, $4)"
        );
        assert_eq!(stmt.values[0], json!(7));
        assert_eq!(stmt.values[1], json!(null));
    }
}
