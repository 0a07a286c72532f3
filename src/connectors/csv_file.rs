//! CSV file source

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::convert::coerce_text;
use super::error::{ConnectorError, ConnectorResult};
use super::settings::{FileSettings, parse_settings};
use super::{ConnectionHandle, Connector, ConnectorKind, ExtractRequest, TestConnectionResult};
use crate::models::{ConnectionConfig, Row};

/// Reads a delimited file with a header row
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvConnector;

/// Parse CSV text; column names come from the header row
pub(crate) fn parse_csv(text: &str, delimiter: u8, coerce_types: bool) -> ConnectorResult<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim().trim_start_matches('\u{feff}');
            if h.is_empty() {
                format!("column_{}", i + 1)
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let cell = record.get(i);
                let value = match cell {
                    None => Value::Null,
                    Some(text) if coerce_types => coerce_text(text),
                    Some(text) => Value::String(text.to_string()),
                };
                (name.clone(), value)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

#[async_trait]
impl Connector for CsvConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Csv
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> TestConnectionResult {
        let settings: FileSettings = match parse_settings(config) {
            Ok(s) => s,
            Err(e) => return TestConnectionResult::failed("Invalid file settings", e),
        };
        if let Err(e) = settings.delimiter_byte() {
            return TestConnectionResult::failed("Invalid file settings", e);
        }
        match tokio::fs::metadata(&settings.file_path).await {
            Ok(meta) if meta.is_file() => TestConnectionResult::ok("File is readable")
                .with_detail("path", settings.file_path.clone())
                .with_detail("size", meta.len()),
            Ok(_) => TestConnectionResult::failed("Path is not a file", &settings.file_path)
                .with_detail("path", settings.file_path.clone()),
            Err(e) => TestConnectionResult::failed("File not accessible", e)
                .with_detail("path", settings.file_path.clone()),
        }
    }

    async fn extract_data(
        &self,
        config: &ConnectionConfig,
        _request: &ExtractRequest,
    ) -> ConnectorResult<Vec<Row>> {
        let settings: FileSettings = parse_settings(config)?;
        let delimiter = settings.delimiter_byte()?;
        let text = tokio::fs::read_to_string(&settings.file_path).await?;
        let rows = parse_csv(&text, delimiter, settings.coerce_types)?;
        debug!(path = %settings.file_path, rows = rows.len(), "Parsed CSV file");
        Ok(rows)
    }

    async fn get_connection(
        &self,
        _config: &ConnectionConfig,
    ) -> ConnectorResult<Box<dyn ConnectionHandle>> {
        Err(ConnectorError::Unsupported(
            "CSV files are source-only and cannot be loaded into".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_names_and_raw_strings() {
        let rows = parse_csv("name,age\nAda,36\nBob,\n", b',', false).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["name", "age"]);
        assert_eq!(rows[0]["age"], json!("36"));
        assert_eq!(rows[1]["age"], json!(""));
    }

    #[test]
    fn test_coerced_cells() {
        let rows = parse_csv("id;ok;score\n1;true;2.5\n2;false;\n", b';', true).unwrap();
        assert_eq!(rows[0]["id"], json!(1));
        assert_eq!(rows[0]["ok"], json!(true));
        assert_eq!(rows[0]["score"], json!(2.5));
        assert_eq!(rows[1]["score"], Value::Null);
    }

    #[test]
    fn test_short_records_fill_null() {
        let rows = parse_csv("a,b,\n1\n", b',', false).unwrap();
        assert_eq!(rows[0]["a"], json!("1"));
        assert_eq!(rows[0]["b"], Value::Null);
        assert!(rows[0].contains_key("column_3"));
    }
}
