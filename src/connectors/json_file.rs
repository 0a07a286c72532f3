//! JSON and JSON-lines file source

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::error::{ConnectorError, ConnectorResult};
use super::settings::{FileSettings, parse_settings};
use super::{ConnectionHandle, Connector, ConnectorKind, ExtractRequest, TestConnectionResult};
use crate::models::{ConnectionConfig, Row};

/// Reads a top-level array, an array under a key, or one object per line
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConnector;

fn is_json_lines(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jsonl") || e.eq_ignore_ascii_case("ndjson"))
}

fn into_row(value: Value, position: usize) -> ConnectorResult<Row> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ConnectorError::Parse(format!(
            "record {position} is not an object: {other}"
        ))),
    }
}

fn rows_from_array(values: Vec<Value>) -> ConnectorResult<Vec<Row>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| into_row(v, i + 1))
        .collect()
}

/// Parse JSON lines, skipping blank lines
pub(crate) fn parse_json_lines(text: &str) -> ConnectorResult<Vec<Row>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let value: Value = serde_json::from_str(line)
                .map_err(|e| ConnectorError::Parse(format!("line {}: {e}", i + 1)))?;
            into_row(value, i + 1)
        })
        .collect()
}

/// Parse a JSON document into rows; `key` selects an array inside an object
pub(crate) fn parse_json_document(text: &str, key: Option<&str>) -> ConnectorResult<Vec<Row>> {
    match (serde_json::from_str::<Value>(text)?, key) {
        (Value::Array(values), _) => rows_from_array(values),
        (Value::Object(mut map), Some(key)) => match map.remove(key) {
            Some(Value::Array(values)) => rows_from_array(values),
            Some(_) => Err(ConnectorError::Parse(format!("'{key}' is not an array"))),
            None => Err(ConnectorError::Parse(format!("key '{key}' not found"))),
        },
        (Value::Object(map), None) => {
            // A single array-valued key is unambiguous
            let mut arrays = map.into_iter().filter(|(_, v)| v.is_array());
            match (arrays.next(), arrays.next()) {
                (Some((_, Value::Array(values))), None) => rows_from_array(values),
                _ => Err(ConnectorError::Parse(
                    "expected a top-level array; set the worksheet to the key holding the records"
                        .to_string(),
                )),
            }
        }
        (other, _) => Err(ConnectorError::Parse(format!(
            "expected an array of objects, found {}",
            super::convert::value_as_text(&other).unwrap_or_default()
        ))),
    }
}

#[async_trait]
impl Connector for JsonConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Json
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> TestConnectionResult {
        let settings: FileSettings = match parse_settings(config) {
            Ok(s) => s,
            Err(e) => return TestConnectionResult::failed("Invalid file settings", e),
        };
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
        request: &ExtractRequest,
    ) -> ConnectorResult<Vec<Row>> {
        let settings: FileSettings = parse_settings(config)?;
        let path = Path::new(&settings.file_path);
        let text = tokio::fs::read_to_string(path).await?;

        let rows = if is_json_lines(path) {
            parse_json_lines(&text)?
        } else {
            let key = request
                .worksheet
                .as_deref()
                .or(request.query.as_deref())
                .map(str::trim)
                .filter(|k| !k.is_empty());
            parse_json_document(&text, key)?
        };

        debug!(path = %settings.file_path, rows = rows.len(), "Parsed JSON file");
        Ok(rows)
    }

    async fn get_connection(
        &self,
        _config: &ConnectionConfig,
    ) -> ConnectorResult<Box<dyn ConnectionHandle>> {
        Err(ConnectorError::Unsupported(
            "JSON files are source-only and cannot be loaded into".to_string(),
        ))
    }
}
