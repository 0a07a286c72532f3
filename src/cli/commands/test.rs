//! `test` command: check a configured connection

use std::path::Path;

use super::resolve_connector;
use crate::cli::error::CliError;
use crate::config::TransferConfig;
use crate::connectors::ConnectorRegistry;

/// Handle the `test` command; prints the result as JSON and returns its success flag
pub async fn handle_test(config_path: &Path, connection: &str) -> Result<bool, CliError> {
    let config = TransferConfig::load(config_path)?;
    let entry = config.connection(connection)?;
    let registry = ConnectorRegistry::with_defaults();
    let (_, connector) = resolve_connector(&registry, &entry.kind)?;

    let result = connector.test_connection(&entry.config()).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.success)
}
