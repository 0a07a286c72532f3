//! `profile` command: show the schema a task would create

use std::path::Path;

use super::resolve_connector;
use crate::cli::error::CliError;
use crate::cli::output::format_schema;
use crate::config::TransferConfig;
use crate::connectors::{ConnectorRegistry, ExtractRequest};
use crate::ddl::generate_create_table;
use crate::inference::SchemaProfiler;

/// Handle the `profile` command
pub async fn handle_profile(config_path: &Path, task_id: &str) -> Result<(), CliError> {
    let config = TransferConfig::load(config_path)?;
    let task = config.task(task_id)?;
    let registry = ConnectorRegistry::with_defaults();

    let (_, source) = resolve_connector(&registry, &task.source_type)?;
    let (target_kind, _) = resolve_connector(&registry, &task.target_type)?;
    let dialect = target_kind
        .dialect()
        .ok_or_else(|| {
            CliError::InvalidArgument(format!("target '{target_kind}' is not a SQL engine"))
        })?
        .dialect();

    let request = ExtractRequest {
        query: task.source_query.clone(),
        worksheet: task.source_worksheet.clone(),
    };
    let rows = source.extract_data(&task.source_config, &request).await?;
    eprintln!("Extracted {} rows", rows.len());

    let columns = SchemaProfiler::new().profile(&rows, dialect)?;
    println!("{}", format_schema(&columns));
    println!(
        "{};",
        generate_create_table(dialect, &task.target_table, &columns)
    );
    Ok(())
}
