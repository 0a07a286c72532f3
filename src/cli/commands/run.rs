//! `run` command: execute one configured task

use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::cli::error::CliError;
use crate::cli::output::{format_execution_state, format_log_entry, format_run_report};
use crate::config::TransferConfig;
use crate::connectors::ConnectorRegistry;
use crate::runner::{MemoryExecutionLog, MemoryTaskStore, TaskRunner};

/// Handle the `run` command; returns whether the task succeeded
pub async fn handle_run(config_path: &Path, task_id: &str) -> Result<bool, CliError> {
    let config = TransferConfig::load(config_path)?;
    // Resolve early so a bad task id is a config error, not a failed execution
    config.task(task_id)?;

    let store = Arc::new(config.task_store()?);
    let log = Arc::new(MemoryExecutionLog::new());
    let runner = TaskRunner::new(store.clone(), log.clone(), ConnectorRegistry::with_defaults())
        .with_gate(Arc::new(config.gate()?));

    let execution_id = Uuid::new_v4();
    eprintln!("Starting execution {execution_id} of task {task_id}");
    let result = runner.run(task_id, execution_id).await;

    print_entries(&log, execution_id);
    print_state(&store, execution_id);

    match result {
        Ok(report) => {
            println!("{}", format_run_report(&report));
            Ok(true)
        }
        Err(e) => {
            eprintln!("\n{}", e.user_message());
            Ok(false)
        }
    }
}

fn print_entries(log: &MemoryExecutionLog, execution_id: Uuid) {
    for entry in log.entries_for(execution_id) {
        println!("{}", format_log_entry(&entry));
    }
}

fn print_state(store: &MemoryTaskStore, execution_id: Uuid) {
    if let Some(update) = store.latest(execution_id) {
        print!("{}", format_execution_state(&update));
    }
}
