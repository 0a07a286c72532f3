//! Output formatting for CLI

use crate::inference::InferredColumn;
use crate::models::{ExecutionUpdate, LogEntry, LogLevel};
use crate::runner::RunReport;

fn level_marker(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "  ",
        LogLevel::Success => "✅",
        LogLevel::Warning => "⚠️ ",
        LogLevel::Error => "❌",
    }
}

/// One execution log line
pub fn format_log_entry(entry: &LogEntry) -> String {
    let mut line = format!(
        "{} {} {}",
        entry.timestamp.format("%H:%M:%S%.3f"),
        level_marker(entry.level),
        entry.message
    );
    if let Some(context) = &entry.context {
        line.push_str(&format!("  {context}"));
    }
    line
}

/// Final status of an execution
pub fn format_execution_state(update: &ExecutionUpdate) -> String {
    let mut output = format!("\nStatus: {}\n", update.status);
    if let Some(records) = update.records_processed {
        output.push_str(&format!("Records processed: {records}\n"));
    }
    if let Some(error) = &update.error_message {
        output.push_str(&format!("Error: {error}\n"));
    }
    output
}

/// Per-strategy summary of a completed run
pub fn format_run_report(report: &RunReport) -> String {
    let mut output = format!(
        "\nTask {} ({}) finished in {} ms\n",
        report.task_id, report.execution_id, report.duration_ms
    );
    output.push_str(&format!("Rows extracted: {}\n", report.rows_extracted));
    for outcome in &report.outcomes {
        match outcome.rows() {
            Some(rows) => output.push_str(&format!(
                "  - {}: {} succeeded, {} failed of {}\n",
                outcome.strategy, rows.succeeded, rows.failed, rows.total
            )),
            None => output.push_str(&format!("  - {}: ok\n", outcome.strategy)),
        }
    }
    output
}

/// Inferred columns as an aligned table
pub fn format_schema(columns: &[InferredColumn]) -> String {
    let width = columns.iter().map(|c| c.name.len()).max().unwrap_or(0).max(6);
    let mut output = format!("{:<width$}  {:<16}  {:<20}  nullable\n", "column", "portable", "sql");
    for column in columns {
        output.push_str(&format!(
            "{:<width$}  {:<16}  {:<20}  {}\n",
            column.name,
            column.portable_type.to_string(),
            column.sql_type,
            if column.nullable { "yes" } else { "no" }
        ));
    }
    output
}
