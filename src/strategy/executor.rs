//! Sequential, fail-fast strategy pipeline

use std::collections::HashSet;

use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};

use super::error::{PipelineHalted, StrategyError, StrategyResult};
use super::state::RunState;
use super::types::{RowSummary, Strategy, StrategyMetrics, StrategyOutcome};
use crate::connectors::ConnectionHandle;
use crate::ddl::{
    DdlError, generate_add_columns, generate_create_table, generate_drop_table, generate_insert,
    generate_truncate_table, generate_upsert,
};
use crate::dialect::{Dialect, DialectKind};
use crate::inference::{InferredColumn, SchemaProfiler};
use crate::models::{LogLevel, Row};
use crate::runner::ExecutionLogger;

/// Runs named strategies against one target table.
///
/// The executor borrows the extracted rows and the target handle for one run;
/// existence checks and the profiled schema are cached in [`RunState`].
pub struct StrategyExecutor<'a> {
    rows: &'a [Row],
    conn: &'a dyn ConnectionHandle,
    table: String,
    dialect: &'static dyn Dialect,
    profiler: SchemaProfiler,
    state: RunState,
    logger: Option<ExecutionLogger>,
}

impl<'a> StrategyExecutor<'a> {
    /// Executor loading `rows` into `table` through `conn`
    pub fn new(
        conn: &'a dyn ConnectionHandle,
        dialect: &'static dyn Dialect,
        table: impl Into<String>,
        rows: &'a [Row],
    ) -> Self {
        Self {
            rows,
            conn,
            table: table.into(),
            dialect,
            profiler: SchemaProfiler::new(),
            state: RunState::default(),
            logger: None,
        }
    }

    /// Use a custom profiler
    pub fn with_profiler(mut self, profiler: SchemaProfiler) -> Self {
        self.profiler = profiler;
        self
    }

    /// Write step-by-step progress to an execution log
    pub fn with_logger(mut self, logger: ExecutionLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Cached run state
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Run `names` in order, stopping at the first failure.
    ///
    /// Unknown names are rejected when reached, so earlier strategies have
    /// already run and their outcomes are returned in [`PipelineHalted`].
    pub async fn execute<S: AsRef<str>>(
        &mut self,
        names: &[S],
    ) -> Result<Vec<StrategyOutcome>, PipelineHalted> {
        let mut completed = Vec::with_capacity(names.len());

        for name in names {
            let name = name.as_ref();
            let strategy = match name.parse::<Strategy>() {
                Ok(strategy) => strategy,
                Err(source) => {
                    self.log(LogLevel::Error, format!("Unknown strategy '{name}'"), None)
                        .await;
                    return Err(PipelineHalted {
                        strategy: name.to_string(),
                        source,
                        completed,
                    });
                }
            };

            let span = info_span!("strategy", strategy = strategy.name(), table = %self.table);
            self.log(LogLevel::Info, format!("Running {strategy}"), None)
                .await;

            match self.run(strategy).instrument(span).await {
                Ok(outcome) => {
                    self.log_outcome(&outcome).await;
                    completed.push(outcome);
                }
                Err(source) => {
                    warn!(strategy = strategy.name(), error = %source, "Strategy failed");
                    self.log(
                        LogLevel::Error,
                        format!("{strategy} failed: {source}"),
                        None,
                    )
                    .await;
                    return Err(PipelineHalted {
                        strategy: strategy.name().to_string(),
                        source,
                        completed,
                    });
                }
            }
        }

        Ok(completed)
    }

    /// Run one strategy
    pub async fn run(&mut self, strategy: Strategy) -> StrategyResult<StrategyOutcome> {
        let metrics = match strategy {
            Strategy::CheckExists => self.check_exists().await?,
            Strategy::CreateTable => self.create_table().await?,
            Strategy::DropTable => self.drop_table().await?,
            Strategy::TruncateTable => self.truncate_table().await?,
            Strategy::AlterAddColumns => self.alter_add_columns().await?,
            Strategy::AppendData => self.append_data().await?,
            Strategy::UpsertData => self.upsert_data().await?,
        };
        Ok(StrategyOutcome::new(strategy, metrics))
    }

    async fn check_exists(&mut self) -> StrategyResult<StrategyMetrics> {
        if let Some(exists) = self.state.cached_existence() {
            debug!(exists, "Using cached table existence");
            return Ok(StrategyMetrics::Exists {
                exists,
                cached: true,
            });
        }
        let exists = self.query_exists().await?;
        Ok(StrategyMetrics::Exists {
            exists,
            cached: false,
        })
    }

    async fn create_table(&mut self) -> StrategyResult<StrategyMetrics> {
        if self.ensure_existence().await? {
            return Ok(StrategyMetrics::Created {
                created: false,
                reason: Some("already_exists".to_string()),
                columns: 0,
            });
        }
        if self.rows.is_empty() {
            return Err(StrategyError::EmptySource(self.table.clone()));
        }

        let schema = self.source_schema()?;
        let sql = generate_create_table(self.dialect, &self.table, &schema);
        debug!(sql = %sql, "Creating table");
        self.conn.query(&sql, &[]).await?;
        self.state.table_created();

        info!(table = %self.table, columns = schema.len(), "Created table");
        Ok(StrategyMetrics::Created {
            created: true,
            reason: None,
            columns: schema.len(),
        })
    }

    async fn drop_table(&mut self) -> StrategyResult<StrategyMetrics> {
        let sql = generate_drop_table(self.dialect, &self.table);
        self.conn.query(&sql, &[]).await?;
        self.state.table_dropped();
        Ok(StrategyMetrics::Dropped { dropped: true })
    }

    async fn truncate_table(&mut self) -> StrategyResult<StrategyMetrics> {
        let sql = generate_truncate_table(self.dialect, &self.table);
        self.conn.query(&sql, &[]).await?;
        Ok(StrategyMetrics::Truncated { truncated: true })
    }

    async fn alter_add_columns(&mut self) -> StrategyResult<StrategyMetrics> {
        if !self.ensure_existence().await? {
            return Ok(StrategyMetrics::ColumnsAdded {
                added: Vec::new(),
                reason: Some("table_missing".to_string()),
            });
        }
        if self.rows.is_empty() {
            return Ok(StrategyMetrics::ColumnsAdded {
                added: Vec::new(),
                reason: Some("no_source_rows".to_string()),
            });
        }

        let schema = self.source_schema()?;
        let existing = self.live_columns().await?;
        let missing: Vec<InferredColumn> = schema
            .into_iter()
            .filter(|c| !existing.contains(&c.name.to_lowercase()))
            .collect();

        // Applied one at a time; a failure leaves earlier columns in place
        let mut added = Vec::with_capacity(missing.len());
        for (column, sql) in missing
            .iter()
            .zip(generate_add_columns(self.dialect, &self.table, &missing))
        {
            self.conn.query(&sql, &[]).await?;
            added.push(column.name.clone());
        }

        Ok(StrategyMetrics::ColumnsAdded {
            added,
            reason: None,
        })
    }

    async fn append_data(&mut self) -> StrategyResult<StrategyMetrics> {
        let mut summary = RowSummary::new(self.rows.len());
        for (index, row) in self.rows.iter().enumerate() {
            let result = match generate_insert(self.dialect, &self.table, row) {
                Ok(statement) => self.conn.execute(&statement).await.map_err(StrategyError::from),
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(_) => summary.record_success(),
                Err(e) => {
                    debug!(row = index + 1, error = %e, "Insert failed");
                    summary.record_failure(index, e);
                }
            }
        }
        Ok(StrategyMetrics::Rows(summary))
    }

    async fn upsert_data(&mut self) -> StrategyResult<StrategyMetrics> {
        if self.dialect.kind() == DialectKind::Oracle {
            return Err(StrategyError::Unsupported {
                strategy: Strategy::UpsertData,
                dialect: DialectKind::Oracle.name(),
            });
        }
        if self.rows.is_empty() {
            return Ok(StrategyMetrics::Rows(RowSummary::default()));
        }

        // The first profiled column is the conflict key
        let schema = self.source_schema()?;
        let key = schema.first().map(|c| c.name.clone());

        let mut summary = RowSummary::new(self.rows.len());
        for (index, row) in self.rows.iter().enumerate() {
            let statement = match &key {
                Some(key) => generate_upsert(self.dialect, &self.table, row, key),
                None => Err(DdlError::EmptyRow),
            };
            let result = match statement {
                Ok(statement) => self.conn.execute(&statement).await.map_err(StrategyError::from),
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(_) => summary.record_success(),
                Err(e) => {
                    debug!(row = index + 1, error = %e, "Upsert failed");
                    summary.record_failure(index, e);
                }
            }
        }
        Ok(StrategyMetrics::Rows(summary))
    }

    /// Cached existence, querying the catalog on first use
    async fn ensure_existence(&mut self) -> StrategyResult<bool> {
        match self.state.cached_existence() {
            Some(exists) => Ok(exists),
            None => self.query_exists().await,
        }
    }

    async fn query_exists(&mut self) -> StrategyResult<bool> {
        let statement = self.dialect.table_exists_query(&self.table);
        let result = self.conn.execute(&statement).await?;
        let exists = result.first_value().is_some_and(count_is_positive);
        self.state.observe_existence(exists);
        debug!(table = %self.table, exists, "Checked table existence");
        Ok(exists)
    }

    /// Lower-cased names of the columns the target table has now
    async fn live_columns(&self) -> StrategyResult<HashSet<String>> {
        let statement = self.dialect.list_columns_query(&self.table);
        let result = self.conn.execute(&statement).await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.values().next())
            .filter_map(Value::as_str)
            .map(str::to_lowercase)
            .collect())
    }

    fn source_schema(&mut self) -> StrategyResult<Vec<InferredColumn>> {
        if let Some(schema) = &self.state.source_schema {
            return Ok(schema.clone());
        }
        let schema = self.profiler.profile(self.rows, self.dialect)?;
        self.state.source_schema = Some(schema.clone());
        Ok(schema)
    }

    async fn log_outcome(&self, outcome: &StrategyOutcome) {
        let context = serde_json::to_value(outcome).ok();
        match outcome.rows() {
            Some(rows) if rows.failed > 0 => {
                self.log(
                    LogLevel::Warning,
                    format!(
                        "{} wrote {} of {} rows; {} failed",
                        outcome.strategy, rows.succeeded, rows.total, rows.failed
                    ),
                    context,
                )
                .await;
            }
            _ => {
                self.log(
                    LogLevel::Success,
                    format!("{} completed", outcome.strategy),
                    context,
                )
                .await;
            }
        }
    }

    async fn log(&self, level: LogLevel, message: String, context: Option<Value>) {
        if let Some(logger) = &self.logger {
            logger.log(level, message, context).await;
        }
    }
}

/// Interpret the first value of an existence query
fn count_is_positive(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64().is_some_and(|n| n > 0.0),
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(|n| n > 0.0),
        Value::Bool(b) => *b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_is_positive() {
        assert!(count_is_positive(&json!(1)));
        assert!(count_is_positive(&json!("2")));
        assert!(count_is_positive(&json!(true)));
        assert!(!count_is_positive(&json!(0)));
        assert!(!count_is_positive(&json!("0")));
        assert!(!count_is_positive(&Value::Null));
    }
}
