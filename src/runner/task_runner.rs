//! End-to-end execution of one task

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::error::{RunError, RunResult};
use super::gate::{ConnectorGate, StaticConnectorGate};
use super::sink::{ExecutionLog, ExecutionLogger};
use super::store::TaskStore;
use crate::connectors::{Connector, ConnectorKind, ConnectorRegistry, ExtractRequest};
use crate::dialect::Dialect;
use crate::inference::{ProfilerConfig, SchemaProfiler};
use crate::models::{ExecutionUpdate, LogLevel, TaskDefinition};
use crate::strategy::{Strategy, StrategyExecutor, StrategyOutcome};

/// Summary of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub execution_id: Uuid,
    pub task_id: String,
    pub rows_extracted: usize,
    pub records_processed: u64,
    pub outcomes: Vec<StrategyOutcome>,
    pub duration_ms: u64,
}

/// A task resolved and validated before any I/O
struct RunPlan {
    task: TaskDefinition,
    source_kind: ConnectorKind,
    source: Arc<dyn Connector>,
    target_kind: ConnectorKind,
    target: Arc<dyn Connector>,
    dialect: &'static dyn Dialect,
    strategies: Vec<String>,
}

/// Loads tasks, moves their data, and persists execution status
pub struct TaskRunner {
    store: Arc<dyn TaskStore>,
    log: Arc<dyn ExecutionLog>,
    registry: ConnectorRegistry,
    gate: Arc<dyn ConnectorGate>,
    profiler: ProfilerConfig,
}

impl TaskRunner {
    /// Runner with every registered connector enabled
    pub fn new(
        store: Arc<dyn TaskStore>,
        log: Arc<dyn ExecutionLog>,
        registry: ConnectorRegistry,
    ) -> Self {
        Self {
            store,
            log,
            registry,
            gate: Arc::new(StaticConnectorGate::allow_all()),
            profiler: ProfilerConfig::default(),
        }
    }

    /// Restrict connectors through `gate`
    pub fn with_gate(mut self, gate: Arc<dyn ConnectorGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Profile source rows with `config`
    pub fn with_profiler_config(mut self, config: ProfilerConfig) -> Self {
        self.profiler = config;
        self
    }

    /// Run `task_id` in the background, recording status under `execution_id`
    pub fn spawn(
        self: &Arc<Self>,
        task_id: impl Into<String>,
        execution_id: Uuid,
    ) -> JoinHandle<RunResult<RunReport>> {
        let runner = Arc::clone(self);
        let task_id = task_id.into();
        tokio::spawn(async move { runner.run(&task_id, execution_id).await })
    }

    /// Run a task to completion.
    ///
    /// Once the run is marked `running`, its final status (`success` or
    /// `failed`) is written to the task store before returning. A store that
    /// rejects the success update gets a `failed` update instead.
    pub async fn run(&self, task_id: &str, execution_id: Uuid) -> RunResult<RunReport> {
        let span = info_span!("task_run", task_id = %task_id, execution_id = %execution_id);
        async move {
            let start = Instant::now();
            let logger = ExecutionLogger::new(Arc::clone(&self.log), execution_id);

            if let Err(e) = self
                .store
                .update_execution(execution_id, ExecutionUpdate::running())
                .await
            {
                warn!(error = %e, "Failed to persist running status");
                logger
                    .error(format!("Could not record execution start: {e}"))
                    .await;
                return Err(e.into());
            }
            logger.info(format!("Starting task {task_id}")).await;

            let result = match self.execute(task_id, &logger).await {
                Ok((rows_extracted, outcomes)) => {
                    let records_processed = records_processed(&outcomes, rows_extracted);
                    let duration_ms = start.elapsed().as_millis() as u64;
                    self.store
                        .update_execution(execution_id, ExecutionUpdate::success(records_processed))
                        .await
                        .map(|()| RunReport {
                            execution_id,
                            task_id: task_id.to_string(),
                            rows_extracted,
                            records_processed,
                            outcomes,
                            duration_ms,
                        })
                        .map_err(RunError::from)
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(report) => {
                    logger
                        .success(
                            "Task completed",
                            Some(json!({
                                "records_processed": report.records_processed,
                                "duration_ms": report.duration_ms,
                            })),
                        )
                        .await;
                    info!(
                        records_processed = report.records_processed,
                        duration_ms = report.duration_ms,
                        "Task completed"
                    );
                    Ok(report)
                }
                Err(e) => {
                    error!(error = %e, "Task failed");
                    logger.error(format!("Task failed: {e}")).await;
                    if let Err(store_err) = self
                        .store
                        .update_execution(execution_id, ExecutionUpdate::failed(e.to_string()))
                        .await
                    {
                        warn!(error = %store_err, "Failed to persist failed status");
                    }
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        task_id: &str,
        logger: &ExecutionLogger,
    ) -> RunResult<(usize, Vec<StrategyOutcome>)> {
        let task = self.store.load_task(task_id).await?;
        let plan = self.plan(task)?;

        for kind in [plan.source_kind, plan.target_kind] {
            if !self.gate.is_enabled(kind).await {
                return Err(RunError::ConnectorDisabled(kind));
            }
        }

        let extract_start = Instant::now();
        let request = ExtractRequest {
            query: plan.task.source_query.clone(),
            worksheet: plan.task.source_worksheet.clone(),
        };
        let rows = plan
            .source
            .extract_data(&plan.task.source_config, &request)
            .await?;
        let elapsed_ms = extract_start.elapsed().as_millis() as u64;
        info!(source = %plan.source_kind, rows = rows.len(), elapsed_ms, "Extracted source rows");
        logger
            .log(
                LogLevel::Info,
                format!(
                    "Extracted {} rows from {} in {} ms",
                    rows.len(),
                    plan.source_kind,
                    elapsed_ms
                ),
                Some(json!({"rows": rows.len(), "elapsed_ms": elapsed_ms})),
            )
            .await;

        let handle = plan
            .target
            .get_connection(&plan.task.target_config)
            .await?;

        let result = {
            let mut executor = StrategyExecutor::new(
                handle.as_ref(),
                plan.dialect,
                plan.task.target_table.as_str(),
                &rows,
            )
            .with_profiler(SchemaProfiler::with_config(self.profiler.clone()))
            .with_logger(logger.clone());
            executor.execute(&plan.strategies).await
        };

        if let Err(e) = plan.target.close_connection(handle).await {
            warn!(target = %plan.target_kind, error = %e, "Failed to close target connection");
            logger
                .warning(format!("Failed to close target connection: {e}"))
                .await;
        }

        Ok((rows.len(), result?))
    }

    /// Resolve connectors and validate the task without touching any system
    fn plan(&self, task: TaskDefinition) -> RunResult<RunPlan> {
        let (source_kind, source) = self.registry.resolve(&task.source_type)?;
        let (target_kind, target) = self.registry.resolve(&task.target_type)?;

        let dialect = target_kind
            .dialect()
            .ok_or_else(|| {
                RunError::Config(format!("target '{target_kind}' is not a SQL engine"))
            })?
            .dialect();

        if task.target_table.trim().is_empty() {
            return Err(RunError::Config("target_table is required".to_string()));
        }

        let strategies = task.loading_strategies.names();
        for name in &strategies {
            name.parse::<Strategy>()?;
        }

        Ok(RunPlan {
            task,
            source_kind,
            source,
            target_kind,
            target,
            dialect,
            strategies,
        })
    }
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("registry", &self.registry)
            .field("profiler", &self.profiler)
            .finish_non_exhaustive()
    }
}

/// Rows written by the last row strategy, else the extracted count
fn records_processed(outcomes: &[StrategyOutcome], rows_extracted: usize) -> u64 {
    outcomes
        .last()
        .and_then(StrategyOutcome::rows)
        .map_or(rows_extracted as u64, |rows| rows.succeeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{RowSummary, StrategyMetrics};

    #[test]
    fn test_records_processed_prefers_last_row_strategy() {
        let mut summary = RowSummary::new(10);
        for _ in 0..9 {
            summary.record_success();
        }
        summary.record_failure(4, "constraint");
        let outcomes = vec![
            StrategyOutcome::new(
                Strategy::CheckExists,
                StrategyMetrics::Exists {
                    exists: true,
                    cached: false,
                },
            ),
            StrategyOutcome::new(Strategy::AppendData, StrategyMetrics::Rows(summary)),
        ];
        assert_eq!(records_processed(&outcomes, 10), 9);
        assert_eq!(records_processed(&outcomes[..1], 10), 10);
        assert_eq!(records_processed(&[], 3), 3);
    }
}
