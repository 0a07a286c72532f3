//! Task-config and execution-status stores

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use super::error::StoreError;
use crate::models::{ExecutionUpdate, TaskDefinition};

/// Where task definitions are read and execution status is persisted
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load a task by id
    async fn load_task(&self, task_id: &str) -> Result<TaskDefinition, StoreError>;

    /// Persist a status change for an execution
    async fn update_execution(
        &self,
        execution_id: Uuid,
        update: ExecutionUpdate,
    ) -> Result<(), StoreError>;
}

/// In-memory store keeping every status change per execution
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<String, TaskDefinition>>,
    executions: Mutex<HashMap<Uuid, Vec<ExecutionUpdate>>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task, returning the store
    pub fn with_task(self, task: TaskDefinition) -> Self {
        self.insert_task(task);
        self
    }

    /// Add or replace a task
    pub fn insert_task(&self, task: TaskDefinition) {
        if let Ok(mut tasks) = self.tasks.write() {
            tasks.insert(task.id.clone(), task);
        }
    }

    /// Ids of all stored tasks, sorted
    pub fn task_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tasks
            .read()
            .map(|tasks| tasks.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Every update recorded for an execution, oldest first
    pub fn execution_history(&self, execution_id: Uuid) -> Vec<ExecutionUpdate> {
        self.executions
            .lock()
            .ok()
            .and_then(|executions| executions.get(&execution_id).cloned())
            .unwrap_or_default()
    }

    /// Most recent update for an execution
    pub fn latest(&self, execution_id: Uuid) -> Option<ExecutionUpdate> {
        self.execution_history(execution_id).pop()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn load_task(&self, task_id: &str) -> Result<TaskDefinition, StoreError> {
        let tasks = self
            .tasks
            .read()
            .map_err(|_| StoreError::Backend("task lock poisoned".to_string()))?;
        tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| StoreError::TaskNotFound(task_id.to_string()))
    }

    async fn update_execution(
        &self,
        execution_id: Uuid,
        update: ExecutionUpdate,
    ) -> Result<(), StoreError> {
        self.executions
            .lock()
            .map_err(|_| StoreError::Backend("execution lock poisoned".to_string()))?
            .entry(execution_id)
            .or_default()
            .push(update);
        Ok(())
    }
}
