// ABOUTME: Durable mapping from task id to the task record and its message history.
// ABOUTME: Defines the TaskStore trait and its error type; in-memory and SQLite implementations live in submodules.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use crate::config::{StoreConfig, StoreType};
use async_trait::async_trait;
use courier_agent::{Message, Task, TaskState, TaskStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Store operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Load,
    Save,
    Delete,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Save => write!(f, "save"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task store {op} failed for task '{task_id}': {source}")]
    Internal {
        op: StoreOp,
        task_id: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn internal(op: StoreOp, task_id: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Internal {
            op,
            task_id: task_id.into(),
            source: source.into(),
        }
    }

    pub fn task_id(&self) -> &str {
        match self {
            Self::Internal { task_id, .. } => task_id,
        }
    }

    pub fn op(&self) -> StoreOp {
        match self {
            Self::Internal { op, .. } => *op,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A task together with the messages exchanged for it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskAndHistory {
    pub task: Task,
    #[serde(default)]
    pub history: Vec<Message>,
}

impl TaskAndHistory {
    /// Fresh record for a task the agent has not reported on yet
    pub fn submitted(task_id: impl Into<String>, session_id: Option<String>) -> Self {
        let mut status = TaskStatus::new(TaskState::Submitted);
        status.timestamp = Some(chrono::Utc::now().to_rfc3339());
        Self {
            task: Task {
                id: task_id.into(),
                session_id,
                status,
                artifacts: None,
                metadata: None,
            },
            history: Vec::new(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task.id
    }
}

/// Persistence for task records, keyed by task id
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// `Ok(None)` when the task has never been saved
    async fn load(&self, task_id: &str) -> StoreResult<Option<TaskAndHistory>>;

    /// Insert or replace the record for `data.task.id`
    async fn save(&self, data: &TaskAndHistory) -> StoreResult<()>;

    /// Remove a task; removing an unknown task is not an error
    async fn delete(&self, task_id: &str) -> StoreResult<()>;
}

/// Open the store selected by the [store] config section
pub fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn TaskStore>> {
    match config.store_type {
        StoreType::Memory => Ok(Arc::new(InMemoryTaskStore::new())),
        StoreType::Sqlite => {
            let path = config.resolved_path();
            tracing::info!(path = %path.display(), "Opening SQLite task store");
            Ok(Arc::new(SqliteTaskStore::open(&path)?))
        }
    }
}
