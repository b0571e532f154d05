// ABOUTME: Persistent TaskStore using a SQLite database.
// ABOUTME: One row per task holding the task and its history as JSON.

use super::{StoreError, StoreOp, StoreResult, TaskAndHistory, TaskStore};
use anyhow::Context;
use async_trait::async_trait;
use courier_agent::{Message, Task};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct SqliteTaskStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    /// Open (or create) the database at `path`, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create task store directory: {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database: {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                task_id TEXT PRIMARY KEY,
                task_json TEXT NOT NULL,
                history_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tasks table")?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn load(&self, task_id: &str) -> StoreResult<Option<TaskAndHistory>> {
        let fail = |e: Box<dyn std::error::Error + Send + Sync>| {
            StoreError::internal(StoreOp::Load, task_id, e)
        };

        let row: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT task_json, history_json FROM tasks WHERE task_id = ?1",
                params![task_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| fail(e.into()))?;

        let Some((task_json, history_json)) = row else {
            return Ok(None);
        };

        let task: Task = serde_json::from_str(&task_json).map_err(|e| fail(e.into()))?;
        let history: Vec<Message> =
            serde_json::from_str(&history_json).map_err(|e| fail(e.into()))?;
        Ok(Some(TaskAndHistory { task, history }))
    }

    async fn save(&self, data: &TaskAndHistory) -> StoreResult<()> {
        let task_id = data.task_id();
        let fail = |e: Box<dyn std::error::Error + Send + Sync>| {
            StoreError::internal(StoreOp::Save, task_id, e)
        };

        let task_json = serde_json::to_string(&data.task).map_err(|e| fail(e.into()))?;
        let history_json = serde_json::to_string(&data.history).map_err(|e| fail(e.into()))?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO tasks (task_id, task_json, history_json, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(task_id) DO UPDATE SET
                    task_json = excluded.task_json,
                    history_json = excluded.history_json,
                    updated_at = excluded.updated_at",
                params![task_id, task_json, history_json, now],
            )
            .map_err(|e| fail(e.into()))?;

        tracing::trace!(task_id = %task_id, history = data.history.len(), "Task saved");
        Ok(())
    }

    async fn delete(&self, task_id: &str) -> StoreResult<()> {
        let removed = self
            .conn()
            .execute("DELETE FROM tasks WHERE task_id = ?1", params![task_id])
            .map_err(|e| StoreError::internal(StoreOp::Delete, task_id, e))?;
        tracing::debug!(task_id = %task_id, removed, "Task deleted");
        Ok(())
    }
}
