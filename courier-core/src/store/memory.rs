// ABOUTME: Process-local TaskStore backed by a HashMap.
// ABOUTME: Used by tests and by the CLI when persistence is not wanted.

use super::{StoreResult, TaskAndHistory, TaskStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, TaskAndHistory>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load(&self, task_id: &str) -> StoreResult<Option<TaskAndHistory>> {
        Ok(self.tasks.read().await.get(task_id).cloned())
    }

    async fn save(&self, data: &TaskAndHistory) -> StoreResult<()> {
        self.tasks
            .write()
            .await
            .insert(data.task.id.clone(), data.clone());
        Ok(())
    }

    async fn delete(&self, task_id: &str) -> StoreResult<()> {
        self.tasks.write().await.remove(task_id);
        Ok(())
    }
}
