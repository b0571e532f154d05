// ABOUTME: UpdateHandler wrapper that journals each task's conversation into a TaskStore.
// ABOUTME: Records the user turn, status changes, agent messages, and artifacts before delegating.

use crate::channel::{UpdateHandler, UserMessage};
use crate::store::{TaskAndHistory, TaskStore};
use anyhow::Result;
use async_trait::async_trait;
use courier_agent::{Artifact, Message, TaskArtifactUpdateEvent, TaskStatusUpdateEvent};
use std::sync::Arc;

/// Persists what flows through the channel, then hands each call to `inner`.
///
/// Because the channel serializes per task, load-modify-save here never races
/// another message of the same task.
pub struct JournalingHandler<H> {
    inner: H,
    store: Arc<dyn TaskStore>,
}

impl<H> JournalingHandler<H> {
    pub fn new(inner: H, store: Arc<dyn TaskStore>) -> Self {
        Self { inner, store }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    async fn load_or_create<C>(&self, message: &UserMessage<C>) -> Result<TaskAndHistory> {
        Ok(self
            .store
            .load(&message.task_id)
            .await?
            .unwrap_or_else(|| {
                TaskAndHistory::submitted(message.task_id.as_str(), message.session_id.clone())
            }))
    }
}

#[async_trait]
impl<C, H> UpdateHandler<C> for JournalingHandler<H>
where
    C: Send + Sync,
    H: UpdateHandler<C>,
{
    async fn on_message_sent(&self, message: &UserMessage<C>) -> Result<()> {
        let mut record = self.load_or_create(message).await?;
        record.history.push(Message::user(message.parts.clone()));
        self.store.save(&record).await?;
        self.inner.on_message_sent(message).await
    }

    async fn on_status_update(
        &self,
        message: &UserMessage<C>,
        event: &TaskStatusUpdateEvent,
    ) -> Result<()> {
        let mut record = self.load_or_create(message).await?;
        record.task.status = event.status.clone();
        if let Some(agent_message) = &event.status.message {
            record.history.push(agent_message.clone());
        }
        self.store.save(&record).await?;

        tracing::debug!(
            task_id = %message.task_id,
            state = %event.status.state,
            "Journaled status update"
        );
        self.inner.on_status_update(message, event).await
    }

    async fn on_artifact_update(
        &self,
        message: &UserMessage<C>,
        event: &TaskArtifactUpdateEvent,
    ) -> Result<()> {
        let mut record = self.load_or_create(message).await?;
        merge_artifact(
            record.task.artifacts.get_or_insert_with(Vec::new),
            &event.artifact,
        );
        self.store.save(&record).await?;
        self.inner.on_artifact_update(message, event).await
    }
}

/// Fold a streamed artifact chunk into the task's artifact list.
///
/// A chunk with `append` extends the artifact at the same index; any other
/// chunk replaces it, or is added when the index is new.
pub fn merge_artifact(artifacts: &mut Vec<Artifact>, chunk: &Artifact) {
    match artifacts.iter_mut().find(|a| a.index == chunk.index) {
        Some(existing) if chunk.append == Some(true) => {
            existing.parts.extend(chunk.parts.iter().cloned());
            existing.last_chunk = chunk.last_chunk;
            if chunk.metadata.is_some() {
                existing.metadata = chunk.metadata.clone();
            }
        }
        Some(existing) => *existing = chunk.clone(),
        None => artifacts.push(chunk.clone()),
    }
}
