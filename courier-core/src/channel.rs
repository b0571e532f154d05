// ABOUTME: Task message channel - sends user messages to a remote agent and routes streamed updates.
// ABOUTME: Messages for one task are processed strictly in order; failures are contained and reported as outcomes.

use crate::metrics;
use crate::serializer::KeyedSerializer;
use async_trait::async_trait;
use courier_agent::{
    Message, Part, RemoteAgent, TaskArtifactUpdateEvent, TaskSendParams, TaskStatusUpdateEvent,
};
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;

/// A message from the local side addressed to one task.
///
/// `context` is carried through to handlers untouched, e.g. the chat thread a
/// reply should go to.
#[derive(Debug, Clone)]
pub struct UserMessage<C> {
    pub task_id: String,
    pub session_id: Option<String>,
    pub parts: Vec<Part>,
    pub context: C,
}

impl<C> UserMessage<C> {
    pub fn new(task_id: impl Into<String>, parts: Vec<Part>, context: C) -> Self {
        Self {
            task_id: task_id.into(),
            session_id: None,
            parts,
            context,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Receives the updates a remote agent streams back for a user message.
///
/// Invoked sequentially for one message, but concurrently across tasks.
/// Returning an error stops delivery of the rest of that message's stream.
#[async_trait]
pub trait UpdateHandler<C: Send + Sync>: Send + Sync {
    /// Called once the agent accepted the message, before any update
    async fn on_message_sent(&self, _message: &UserMessage<C>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_status_update(
        &self,
        message: &UserMessage<C>,
        event: &TaskStatusUpdateEvent,
    ) -> anyhow::Result<()>;

    async fn on_artifact_update(
        &self,
        message: &UserMessage<C>,
        event: &TaskArtifactUpdateEvent,
    ) -> anyhow::Result<()>;
}

#[async_trait]
impl<C, H> UpdateHandler<C> for Arc<H>
where
    C: Send + Sync,
    H: UpdateHandler<C> + ?Sized,
{
    async fn on_message_sent(&self, message: &UserMessage<C>) -> anyhow::Result<()> {
        (**self).on_message_sent(message).await
    }

    async fn on_status_update(
        &self,
        message: &UserMessage<C>,
        event: &TaskStatusUpdateEvent,
    ) -> anyhow::Result<()> {
        (**self).on_status_update(message, event).await
    }

    async fn on_artifact_update(
        &self,
        message: &UserMessage<C>,
        event: &TaskArtifactUpdateEvent,
    ) -> anyhow::Result<()> {
        (**self).on_artifact_update(message, event).await
    }
}

/// Why processing a message stopped early
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("task id must not be empty")]
    EmptyTaskId,

    /// The send call or the update stream failed
    #[error("remote agent failed: {0:#}")]
    Remote(anyhow::Error),

    #[error("{kind} handler failed: {error:#}")]
    Handler {
        kind: &'static str,
        error: anyhow::Error,
    },
}

impl DispatchError {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyTaskId => "empty_task_id",
            Self::Remote(_) => "remote",
            Self::Handler { .. } => "handler",
        }
    }
}

/// Result of processing one user message
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The stream ended normally; `updates` non-empty updates were handled
    Completed { updates: usize },
    Failed(DispatchError),
}

impl DispatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            Self::Failed(e) => Some(e),
            Self::Completed { .. } => None,
        }
    }
}

/// Sends user messages to a remote agent and routes the update stream to a handler,
/// one message at a time per task.
pub struct TaskMessageChannel<C: Send + Sync> {
    agent: Arc<dyn RemoteAgent>,
    handler: Arc<dyn UpdateHandler<C>>,
    serializer: KeyedSerializer,
}

impl<C: Send + Sync> TaskMessageChannel<C> {
    pub fn new(agent: Arc<dyn RemoteAgent>, handler: Arc<dyn UpdateHandler<C>>) -> Self {
        Self {
            agent,
            handler,
            serializer: KeyedSerializer::new(),
        }
    }

    /// Deliver a message and drain its updates. Never fails; problems are logged.
    pub async fn user_message(&self, message: UserMessage<C>) {
        let _ = self.dispatch(message).await;
    }

    /// Deliver a message and drain its updates, reporting how it went.
    ///
    /// Waits for every earlier message of the same task to finish first.
    pub async fn dispatch(&self, message: UserMessage<C>) -> DispatchOutcome {
        if message.task_id.is_empty() {
            tracing::warn!(
                session_id = ?message.session_id,
                parts = message.parts.len(),
                "Rejecting message with empty task id"
            );
            metrics::record_message("failed");
            metrics::record_error(DispatchError::EmptyTaskId.kind());
            return DispatchOutcome::Failed(DispatchError::EmptyTaskId);
        }

        let result = self
            .serializer
            .run(&message.task_id, || async {
                let _in_flight = metrics::InFlight::start();
                self.process_message(&message).await
            })
            .await;

        match result {
            Ok(updates) => {
                tracing::debug!(
                    task_id = %message.task_id,
                    updates,
                    "Message processed"
                );
                metrics::record_message("completed");
                DispatchOutcome::Completed { updates }
            }
            Err(error) => {
                tracing::error!(
                    task_id = %message.task_id,
                    session_id = ?message.session_id,
                    parts = message.parts.len(),
                    error = %error,
                    "Message processing failed"
                );
                metrics::record_message("failed");
                metrics::record_error(error.kind());
                DispatchOutcome::Failed(error)
            }
        }
    }

    /// Number of tasks with a message currently running or waiting
    pub fn active_tasks(&self) -> usize {
        self.serializer.active_keys()
    }

    async fn process_message(&self, message: &UserMessage<C>) -> Result<usize, DispatchError> {
        let params = TaskSendParams::new(
            message.task_id.as_str(),
            Message::user(message.parts.clone()),
        )
        .with_session(message.session_id.clone());

        tracing::debug!(
            task_id = %message.task_id,
            agent = self.agent.name(),
            parts = message.parts.len(),
            "Sending message to agent"
        );

        let mut updates = self
            .agent
            .send_subscribe(params)
            .await
            .map_err(DispatchError::Remote)?;

        self.handler
            .on_message_sent(message)
            .await
            .map_err(|error| DispatchError::Handler {
                kind: "message_sent",
                error,
            })?;

        let mut delivered = 0;
        while let Some(item) = updates.next().await {
            let update = match item.map_err(DispatchError::Remote)? {
                Some(update) => update,
                None => {
                    tracing::trace!(task_id = %message.task_id, "Skipping empty stream element");
                    continue;
                }
            };

            // A combined event reaches the status handler first, then the artifact handler
            if let Some(event) = update.status_event() {
                self.handler
                    .on_status_update(message, event)
                    .await
                    .map_err(|error| DispatchError::Handler {
                        kind: "status",
                        error,
                    })?;
                metrics::record_update("status");
            }
            if let Some(event) = update.artifact_event() {
                self.handler
                    .on_artifact_update(message, event)
                    .await
                    .map_err(|error| DispatchError::Handler {
                        kind: "artifact",
                        error,
                    })?;
                metrics::record_update("artifact");
            }
            delivered += 1;
        }

        Ok(delivered)
    }
}
