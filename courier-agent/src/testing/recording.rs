// ABOUTME: Recording and replay infrastructure for transcript-based testing.
// ABOUTME: Captures what a remote agent streamed for each message so it can be replayed deterministically.

use crate::event::TaskUpdate;
use crate::part::Message;
use crate::task::TaskSendParams;
use crate::traits::{RemoteAgent, UpdateStream};
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// One message sent to the agent and everything it streamed back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub timestamp: std::time::SystemTime,
    pub task_id: String,
    pub session_id: Option<String>,
    pub message: Message,
    pub updates: Vec<TaskUpdate>,
    /// Send rejection or mid-stream failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The send call itself failed; no stream was opened
    #[serde(default)]
    pub rejected: bool,
}

impl Interaction {
    fn started(params: &TaskSendParams) -> Self {
        Self {
            timestamp: std::time::SystemTime::now(),
            task_id: params.id.clone(),
            session_id: params.session_id.clone(),
            message: params.message.clone(),
            updates: Vec::new(),
            error: None,
            rejected: false,
        }
    }
}

type Transcript = Arc<Mutex<Vec<Interaction>>>;

/// Records all interactions for later replay
pub struct RecordingAgent {
    inner: Arc<dyn RemoteAgent>,
    transcript: Transcript,
}

impl RecordingAgent {
    /// Wrap a RemoteAgent to record all interactions
    pub fn wrap(inner: Arc<dyn RemoteAgent>) -> Self {
        Self {
            inner,
            transcript: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get a copy of the current transcript
    pub fn transcript(&self) -> Vec<Interaction> {
        self.transcript
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Save transcript to a file
    pub async fn save_transcript(&self, path: &Path) -> Result<()> {
        let transcript = self.transcript();
        let json = serde_json::to_string_pretty(&transcript)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

/// Accumulates one interaction and commits it to the transcript when dropped,
/// so streams abandoned early are still recorded.
struct Capture {
    transcript: Transcript,
    interaction: Option<Interaction>,
}

impl Capture {
    fn observe(&mut self, item: &Result<Option<TaskUpdate>>) {
        if let Some(interaction) = self.interaction.as_mut() {
            match item {
                Ok(Some(update)) => interaction.updates.push(update.clone()),
                Ok(None) => {}
                Err(e) => interaction.error = Some(e.to_string()),
            }
        }
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        if let Some(interaction) = self.interaction.take() {
            self.transcript
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(interaction);
        }
    }
}

impl RemoteAgent for RecordingAgent {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn send_subscribe<'a>(&'a self, params: TaskSendParams) -> BoxFuture<'a, Result<UpdateStream<'a>>> {
        Box::pin(async move {
            let mut capture = Capture {
                transcript: Arc::clone(&self.transcript),
                interaction: Some(Interaction::started(&params)),
            };

            let stream = match self.inner.send_subscribe(params).await {
                Ok(stream) => stream,
                Err(e) => {
                    if let Some(interaction) = capture.interaction.as_mut() {
                        interaction.error = Some(e.to_string());
                        interaction.rejected = true;
                    }
                    return Err(e);
                }
            };

            let recorded: UpdateStream<'a> = stream
                .map(move |item| {
                    capture.observe(&item);
                    item
                })
                .boxed();
            Ok(recorded)
        })
    }
}

/// Replays recorded interactions
pub struct ReplayAgent {
    transcript: Mutex<VecDeque<Interaction>>,
}

impl ReplayAgent {
    /// Create a replay agent from a transcript
    pub fn from_transcript(transcript: Vec<Interaction>) -> Self {
        Self {
            transcript: Mutex::new(transcript.into()),
        }
    }

    /// Load a transcript from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        let transcript: Vec<Interaction> = serde_json::from_str(&json)?;
        Ok(Self::from_transcript(transcript))
    }

    /// Interactions not yet replayed
    pub fn remaining(&self) -> usize {
        self.transcript
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl RemoteAgent for ReplayAgent {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn send_subscribe<'a>(&'a self, params: TaskSendParams) -> BoxFuture<'a, Result<UpdateStream<'a>>> {
        Box::pin(async move {
            let text = params.message.text();
            let interaction = {
                let mut t = self.transcript.lock().unwrap_or_else(|e| e.into_inner());
                t.iter()
                    .position(|i| i.message.text() == text)
                    .and_then(|idx| t.remove(idx))
            };

            let interaction = interaction
                .ok_or_else(|| anyhow!("No recorded interaction for message: {}", text))?;

            if interaction.rejected {
                return Err(anyhow!(interaction
                    .error
                    .unwrap_or_else(|| "send rejected".to_string())));
            }

            let mut items: Vec<Result<Option<TaskUpdate>>> =
                interaction.updates.into_iter().map(|u| Ok(Some(u))).collect();
            if let Some(error) = interaction.error {
                items.push(Err(anyhow!(error)));
            }
            let stream: UpdateStream<'a> = futures::stream::iter(items).boxed();
            Ok(stream)
        })
    }
}
