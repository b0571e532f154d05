// ABOUTME: Fire-and-forget submission of task messages that keeps per-task arrival order.
// ABOUTME: One worker per task id drains its own FIFO queue into the TaskMessageChannel.

use crate::channel::{TaskMessageChannel, UserMessage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

struct Worker<C> {
    tx: mpsc::UnboundedSender<UserMessage<C>>,
    /// Submitted but not yet finished
    pending: usize,
}

type Workers<C> = Arc<Mutex<HashMap<String, Worker<C>>>>;

/// Hands messages to a channel without waiting for them.
///
/// `TaskMessageChannel::dispatch` orders messages by when their futures first
/// poll, so spawning one task per message can reorder a quick burst. The queue
/// fixes the order at `submit` time instead: messages for a task are processed
/// in the order they were submitted, and tasks still run independently.
pub struct TaskQueue<C: Send + Sync> {
    channel: Arc<TaskMessageChannel<C>>,
    workers: Workers<C>,
}

impl<C> TaskQueue<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(channel: Arc<TaskMessageChannel<C>>) -> Self {
        Self {
            channel,
            workers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Queue a message behind earlier submissions for the same task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, message: UserMessage<C>) {
        let mut workers = lock(&self.workers);
        let task_id = message.task_id.clone();
        let mut message = message;
        loop {
            let worker = workers.entry(task_id.clone()).or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(drain(
                    task_id.clone(),
                    rx,
                    Arc::clone(&self.channel),
                    Arc::clone(&self.workers),
                ));
                Worker { tx, pending: 0 }
            });
            match worker.tx.send(message) {
                Ok(()) => {
                    worker.pending += 1;
                    return;
                }
                // Worker died mid-message; start a fresh one
                Err(mpsc::error::SendError(returned)) => {
                    tracing::warn!(task_id = %task_id, "Task queue worker exited, restarting");
                    workers.remove(&task_id);
                    message = returned;
                }
            }
        }
    }

    /// Number of tasks with queued or running messages
    pub fn active_tasks(&self) -> usize {
        lock(&self.workers).len()
    }
}

async fn drain<C>(
    task_id: String,
    mut rx: mpsc::UnboundedReceiver<UserMessage<C>>,
    channel: Arc<TaskMessageChannel<C>>,
    workers: Workers<C>,
) where
    C: Send + Sync + 'static,
{
    while let Some(message) = rx.recv().await {
        channel.user_message(message).await;

        // Removing the entry drops the only sender, which ends the loop
        let mut table = lock(&workers);
        if let Some(worker) = table.get_mut(&task_id) {
            worker.pending -= 1;
            if worker.pending == 0 {
                table.remove(&task_id);
            }
        }
    }
    tracing::trace!(task_id = %task_id, "Task queue worker finished");
}

fn lock<C>(workers: &Workers<C>) -> std::sync::MutexGuard<'_, HashMap<String, Worker<C>>> {
    workers.lock().unwrap_or_else(|e| e.into_inner())
}
