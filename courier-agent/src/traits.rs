// ABOUTME: Core RemoteAgent trait that every agent transport implements.
// ABOUTME: Defines the send-and-subscribe capability consumed by the message channel.

use crate::event::TaskUpdate;
use crate::task::TaskSendParams;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

/// Lazy, finite, non-restartable sequence of updates for one submitted message.
///
/// `Ok(None)` is a no-op tick and must be skipped by consumers. An `Err` item
/// means the transport or the remote side failed mid-stream.
pub type UpdateStream<'a> = BoxStream<'a, Result<Option<TaskUpdate>>>;

/// Capability to hand a task message to a remote agent and follow its progress.
///
/// Implementations must be safe to call concurrently for different tasks.
pub trait RemoteAgent: Send + Sync {
    /// Agent transport name for logging and metrics
    fn name(&self) -> &'static str;

    /// Send a message for a task and subscribe to the resulting updates
    ///
    /// The returned stream ends when the remote side closes it.
    fn send_subscribe<'a>(&'a self, params: TaskSendParams)
        -> BoxFuture<'a, Result<UpdateStream<'a>>>;
}
