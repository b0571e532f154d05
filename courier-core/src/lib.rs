// ABOUTME: Per-task serialized message dispatch for remote agents.
// ABOUTME: Keyed serializer, task message channel, update handler seam, and task persistence.

pub mod channel;
pub mod config;
pub mod journal;
pub mod metrics;
pub mod paths;
pub mod queue;
pub mod serializer;
pub mod store;

pub use channel::{DispatchError, DispatchOutcome, TaskMessageChannel, UpdateHandler, UserMessage};
pub use config::Config;
pub use journal::JournalingHandler;
pub use queue::TaskQueue;
pub use serializer::KeyedSerializer;
pub use store::{
    InMemoryTaskStore, SqliteTaskStore, StoreError, StoreOp, TaskAndHistory, TaskStore,
};

// Re-export courier-agent types
pub use courier_agent::{AgentRegistry, RemoteAgent};
