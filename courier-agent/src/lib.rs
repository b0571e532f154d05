// ABOUTME: Remote agent abstraction for courier.
// ABOUTME: A2A data model, the RemoteAgent trait, an HTTP+SSE client, and test doubles.

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod part;
pub mod registry;
pub mod sse;
pub mod task;
pub mod traits;

pub mod backends;
pub mod testing;

pub use client::A2AClient;
pub use config::AgentConfig;
pub use error::{AgentError, AgentResult, RpcError};
pub use event::{
    Artifact, TaskArtifactUpdateEvent, TaskState, TaskStatus, TaskStatusUpdateEvent, TaskUpdate,
};
pub use part::{FileContent, FileSource, Message, Part, Role};
pub use registry::{AgentFactory, AgentRegistry};
pub use task::{AgentCapabilities, AgentCard, Task, TaskIdParams, TaskQueryParams, TaskSendParams};
pub use traits::{RemoteAgent, UpdateStream};
