// ABOUTME: Root library module exposing the courier front ends
// ABOUTME: Console and Slack renderers, message composition, and logging setup

pub mod compose;
pub mod console;
pub mod logging;
pub mod platform;
pub mod render;

// Re-export platform-agnostic modules from courier-core
pub use courier_core::config;
pub use courier_core::metrics;
pub use courier_core::paths;

// Re-export courier-agent types for convenience
pub use courier_agent::{AgentRegistry, RemoteAgent, TaskUpdate};
