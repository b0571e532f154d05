// ABOUTME: Registry pattern for runtime agent selection.
// ABOUTME: Agents register factories, courier creates one by name from config.

use crate::config::AgentConfig;
use crate::traits::RemoteAgent;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory function that creates a RemoteAgent from config
pub type AgentFactory =
    Box<dyn Fn(&AgentConfig) -> Result<Arc<dyn RemoteAgent>> + Send + Sync>;

/// Registry for runtime agent selection
pub struct AgentRegistry {
    factories: HashMap<String, AgentFactory>,
}

impl AgentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register an agent factory by name
    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&AgentConfig) -> Result<Arc<dyn RemoteAgent>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    /// Create an agent by name with the given config
    pub fn create(&self, name: &str, config: &AgentConfig) -> Result<Arc<dyn RemoteAgent>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| anyhow!("Unknown agent type: {}", name))?;
        factory(config)
    }

    /// List available agent type names
    pub fn available(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Create the agent selected by `config.agent_type`
    pub fn create_from_config(&self, config: &AgentConfig) -> Result<Arc<dyn RemoteAgent>> {
        self.create(config.agent_type(), config)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        use crate::backends::mock::MockAgent;
        use crate::client::A2AClient;

        Self::new()
            .register("a2a", |config| {
                let client = A2AClient::from_config(config)?;
                Ok(Arc::new(client) as Arc<dyn RemoteAgent>)
            })
            .register("mock", MockAgent::factory())
    }
}
