// ABOUTME: Configuration for selecting and connecting to a remote agent.
// ABOUTME: Deserialized from the [agent] TOML section; the type field picks a registry factory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Agent configuration with type discriminator
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent type: "a2a" or "mock"
    #[serde(rename = "type", default = "default_agent_type")]
    pub agent_type: String,
    /// Base URL of the agent (the JSON-RPC endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Whole-request timeout; unset means streams may stay open indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Extra HTTP headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_agent_type() -> String {
    "a2a".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_type: default_agent_type(),
            url: None,
            auth_token: None,
            timeout_secs: None,
            headers: HashMap::new(),
        }
    }
}

// Custom Debug impl to redact auth_token and header values
impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&String> = self.headers.keys().collect();
        f.debug_struct("AgentConfig")
            .field("agent_type", &self.agent_type)
            .field("url", &self.url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("headers", &header_names)
            .finish()
    }
}

impl AgentConfig {
    /// Config for an A2A agent at the given URL
    pub fn a2a(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Get agent type name
    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
