// ABOUTME: Tests for the AgentRegistry and AgentFactory pattern.
// ABOUTME: Validates runtime agent selection and creation from config.

use courier_agent::backends::mock::MockAgent;
use courier_agent::registry::{AgentFactory, AgentRegistry};
use courier_agent::{AgentConfig, Message, Part, RemoteAgent, TaskSendParams};
use futures::StreamExt;
use std::sync::Arc;

#[test]
fn test_registry_creates_mock_agent() {
    let registry = AgentRegistry::default();
    let agent = registry.create("mock", &AgentConfig::default()).unwrap();
    assert_eq!(agent.name(), "mock");
}

#[test]
fn test_registry_creates_a2a_agent() {
    let registry = AgentRegistry::default();
    let agent = registry
        .create_from_config(&AgentConfig::a2a("http://localhost:41241"))
        .unwrap();
    assert_eq!(agent.name(), "a2a");
}

#[test]
fn test_a2a_agent_requires_url() {
    let registry = AgentRegistry::default();
    let result = registry.create("a2a", &AgentConfig::default());
    match result {
        Err(err) => assert!(err.to_string().contains("agent.url is required")),
        Ok(_) => panic!("Expected error for missing url"),
    }
}

#[test]
fn test_registry_lists_available_agents() {
    let registry = AgentRegistry::default();
    assert_eq!(registry.available(), vec!["a2a", "mock"]);
}

#[test]
fn test_registry_unknown_agent_errors() {
    let registry = AgentRegistry::default();
    let mut config = AgentConfig::default();
    config.agent_type = "carrier-pigeon".to_string();
    match registry.create_from_config(&config) {
        Err(err) => assert!(err.to_string().contains("Unknown agent type: carrier-pigeon")),
        Ok(_) => panic!("Expected error for unknown agent type"),
    }
}

#[tokio::test]
async fn test_registry_custom_factory() {
    let factory: AgentFactory = Box::new(|_config| {
        let mock = MockAgent::new().on_message("ping").respond_text("pong");
        Ok(Arc::new(mock) as Arc<dyn RemoteAgent>)
    });

    let registry = AgentRegistry::new().register("custom", factory);
    let agent = registry.create("custom", &AgentConfig::default()).unwrap();

    let params = TaskSendParams::new("t1", Message::user(vec![Part::text("ping")]));
    let items: Vec<_> = agent.send_subscribe(params).await.unwrap().collect().await;
    assert_eq!(items.len(), 1);
}

#[test]
fn test_registry_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AgentRegistry>();
}
