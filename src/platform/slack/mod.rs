// ABOUTME: Slack Socket Mode bridge that turns thread messages into task messages for the agent.
// ABOUTME: One task per thread; replies are rendered back into the thread by SlackRenderer.

pub mod channel;

pub use channel::{SlackRenderer, SlackThread};

use anyhow::{Context, Result};
use courier_agent::Part;
use courier_core::config::SlackConfig;
use courier_core::{TaskMessageChannel, TaskQueue, UserMessage};
use slack_morphism::prelude::*;
use std::sync::Arc;

// =============================================================================
// Message filtering
// =============================================================================

/// The fields of a Slack message event the bridge routes on
#[derive(Debug, Clone, Default)]
pub struct SlackIncoming {
    pub user: Option<String>,
    pub bot_id: Option<String>,
    /// Edits, joins, bot posts and other non-plain messages carry a subtype
    pub has_subtype: bool,
    pub channel: Option<String>,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub text: String,
}

impl SlackIncoming {
    fn from_event(event: &SlackMessageEvent) -> Self {
        Self {
            user: event.sender.user.as_ref().map(|u| u.to_string()),
            bot_id: event.sender.bot_id.as_ref().map(|b| b.to_string()),
            has_subtype: event.subtype.is_some(),
            channel: event.origin.channel.as_ref().map(|c| c.to_string()),
            ts: event.origin.ts.to_string(),
            thread_ts: event.origin.thread_ts.as_ref().map(|ts| ts.to_string()),
            text: event
                .content
                .as_ref()
                .and_then(|c| c.text.clone())
                .unwrap_or_default(),
        }
    }
}

/// Decides which Slack messages reach the agent and how they are addressed
#[derive(Debug, Clone)]
pub struct MessageRouter {
    bot_user_id: String,
    config: SlackConfig,
}

impl MessageRouter {
    pub fn new(bot_user_id: impl Into<String>, config: SlackConfig) -> Self {
        Self {
            bot_user_id: bot_user_id.into(),
            config,
        }
    }

    /// Build the task message for an incoming Slack message, or None when it should be ignored
    pub fn route(&self, incoming: &SlackIncoming) -> Option<UserMessage<SlackThread>> {
        let user = incoming.user.as_deref()?;

        // Skip bot's own messages and anything posted by integrations
        if user == self.bot_user_id || incoming.bot_id.is_some() || incoming.has_subtype {
            return None;
        }

        if !self.config.is_user_allowed(user) {
            tracing::debug!(
                platform = "slack",
                user_id = %user,
                "Skipping message from non-allowed user"
            );
            return None;
        }

        let channel = incoming.channel.as_deref()?;
        if !self.config.is_channel_allowed(channel) {
            tracing::debug!(
                platform = "slack",
                channel_id = %channel,
                "Skipping message from non-allowed channel"
            );
            return None;
        }

        if incoming.text.trim().is_empty() {
            return None;
        }

        // A top-level message starts its own thread
        let root = incoming.thread_ts.as_deref().unwrap_or(&incoming.ts);
        let thread = SlackThread::new(channel, root);

        Some(
            UserMessage::new(
                thread.task_id(),
                vec![Part::text(incoming.text.as_str())],
                thread,
            )
            .with_session(channel),
        )
    }
}

// =============================================================================
// Socket Mode callbacks (must be fn pointers, not closures)
// =============================================================================

/// State shared with Socket Mode callbacks via `with_user_state()`
#[derive(Clone)]
struct BridgeState {
    router: MessageRouter,
    queue: Arc<TaskQueue<SlackThread>>,
}

async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let bridge = {
        let guard = states.read().await;
        guard
            .get_user_state::<BridgeState>()
            .cloned()
            .ok_or("BridgeState not found in user state")?
    };

    if let SlackEventCallbackBody::Message(msg_event) = event.event {
        let incoming = SlackIncoming::from_event(&msg_event);
        if let Some(message) = bridge.router.route(&incoming) {
            tracing::info!(
                platform = "slack",
                task_id = %message.task_id,
                "Dispatching Slack message to agent"
            );
            // Ack Slack right away; the queue keeps per-thread arrival order
            bridge.queue.submit(message);
        }
    }
    Ok(())
}

fn socket_mode_error_handler(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    tracing::error!(platform = "slack", error = %err, "Socket Mode error");
    HttpStatusCode::OK
}

// =============================================================================
// SlackBridge
// =============================================================================

/// Authenticated Slack connection that feeds thread messages into a TaskMessageChannel
pub struct SlackBridge {
    client: Arc<SlackHyperClient>,
    bot_token: SlackApiToken,
    app_token: SlackApiToken,
    bot_user_id: String,
    config: SlackConfig,
}

impl SlackBridge {
    /// Create the client and resolve the bot's user ID via `auth.test`
    pub async fn connect(config: SlackConfig) -> Result<Self> {
        let client = Arc::new(SlackClient::new(
            SlackClientHyperConnector::new().context("Failed to create Slack HTTP connector")?,
        ));

        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.bot_token.clone()));
        let app_token = SlackApiToken::new(SlackApiTokenValue(config.app_token.clone()));

        let session = client.open_session(&bot_token);
        let auth_response = session
            .auth_test()
            .await
            .context("Failed to call Slack auth.test, check bot_token")?;
        let bot_user_id = auth_response.user_id.to_string();

        tracing::info!(
            bot_user = %bot_user_id,
            team = %auth_response.team,
            "Slack bot authenticated"
        );
        if config.allowed_users.is_empty() {
            tracing::warn!("slack.allowed_users is empty, every message will be ignored");
        }

        Ok(Self {
            client,
            bot_token,
            app_token,
            bot_user_id,
            config,
        })
    }

    /// Handler that posts updates back into the originating thread
    pub fn renderer(&self) -> SlackRenderer {
        SlackRenderer::new(Arc::clone(&self.client), self.bot_token.clone())
    }

    /// Listen on Socket Mode until the process is interrupted
    pub async fn run(self, channel: Arc<TaskMessageChannel<SlackThread>>) -> Result<()> {
        let state = BridgeState {
            router: MessageRouter::new(self.bot_user_id.clone(), self.config.clone()),
            queue: Arc::new(TaskQueue::new(channel)),
        };

        let callbacks =
            SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_event);

        let listener_environment = Arc::new(
            SlackClientEventsListenerEnvironment::new(Arc::clone(&self.client))
                .with_error_handler(socket_mode_error_handler)
                .with_user_state(state),
        );

        let listener = SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment,
            callbacks,
        );

        listener
            .listen_for(&self.app_token)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start Socket Mode listener: {}", e))?;
        tracing::info!(platform = "slack", "Socket Mode connected");

        // serve() blocks until the listener is shut down
        listener.serve().await;
        tracing::info!(platform = "slack", "Socket Mode listener stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(users: &[&str], channels: &[&str]) -> SlackConfig {
        SlackConfig {
            app_token: "xapp-test".to_string(),
            bot_token: "xoxb-test".to_string(),
            allowed_users: users.iter().map(|u| u.to_string()).collect(),
            allowed_channels: channels.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn incoming(user: &str, channel: &str, text: &str) -> SlackIncoming {
        SlackIncoming {
            user: Some(user.to_string()),
            channel: Some(channel.to_string()),
            ts: "1700000000.000200".to_string(),
            text: text.to_string(),
            ..SlackIncoming::default()
        }
    }

    #[test]
    fn test_top_level_message_starts_task_keyed_by_its_ts() {
        let router = MessageRouter::new("UBOT", config(&["U1"], &[]));

        let message = router.route(&incoming("U1", "C1", "hello")).unwrap();

        assert_eq!(message.task_id, "C1:1700000000.000200");
        assert_eq!(message.session_id.as_deref(), Some("C1"));
        assert_eq!(message.context, SlackThread::new("C1", "1700000000.000200"));
        assert_eq!(message.parts, vec![Part::text("hello")]);
    }

    #[test]
    fn test_thread_reply_uses_thread_root() {
        let router = MessageRouter::new("UBOT", config(&["U1"], &[]));
        let mut reply = incoming("U1", "C1", "follow up");
        reply.thread_ts = Some("1700000000.000100".to_string());

        let message = router.route(&reply).unwrap();

        assert_eq!(message.task_id, "C1:1700000000.000100");
        assert_eq!(message.context.thread_ts, "1700000000.000100");
    }

    #[test]
    fn test_bot_and_integration_messages_are_skipped() {
        let router = MessageRouter::new("UBOT", config(&["U1", "UBOT"], &[]));
        assert!(router.route(&incoming("UBOT", "C1", "echo")).is_none());

        let mut from_app = incoming("U1", "C1", "hi");
        from_app.bot_id = Some("B1".to_string());
        assert!(router.route(&from_app).is_none());

        let mut edited = incoming("U1", "C1", "hi");
        edited.has_subtype = true;
        assert!(router.route(&edited).is_none());
    }

    #[test]
    fn test_allow_lists_are_enforced() {
        let router = MessageRouter::new("UBOT", config(&["U1"], &["C1"]));
        assert!(router.route(&incoming("U2", "C1", "hi")).is_none());
        assert!(router.route(&incoming("U1", "C2", "hi")).is_none());
        assert!(router.route(&incoming("U1", "C1", "hi")).is_some());
    }

    #[test]
    fn test_empty_user_list_allows_nobody() {
        let router = MessageRouter::new("UBOT", config(&[], &[]));
        assert!(router.route(&incoming("U1", "C1", "hi")).is_none());
    }

    #[test]
    fn test_blank_or_userless_messages_are_skipped() {
        let router = MessageRouter::new("UBOT", config(&["U1"], &[]));
        assert!(router.route(&incoming("U1", "C1", "   ")).is_none());

        let mut system = incoming("U1", "C1", "joined");
        system.user = None;
        assert!(router.route(&system).is_none());
    }
}
