// ABOUTME: A2A JSON-RPC client over HTTP with Server-Sent Events for streaming updates.
// ABOUTME: Implements RemoteAgent via tasks/sendSubscribe, plus tasks/get, tasks/cancel, and the agent card.

use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult, RpcError};
use crate::event::TaskUpdate;
use crate::sse;
use crate::task::{AgentCard, Task, TaskIdParams, TaskQueryParams, TaskSendParams};
use crate::traits::{RemoteAgent, UpdateStream};
use futures::future::BoxFuture;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const JSONRPC_VERSION: &str = "2.0";

/// Well-known path of the agent card relative to the agent's base URL
pub const AGENT_CARD_PATH: &str = ".well-known/agent.json";

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: T,
}

/// JSON-RPC 2.0 response envelope; `result` is kept raw so `null` survives
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Client for a remote agent speaking the A2A JSON-RPC protocol
#[derive(Clone)]
pub struct A2AClient {
    http: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
    request_id: Arc<AtomicU64>,
}

impl A2AClient {
    /// Create a client for the given JSON-RPC endpoint with a default HTTP client
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_http_client(endpoint, reqwest::Client::new())
    }

    /// Create a client with a pre-configured `reqwest::Client`
    pub fn with_http_client(endpoint: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            auth_token: None,
            request_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Build a client from the [agent] config section
    pub fn from_config(config: &AgentConfig) -> AgentResult<Self> {
        let endpoint = config
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AgentError::Config("agent.url is required for a2a agents".into()))?;

        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_str(key).map_err(|e| {
                AgentError::Config(format!("invalid header name '{}': {}", key, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                AgentError::Config(format!("invalid header value for '{}': {}", key, e))
            })?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {}", e)))?;

        let client = Self::with_http_client(endpoint, http);
        Ok(match &config.auth_token {
            Some(token) => client.with_auth_token(token.clone()),
            None => client,
        })
    }

    /// Set authentication token (builder pattern)
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.http.post(url);
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Fetch the agent card published under the agent's base URL
    pub async fn agent_card(&self, base_url: &str) -> AgentResult<AgentCard> {
        let card_url = format!("{}/{}", base_url.trim_end_matches('/'), AGENT_CARD_PATH);

        let mut req = self.http.get(&card_url).header(ACCEPT, "application/json");
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|source| AgentError::Network {
            operation: "agent card",
            source,
        })?;
        let body = read_success_body(response, "agent card").await?;

        serde_json::from_str(&body).map_err(|source| AgentError::Decode {
            what: "agent card",
            source,
        })
    }

    /// Retrieve a task's current state (`tasks/get`)
    pub async fn get_task(&self, params: TaskQueryParams) -> AgentResult<Task> {
        self.call("tasks/get", params).await
    }

    /// Ask the agent to cancel a task (`tasks/cancel`)
    pub async fn cancel_task(&self, params: TaskIdParams) -> AgentResult<Task> {
        self.call("tasks/cancel", params).await
    }

    /// Unary JSON-RPC call
    async fn call<P, T>(&self, method: &'static str, params: P) -> AgentResult<T>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: self.next_request_id(),
            method,
            params,
        };

        tracing::debug!(method, endpoint = %self.endpoint, "Sending JSON-RPC request");

        let response = self
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|source| AgentError::Network {
                operation: method,
                source,
            })?;
        let body = read_success_body(response, method).await?;

        match decode_frame(&body, method)? {
            Value::Null => Err(AgentError::Protocol(format!(
                "{} response carried no result",
                method
            ))),
            result => serde_json::from_value(result).map_err(|source| AgentError::Decode {
                what: method,
                source,
            }),
        }
    }

    /// Open a `tasks/sendSubscribe` stream
    pub async fn send_task_subscribe(
        &self,
        params: TaskSendParams,
    ) -> AgentResult<impl futures::Stream<Item = AgentResult<Option<TaskUpdate>>> + Send + 'static>
    {
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: self.next_request_id(),
            method: "tasks/sendSubscribe",
            params: &params,
        };

        tracing::debug!(
            task_id = %params.id,
            endpoint = %self.endpoint,
            "Opening task update stream"
        );

        let response = self
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|source| AgentError::Network {
                operation: "tasks/sendSubscribe",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("text/event-stream") {
            return Err(AgentError::Protocol(format!(
                "expected text/event-stream response, got '{}'",
                content_type
            )));
        }

        let frames = sse::data_frames(response.bytes_stream());
        Ok(frames.map(|frame| {
            let frame = frame.map_err(|source| AgentError::Network {
                operation: "tasks/sendSubscribe stream",
                source,
            })?;
            decode_update(&frame)
        }))
    }
}

impl RemoteAgent for A2AClient {
    fn name(&self) -> &'static str {
        "a2a"
    }

    fn send_subscribe<'a>(
        &'a self,
        params: TaskSendParams,
    ) -> BoxFuture<'a, anyhow::Result<UpdateStream<'a>>> {
        Box::pin(async move {
            let stream = self.send_task_subscribe(params).await?;
            let stream: UpdateStream<'a> = stream.map(|item| item.map_err(anyhow::Error::from)).boxed();
            Ok(stream)
        })
    }
}

async fn read_success_body(response: reqwest::Response, operation: &'static str) -> AgentResult<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| AgentError::Network { operation, source })?;

    if status.is_success() {
        return Ok(body);
    }
    // Agents may report JSON-RPC errors with a non-2xx status
    if let Ok(JsonRpcResponse {
        error: Some(error), ..
    }) = serde_json::from_str::<JsonRpcResponse>(&body)
    {
        return Err(error.into());
    }
    Err(AgentError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Decode a JSON-RPC response frame into its raw result (`Null` when absent)
fn decode_frame(frame: &str, what: &'static str) -> AgentResult<Value> {
    let response: JsonRpcResponse =
        serde_json::from_str(frame).map_err(|source| AgentError::Decode { what, source })?;
    if let Some(error) = response.error {
        return Err(error.into());
    }
    Ok(response.result.unwrap_or(Value::Null))
}

/// Decode one SSE frame of a sendSubscribe stream
pub(crate) fn decode_update(frame: &str) -> AgentResult<Option<TaskUpdate>> {
    match decode_frame(frame, "task update")? {
        Value::Null => Ok(None),
        result => {
            let update = TaskUpdate::from_value(result).map_err(|source| AgentError::Decode {
                what: "task update",
                source,
            })?;
            if update.is_none() {
                tracing::debug!("Ignoring stream element without status or artifact");
            }
            Ok(update)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TaskState;

    #[test]
    fn test_decode_status_frame() {
        let frame = r#"{"jsonrpc":"2.0","id":1,"result":{"id":"t1","status":{"state":"working"},"final":false}}"#;
        match decode_update(frame).unwrap() {
            Some(TaskUpdate::Status(event)) => {
                assert_eq!(event.id, "t1");
                assert_eq!(event.status.state, TaskState::Working);
            }
            other => panic!("Expected status update, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_null_result_is_no_update() {
        let frame = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
        assert!(decode_update(frame).unwrap().is_none());
    }

    #[test]
    fn test_decode_object_without_status_or_artifact_is_no_update() {
        let frame = r#"{"jsonrpc":"2.0","id":1,"result":{"id":"t1","kind":"message","parts":[]}}"#;
        assert!(decode_update(frame).unwrap().is_none());
    }

    #[test]
    fn test_decode_non_object_result_is_error() {
        let frame = r#"{"jsonrpc":"2.0","id":1,"result":"working"}"#;
        assert!(matches!(
            decode_update(frame),
            Err(AgentError::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_frame_with_status_and_artifact_keeps_both() {
        let frame = r#"{"jsonrpc":"2.0","id":1,"result":{"id":"t1","status":{"state":"working"},"artifact":{"name":"out","parts":[{"type":"text","text":"x"}]}}}"#;
        let update = decode_update(frame).unwrap().unwrap();
        assert_eq!(update.status_event().unwrap().status.state, TaskState::Working);
        assert_eq!(
            update.artifact_event().unwrap().artifact.name.as_deref(),
            Some("out")
        );
    }

    #[test]
    fn test_decode_rpc_error_frame() {
        let frame = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32001,"message":"Task not found"}}"#;
        match decode_update(frame) {
            Err(AgentError::Rpc(err)) => {
                assert_eq!(err.code, -32001);
                assert_eq!(err.message, "Task not found");
            }
            other => panic!("Expected RPC error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_garbage_frame() {
        assert!(matches!(
            decode_update("not json"),
            Err(AgentError::Decode { .. })
        ));
    }

    #[test]
    fn test_from_config_requires_url() {
        let result = A2AClient::from_config(&AgentConfig::default());
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_from_config_rejects_bad_header() {
        let mut config = AgentConfig::a2a("http://localhost:1");
        config
            .headers
            .insert("bad header".to_string(), "v".to_string());
        assert!(matches!(
            A2AClient::from_config(&config),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn test_request_ids_increase() {
        let client = A2AClient::new("http://localhost:1");
        let first = client.next_request_id();
        let second = client.clone().next_request_id();
        assert_eq!(second, first + 1);
    }
}
