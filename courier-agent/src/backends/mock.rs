// ABOUTME: Mock remote agent for testing - replays pre-configured update scripts.
// ABOUTME: Allows deterministic tests without a live A2A server.
//!
//! # Example
//!
//! ```no_run
//! use courier_agent::backends::mock::{MockAgent, MockStep};
//! use courier_agent::{Message, Part, RemoteAgent, TaskSendParams, TaskState};
//! use futures::StreamExt;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mock = MockAgent::new()
//!     .on_message("hello").respond_text("Hi there!")
//!     .on_message("slow").respond_with(vec![
//!         MockStep::status(TaskState::Working, "thinking"),
//!         MockStep::Tick,
//!         MockStep::status(TaskState::Completed, "done").finished(),
//!     ]);
//!
//! let params = TaskSendParams::new("t1", Message::user(vec![Part::text("hello")]));
//! let mut updates = mock.send_subscribe(params).await?;
//! while let Some(update) = updates.next().await {
//!     println!("{:?}", update?);
//! }
//! # Ok(())
//! # }
//! ```

use crate::event::{TaskState, TaskStatus, TaskStatusUpdateEvent, TaskUpdate};
use crate::part::{Message, Part};
use crate::registry::AgentFactory;
use crate::task::TaskSendParams;
use crate::traits::{RemoteAgent, UpdateStream};
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use futures::stream::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One step of a scripted response
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Yield this update verbatim
    Update(TaskUpdate),
    /// Yield a status update addressed to the incoming task id
    Status {
        state: TaskState,
        text: String,
        is_final: bool,
    },
    /// Yield an empty (null) item
    Tick,
    /// Sleep before the next step
    Delay(Duration),
    /// Yield a stream error and end the stream
    Fail(String),
    /// Never yield again
    Hang,
}

impl MockStep {
    pub fn status(state: TaskState, text: impl Into<String>) -> Self {
        Self::Status {
            state,
            text: text.into(),
            is_final: false,
        }
    }

    /// Mark a status step as the final event of the task
    pub fn finished(self) -> Self {
        match self {
            Self::Status { state, text, .. } => Self::Status {
                state,
                text,
                is_final: true,
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
enum Response {
    Steps(Vec<MockStep>),
    RejectSend(String),
}

struct Expectation {
    pattern: String,
    response: Response,
}

/// Mock agent for testing
#[derive(Clone, Default)]
pub struct MockAgent {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    sent: Arc<Mutex<Vec<TaskSendParams>>>,
}

impl MockAgent {
    /// Create a new mock agent with no expectations
    pub fn new() -> Self {
        Self::default()
    }

    /// Set up an expectation for a message whose text contains `pattern`
    pub fn on_message(self, pattern: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            agent: self,
            pattern: pattern.to_string(),
        }
    }

    /// Every set of send parameters received so far, in arrival order
    pub fn sent(&self) -> Vec<TaskSendParams> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of expectations not yet consumed
    pub fn pending(&self) -> usize {
        self.expectations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Factory function for the registry
    pub fn factory() -> AgentFactory {
        Box::new(|_config| Ok(Arc::new(MockAgent::new()) as Arc<dyn RemoteAgent>))
    }

    fn push(&self, pattern: String, response: Response) {
        self.expectations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Expectation { pattern, response });
    }

    // Match expectations with FIFO preference: check the front first,
    // fall back to the first matching entry anywhere in the queue.
    fn take_response(&self, text: &str) -> Option<Response> {
        let mut exp = self.expectations.lock().unwrap_or_else(|e| e.into_inner());
        let front_matches = exp.front().is_some_and(|e| text.contains(&e.pattern));
        if front_matches {
            return exp.pop_front().map(|e| e.response);
        }
        exp.iter()
            .position(|e| text.contains(&e.pattern))
            .and_then(|i| exp.remove(i))
            .map(|e| e.response)
    }
}

impl RemoteAgent for MockAgent {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn send_subscribe<'a>(&'a self, params: TaskSendParams) -> BoxFuture<'a, Result<UpdateStream<'a>>> {
        Box::pin(async move {
            let text = params.message.text();
            let task_id = params.id.clone();
            self.sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(params);

            let steps = match self.take_response(&text) {
                Some(Response::Steps(steps)) => steps,
                Some(Response::RejectSend(message)) => return Err(anyhow!(message)),
                None => vec![MockStep::status(
                    TaskState::Completed,
                    format!("Mock: no expectation for '{}'", text),
                )
                .finished()],
            };

            Ok(play(task_id, steps))
        })
    }
}

fn play<'a>(task_id: String, steps: Vec<MockStep>) -> UpdateStream<'a> {
    let steps: VecDeque<MockStep> = steps.into();
    futures::stream::unfold(Some(steps), move |state| {
        let task_id = task_id.clone();
        async move {
            let mut steps = state?;
            loop {
                match steps.pop_front()? {
                    MockStep::Update(update) => return Some((Ok(Some(update)), Some(steps))),
                    MockStep::Status {
                        state,
                        text,
                        is_final,
                    } => {
                        let mut event = TaskStatusUpdateEvent::new(
                            task_id.as_str(),
                            TaskStatus::new(state)
                                .with_message(Message::agent(vec![Part::text(text)])),
                        );
                        event.is_final = is_final;
                        return Some((Ok(Some(event.into())), Some(steps)));
                    }
                    MockStep::Tick => return Some((Ok(None), Some(steps))),
                    MockStep::Delay(duration) => tokio::time::sleep(duration).await,
                    MockStep::Fail(message) => return Some((Err(anyhow!(message)), None)),
                    MockStep::Hang => futures::future::pending::<()>().await,
                }
            }
        }
    })
    .boxed()
}

/// Builder for setting up mock expectations with a fluent API
pub struct ExpectationBuilder {
    agent: MockAgent,
    pattern: String,
}

impl ExpectationBuilder {
    /// Respond with a script of steps
    pub fn respond_with(self, steps: Vec<MockStep>) -> MockAgent {
        self.agent.push(self.pattern, Response::Steps(steps));
        self.agent
    }

    /// Respond with a single final `completed` status carrying `text`
    pub fn respond_text(self, text: &str) -> MockAgent {
        self.respond_with(vec![MockStep::status(TaskState::Completed, text).finished()])
    }

    /// Open the stream, then fail it before any update
    pub fn respond_error(self, message: &str) -> MockAgent {
        self.respond_with(vec![MockStep::Fail(message.to_string())])
    }

    /// Fail the send call itself
    pub fn reject_send(self, message: &str) -> MockAgent {
        self.agent
            .push(self.pattern, Response::RejectSend(message.to_string()));
        self.agent
    }
}
