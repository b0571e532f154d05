// ABOUTME: Tests for the scripted MockAgent.
// ABOUTME: Validates matching, step playback, failures, and recorded send parameters.

use courier_agent::backends::mock::{MockAgent, MockStep};
use courier_agent::{Message, Part, RemoteAgent, TaskSendParams, TaskState, TaskUpdate};
use futures::StreamExt;
use std::time::Duration;

fn params(task_id: &str, text: &str) -> TaskSendParams {
    TaskSendParams::new(task_id, Message::user(vec![Part::text(text)]))
}

async fn collect(agent: &MockAgent, p: TaskSendParams) -> Vec<anyhow::Result<Option<TaskUpdate>>> {
    agent.send_subscribe(p).await.unwrap().collect().await
}

fn status_text(update: &TaskUpdate) -> String {
    match update {
        TaskUpdate::Status(event) => event
            .status
            .message
            .as_ref()
            .map(|m| m.text())
            .unwrap_or_default(),
        other => panic!("Expected status update, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mock_returns_configured_text() {
    let mock = MockAgent::new().on_message("hello").respond_text("Hi there!");

    let items = collect(&mock, params("t1", "hello")).await;
    assert_eq!(items.len(), 1);
    let update = items[0].as_ref().unwrap().as_ref().unwrap();
    assert_eq!(update.task_id(), "t1");
    assert_eq!(status_text(update), "Hi there!");
}

#[tokio::test]
async fn test_mock_plays_script_in_order_including_ticks() {
    let mock = MockAgent::new().on_message("build").respond_with(vec![
        MockStep::status(TaskState::Working, "compiling"),
        MockStep::Tick,
        MockStep::Delay(Duration::from_millis(5)),
        MockStep::status(TaskState::Completed, "done").finished(),
    ]);

    let items = collect(&mock, params("t1", "please build")).await;
    assert_eq!(items.len(), 3);
    assert_eq!(status_text(items[0].as_ref().unwrap().as_ref().unwrap()), "compiling");
    assert!(items[1].as_ref().unwrap().is_none());
    match items[2].as_ref().unwrap().as_ref().unwrap() {
        TaskUpdate::Status(event) => {
            assert!(event.is_final);
            assert_eq!(event.status.state, TaskState::Completed);
        }
        other => panic!("Expected status update, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mock_fail_step_ends_stream() {
    let mock = MockAgent::new().on_message("x").respond_with(vec![
        MockStep::status(TaskState::Working, "a"),
        MockStep::Fail("stream broke".to_string()),
        MockStep::status(TaskState::Working, "never"),
    ]);

    let items = collect(&mock, params("t1", "x")).await;
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert_eq!(items[1].as_ref().unwrap_err().to_string(), "stream broke");
}

#[tokio::test]
async fn test_mock_reject_send_fails_the_call() {
    let mock = MockAgent::new().on_message("x").reject_send("connection refused");

    let result = mock.send_subscribe(params("t1", "x")).await;
    match result {
        Err(e) => assert_eq!(e.to_string(), "connection refused"),
        Ok(_) => panic!("Expected send to fail"),
    }
    assert_eq!(mock.sent().len(), 1);
}

#[tokio::test]
async fn test_mock_hang_never_yields() {
    let mock = MockAgent::new()
        .on_message("x")
        .respond_with(vec![MockStep::Hang]);

    let mut stream = mock.send_subscribe(params("t1", "x")).await.unwrap();
    let next = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
    assert!(next.is_err(), "hanging stream should not yield");
}

#[tokio::test]
async fn test_mock_unmatched_message_gets_default_reply() {
    let mock = MockAgent::new();
    let items = collect(&mock, params("t1", "anything")).await;
    let update = items[0].as_ref().unwrap().as_ref().unwrap();
    assert!(status_text(update).contains("Mock: no expectation for 'anything'"));
}

#[tokio::test]
async fn test_mock_prefers_front_then_searches() {
    let mock = MockAgent::new()
        .on_message("first")
        .respond_text("one")
        .on_message("second")
        .respond_text("two");

    let items = collect(&mock, params("t1", "second")).await;
    assert_eq!(status_text(items[0].as_ref().unwrap().as_ref().unwrap()), "two");
    assert_eq!(mock.pending(), 1);

    let items = collect(&mock, params("t1", "first")).await;
    assert_eq!(status_text(items[0].as_ref().unwrap().as_ref().unwrap()), "one");
    assert_eq!(mock.pending(), 0);
}

#[tokio::test]
async fn test_mock_records_send_params() {
    let mock = MockAgent::new();
    let p = params("t7", "hi").with_session(Some("s1".to_string()));
    let _ = collect(&mock, p.clone()).await;

    let sent = mock.sent();
    assert_eq!(sent, vec![p]);
}

#[tokio::test]
async fn test_mock_clones_share_state() {
    let mock = MockAgent::new().on_message("x").respond_text("y");
    let clone = mock.clone();
    let _ = collect(&clone, params("t1", "x")).await;
    assert_eq!(mock.pending(), 0);
    assert_eq!(mock.sent().len(), 1);
}
