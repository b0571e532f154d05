// ABOUTME: Tests for transcript recording and replay.
// ABOUTME: Validates capture of updates and failures, file round trip, and replay.

use courier_agent::backends::mock::{MockAgent, MockStep};
use courier_agent::testing::recording::{RecordingAgent, ReplayAgent};
use courier_agent::{Message, Part, RemoteAgent, TaskSendParams, TaskState};
use futures::StreamExt;
use std::sync::Arc;
use tempfile::TempDir;

fn params(task_id: &str, text: &str) -> TaskSendParams {
    TaskSendParams::new(task_id, Message::user(vec![Part::text(text)]))
}

#[tokio::test]
async fn test_recording_passes_updates_through_and_records() {
    let mock = MockAgent::new().on_message("hello").respond_with(vec![
        MockStep::status(TaskState::Working, "hm"),
        MockStep::Tick,
        MockStep::status(TaskState::Completed, "Hi there!").finished(),
    ]);
    let recording = RecordingAgent::wrap(Arc::new(mock));

    let items: Vec<_> = recording
        .send_subscribe(params("t1", "hello").with_session(Some("s".into())))
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 3);

    let transcript = recording.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].task_id, "t1");
    assert_eq!(transcript[0].session_id.as_deref(), Some("s"));
    assert_eq!(transcript[0].message.text(), "hello");
    // ticks are not recorded
    assert_eq!(transcript[0].updates.len(), 2);
    assert!(transcript[0].error.is_none());
    assert!(!transcript[0].rejected);
}

#[tokio::test]
async fn test_recording_captures_stream_failure() {
    let mock = MockAgent::new()
        .on_message("x")
        .respond_error("agent crashed");
    let recording = RecordingAgent::wrap(Arc::new(mock));

    let items: Vec<_> = recording
        .send_subscribe(params("t1", "x"))
        .await
        .unwrap()
        .collect()
        .await;
    assert!(items[0].is_err());

    let transcript = recording.transcript();
    assert_eq!(transcript[0].error.as_deref(), Some("agent crashed"));
    assert!(!transcript[0].rejected);
}

#[tokio::test]
async fn test_recording_captures_rejected_send() {
    let mock = MockAgent::new().on_message("x").reject_send("refused");
    let recording = RecordingAgent::wrap(Arc::new(mock));

    assert!(recording.send_subscribe(params("t1", "x")).await.is_err());

    let transcript = recording.transcript();
    assert_eq!(transcript.len(), 1);
    assert!(transcript[0].rejected);
    assert_eq!(transcript[0].error.as_deref(), Some("refused"));
}

#[tokio::test]
async fn test_recording_records_abandoned_stream() {
    let mock = MockAgent::new().on_message("x").respond_with(vec![
        MockStep::status(TaskState::Working, "a"),
        MockStep::Hang,
    ]);
    let recording = RecordingAgent::wrap(Arc::new(mock));

    {
        let mut stream = recording.send_subscribe(params("t1", "x")).await.unwrap();
        assert!(stream.next().await.is_some());
    }

    let transcript = recording.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].updates.len(), 1);
}

#[tokio::test]
async fn test_transcript_save_and_replay() {
    let mock = MockAgent::new()
        .on_message("first")
        .respond_text("one")
        .on_message("second")
        .respond_error("boom")
        .on_message("third")
        .reject_send("nope");
    let recording = RecordingAgent::wrap(Arc::new(mock));

    for text in ["first", "second"] {
        let _: Vec<_> = recording
            .send_subscribe(params("t1", text))
            .await
            .unwrap()
            .collect()
            .await;
    }
    assert!(recording.send_subscribe(params("t1", "third")).await.is_err());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("transcript.json");
    recording.save_transcript(&path).await.unwrap();

    let replay = ReplayAgent::load(&path).await.unwrap();
    assert_eq!(replay.remaining(), 3);

    let items: Vec<_> = replay
        .send_subscribe(params("t1", "first"))
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 1);
    assert!(items[0].as_ref().unwrap().is_some());

    let items: Vec<_> = replay
        .send_subscribe(params("t1", "second"))
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap_err().to_string(), "boom");

    match replay.send_subscribe(params("t1", "third")).await {
        Err(e) => assert_eq!(e.to_string(), "nope"),
        Ok(_) => panic!("Expected rejected send"),
    }

    match replay.send_subscribe(params("t1", "unknown")).await {
        Err(e) => assert!(e.to_string().contains("No recorded interaction")),
        Ok(_) => panic!("Expected missing interaction error"),
    };
}
