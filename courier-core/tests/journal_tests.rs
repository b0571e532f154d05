// ABOUTME: Tests for JournalingHandler running behind a TaskMessageChannel.
// ABOUTME: Verifies history, status, and artifacts are persisted as updates stream in.

use async_trait::async_trait;
use courier_agent::backends::mock::{MockAgent, MockStep};
use courier_agent::{
    Artifact, Part, Role, TaskArtifactUpdateEvent, TaskState, TaskStatusUpdateEvent, TaskUpdate,
};
use courier_core::{
    InMemoryTaskStore, JournalingHandler, TaskMessageChannel, TaskStore, UpdateHandler,
    UserMessage,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Counting {
    statuses: AtomicUsize,
    artifacts: AtomicUsize,
}

#[async_trait]
impl UpdateHandler<()> for Counting {
    async fn on_status_update(
        &self,
        _message: &UserMessage<()>,
        _event: &TaskStatusUpdateEvent,
    ) -> anyhow::Result<()> {
        self.statuses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_artifact_update(
        &self,
        _message: &UserMessage<()>,
        _event: &TaskArtifactUpdateEvent,
    ) -> anyhow::Result<()> {
        self.artifacts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn chunk(task_id: &str, text: &str, append: bool) -> MockStep {
    let mut artifact = Artifact::new(vec![Part::text(text)]).named("answer");
    artifact.append = Some(append);
    MockStep::Update(TaskUpdate::Artifact(TaskArtifactUpdateEvent::new(
        task_id, artifact,
    )))
}

fn setup(mock: MockAgent) -> (TaskMessageChannel<()>, Arc<InMemoryTaskStore>, Arc<Counting>) {
    let store = Arc::new(InMemoryTaskStore::new());
    let counting = Arc::new(Counting::default());
    let handler = JournalingHandler::new(counting.clone(), store.clone());
    (
        TaskMessageChannel::new(Arc::new(mock), Arc::new(handler)),
        store,
        counting,
    )
}

#[tokio::test]
async fn test_conversation_is_journaled_in_order() {
    let mock = MockAgent::new()
        .on_message("question")
        .respond_with(vec![
            MockStep::status(TaskState::Working, "thinking"),
            chunk("t1", "part one, ", false),
            chunk("t1", "part two", true),
            MockStep::status(TaskState::Completed, "done").finished(),
        ]);
    let (channel, store, counting) = setup(mock);

    let outcome = channel
        .dispatch(UserMessage::new("t1", vec![Part::text("question")], ()).with_session("s1"))
        .await;
    assert!(outcome.is_completed());

    let record = store.load("t1").await.unwrap().unwrap();
    assert_eq!(record.task.session_id.as_deref(), Some("s1"));
    assert_eq!(record.task.status.state, TaskState::Completed);

    let turns: Vec<(Role, String)> = record
        .history
        .iter()
        .map(|m| (m.role, m.text()))
        .collect();
    assert_eq!(
        turns,
        vec![
            (Role::User, "question".to_string()),
            (Role::Agent, "thinking".to_string()),
            (Role::Agent, "done".to_string()),
        ]
    );

    let artifacts = record.task.artifacts.unwrap();
    assert_eq!(artifacts.len(), 1);
    let texts: Vec<&str> = artifacts[0].parts.iter().filter_map(Part::as_text).collect();
    assert_eq!(texts, vec!["part one, ", "part two"]);

    assert_eq!(counting.statuses.load(Ordering::SeqCst), 2);
    assert_eq!(counting.artifacts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_follow_up_messages_extend_existing_history() {
    let mock = MockAgent::new()
        .on_message("one")
        .respond_text("first answer")
        .on_message("two")
        .respond_text("second answer");
    let (channel, store, _) = setup(mock);

    channel
        .user_message(UserMessage::new("t1", vec![Part::text("one")], ()))
        .await;
    channel
        .user_message(UserMessage::new("t1", vec![Part::text("two")], ()))
        .await;

    let record = store.load("t1").await.unwrap().unwrap();
    let texts: Vec<String> = record.history.iter().map(|m| m.text()).collect();
    assert_eq!(texts, vec!["one", "first answer", "two", "second answer"]);
}

#[tokio::test]
async fn test_rejected_send_is_not_journaled() {
    let mock = MockAgent::new().on_message("x").reject_send("down");
    let (channel, store, _) = setup(mock);

    let outcome = channel
        .dispatch(UserMessage::new("t1", vec![Part::text("x")], ()))
        .await;

    assert!(!outcome.is_completed());
    assert!(store.is_empty().await);
}
