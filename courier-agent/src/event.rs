// ABOUTME: Update events streamed back by a remote agent while it works on a task.
// ABOUTME: TaskUpdate is discriminated by the "status" and "artifact" fields; an event may carry both.

use crate::part::{Message, Part};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Lifecycle state of a task on the remote agent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Unknown,
}

impl TaskState {
    /// Whether the task can make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::InputRequired => "input-required",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Current status of a task, optionally with an agent-authored message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// ISO 8601 timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: None,
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }
}

/// Output produced by a task
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub index: u32,
    /// When true, parts extend the artifact already at `index`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_chunk: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Artifact {
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            parts,
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Progress notification for a task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatusUpdateEvent {
    /// Task id
    pub id: String,
    pub status: TaskStatus,
    /// Set on the last status event the agent will send for this request
    #[serde(rename = "final", default)]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TaskStatusUpdateEvent {
    pub fn new(id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            status,
            is_final: false,
            metadata: None,
        }
    }

    pub fn finished(mut self) -> Self {
        self.is_final = true;
        self
    }
}

/// Output notification for a task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskArtifactUpdateEvent {
    /// Task id
    pub id: String,
    pub artifact: Artifact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TaskArtifactUpdateEvent {
    pub fn new(id: impl Into<String>, artifact: Artifact) -> Self {
        Self {
            id: id.into(),
            artifact,
            metadata: None,
        }
    }
}

/// One element of a task's update stream
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    Status(TaskStatusUpdateEvent),
    Artifact(TaskArtifactUpdateEvent),
    /// A single event carrying both fields; routed as status, then artifact
    StatusAndArtifact(TaskStatusUpdateEvent, TaskArtifactUpdateEvent),
}

impl TaskUpdate {
    /// Convenience constructor for a status event carrying agent text
    pub fn status_text(task_id: &str, state: TaskState, text: &str) -> Self {
        Self::Status(TaskStatusUpdateEvent::new(
            task_id,
            TaskStatus::new(state).with_message(Message::agent(vec![Part::text(text)])),
        ))
    }

    /// Decode one stream element.
    ///
    /// An object with neither a `status` nor an `artifact` field has nothing to
    /// route and yields `None`. Anything that is not an object is an error.
    pub fn from_value(value: Value) -> serde_json::Result<Option<Self>> {
        match value.as_object() {
            Some(object) if !object.contains_key("status") && !object.contains_key("artifact") => {
                Ok(None)
            }
            _ => serde_json::from_value(value).map(Some),
        }
    }

    /// Task id carried by the event
    pub fn task_id(&self) -> &str {
        match self {
            Self::Status(event) | Self::StatusAndArtifact(event, _) => &event.id,
            Self::Artifact(event) => &event.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Artifact(_) => "artifact",
            Self::StatusAndArtifact(..) => "status+artifact",
        }
    }

    pub fn status_event(&self) -> Option<&TaskStatusUpdateEvent> {
        match self {
            Self::Status(event) | Self::StatusAndArtifact(event, _) => Some(event),
            Self::Artifact(_) => None,
        }
    }

    pub fn artifact_event(&self) -> Option<&TaskArtifactUpdateEvent> {
        match self {
            Self::Artifact(event) | Self::StatusAndArtifact(_, event) => Some(event),
            Self::Status(_) => None,
        }
    }
}

impl From<TaskStatusUpdateEvent> for TaskUpdate {
    fn from(event: TaskStatusUpdateEvent) -> Self {
        Self::Status(event)
    }
}

impl From<TaskArtifactUpdateEvent> for TaskUpdate {
    fn from(event: TaskArtifactUpdateEvent) -> Self {
        Self::Artifact(event)
    }
}

// Serializes flat, the way it arrives on the wire. A combined event is the
// union of both objects' fields.
impl Serialize for TaskUpdate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::Error;

        match self {
            Self::Status(event) => event.serialize(serializer),
            Self::Artifact(event) => event.serialize(serializer),
            Self::StatusAndArtifact(status, artifact) => {
                let mut merged = serde_json::to_value(status).map_err(S::Error::custom)?;
                let artifact = serde_json::to_value(artifact).map_err(S::Error::custom)?;
                if let (Some(target), Value::Object(extra)) = (merged.as_object_mut(), artifact) {
                    for (key, value) in extra {
                        target.entry(key).or_insert(value);
                    }
                }
                merged.serialize(serializer)
            }
        }
    }
}

// Decode by field presence rather than `untagged`, so an object with neither
// discriminant gets a useful error instead of "did not match any variant".
impl<'de> Deserialize<'de> for TaskUpdate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let value = Value::deserialize(deserializer)?;
        let object = value
            .as_object()
            .ok_or_else(|| D::Error::custom("task update must be a JSON object"))?;

        match (object.contains_key("status"), object.contains_key("artifact")) {
            (true, true) => {
                let status = serde_json::from_value(value.clone()).map_err(D::Error::custom)?;
                let artifact = serde_json::from_value(value).map_err(D::Error::custom)?;
                Ok(Self::StatusAndArtifact(status, artifact))
            }
            (true, false) => serde_json::from_value(value)
                .map(Self::Status)
                .map_err(D::Error::custom),
            (false, true) => serde_json::from_value(value)
                .map(Self::Artifact)
                .map_err(D::Error::custom),
            (false, false) => Err(D::Error::custom(
                "unrecognized task update: expected a `status` or `artifact` field",
            )),
        }
    }
}
