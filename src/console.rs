// ABOUTME: UpdateHandler that prints task updates to a terminal or any writer.
// ABOUTME: Renders the same delivery plan as Slack; uploads are listed and optionally saved to disk.

use crate::render::{self, Block, Delivery, Upload};
use anyhow::{Context, Result};
use async_trait::async_trait;
use courier_agent::{TaskArtifactUpdateEvent, TaskStatusUpdateEvent};
use courier_core::{UpdateHandler, UserMessage};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct ConsoleRenderer<W> {
    out: Mutex<W>,
    save_dir: Option<PathBuf>,
}

impl ConsoleRenderer<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            save_dir: None,
        }
    }

    /// Write uploaded files into `dir` in addition to listing them
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn print(&self, header: &str, deliveries: &[Delivery]) -> Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "{}", header)?;
        for delivery in deliveries {
            match delivery {
                Delivery::Post { text, blocks } => {
                    if let Some(text) = text {
                        writeln!(out, "{}", text)?;
                    }
                    for block in blocks {
                        match block {
                            Block::Section { text } => writeln!(out, "{}", text)?,
                            Block::Image { url, alt_text } => {
                                writeln!(out, "[image: {}] {}", alt_text, url)?
                            }
                        }
                    }
                }
                Delivery::Upload(upload) => {
                    let saved = match &self.save_dir {
                        Some(dir) => Some(save_upload(dir, upload)?),
                        None => None,
                    };
                    write!(
                        out,
                        "[file: {} ({} bytes, {})]",
                        upload.name,
                        upload.bytes.len(),
                        upload.mime_type.as_deref().unwrap_or("unknown type")
                    )?;
                    match saved {
                        Some(path) => writeln!(out, " saved to {}", path.display())?,
                        None => writeln!(out)?,
                    }
                }
            }
        }
        out.flush()?;
        Ok(())
    }
}

// Only the file name is kept so agent-supplied names cannot escape `dir`
fn save_upload(dir: &Path, upload: &Upload) -> Result<PathBuf> {
    let file_name = Path::new(&upload.name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "file".into());
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(file_name);
    std::fs::write(&path, &upload.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[async_trait]
impl<C, W> UpdateHandler<C> for ConsoleRenderer<W>
where
    C: Send + Sync,
    W: Write + Send,
{
    async fn on_status_update(
        &self,
        message: &UserMessage<C>,
        event: &TaskStatusUpdateEvent,
    ) -> Result<()> {
        let deliveries = render::render_status(event)?;
        let marker = if event.is_final { " (final)" } else { "" };
        self.print(
            &format!("[{}] {}{}", message.task_id, event.status.state, marker),
            &deliveries,
        )
    }

    async fn on_artifact_update(
        &self,
        message: &UserMessage<C>,
        event: &TaskArtifactUpdateEvent,
    ) -> Result<()> {
        let deliveries = render::render_artifact(&event.artifact)?;
        self.print(&format!("[{}] artifact", message.task_id), &deliveries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_agent::{Artifact, FileContent, Message, Part, TaskState, TaskStatus};

    fn status_event(parts: Vec<Part>) -> TaskStatusUpdateEvent {
        TaskStatusUpdateEvent::new(
            "t1",
            TaskStatus::new(TaskState::Completed).with_message(Message::agent(parts)),
        )
        .finished()
    }

    #[tokio::test]
    async fn test_status_is_printed_with_header() {
        let renderer = ConsoleRenderer::new(Vec::new());
        let message = UserMessage::new("t1", vec![], ());

        renderer
            .on_status_update(&message, &status_event(vec![Part::text("all done")]))
            .await
            .unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "[t1] completed (final)\nall done\n");
    }

    #[tokio::test]
    async fn test_artifact_lists_files_and_saves_them() {
        let dir = tempfile::TempDir::new().unwrap();
        let renderer = ConsoleRenderer::new(Vec::new()).with_save_dir(dir.path());
        let message = UserMessage::new("t1", vec![], ());
        let artifact = Artifact::new(vec![Part::file(
            FileContent::from_base64("aGk=").with_name("../escape.txt"),
        )])
        .named("out");

        renderer
            .on_artifact_update(&message, &TaskArtifactUpdateEvent::new("t1", artifact))
            .await
            .unwrap();

        let saved = dir.path().join("escape.txt");
        assert_eq!(std::fs::read(&saved).unwrap(), b"hi");
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.starts_with("[t1] artifact\nout\n*out*\n\n"));
        assert!(out.contains("[file: ../escape.txt (2 bytes, unknown type)] saved to"));
    }

    #[tokio::test]
    async fn test_render_error_is_returned() {
        let renderer = ConsoleRenderer::new(Vec::new());
        let message = UserMessage::new("t1", vec![], ());
        let bad = status_event(vec![Part::file(FileContent::default())]);

        assert!(renderer.on_status_update(&message, &bad).await.is_err());
    }
}
