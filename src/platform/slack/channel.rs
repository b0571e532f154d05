// ABOUTME: Slack thread renderer that turns task updates into threaded posts and file uploads.
// ABOUTME: Executes the render plan via the Slack Web API with 4K-char chunking of long text.

use crate::render::{self, Block, Delivery, Upload};
use anyhow::{Context, Result};
use async_trait::async_trait;
use courier_agent::{TaskArtifactUpdateEvent, TaskStatusUpdateEvent};
use courier_core::{UpdateHandler, UserMessage};
use slack_morphism::prelude::*;
use std::sync::Arc;

/// Maximum message length for a single Slack text post
const MAX_MESSAGE_LENGTH: usize = 4000;

/// The Slack conversation a task's replies belong to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackThread {
    pub channel: String,
    /// ts of the thread's root message
    pub thread_ts: String,
}

impl SlackThread {
    pub fn new(channel: impl Into<String>, thread_ts: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            thread_ts: thread_ts.into(),
        }
    }

    /// One task per thread: `<channel>:<thread root ts>`
    pub fn task_id(&self) -> String {
        format!("{}:{}", self.channel, self.thread_ts)
    }
}

/// Posts a task's updates back into the Slack thread it came from
#[derive(Clone)]
pub struct SlackRenderer {
    client: Arc<SlackHyperClient>,
    bot_token: SlackApiToken,
}

impl SlackRenderer {
    pub fn new(client: Arc<SlackHyperClient>, bot_token: SlackApiToken) -> Self {
        Self { client, bot_token }
    }

    async fn deliver(&self, thread: &SlackThread, deliveries: Vec<Delivery>) -> Result<()> {
        for delivery in deliveries {
            match delivery {
                Delivery::Post { text, blocks } => self.post(thread, text, &blocks).await?,
                Delivery::Upload(upload) => self.upload(thread, upload).await?,
            }
        }
        Ok(())
    }

    async fn post(&self, thread: &SlackThread, text: Option<String>, blocks: &[Block]) -> Result<()> {
        let session = self.client.open_session(&self.bot_token);

        if blocks.is_empty() {
            let Some(text) = text.filter(|t| !t.is_empty()) else {
                tracing::debug!(channel = %thread.channel, "Skipping empty Slack post");
                return Ok(());
            };
            for chunk in chunk_text(&text, MAX_MESSAGE_LENGTH) {
                let req = SlackApiChatPostMessageRequest::new(
                    thread.channel.clone().into(),
                    SlackMessageContent::new().with_text(chunk.to_string()),
                )
                .with_thread_ts(thread.thread_ts.clone().into());
                session
                    .chat_post_message(&req)
                    .await
                    .context("Failed to send Slack message")?;
            }
            return Ok(());
        }

        let mut content = SlackMessageContent::new().with_blocks(to_slack_blocks(blocks)?);
        if let Some(text) = text {
            content = content.with_text(text);
        }
        let req = SlackApiChatPostMessageRequest::new(thread.channel.clone().into(), content)
            .with_thread_ts(thread.thread_ts.clone().into());
        session
            .chat_post_message(&req)
            .await
            .context("Failed to send Slack block message")?;
        Ok(())
    }

    /// External upload flow: reserve an upload URL, send the bytes, then share
    /// the file into the thread.
    async fn upload(&self, thread: &SlackThread, upload: Upload) -> Result<()> {
        let session = self.client.open_session(&self.bot_token);
        let content_type = upload.mime_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&upload.name)
                .first_or_octet_stream()
                .to_string()
        });
        let size = upload.bytes.len();

        let reserved = session
            .get_upload_url_external(&SlackApiFilesGetUploadUrlExternalRequest::new(
                upload.name.clone(),
                size,
            ))
            .await
            .context("Failed to get Slack upload URL")?;

        session
            .files_upload_via_url(&SlackApiFilesUploadViaUrlRequest::new(
                reserved.upload_url,
                upload.bytes,
                content_type,
            ))
            .await
            .context("Failed to upload file content to Slack")?;

        session
            .files_complete_upload_external(
                &SlackApiFilesCompleteUploadExternalRequest::new(vec![
                    SlackApiFilesComplete::new(reserved.file_id),
                ])
                .with_channel_id(thread.channel.clone().into())
                .with_thread_ts(thread.thread_ts.clone().into()),
            )
            .await
            .context("Failed to share uploaded file in Slack thread")?;

        tracing::debug!(
            channel = %thread.channel,
            thread_ts = %thread.thread_ts,
            name = %upload.name,
            size,
            "Uploaded file to Slack"
        );
        Ok(())
    }
}

#[async_trait]
impl UpdateHandler<SlackThread> for SlackRenderer {
    async fn on_status_update(
        &self,
        message: &UserMessage<SlackThread>,
        event: &TaskStatusUpdateEvent,
    ) -> Result<()> {
        let deliveries = render::render_status(event)?;
        self.deliver(&message.context, deliveries).await
    }

    async fn on_artifact_update(
        &self,
        message: &UserMessage<SlackThread>,
        event: &TaskArtifactUpdateEvent,
    ) -> Result<()> {
        let deliveries = render::render_artifact(&event.artifact)?;
        self.deliver(&message.context, deliveries).await
    }
}

/// Convert rendered blocks into slack-morphism's Block Kit model
pub fn to_slack_blocks(blocks: &[Block]) -> Result<Vec<SlackBlock>> {
    blocks
        .iter()
        .map(|block| {
            serde_json::from_value::<SlackBlock>(block.to_json())
                .with_context(|| format!("Invalid Slack block: {:?}", block))
        })
        .collect()
}

/// Split text into chunks at line boundaries, falling back to character boundaries
fn chunk_text(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining);
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        let split_at = remaining[..limit]
            .rfind('\n')
            .map(|pos| pos + 1)
            .unwrap_or(limit);

        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_task_id() {
        let thread = SlackThread::new("C123", "1700000000.000100");
        assert_eq!(thread.task_id(), "C123:1700000000.000100");
    }

    #[test]
    fn test_renderer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SlackRenderer>();
    }

    #[test]
    fn test_blocks_convert_to_slack_model() {
        let blocks = to_slack_blocks(&[
            Block::section("*Report*\nweekly"),
            Block::Image {
                url: "https://example.com/cat.png".to_string(),
                alt_text: "cat".to_string(),
            },
        ])
        .unwrap();

        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0], SlackBlock::Section(_)));
        assert!(matches!(blocks[1], SlackBlock::Image(_)));
    }

    #[test]
    fn test_chunk_text_short() {
        let chunks = chunk_text("hello", MAX_MESSAGE_LENGTH);
        assert_eq!(chunks, vec!["hello"]);
    }

    #[test]
    fn test_chunk_text_splits_at_newline() {
        let line1 = "a".repeat(2000);
        let line2 = "b".repeat(2000);
        let line3 = "c".repeat(2000);
        let text = format!("{}\n{}\n{}", line1, line2, line3);
        let chunks = chunk_text(&text, MAX_MESSAGE_LENGTH);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], format!("{}\n", line1));
        for chunk in &chunks {
            assert!(chunk.len() <= MAX_MESSAGE_LENGTH);
        }
    }

    #[test]
    fn test_chunk_text_no_newlines() {
        let text = "a".repeat(5000);
        let chunks = chunk_text(&text, MAX_MESSAGE_LENGTH);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), MAX_MESSAGE_LENGTH);
        assert_eq!(chunks[1].len(), 1000);
    }

    #[test]
    fn test_chunk_text_respects_char_boundaries() {
        // 3-byte chars; 4000 is not a multiple of 3
        let text = "€".repeat(2000);
        let chunks = chunk_text(&text, MAX_MESSAGE_LENGTH);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.len() <= MAX_MESSAGE_LENGTH));
    }
}
