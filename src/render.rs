// ABOUTME: Turns task updates into an ordered plan of chat posts and file uploads.
// ABOUTME: Pure conversion shared by the Slack and console renderers; performs no I/O.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use courier_agent::{Artifact, FileContent, FileSource, Part, TaskStatusUpdateEvent};
use serde_json::{json, Value};
use thiserror::Error;

/// Fallback name for uploads that arrive without one
const DEFAULT_FILE_NAME: &str = "file";

/// A Block Kit element, rendered to Slack JSON by [`Block::to_json`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// mrkdwn section
    Section { text: String },
    Image { url: String, alt_text: String },
}

impl Block {
    pub fn section(text: impl Into<String>) -> Self {
        Self::Section { text: text.into() }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Section { text } => json!({
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": text
                }
            }),
            Self::Image { url, alt_text } => json!({
                "type": "image",
                "image_url": url,
                "alt_text": alt_text
            }),
        }
    }
}

/// Decoded file content to upload into the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// One outbound action, executed in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Post {
        text: Option<String>,
        blocks: Vec<Block>,
    },
    Upload(Upload),
}

impl Delivery {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Post {
            text: Some(text.into()),
            blocks: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("file '{name}' has invalid base64 content: {source}")]
    InvalidBase64 {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("file '{name}' has neither a uri nor bytes")]
    InvalidFile { name: String },

    #[error("failed to serialize data part: {0}")]
    Data(#[from] serde_json::Error),
}

/// Deliveries for a status update: one per part of the agent message, in order.
///
/// Text is posted as-is and data as a pretty-printed code block. A file is
/// posted as blocks when it has a uri and uploaded when it carries bytes.
pub fn render_status(event: &TaskStatusUpdateEvent) -> Result<Vec<Delivery>, RenderError> {
    let mut deliveries = Vec::new();
    let Some(message) = &event.status.message else {
        return Ok(deliveries);
    };

    for part in &message.parts {
        match part {
            Part::Text { text, .. } => deliveries.push(Delivery::text(text.as_str())),
            Part::Data { data, .. } => deliveries.push(Delivery::text(format!(
                "```\n{}\n```",
                serde_json::to_string_pretty(data)?
            ))),
            Part::File { file, .. } => {
                let mut blocks = Vec::new();
                let mut uploads = Vec::new();
                collect_file(file, &mut blocks, &mut uploads)?;
                if !blocks.is_empty() {
                    deliveries.push(Delivery::Post { text: None, blocks });
                }
                deliveries.extend(uploads.into_iter().map(Delivery::Upload));
            }
        }
    }

    Ok(deliveries)
}

/// Deliveries for an artifact: a single post followed by its uploads.
///
/// Every part becomes a file; text as `text` (text/plain) and data as `data`
/// (application/json). A named artifact gets a `*name*` header section.
pub fn render_artifact(artifact: &Artifact) -> Result<Vec<Delivery>, RenderError> {
    let mut blocks = Vec::new();
    let mut uploads = Vec::new();

    if let Some(name) = &artifact.name {
        blocks.push(Block::section(format!(
            "*{}*\n{}",
            name,
            artifact.description.as_deref().unwrap_or_default()
        )));
    }

    for part in &artifact.parts {
        match part {
            Part::Text { text, .. } => uploads.push(Upload {
                name: "text".to_string(),
                mime_type: Some("text/plain".to_string()),
                bytes: text.as_bytes().to_vec(),
            }),
            Part::Data { data, .. } => uploads.push(Upload {
                name: "data".to_string(),
                mime_type: Some("application/json".to_string()),
                bytes: serde_json::to_vec(data)?,
            }),
            Part::File { file, .. } => collect_file(file, &mut blocks, &mut uploads)?,
        }
    }

    let mut deliveries = vec![Delivery::Post {
        text: Some(
            artifact
                .name
                .clone()
                .unwrap_or_else(|| "artifact".to_string()),
        ),
        blocks,
    }];
    deliveries.extend(uploads.into_iter().map(Delivery::Upload));
    Ok(deliveries)
}

fn collect_file(
    file: &FileContent,
    blocks: &mut Vec<Block>,
    uploads: &mut Vec<Upload>,
) -> Result<(), RenderError> {
    let name = file.name.as_deref();
    match file.source() {
        Some(FileSource::Uri(uri)) => {
            let is_image = file
                .mime_type
                .as_deref()
                .is_some_and(|m| m.starts_with("image/"));
            blocks.push(if is_image {
                Block::Image {
                    url: uri.to_string(),
                    alt_text: name.unwrap_or("image").to_string(),
                }
            } else {
                Block::section(uri)
            });
        }
        Some(FileSource::Bytes(encoded)) => {
            let name = name.unwrap_or(DEFAULT_FILE_NAME).to_string();
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|source| RenderError::InvalidBase64 {
                    name: name.clone(),
                    source,
                })?;
            uploads.push(Upload {
                name,
                mime_type: file.mime_type.clone(),
                bytes,
            });
        }
        None => {
            return Err(RenderError::InvalidFile {
                name: name.unwrap_or(DEFAULT_FILE_NAME).to_string(),
            })
        }
    }
    Ok(())
}
