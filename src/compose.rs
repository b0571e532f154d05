// ABOUTME: Builds message parts from command-line text, inline JSON, and local files.
// ABOUTME: Files are inlined as base64 with a MIME type guessed from the extension.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use courier_agent::{FileContent, Part};
use std::path::Path;

/// Parts in a fixed order: text, then data, then files
pub async fn compose_parts(
    text: &[String],
    data: Option<&str>,
    files: &[impl AsRef<Path>],
) -> Result<Vec<Part>> {
    let mut parts = Vec::new();

    let text = text.join(" ");
    if !text.trim().is_empty() {
        parts.push(Part::text(text));
    }

    if let Some(data) = data {
        let value: serde_json::Value =
            serde_json::from_str(data).context("--data must be valid JSON")?;
        parts.push(Part::data(value));
    }

    for path in files {
        parts.push(file_part(path.as_ref()).await?);
    }

    Ok(parts)
}

pub async fn file_part(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let mime_type = mime_guess::from_path(path).first_or_octet_stream();

    Ok(Part::file(
        FileContent::from_base64(STANDARD.encode(bytes))
            .with_name(name)
            .with_mime_type(mime_type.to_string()),
    ))
}
