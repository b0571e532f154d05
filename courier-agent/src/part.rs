// ABOUTME: Message content model shared with remote agents: parts, files, and messages.
// ABOUTME: Parts are a closed tagged union (text, data, file) keyed on the wire by "type".

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of message content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    /// Plain text
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },

    /// Arbitrary structured payload
    Data {
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },

    /// File reference or inline file content
    File {
        file: FileContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn data(data: Value) -> Self {
        Self::Data {
            data,
            metadata: None,
        }
    }

    pub fn file(file: FileContent) -> Self {
        Self::File {
            file,
            metadata: None,
        }
    }

    /// Returns the text payload for text parts
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Short variant name for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Data { .. } => "data",
            Self::File { .. } => "file",
        }
    }
}

/// File payload: either a dereferenceable URI or base64-encoded bytes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Base64-encoded content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Where a file's content lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource<'a> {
    Uri(&'a str),
    /// Base64-encoded content, not yet decoded
    Bytes(&'a str),
}

impl FileContent {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn from_base64(bytes: impl Into<String>) -> Self {
        Self {
            bytes: Some(bytes.into()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Where to read the content from. A uri wins over inline bytes; None when neither is set.
    pub fn source(&self) -> Option<FileSource<'_>> {
        match (&self.uri, &self.bytes) {
            (Some(uri), _) => Some(FileSource::Uri(uri)),
            (None, Some(bytes)) => Some(FileSource::Bytes(bytes)),
            (None, None) => None,
        }
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// A conversational turn made of ordered parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
            metadata: None,
        }
    }

    pub fn agent(parts: Vec<Part>) -> Self {
        Self {
            role: Role::Agent,
            parts,
            metadata: None,
        }
    }

    /// Concatenated text of all text parts, newline separated
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_part_wire_shape() {
        let part = Part::text("hi");
        assert_eq!(
            serde_json::to_value(&part).unwrap(),
            json!({"type": "text", "text": "hi"})
        );
    }

    #[test]
    fn test_file_part_uses_camel_case_mime_type() {
        let part = Part::file(
            FileContent::from_uri("https://example.com/cat.png").with_mime_type("image/png"),
        );
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["file"]["mimeType"], "image/png");
        assert!(value["file"].get("bytes").is_none());
    }

    #[test]
    fn test_unknown_part_type_is_rejected() {
        let result = serde_json::from_value::<Part>(json!({"type": "video", "url": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_file_source_prefers_uri() {
        assert_eq!(
            FileContent::from_uri("u").source(),
            Some(FileSource::Uri("u"))
        );
        assert_eq!(
            FileContent::from_base64("aGk=").source(),
            Some(FileSource::Bytes("aGk="))
        );
        assert_eq!(FileContent::default().source(), None);

        let both = FileContent {
            uri: Some("u".into()),
            bytes: Some("aGk=".into()),
            ..FileContent::default()
        };
        assert_eq!(both.source(), Some(FileSource::Uri("u")));
    }

    #[test]
    fn test_message_text_joins_text_parts_only() {
        let msg = Message::agent(vec![
            Part::text("one"),
            Part::data(json!({"k": 1})),
            Part::text("two"),
        ]);
        assert_eq!(msg.text(), "one\ntwo");
    }
}
