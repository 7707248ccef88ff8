//! Message content models
//!
//! Content arrives either as a bare string, a single structured chunk, or an
//! ordered list mixing strings and chunks. All three shapes appear both in
//! streamed `message.output.delta` events and in stored conversation entries.

use serde::{Deserialize, Serialize};

/// Structured content chunk, discriminated by the wire `type` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentChunk {
    /// Plain text
    Text { text: String },
    /// Reference to an external source consulted by a tool
    ToolReference {
        #[serde(default)]
        tool: Option<String>,
        title: String,
        #[serde(default)]
        url: Option<String>,
    },
    /// File produced by a tool (generated images)
    ToolFile {
        #[serde(default)]
        tool: Option<String>,
        file_id: String,
        #[serde(default)]
        file_name: Option<String>,
        #[serde(default)]
        file_type: Option<String>,
    },
    /// Image given by URL or data URI
    ImageUrl { image_url: serde_json::Value },
    /// Document given by URL
    DocumentUrl {
        document_url: String,
        #[serde(default)]
        document_name: Option<String>,
    },
    /// Chunk kind this client does not know about
    #[serde(other)]
    Unknown,
}

impl ContentChunk {
    /// Text carried by a `text` chunk
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Element of a fragment list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fragment {
    Text(String),
    Chunk(ContentChunk),
}

impl Fragment {
    /// Plain text of the fragment, if it is text at all
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Chunk(chunk) => chunk.as_text(),
        }
    }
}

/// Message content in any of its wire shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Fragments(Vec<Fragment>),
    Chunk(ContentChunk),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<Fragment>> for MessageContent {
    fn from(fragments: Vec<Fragment>) -> Self {
        Self::Fragments(fragments)
    }
}

impl MessageContent {
    /// Concatenate every plain-text piece in order, ignoring other chunk kinds
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Fragments(fragments) => fragments.iter().filter_map(Fragment::as_text).collect(),
            Self::Chunk(chunk) => chunk.as_text().unwrap_or_default().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_plain_string() {
        let content: MessageContent = serde_json::from_str(r#""hello""#).unwrap();
        assert_eq!(content, MessageContent::Text("hello".to_string()));
    }

    #[test]
    fn test_deserialize_reference_chunk() {
        let json = r#"{"type":"tool_reference","tool":"web_search","title":"Rust","url":"https://rust-lang.org","favicon":null}"#;
        let content: MessageContent = serde_json::from_str(json).unwrap();
        assert_eq!(
            content,
            MessageContent::Chunk(ContentChunk::ToolReference {
                tool: Some("web_search".to_string()),
                title: "Rust".to_string(),
                url: Some("https://rust-lang.org".to_string()),
            })
        );
    }

    #[test]
    fn test_deserialize_tool_file_chunk() {
        let json = r#"{"type":"tool_file","tool":"image_generation","file_id":"f1","file_name":"image.png","file_type":"png"}"#;
        let content: MessageContent = serde_json::from_str(json).unwrap();
        match content {
            MessageContent::Chunk(ContentChunk::ToolFile {
                file_id, file_name, ..
            }) => {
                assert_eq!(file_id, "f1");
                assert_eq!(file_name.as_deref(), Some("image.png"));
            }
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_mixed_fragments() {
        let json = r#"["a", {"type":"text","text":"b"}, {"type":"tool_reference","title":"t","url":"u"}, {"type":"thinking","thinking":[]}]"#;
        let content: MessageContent = serde_json::from_str(json).unwrap();
        let MessageContent::Fragments(fragments) = &content else {
            panic!("expected fragments");
        };
        assert_eq!(fragments.len(), 4);
        assert_eq!(fragments[3], Fragment::Chunk(ContentChunk::Unknown));
        assert_eq!(content.plain_text(), "ab");
    }
}
