//! Conversation request models

use serde::Serialize;

/// Built-in tool enabled for a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ToolSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Body of `POST /v1/conversations`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartConversationRequest {
    pub model: String,
    pub inputs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    pub stream: bool,
}

impl StartConversationRequest {
    /// Streaming start request titled from the prompt
    pub fn new(
        model: impl Into<String>,
        inputs: impl Into<String>,
        title_length: usize,
        tools: &[String],
    ) -> Self {
        let inputs = inputs.into();
        Self {
            model: model.into(),
            name: Some(conversation_title(&inputs, title_length)),
            inputs,
            tools: tools.iter().map(ToolSpec::new).collect(),
            stream: true,
        }
    }
}

/// Body of `POST /v1/conversations/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppendConversationRequest {
    pub inputs: String,
    pub stream: bool,
}

impl AppendConversationRequest {
    pub fn new(inputs: impl Into<String>) -> Self {
        Self {
            inputs: inputs.into(),
            stream: true,
        }
    }
}

/// Conversation title: the first `max_chars` characters of the prompt plus `...`
pub fn conversation_title(prompt: &str, max_chars: usize) -> String {
    let head: String = prompt.chars().take(max_chars).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_truncates_by_chars() {
        assert_eq!(conversation_title("hello", 30), "hello...");
        assert_eq!(conversation_title("héllo wörld", 4), "héll...");
    }

    #[test]
    fn test_start_request_shape() {
        let request = StartConversationRequest::new(
            "mistral-large-2411",
            "What is new in Rust?",
            30,
            &["web_search".to_string(), "generate_image".to_string()],
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "mistral-large-2411",
                "inputs": "What is new in Rust?",
                "name": "What is new in Rust?...",
                "tools": [{"type": "web_search"}, {"type": "generate_image"}],
                "stream": true
            })
        );
    }

    #[test]
    fn test_start_request_without_tools() {
        let request = StartConversationRequest::new("m", "hi", 30, &[]);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_append_request_shape() {
        let value = serde_json::to_value(AppendConversationRequest::new("more")).unwrap();
        assert_eq!(value, json!({"inputs": "more", "stream": true}));
    }
}
