//! Conversation stream events
//!
//! Defines the event type enum and the unified `RawEvent` produced from each
//! SSE frame of the streaming conversation endpoints

use serde::Deserialize;

use crate::mistral::parser::error::{ParseError, ParseResult};
use crate::mistral::parser::frame::Frame;

use super::content::MessageContent;

/// Event type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A reply has started; carries the conversation id
    ResponseStarted,
    /// Incremental assistant output
    MessageOutput,
    /// A built-in tool started running
    ToolExecutionStarted,
    /// A built-in tool finished
    ToolExecutionDone,
    /// The reply is complete
    ResponseDone,
    /// The service aborted the reply
    ResponseError,
    /// Event type not modelled by this client
    Unknown,
}

impl EventType {
    /// Parse from event type string
    pub fn from_str(s: &str) -> Self {
        match s {
            "conversation.response.started" => Self::ResponseStarted,
            "message.output.delta" => Self::MessageOutput,
            "tool.execution.started" => Self::ToolExecutionStarted,
            "tool.execution.done" => Self::ToolExecutionDone,
            "conversation.response.done" => Self::ResponseDone,
            "conversation.response.error" => Self::ResponseError,
            _ => Self::Unknown,
        }
    }

    /// Convert to event type string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResponseStarted => "conversation.response.started",
            Self::MessageOutput => "message.output.delta",
            Self::ToolExecutionStarted => "tool.execution.started",
            Self::ToolExecutionDone => "tool.execution.done",
            Self::ResponseDone => "conversation.response.done",
            Self::ResponseError => "conversation.response.error",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseStartedPayload {
    conversation_id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MessageOutputPayload {
    #[serde(default)]
    content: MessageContent,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolExecutionPayload {
    name: String,
}

/// Token usage reported when a reply completes
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseDonePayload {
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseErrorPayload {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: serde_json::Value,
}

/// Unified stream event
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    ResponseStarted { conversation_id: String },
    MessageOutput { content: MessageContent },
    ToolExecutionStarted { tool_name: String },
    ToolExecutionDone { tool_name: String },
    ResponseDone { usage: Option<Usage> },
    ResponseError { code: String, message: String },
    /// Event type this client does not model (function calls, handoffs)
    Unrecognized { event_type: String },
}

impl RawEvent {
    /// Parse event from frame
    ///
    /// The payload `type` field is authoritative; the `event:` line is the
    /// fallback when the payload omits it.
    pub fn from_frame(frame: &Frame) -> ParseResult<Self> {
        let payload: serde_json::Value = frame.payload_as_json()?;
        let event_type_str = payload
            .get("type")
            .and_then(|v| v.as_str())
            .or(frame.event_type())
            .ok_or(ParseError::MissingEventType)?
            .to_string();

        let event = match EventType::from_str(&event_type_str) {
            EventType::ResponseStarted => {
                let p: ResponseStartedPayload = serde_json::from_value(payload)?;
                Self::ResponseStarted {
                    conversation_id: p.conversation_id,
                }
            }
            EventType::MessageOutput => {
                let p: MessageOutputPayload = serde_json::from_value(payload)?;
                Self::MessageOutput { content: p.content }
            }
            EventType::ToolExecutionStarted => {
                let p: ToolExecutionPayload = serde_json::from_value(payload)?;
                Self::ToolExecutionStarted { tool_name: p.name }
            }
            EventType::ToolExecutionDone => {
                let p: ToolExecutionPayload = serde_json::from_value(payload)?;
                Self::ToolExecutionDone { tool_name: p.name }
            }
            EventType::ResponseDone => {
                let p: ResponseDonePayload = serde_json::from_value(payload)?;
                Self::ResponseDone { usage: p.usage }
            }
            EventType::ResponseError => {
                let p: ResponseErrorPayload = serde_json::from_value(payload)?;
                let code = match p.code {
                    serde_json::Value::Null => "unknown".to_string(),
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Self::ResponseError {
                    code,
                    message: p.message,
                }
            }
            EventType::Unknown => Self::Unrecognized {
                event_type: event_type_str,
            },
        };

        Ok(event)
    }
}
