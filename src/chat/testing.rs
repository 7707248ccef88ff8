//! In-memory conversation service for adapter tests

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use reqwest::StatusCode;

use crate::mistral::errors::ServiceError;
use crate::mistral::model::conversations::{ConversationSummary, StoredMessage};
use crate::mistral::model::events::RawEvent;
use crate::mistral::model::requests::{AppendConversationRequest, StartConversationRequest};
use crate::mistral::service::{ConversationService, RawEventStream};

/// Request observed by the fake
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Start(StartConversationRequest),
    Append(String, AppendConversationRequest),
    Download(String),
}

/// Scripted reply to one start/append request
pub enum Reply {
    Events(Vec<Result<RawEvent, ServiceError>>),
    /// Events followed by a stream that never ends
    Hang(Vec<RawEvent>),
    Fail(ServiceError),
}

#[derive(Default)]
pub struct FakeService {
    replies: Mutex<VecDeque<Reply>>,
    files: HashMap<String, Bytes>,
    history: HashMap<String, Vec<StoredMessage>>,
    calls: Mutex<Vec<Call>>,
    /// Raw events handed out across all reply streams
    pub pulled: Arc<AtomicUsize>,
}

pub fn status_error(operation: &'static str, status: StatusCode) -> ServiceError {
    ServiceError::Status {
        operation,
        status,
        message: status.to_string(),
    }
}

pub fn started(id: &str) -> RawEvent {
    RawEvent::ResponseStarted {
        conversation_id: id.to_string(),
    }
}

pub fn output(text: &str) -> RawEvent {
    RawEvent::MessageOutput {
        content: text.into(),
    }
}

pub fn tool_started(name: &str) -> RawEvent {
    RawEvent::ToolExecutionStarted {
        tool_name: name.to_string(),
    }
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, events: Vec<RawEvent>) -> Self {
        self.with_script(Reply::Events(events.into_iter().map(Ok).collect()))
    }

    pub fn with_script(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_file(mut self, file_id: &str, bytes: impl Into<Bytes>) -> Self {
        self.files.insert(file_id.to_string(), bytes.into());
        self
    }

    pub fn with_history(mut self, conversation_id: &str, messages: Vec<StoredMessage>) -> Self {
        self.history.insert(conversation_id.to_string(), messages);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn next_stream(&self) -> Result<RawEventStream, ServiceError> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Events(Vec::new()));
        let pulled = self.pulled.clone();
        let count = move |item| {
            pulled.fetch_add(1, Ordering::SeqCst);
            item
        };

        match reply {
            Reply::Events(events) => Ok(stream::iter(events).map(count).boxed()),
            Reply::Hang(events) => Ok(stream::iter(events.into_iter().map(Ok))
                .map(count)
                .chain(stream::pending())
                .boxed()),
            Reply::Fail(e) => Err(e),
        }
    }
}

impl ConversationService for FakeService {
    async fn start_conversation(
        &self,
        request: StartConversationRequest,
    ) -> Result<RawEventStream, ServiceError> {
        self.calls.lock().unwrap().push(Call::Start(request));
        self.next_stream()
    }

    async fn append_conversation(
        &self,
        conversation_id: &str,
        request: AppendConversationRequest,
    ) -> Result<RawEventStream, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Append(conversation_id.to_string(), request));
        self.next_stream()
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ServiceError> {
        Ok(self
            .history
            .keys()
            .map(|id| ConversationSummary {
                id: id.clone(),
                name: id.clone(),
                updated_at: None,
            })
            .collect())
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>, ServiceError> {
        self.history
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| status_error("get messages", StatusCode::NOT_FOUND))
    }

    async fn download_file(&self, file_id: &str) -> Result<Bytes, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Download(file_id.to_string()));
        self.files
            .get(file_id)
            .cloned()
            .ok_or_else(|| status_error("download file", StatusCode::NOT_FOUND))
    }
}
