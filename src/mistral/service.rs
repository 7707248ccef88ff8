//! Remote conversation service seam
//!
//! The chat adapter only talks to the service through this trait, so tests
//! can substitute an in-memory implementation for the HTTP provider.

use std::future::Future;

use bytes::Bytes;
use futures::stream::BoxStream;

use super::errors::ServiceError;
use super::model::conversations::{ConversationSummary, StoredMessage};
use super::model::events::RawEvent;
use super::model::requests::{AppendConversationRequest, StartConversationRequest};

/// Single-pass stream of raw events for one reply
pub type RawEventStream = BoxStream<'static, Result<RawEvent, ServiceError>>;

/// Operations of the remote conversation service
pub trait ConversationService: Send + Sync {
    /// Start a new conversation and stream the reply
    fn start_conversation(
        &self,
        request: StartConversationRequest,
    ) -> impl Future<Output = Result<RawEventStream, ServiceError>> + Send;

    /// Append a prompt to an existing conversation and stream the reply
    fn append_conversation(
        &self,
        conversation_id: &str,
        request: AppendConversationRequest,
    ) -> impl Future<Output = Result<RawEventStream, ServiceError>> + Send;

    /// Named conversations, most recent first
    fn list_conversations(
        &self,
    ) -> impl Future<Output = Result<Vec<ConversationSummary>, ServiceError>> + Send;

    /// Stored history of a conversation, oldest first
    fn get_messages(
        &self,
        conversation_id: &str,
    ) -> impl Future<Output = Result<Vec<StoredMessage>, ServiceError>> + Send;

    /// Raw bytes of a file produced by a tool
    fn download_file(&self, file_id: &str)
    -> impl Future<Output = Result<Bytes, ServiceError>> + Send;
}
