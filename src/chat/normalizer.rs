//! Event normalizer
//!
//! Reduces each raw service event to at most one `NormalizedIncrement`.
//! The only I/O is the single download attempt for tool-generated files.

use std::sync::Arc;

use super::error::{AttachmentError, ChatError};
use super::image::decode_image;
use super::increment::{NormalizedIncrement, reference_markup};
use super::tools::ToolNameTable;
use crate::mistral::model::content::{ContentChunk, Fragment, MessageContent};
use crate::mistral::model::events::RawEvent;
use crate::mistral::service::ConversationService;

/// Result of normalizing one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub increment: Option<NormalizedIncrement>,
    /// Continuation id after this event
    pub conversation_id: Option<String>,
}

pub struct EventNormalizer<S> {
    service: Arc<S>,
    tools: ToolNameTable,
}

impl<S: ConversationService> EventNormalizer<S> {
    pub fn new(service: Arc<S>, tools: ToolNameTable) -> Self {
        Self { service, tools }
    }

    /// Normalize one event
    ///
    /// `prior` is passed through unless the event starts a response, in
    /// which case the event's id replaces it. An error affects this event
    /// only; `ChatError::is_terminal` tells whether the reply is over.
    pub async fn normalize(
        &self,
        event: RawEvent,
        prior: Option<&str>,
    ) -> Result<Normalized, ChatError> {
        let mut conversation_id = prior.map(str::to_string);

        let increment = match event {
            RawEvent::ResponseStarted {
                conversation_id: id,
            } => {
                tracing::debug!(conversation_id = %id, "Response started");
                conversation_id = Some(id);
                None
            }
            RawEvent::MessageOutput { content } => self.normalize_content(content).await?,
            RawEvent::ToolExecutionStarted { tool_name } => {
                let text = self
                    .tools
                    .status_note(&tool_name)
                    .ok_or(ChatError::UnknownTool { name: tool_name })?;
                Some(NormalizedIncrement::StatusNote { text })
            }
            RawEvent::ToolExecutionDone { tool_name } => {
                tracing::debug!(tool_name = %tool_name, "Tool execution finished");
                None
            }
            RawEvent::ResponseDone { usage } => {
                if let Some(usage) = usage {
                    tracing::debug!(
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        total_tokens = usage.total_tokens,
                        "Response finished"
                    );
                }
                None
            }
            RawEvent::ResponseError { code, message } => {
                return Err(ChatError::Remote { code, message });
            }
            RawEvent::Unrecognized { event_type } => {
                tracing::debug!(event_type = %event_type, "Ignoring unrecognized event");
                None
            }
        };

        Ok(Normalized {
            increment,
            conversation_id,
        })
    }

    async fn normalize_content(
        &self,
        content: MessageContent,
    ) -> Result<Option<NormalizedIncrement>, ChatError> {
        match content {
            MessageContent::Text(text) => Ok(Some(NormalizedIncrement::TextDelta { text })),
            MessageContent::Chunk(chunk) => self.normalize_chunk(chunk).await,
            MessageContent::Fragments(fragments) => {
                let text: String = fragments.iter().filter_map(Fragment::as_text).collect();
                if text.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(NormalizedIncrement::TextDelta { text }))
                }
            }
        }
    }

    async fn normalize_chunk(
        &self,
        chunk: ContentChunk,
    ) -> Result<Option<NormalizedIncrement>, ChatError> {
        match chunk {
            ContentChunk::Text { text } => Ok(Some(NormalizedIncrement::TextDelta { text })),
            ContentChunk::ToolReference { title, url, .. } => Ok(Some(NormalizedIncrement::TextDelta {
                text: reference_markup(&title, url.as_deref()),
            })),
            ContentChunk::ToolFile {
                file_id, file_name, ..
            } => self.fetch_image(file_id, file_name).await.map(Some),
            ContentChunk::ImageUrl { .. } | ContentChunk::DocumentUrl { .. } | ContentChunk::Unknown => {
                tracing::debug!("Ignoring non-textual output chunk");
                Ok(None)
            }
        }
    }

    async fn fetch_image(
        &self,
        file_id: String,
        file_name: Option<String>,
    ) -> Result<NormalizedIncrement, ChatError> {
        let bytes = match self.service.download_file(&file_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Err(ChatError::AttachmentFetch {
                    file_id,
                    source: AttachmentError::Download(e),
                });
            }
        };

        let size = bytes.len();
        match decode_image(bytes, file_name.as_deref()) {
            Ok(image) => {
                tracing::debug!(
                    file_id = %file_id,
                    size,
                    width = image.width,
                    height = image.height,
                    mime = image.format.mime_type(),
                    "Generated image ready"
                );
                Ok(NormalizedIncrement::ImageReady { image })
            }
            Err(e) => Err(ChatError::AttachmentFetch {
                file_id,
                source: e.into(),
            }),
        }
    }
}
