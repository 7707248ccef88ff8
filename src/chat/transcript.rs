//! Transcript reconstruction
//!
//! Turns stored history into the same renderable messages a live reply
//! produces. Stored history keeps no tool progress, so no status notes
//! appear here.

use super::increment::reference_markup;
use crate::mistral::model::content::{ContentChunk, Fragment, MessageContent};
use crate::mistral::model::conversations::{Role, StoredMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// A message ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderableMessage {
    pub speaker: Speaker,
    pub text: String,
}

impl RenderableMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Rebuild renderable messages from stored history, in order
pub fn reconstruct(history: &[StoredMessage]) -> Vec<RenderableMessage> {
    history
        .iter()
        .filter_map(|message| match message.role {
            Role::User => Some(RenderableMessage::user(message.content.plain_text())),
            Role::Assistant => Some(RenderableMessage::assistant(render_assistant(
                &message.content,
            ))),
            Role::Other => {
                tracing::debug!("Skipping stored entry without a user or assistant role");
                None
            }
        })
        .collect()
}

fn render_assistant(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Chunk(chunk) => render_chunk(chunk),
        MessageContent::Fragments(fragments) => fragments
            .iter()
            .map(|fragment| match fragment {
                Fragment::Text(text) => text.clone(),
                Fragment::Chunk(chunk) => render_chunk(chunk),
            })
            .collect(),
    }
}

fn render_chunk(chunk: &ContentChunk) -> String {
    match chunk {
        ContentChunk::Text { text } => text.clone(),
        ContentChunk::ToolReference { title, url, .. } => reference_markup(title, url.as_deref()),
        ContentChunk::ToolFile { .. }
        | ContentChunk::ImageUrl { .. }
        | ContentChunk::DocumentUrl { .. }
        | ContentChunk::Unknown => String::new(),
    }
}
