//! Message accumulator
//!
//! Folds increments into display entries. Text and status notes extend the
//! open assistant message; an image closes it, so the next text opens a
//! fresh message.

use super::image::DecodedImage;
use super::increment::NormalizedIncrement;
use super::transcript::{RenderableMessage, Speaker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    Message(RenderableMessage),
    Image(DecodedImage),
}

/// What a push added to the transcript
#[derive(Debug, PartialEq, Eq)]
pub enum Appended {
    /// Text appended to the open assistant message, separator included
    Text(String),
    Image(DecodedImage),
}

#[derive(Debug, Default)]
pub struct MessageAccumulator {
    /// Closed entries, in order
    entries: Vec<TranscriptEntry>,
    /// Assistant message still receiving text
    open: Option<RenderableMessage>,
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with reconstructed history; the next reply opens a new message
    pub fn from_transcript(messages: Vec<RenderableMessage>) -> Self {
        Self {
            entries: messages.into_iter().map(TranscriptEntry::Message).collect(),
            open: None,
        }
    }

    /// Record a user prompt and close the assistant message
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.finish_turn();
        self.entries
            .push(TranscriptEntry::Message(RenderableMessage::user(text)));
    }

    /// Close the assistant message without adding anything
    pub fn finish_turn(&mut self) {
        if let Some(message) = self.open.take() {
            self.entries.push(TranscriptEntry::Message(message));
        }
    }

    pub fn push(&mut self, increment: NormalizedIncrement) -> Appended {
        match increment {
            NormalizedIncrement::TextDelta { text } => {
                self.open_text().push_str(&text);
                Appended::Text(text)
            }
            NormalizedIncrement::StatusNote { text } => {
                let current = self.open_text();
                let mut piece = String::new();
                if !current.is_empty() && !current.ends_with("\n\n") {
                    piece.push_str(if current.ends_with('\n') { "\n" } else { "\n\n" });
                }
                piece.push_str(&text);
                current.push_str(&piece);
                Appended::Text(piece)
            }
            NormalizedIncrement::ImageReady { image } => {
                self.finish_turn();
                self.entries.push(TranscriptEntry::Image(image.clone()));
                Appended::Image(image)
            }
        }
    }

    /// Closed entries; the open assistant message is not included
    #[cfg(test)]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    #[cfg(test)]
    pub fn open_message(&self) -> Option<&RenderableMessage> {
        self.open.as_ref()
    }

    /// Text of every assistant message, open one last
    #[cfg(test)]
    pub fn assistant_texts(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Message(m) => Some(m),
                TranscriptEntry::Image(_) => None,
            })
            .chain(self.open.as_ref())
            .filter(|m| m.speaker == Speaker::Assistant)
            .map(|m| m.text.as_str())
            .collect()
    }

    fn open_text(&mut self) -> &mut String {
        &mut self
            .open
            .get_or_insert_with(|| RenderableMessage::assistant(""))
            .text
    }
}
