//! Stored conversation models
//!
//! Listing entries and message history returned by the non-streaming
//! conversation endpoints

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::content::MessageContent;

/// Conversation listing entry as sent by the service
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Named conversation offered for resumption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: String,
    pub name: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConversationSummary {
    /// Keep only entries with a non-blank name, most recently updated first
    ///
    /// Entries without a usable timestamp keep their listing order after the dated ones.
    pub fn from_entries(entries: Vec<ConversationEntry>) -> Vec<Self> {
        let mut summaries: Vec<Self> = entries
            .into_iter()
            .filter_map(|entry| {
                let name = entry.name.filter(|n| !n.trim().is_empty())?;
                Some(Self {
                    id: entry.id,
                    name,
                    updated_at: entry.updated_at,
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }
}

/// Author of a stored message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    #[default]
    #[serde(other)]
    Other,
}

/// One entry of a conversation's message history
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredMessage {
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub content: MessageContent,
}

#[cfg(test)]
impl StoredMessage {
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of the message history endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationMessages {
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// Accepts RFC 3339 and zone-less timestamps; anything else becomes `None`
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}
