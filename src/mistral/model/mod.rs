//! Conversation API data models
//!
//! Contains all data type definitions for the conversation API:
//! - `content`: Message content and chunk shapes
//! - `events`: Streaming response event types
//! - `requests`: Request types
//! - `conversations`: Listing entries and stored history

pub mod content;
pub mod conversations;
pub mod events;
pub mod requests;
