//! Conversation streaming adapter
//!
//! Normalizes the service's event stream into increments, tracks the
//! continuation id across prompts and rebuilds stored transcripts.

pub mod accumulator;
pub mod error;
pub mod image;
pub mod increment;
pub mod normalizer;
pub mod session;
pub mod tools;
pub mod transcript;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use session::{ConversationSession, SessionSettings};
pub use tools::ToolNameTable;
