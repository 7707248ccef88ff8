//! Mistral conversations API client
//!
//! Wire models, SSE parsing and the HTTP provider behind the
//! `ConversationService` seam.

pub mod errors;
pub mod model;
pub mod parser;
pub mod provider;
pub mod service;
