//! Server-Sent Events parser
//!
//! Provides parsing support for the `text/event-stream` framing used by the
//! streaming conversation endpoints

pub mod decoder;
pub mod error;
pub mod frame;

pub use decoder::SseDecoder;
