//! Server-Sent Events streaming decoder
//!
//! Uses a small state machine to process streaming data:
//!
//! ```text
//! ┌─────────────────┐
//! │      Ready      │  (Initial state, ready to receive data)
//! └────────┬────────┘
//!          │ feed() provides data
//!          ↓
//! ┌─────────────────┐
//! │     Parsing     │  decode() attempts to parse
//! └────────┬────────┘
//!          │
//!     ┌────┴────────────┐
//!     ↓                 ↓
//!  [Success]         [Failure]
//!     │                 │
//!     ↓                 ↓
//! ┌─────────┐     ┌────────────┐
//! │  Ready  │     │   Stopped  │ (Terminal state)
//! └─────────┘     └────────────┘
//! ```
//!
//! Text framing cannot lose synchronisation the way binary framing can, so
//! there is no recovery state: any error is terminal for the stream.

use super::error::{ParseError, ParseResult};
use super::frame::{Frame, parse_frame};
use bytes::{Buf, BytesMut};

/// Default maximum buffer size (16 MB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Default initial buffer capacity
pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

/// Decoder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Ready, can receive data
    Ready,
    /// Currently parsing frame
    Parsing,
    /// Stopped after an error
    Stopped,
}

/// Streaming SSE decoder
///
/// # Example
///
/// ```rust,ignore
/// let mut decoder = SseDecoder::new();
/// decoder.feed(chunk)?;
/// for result in decoder.decode_iter() {
///     let frame = result?;
///     println!("{:?}: {}", frame.event_type(), frame.data);
/// }
/// ```
pub struct SseDecoder {
    buffer: BytesMut,
    state: DecoderState,
    frames_decoded: usize,
    max_buffer_size: usize,
    last_error: Option<String>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    /// Create new decoder
    pub fn new() -> Self {
        Self::with_config(DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_BUFFER_SIZE)
    }

    /// Create decoder with custom configuration
    pub fn with_config(capacity: usize, max_buffer_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: DecoderState::Ready,
            frames_decoded: 0,
            max_buffer_size,
            last_error: None,
        }
    }

    /// Feed data to decoder
    ///
    /// # Returns
    /// - `Ok(())` - Data added to buffer
    /// - `Err(BufferOverflow)` - Buffer is full
    pub fn feed(&mut self, data: &[u8]) -> ParseResult<()> {
        let new_size = self.buffer.len() + data.len();
        if new_size > self.max_buffer_size {
            let error = ParseError::BufferOverflow {
                size: new_size,
                max: self.max_buffer_size,
            };
            self.stop(&error);
            return Err(error);
        }

        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Try to decode next frame, skipping keep-alive comments
    ///
    /// # Returns
    /// - `Ok(Some(frame))` - Successfully decoded a frame
    /// - `Ok(None)` - Insufficient data, need more data
    /// - `Err(e)` - Decode error, decoder is now stopped
    pub fn decode(&mut self) -> ParseResult<Option<Frame>> {
        if self.state == DecoderState::Stopped {
            return Err(ParseError::Stopped {
                last_error: self.last_error.clone().unwrap_or_default(),
            });
        }

        loop {
            if self.buffer.is_empty() {
                self.state = DecoderState::Ready;
                return Ok(None);
            }

            self.state = DecoderState::Parsing;

            match parse_frame(&self.buffer) {
                Ok(Some((frame, consumed))) => {
                    self.buffer.advance(consumed);
                    self.state = DecoderState::Ready;
                    if frame.is_keep_alive() {
                        continue;
                    }
                    self.frames_decoded += 1;
                    return Ok(Some(frame));
                }
                Ok(None) => {
                    self.state = DecoderState::Ready;
                    return Ok(None);
                }
                Err(e) => {
                    self.stop(&e);
                    return Err(e);
                }
            }
        }
    }

    /// Create decode iterator
    pub fn decode_iter(&mut self) -> DecodeIter<'_> {
        DecodeIter { decoder: self }
    }

    fn stop(&mut self, error: &ParseError) {
        tracing::error!("SSE decoder stopped: {}", error);
        self.state = DecoderState::Stopped;
        self.last_error = Some(error.to_string());
    }

    /// Get current state
    #[cfg(test)]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Get number of decoded frames
    pub fn frames_decoded(&self) -> usize {
        self.frames_decoded
    }

    /// Bytes still waiting for a frame terminator
    ///
    /// Whitespace-only leftovers are not counted.
    pub fn pending_bytes(&self) -> usize {
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            0
        } else {
            self.buffer.len()
        }
    }
}

/// Decode iterator
pub struct DecodeIter<'a> {
    decoder: &'a mut SseDecoder,
}

impl Iterator for DecodeIter<'_> {
    type Item = ParseResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.decoder.state == DecoderState::Stopped {
            return None;
        }

        match self.decoder.decode() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
