//! Server-Sent Events frame parsing
//!
//! ## Frame Format
//!
//! ```text
//! event: message.output.delta
//! data: {"type":"message.output.delta","content":"Hel"}
//! <blank line>
//! ```
//!
//! - Lines end with `\n`, `\r\n` or `\r`
//! - A blank line terminates the frame
//! - Lines starting with `:` are comments (keep-alives)
//! - Multiple `data:` lines are joined with `\n`
//! - A single space after the field colon is not part of the value

use super::error::{ParseError, ParseResult};

/// Parsed event frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Value of the `event:` field
    pub event: Option<String>,
    /// Joined `data:` lines
    pub data: String,
    /// Value of the `id:` field
    pub id: Option<String>,
    data_lines: usize,
}

impl Frame {
    /// Frame with an `event:` field and a single `data:` line
    #[cfg(test)]
    pub(crate) fn new(event: Option<&str>, data: &str) -> Self {
        Self {
            event: event.map(str::to_string),
            data: data.to_string(),
            id: None,
            data_lines: 1,
        }
    }

    /// Get event type declared by the `event:` field
    pub fn event_type(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// A frame without `data:` lines is never dispatched (comments, bare `event:`)
    pub fn is_keep_alive(&self) -> bool {
        self.data_lines == 0
    }

    /// Parse payload as JSON
    pub fn payload_as_json<T: serde::de::DeserializeOwned>(&self) -> ParseResult<T> {
        serde_json::from_str(&self.data).map_err(ParseError::PayloadDeserialize)
    }

    fn apply_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                if self.data_lines > 0 {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.data_lines += 1;
            }
            "id" => self.id = Some(value.to_string()),
            // `retry:` and unknown fields are ignored
            _ => {}
        }
    }
}

/// Locate the next line in `buffer`
///
/// Returns `(line_length, terminator_length)`, or `None` when no complete
/// line is available yet. A trailing `\r` is held back because a `\n` may
/// still follow in the next chunk.
fn next_line(buffer: &[u8]) -> Option<(usize, usize)> {
    let pos = buffer.iter().position(|&b| b == b'\n' || b == b'\r')?;
    if buffer[pos] == b'\n' {
        return Some((pos, 1));
    }
    match buffer.get(pos + 1) {
        Some(b'\n') => Some((pos, 2)),
        Some(_) => Some((pos, 1)),
        None => None,
    }
}

/// Try to parse a complete frame from buffer
///
/// This is a stateless pure function, each call parses independently.
/// Buffer management is handled by the upper layer `SseDecoder`.
///
/// # Returns
/// - `Ok(Some((frame, consumed)))` - Successfully parsed, returns frame and consumed bytes
/// - `Ok(None)` - Insufficient data, need more data
/// - `Err(e)` - Parse error
pub fn parse_frame(buffer: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
    let mut frame = Frame::default();
    let mut offset = 0;

    while let Some((line_len, terminator_len)) = next_line(&buffer[offset..]) {
        let line = &buffer[offset..offset + line_len];
        let line_start = offset;
        offset += line_len + terminator_len;

        if line.is_empty() {
            return Ok(Some((frame, offset)));
        }

        let line =
            std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8 { offset: line_start })?;
        frame.apply_line(line);
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_insufficient_data() {
        let buffer = b"event: message.output.delta\ndata: {}";
        assert!(matches!(parse_frame(buffer), Ok(None)));
    }

    #[test]
    fn test_frame_complete() {
        let buffer = b"event: conversation.response.started\ndata: {\"a\":1}\n\nrest";
        let (frame, consumed) = parse_frame(buffer).unwrap().unwrap();
        assert_eq!(frame.event_type(), Some("conversation.response.started"));
        assert_eq!(frame.data, "{\"a\":1}");
        assert_eq!(&buffer[consumed..], b"rest");
    }

    #[test]
    fn test_frame_crlf_and_multiline_data() {
        let buffer = b"data: first\r\ndata:second\r\n\r\n";
        let (frame, consumed) = parse_frame(buffer).unwrap().unwrap();
        assert_eq!(frame.data, "first\nsecond");
        assert_eq!(frame.event, None);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_frame_trailing_cr_waits_for_more() {
        assert!(matches!(parse_frame(b"data: x\r"), Ok(None)));
    }

    #[test]
    fn test_frame_new_is_dispatched() {
        let frame = Frame::new(Some("message.output.delta"), "{}");
        assert!(!frame.is_keep_alive());
        assert_eq!(frame.event_type(), Some("message.output.delta"));
    }

    #[test]
    fn test_frame_comment_is_keep_alive() {
        let (frame, _) = parse_frame(b": ping\n\n").unwrap().unwrap();
        assert!(frame.is_keep_alive());
    }

    #[test]
    fn test_frame_invalid_utf8() {
        let buffer = b"data: \xff\xfe\n\n";
        assert!(matches!(
            parse_frame(buffer),
            Err(ParseError::InvalidUtf8 { offset: 0 })
        ));
    }
}
