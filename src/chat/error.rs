//! Chat adapter errors

use thiserror::Error;

use super::image::ImageDecodeError;
use crate::mistral::errors::ServiceError;

/// Failure while normalizing or streaming a reply
#[derive(Debug, Error)]
pub enum ChatError {
    /// A tool started that has no status phrase; only this event is affected
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    /// A generated file could not be downloaded or decoded; only this event is affected
    #[error("Failed to fetch attachment {file_id}: {source}")]
    AttachmentFetch {
        file_id: String,
        #[source]
        source: AttachmentError,
    },

    /// The service could not be reached or the stream broke; ends the reply
    #[error(transparent)]
    Transport(#[from] ServiceError),

    /// The service reported a failure inside the stream; ends the reply
    #[error("Service reported an error ({code}): {message}")]
    Remote { code: String, message: String },
}

impl ChatError {
    /// Whether the reply stream ends after this error
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Remote { .. })
    }
}

/// Cause of an `AttachmentFetch` failure
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("download failed: {0}")]
    Download(#[source] ServiceError),
    #[error("not a supported image: {0}")]
    Decode(#[from] ImageDecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_terminal_classification() {
        assert!(!ChatError::UnknownTool { name: "x".into() }.is_terminal());
        assert!(
            !ChatError::AttachmentFetch {
                file_id: "f".into(),
                source: AttachmentError::Decode(ImageDecodeError::UnrecognizedFormat { hint: None }),
            }
            .is_terminal()
        );
        assert!(
            ChatError::Remote {
                code: "3000".into(),
                message: "boom".into()
            }
            .is_terminal()
        );
        let status = ServiceError::Status {
            operation: "append conversation",
            status: StatusCode::BAD_GATEWAY,
            message: "down".into(),
        };
        assert!(ChatError::from(status).is_terminal());
    }

    #[test]
    fn test_attachment_error_message() {
        let err = ChatError::AttachmentFetch {
            file_id: "file_1".into(),
            source: AttachmentError::Decode(ImageDecodeError::Truncated),
        };
        assert!(err.to_string().contains("file_1"));
    }
}
