//! Normalized output units

use super::image::DecodedImage;

/// One unit of normalized reply output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedIncrement {
    /// Text appended to the current assistant message
    TextDelta { text: String },
    /// Tool progress notice, already suffixed with a blank line
    StatusNote { text: String },
    /// Generated image; closes the current assistant message
    ImageReady { image: DecodedImage },
}

impl NormalizedIncrement {
    #[cfg(test)]
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }
}

/// Inline markup for a source reference, identical in live and stored replies
pub fn reference_markup(title: &str, url: Option<&str>) -> String {
    format!(" [[{}]({})] ", title, url.unwrap_or_default())
}
