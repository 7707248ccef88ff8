//! Image attachment decoding
//!
//! Generated images are identified by their signature and header only; pixel
//! data is never decompressed. Supported containers: PNG, JPEG, GIF, WebP.

use std::path::Path;

use bytes::Bytes;
use thiserror::Error;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageDecodeError {
    #[error("unrecognized image data{}", describe_hint(.hint))]
    UnrecognizedFormat { hint: Option<String> },
    #[error("image header is truncated")]
    Truncated,
    #[error("image reports zero dimensions")]
    ZeroDimensions,
}

fn describe_hint(hint: &Option<String>) -> String {
    hint.as_deref()
        .map(|mime| format!(" (file name suggests {})", mime))
        .unwrap_or_default()
}

/// Detected image container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

/// Image ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Bytes,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// File name reported by the tool, if any
    pub file_name: Option<String>,
}

impl DecodedImage {
    /// File name to save the image under, derived from `fallback_stem` when the tool gave none
    pub fn suggested_file_name(&self, fallback_stem: &str) -> String {
        let extension = self.format.extension();
        match self.file_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) if Path::new(name).extension().is_some() => name.to_string(),
            Some(name) => format!("{}.{}", name, extension),
            None => format!("{}.{}", fallback_stem, extension),
        }
    }
}

/// Identify `bytes` as an image and read its dimensions
pub fn decode_image(bytes: Bytes, file_name: Option<&str>) -> Result<DecodedImage, ImageDecodeError> {
    let (format, width, height) = sniff(&bytes).ok_or_else(|| ImageDecodeError::UnrecognizedFormat {
        hint: file_name
            .and_then(|name| mime_guess::from_path(name).first_raw())
            .map(str::to_string),
    })??;

    if width == 0 || height == 0 {
        return Err(ImageDecodeError::ZeroDimensions);
    }

    Ok(DecodedImage {
        bytes,
        format,
        width,
        height,
        file_name: file_name.map(str::to_string),
    })
}

type Dimensions = Result<(ImageFormat, u32, u32), ImageDecodeError>;

/// `None` when no known signature matches
fn sniff(data: &[u8]) -> Option<Dimensions> {
    if data.starts_with(PNG_SIGNATURE) {
        Some(png_dimensions(data))
    } else if data.starts_with(&[0xFF, 0xD8]) {
        Some(jpeg_dimensions(data))
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some(gif_dimensions(data))
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(webp_dimensions(data))
    } else {
        None
    }
}

fn be_u16(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]) as u32)
}

fn le_u16(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]) as u32)
}

fn le_u24(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 3)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], 0]))
}

fn png_dimensions(data: &[u8]) -> Dimensions {
    // IHDR is always the first chunk
    let header = data.get(12..24).ok_or(ImageDecodeError::Truncated)?;
    if &header[0..4] != b"IHDR" {
        return Err(ImageDecodeError::UnrecognizedFormat { hint: None });
    }
    let width = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    let height = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
    Ok((ImageFormat::Png, width, height))
}

fn gif_dimensions(data: &[u8]) -> Dimensions {
    let width = le_u16(data, 6).ok_or(ImageDecodeError::Truncated)?;
    let height = le_u16(data, 8).ok_or(ImageDecodeError::Truncated)?;
    Ok((ImageFormat::Gif, width, height))
}

fn jpeg_dimensions(data: &[u8]) -> Dimensions {
    let mut pos = 2;
    loop {
        // Skip fill bytes before the marker code
        while data.get(pos) == Some(&0xFF) && data.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        if data.get(pos) != Some(&0xFF) {
            return Err(ImageDecodeError::Truncated);
        }
        let marker = *data.get(pos + 1).ok_or(ImageDecodeError::Truncated)?;
        pos += 2;

        match marker {
            0xD0..=0xD7 | 0x01 => continue,
            0xD9 | 0xDA => return Err(ImageDecodeError::Truncated),
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                // length(2) precision(1) height(2) width(2)
                let height = be_u16(data, pos + 3).ok_or(ImageDecodeError::Truncated)?;
                let width = be_u16(data, pos + 5).ok_or(ImageDecodeError::Truncated)?;
                return Ok((ImageFormat::Jpeg, width, height));
            }
            _ => {
                let length = be_u16(data, pos).ok_or(ImageDecodeError::Truncated)? as usize;
                if length < 2 {
                    return Err(ImageDecodeError::Truncated);
                }
                pos += length;
            }
        }
    }
}

fn webp_dimensions(data: &[u8]) -> Dimensions {
    let chunk = data.get(12..16).ok_or(ImageDecodeError::Truncated)?;
    let (width, height) = match chunk {
        b"VP8 " => {
            if data.get(23..26) != Some(&[0x9D, 0x01, 0x2A][..]) {
                return Err(ImageDecodeError::Truncated);
            }
            let width = le_u16(data, 26).ok_or(ImageDecodeError::Truncated)? & 0x3FFF;
            let height = le_u16(data, 28).ok_or(ImageDecodeError::Truncated)? & 0x3FFF;
            (width, height)
        }
        b"VP8L" => {
            let b = data.get(21..25).ok_or(ImageDecodeError::Truncated)?;
            if data[20] != 0x2F {
                return Err(ImageDecodeError::Truncated);
            }
            let bits = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            ((bits & 0x3FFF) + 1, ((bits >> 14) & 0x3FFF) + 1)
        }
        b"VP8X" => {
            let width = le_u24(data, 24).ok_or(ImageDecodeError::Truncated)? + 1;
            let height = le_u24(data, 27).ok_or(ImageDecodeError::Truncated)? + 1;
            (width, height)
        }
        _ => return Err(ImageDecodeError::UnrecognizedFormat { hint: None }),
    };
    Ok((ImageFormat::Webp, width, height))
}
