//! `data:` URI decoding for inline icons.
//!
//! Accepts `data:[mediatype][;base64],<payload>`. Base64 payloads use the
//! standard alphabet (ASCII whitespace is skipped); anything else is
//! percent-decoded without treating `+` specially.

use base64::Engine;

const DATA_URI_PREFIX: &str = "data:";

/// Errors from decoding a data URI. Nothing is written when these occur.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUriError {
    #[error("not a data URI")]
    NotDataUri,

    #[error("missing comma in data URI")]
    MissingComma,

    #[error("invalid base64: {0}")]
    Base64(String),

    #[error("invalid percent-escape")]
    PercentEscape,

    #[error("empty data URI payload")]
    Empty,
}

impl From<DataUriError> for homeport_core::Error {
    fn from(err: DataUriError) -> Self {
        homeport_core::Error::DecodeFailed(err.to_string())
    }
}

/// A decoded inline asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Declared media type, lowercased, without parameters. Empty if none.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl DataUri {
    /// File extension (with dot) for the declared media type.
    pub fn extension(&self) -> &'static str {
        extension_for_media_type(&self.media_type)
    }
}

/// Map an image media type to a file extension. Unknown types get `.ico`.
pub fn extension_for_media_type(media_type: &str) -> &'static str {
    match media_type {
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        "image/gif" => ".gif",
        _ => ".ico",
    }
}

/// Decode a `data:` URI.
pub fn decode(uri: &str) -> Result<DataUri, DataUriError> {
    let uri = uri.trim();
    let rest = uri
        .get(..DATA_URI_PREFIX.len())
        .filter(|p| p.eq_ignore_ascii_case(DATA_URI_PREFIX))
        .map(|_| &uri[DATA_URI_PREFIX.len()..])
        .ok_or(DataUriError::NotDataUri)?;

    let (metadata, payload) = rest.split_once(',').ok_or(DataUriError::MissingComma)?;

    let mut params = metadata.split(';');
    let media_type = params.next().unwrap_or("").trim().to_ascii_lowercase();
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 { decode_base64(payload)? } else { percent_decode(payload)? };

    if bytes.is_empty() {
        return Err(DataUriError::Empty);
    }

    Ok(DataUri { media_type, bytes })
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, DataUriError> {
    let cleaned: Vec<u8> = payload.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .map_err(|e| DataUriError::Base64(e.to_string()))
}

fn percent_decode(input: &str) -> Result<Vec<u8>, DataUriError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3).ok_or(DataUriError::PercentEscape)?;
            let hi = (hex[0] as char).to_digit(16).ok_or(DataUriError::PercentEscape)?;
            let lo = (hex[1] as char).to_digit(16).ok_or(DataUriError::PercentEscape)?;
            out.push(((hi << 4) | lo) as u8);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Ok(out)
}
