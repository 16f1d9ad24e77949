//! The uploaded document as the capability sees it: base64 bytes plus a media type.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

pub const PDF_MIME_TYPE: &str = "application/pdf";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("document is empty")]
    Empty,
    #[error("document is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("unsupported media type {0:?}; only PDF files are accepted")]
    UnsupportedMediaType(String),
    #[error("malformed data URL")]
    MalformedDataUrl,
    #[error("invalid base64 data: {0}")]
    InvalidBase64(String),
}

/// An immutable, base64-encoded document shared read-only by every request
/// in a session.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentPayload {
    mime_type: String,
    data: String,
    byte_len: usize,
}

impl std::fmt::Debug for DocumentPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentPayload")
            .field("mime_type", &self.mime_type)
            .field("byte_len", &self.byte_len)
            .finish()
    }
}

impl DocumentPayload {
    /// Encode raw bytes with the declared media type.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Result<Self, PayloadError> {
        if bytes.is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
            byte_len: bytes.len(),
        })
    }

    /// Build from a `data:<mime>;base64,<data>` URL, stripping the prefix.
    pub fn from_data_url(url: &str) -> Result<Self, PayloadError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or(PayloadError::MalformedDataUrl)?;
        let (header, data) = rest.split_once(',').ok_or(PayloadError::MalformedDataUrl)?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or(PayloadError::MalformedDataUrl)?;
        let decoded = STANDARD
            .decode(data.trim())
            .map_err(|e| PayloadError::InvalidBase64(e.to_string()))?;
        if decoded.is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.trim().to_string(),
            byte_len: decoded.len(),
        })
    }

    /// Reject payloads that are not PDFs or exceed `limit` bytes.
    pub fn validate(&self, limit: usize) -> Result<(), PayloadError> {
        if self.mime_type != PDF_MIME_TYPE {
            return Err(PayloadError::UnsupportedMediaType(self.mime_type.clone()));
        }
        if self.byte_len > limit {
            return Err(PayloadError::TooLarge {
                size: self.byte_len,
                limit,
            });
        }
        Ok(())
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 data, without any data-URL prefix.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Size of the decoded document.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}
