//! Per-paper extraction into a `\paperentrynum` block.

use thiserror::Error;

use crate::PaperMetadata;
use crate::capability::{Capability, CapabilityError, GenerateRequest, OutputMode};
use crate::payload::DocumentPayload;
use crate::prompts::{self, UNREADABLE_MARKER};
use crate::text_utils::strip_code_fence;

/// Message stored on an item the capability flagged as unreadable.
pub const UNREADABLE_MESSAGE: &str = "Content unreadable";

/// Generic fallback when a failure carries no text of its own.
pub const EXTRACTION_FALLBACK_MESSAGE: &str = "Failed to extract abstract.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Failed to extract abstract: no output generated.")]
    Empty,
    #[error("{0}")]
    Capability(#[from] CapabilityError),
}

impl ExtractionError {
    /// Message stored on the failed item: the underlying text verbatim, or
    /// the generic fallback when that text is empty.
    pub fn user_message(&self) -> String {
        let msg = self.to_string();
        if msg.trim().is_empty() {
            EXTRACTION_FALLBACK_MESSAGE.to_string()
        } else {
            msg
        }
    }
}

/// Successful outcome of one extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The formatted block, trimmed and unfenced.
    Block(String),
    /// The capability answered with the unreadable sentinel.
    Unreadable,
}

/// Ask the capability to render the paper described by `metadata`.
pub async fn extract_paper(
    capability: &dyn Capability,
    document: &DocumentPayload,
    metadata: &PaperMetadata,
) -> Result<Extraction, ExtractionError> {
    let prompt = prompts::extraction_prompt(metadata);
    let text = capability
        .generate(GenerateRequest {
            prompt: &prompt,
            document,
            output_mode: OutputMode::Text,
        })
        .await?;
    classify_output(&text)
}

/// Turn raw extraction output into an [`Extraction`].
pub fn classify_output(text: &str) -> Result<Extraction, ExtractionError> {
    let clean = strip_code_fence(text);
    if clean.is_empty() {
        return Err(ExtractionError::Empty);
    }
    if clean.contains(UNREADABLE_MARKER) {
        return Ok(Extraction::Unreadable);
    }
    Ok(Extraction::Block(clean.to_string()))
}
