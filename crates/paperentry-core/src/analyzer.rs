//! Document analysis: enumerate the papers contained in a PDF.

use thiserror::Error;

use crate::capability::{Capability, CapabilityError, GenerateRequest, OutputMode};
use crate::payload::DocumentPayload;
use crate::text_utils::strip_code_fence;
use crate::{PaperMetadata, prompts};

/// Prefix of every analysis failure message shown to users.
pub const ANALYSIS_FAILED_PREFIX: &str = "Failed to analyze PDF structure.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("No response from AI for structure analysis.")]
    EmptyResponse,
    #[error("Could not parse paper list: {0}")]
    InvalidJson(String),
    #[error("Could not identify papers in the PDF.")]
    NoPapers,
    #[error("{0}")]
    Capability(#[from] CapabilityError),
}

impl AnalysisError {
    /// Full message for the session-fatal failure view.
    pub fn user_message(&self) -> String {
        format!("{} {}", ANALYSIS_FAILED_PREFIX, self)
    }
}

/// Ask the capability for the list of papers in `document`.
///
/// The result is non-empty and in the order the model emitted it. At most
/// `max_papers` entries are kept; a cap of zero is treated as one.
pub async fn analyze_document(
    capability: &dyn Capability,
    document: &DocumentPayload,
    max_papers: usize,
) -> Result<Vec<PaperMetadata>, AnalysisError> {
    let text = capability
        .generate(GenerateRequest {
            prompt: prompts::analysis_prompt(),
            document,
            output_mode: OutputMode::Json,
        })
        .await?;

    let mut papers = parse_paper_list(&text)?;
    // A zero cap would turn a successful analysis into an empty session.
    let max_papers = max_papers.max(1);
    if papers.len() > max_papers {
        tracing::warn!(
            found = papers.len(),
            max_papers,
            "analysis returned more papers than allowed, truncating"
        );
        papers.truncate(max_papers);
    }
    tracing::info!(papers = papers.len(), "document analysis complete");
    Ok(papers)
}

/// Parse the analysis response text into paper descriptors.
pub fn parse_paper_list(text: &str) -> Result<Vec<PaperMetadata>, AnalysisError> {
    let clean = strip_code_fence(text);
    if clean.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    let papers: Vec<PaperMetadata> =
        serde_json::from_str(clean).map_err(|e| AnalysisError::InvalidJson(e.to_string()))?;
    if papers.is_empty() {
        return Err(AnalysisError::NoPapers);
    }
    Ok(papers)
}
