use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod analyzer;
pub mod capability;
pub mod config_file;
pub mod extractor;
pub mod latex;
pub mod orchestrator;
pub mod payload;
pub mod prompts;
pub mod session;
pub mod text_utils;

// Re-export for convenience
pub use analyzer::{AnalysisError, analyze_document};
pub use capability::gemini::GeminiClient;
pub use capability::{Capability, CapabilityError, GenerateRequest, OutputMode};
pub use extractor::{Extraction, ExtractionError, extract_paper};
pub use latex::{LatexError, PaperEntry};
pub use orchestrator::run_session;
pub use payload::{DocumentPayload, PDF_MIME_TYPE, PayloadError};
pub use session::{ItemStatus, PaperResult, Phase, Session, SessionSnapshot, SessionTicket};

/// Identifies one paper within the source document, as reported by analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    /// 1-based position of the paper in the document.
    pub index: u32,
    pub title: String,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("capability error: {0}")]
    Capability(#[from] CapabilityError),
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Default Gemini model used for both analysis and extraction.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default base URL for the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default cap on the number of papers processed per document.
pub const DEFAULT_MAX_PAPERS: usize = 50;

/// Default cap on the uploaded document size, in megabytes.
pub const DEFAULT_MAX_DOCUMENT_MB: u32 = 20;

/// Default address the web server binds to.
pub const DEFAULT_BIND: &str = "0.0.0.0:5002";

/// Runtime configuration shared by the CLI and the web server.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Per-request HTTP timeout. `None` leaves timeouts to the service.
    pub request_timeout_secs: Option<u64>,
    /// Analysis results beyond this count are dropped.
    pub max_papers: usize,
    pub max_document_mb: u32,
    pub bind: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_papers", &self.max_papers)
            .field("max_document_mb", &self.max_document_mb)
            .field("bind", &self.bind)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
            max_papers: DEFAULT_MAX_PAPERS,
            max_document_mb: DEFAULT_MAX_DOCUMENT_MB,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Config {
    /// Maximum accepted document size in bytes.
    pub fn max_document_bytes(&self) -> usize {
        self.max_document_mb as usize * 1024 * 1024
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Resolve configuration: config files, then environment variables.
    ///
    /// Callers load `.env` (via `dotenvy`) before calling this.
    pub fn resolve() -> Self {
        let file = config_file::load_config();
        let mut config = config_file::apply(Config::default(), &file);
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlay environment values read through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("GEMINI_API_KEY").or_else(|| var("API_KEY")) {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Some(model) = var("PAPERENTRY_MODEL") {
            self.model = model;
        }
        if let Some(base_url) = var("PAPERENTRY_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(bind) = var("PAPERENTRY_BIND") {
            self.bind = bind;
        }
        if let Some(n) = var("PAPERENTRY_MAX_PAPERS")
            .and_then(|v| v.parse().ok())
            .filter(|&n: &usize| n > 0)
        {
            self.max_papers = n;
        }
        if let Some(mb) = var("PAPERENTRY_MAX_DOCUMENT_MB")
            .and_then(|v| v.parse().ok())
            .filter(|&mb: &u32| mb > 0)
        {
            self.max_document_mb = mb;
        }
        if let Some(secs) = var("PAPERENTRY_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = Some(secs);
        }
    }

    /// Build the Gemini capability from this configuration.
    pub fn build_capability(&self) -> Result<Arc<GeminiClient>, CoreError> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            CoreError::Config(
                "No API key configured. Set GEMINI_API_KEY or [llm] api_key.".to_string(),
            )
        })?;
        Ok(Arc::new(GeminiClient::new(
            api_key,
            self.model.clone(),
            self.base_url.clone(),
            self.request_timeout(),
        )))
    }
}
