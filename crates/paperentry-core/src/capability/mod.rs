//! The generation capability: "given a document and a prompt, return text".

pub mod gemini;
pub mod mock;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::payload::DocumentPayload;

/// Shape of output requested from the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Strict JSON (`application/json` response type).
    Json,
    /// Free text.
    Text,
}

/// A single generation request. The full document is sent every time.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    pub document: &'a DocumentPayload,
    pub output_mode: OutputMode,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The service answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },
    /// Server returned 429.
    #[error("Rate limited (429){}", retry_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },
    /// Transport-level failure (connect, TLS, timeout, body decoding).
    #[error("{0}")]
    Transport(String),
    /// The service answered but the body did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

fn retry_suffix(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|d| format!(", retry after {:.1}s", d.as_secs_f64()))
        .unwrap_or_default()
}

impl From<reqwest::Error> for CapabilityError {
    fn from(e: reqwest::Error) -> Self {
        CapabilityError::Transport(e.to_string())
    }
}

/// An external generative service that can answer a prompt about a document.
pub trait Capability: Send + Sync {
    /// Human-readable name of the backing model or service.
    fn name(&self) -> &str;

    fn generate<'a>(
        &'a self,
        request: GenerateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, CapabilityError>> + Send + 'a>>;
}
