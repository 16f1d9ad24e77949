use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{Capability, CapabilityError, GenerateRequest, OutputMode};

/// Gemini `generateContent` client. The document travels inline with every
/// request; no context is kept between calls.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl Capability for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate<'a>(
        &'a self,
        request: GenerateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, CapabilityError>> + Send + 'a>> {
        Box::pin(async move {
            let body = build_request_body(&request);
            tracing::debug!(
                model = %self.model,
                mode = ?request.output_mode,
                document_bytes = request.document.byte_len(),
                "sending generateContent request"
            );

            let mut builder = self
                .client
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(&body);
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
            let resp = builder.send().await?;

            let status = resp.status();
            if status.as_u16() == 429 {
                let retry_after = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                return Err(CapabilityError::RateLimited { retry_after });
            }
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(CapabilityError::Api {
                    status: status.as_u16(),
                    message: parse_error_message(&text)
                        .unwrap_or_else(|| format!("HTTP {}", status)),
                });
            }

            let data: serde_json::Value = resp.json().await?;
            let text = parse_response_text(&data)?;
            tracing::debug!(model = %self.model, chars = text.len(), "generateContent complete");
            Ok(text)
        })
    }
}

/// Build the JSON body for a `generateContent` call.
pub fn build_request_body(request: &GenerateRequest<'_>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "contents": [{
            "parts": [
                { "text": request.prompt },
                {
                    "inlineData": {
                        "mimeType": request.document.mime_type(),
                        "data": request.document.data(),
                    }
                }
            ]
        }]
    });
    if request.output_mode == OutputMode::Json {
        body["generationConfig"] = serde_json::json!({ "responseMimeType": "application/json" });
    }
    body
}

/// Concatenate the text parts of the first candidate.
///
/// A response with no candidates but a `promptFeedback.blockReason` is
/// reported as malformed with the block reason; a candidate with no text
/// parts yields an empty string, which callers treat as "no output".
pub fn parse_response_text(data: &serde_json::Value) -> Result<String, CapabilityError> {
    let Some(candidate) = data["candidates"].as_array().and_then(|c| c.first()) else {
        if let Some(reason) = data["promptFeedback"]["blockReason"].as_str() {
            return Err(CapabilityError::Malformed(format!(
                "prompt blocked ({})",
                reason
            )));
        }
        return Ok(String::new());
    };

    let text = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text)
}

/// Pull `error.message` out of an error body, if it has one.
pub fn parse_error_message(body: &str) -> Option<String> {
    let data: serde_json::Value = serde_json::from_str(body).ok()?;
    data["error"]["message"]
        .as_str()
        .filter(|m| !m.is_empty())
        .map(String::from)
}
