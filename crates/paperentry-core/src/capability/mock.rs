//! Mock capability for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{Capability, CapabilityError, GenerateRequest, OutputMode};

/// A configurable mock response for [`MockCapability`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this text.
    Text(String),
    /// Fail with this error.
    Error(CapabilityError),
}

impl MockResponse {
    pub fn text(s: impl Into<String>) -> Self {
        MockResponse::Text(s.into())
    }

    /// Shorthand for a transport failure carrying `message`.
    pub fn fail(message: impl Into<String>) -> Self {
        MockResponse::Error(CapabilityError::Transport(message.into()))
    }
}

/// One recorded call to [`MockCapability::generate`].
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub prompt: String,
    pub output_mode: OutputMode,
    pub document_bytes: usize,
}

/// A hand-rolled mock implementing [`Capability`] for tests.
///
/// Returns scripted responses in order, repeating the last one once the
/// script is exhausted. Every call is recorded.
pub struct MockCapability {
    responses: Mutex<Vec<MockResponse>>,
    fallback: MockResponse,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockCapability {
    /// Create a mock that always returns `response`.
    pub fn new(response: MockResponse) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            fallback: response,
            delay: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Create a mock that returns responses in order, repeating the last one.
    pub fn with_sequence(mut responses: Vec<MockResponse>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        // Reversed so pop() yields the next response.
        responses.reverse();
        let fallback = responses.first().cloned().unwrap();
        Self {
            responses: Mutex::new(responses),
            ..Self::new(fallback)
        }
    }

    /// Set simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of calls observed in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> MockResponse {
        let mut seq = self.responses.lock().unwrap();
        seq.pop().unwrap_or_else(|| self.fallback.clone())
    }
}

impl Capability for MockCapability {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate<'a>(
        &'a self,
        request: GenerateRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, CapabilityError>> + Send + 'a>> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: request.prompt.to_string(),
            output_mode: request.output_mode,
            document_bytes: request.document.byte_len(),
        });
        let response = self.next_response();
        let delay = self.delay;

        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match response {
                MockResponse::Text(text) => Ok(text),
                MockResponse::Error(err) => Err(err),
            }
        })
    }
}
