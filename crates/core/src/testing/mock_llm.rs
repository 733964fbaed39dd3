//! Mock LLM client for testing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::analysis::{CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};

/// Mock implementation of the LlmClient trait.
///
/// Replies are scripted in order with [`push_response`](Self::push_response)
/// and [`push_error`](Self::push_error). When the script runs out, the
/// default response is returned, or an API error if none is set.
///
/// # Example
///
/// ```rust,ignore
/// use triage_core::testing::MockLlmClient;
///
/// let llm = MockLlmClient::new("gemini-1.5-pro-002");
/// llm.push_error(LlmError::Api { status: 429, message: "quota".into() }).await;
/// llm.push_response(r#"{"priority":"high"}"#).await;
///
/// // ... run the code under test ...
/// assert_eq!(llm.call_count().await, 2);
/// ```
#[derive(Debug)]
pub struct MockLlmClient {
    model: String,
    script: Arc<RwLock<VecDeque<Result<String, LlmError>>>>,
    default_response: Arc<RwLock<Option<String>>>,
    requests: Arc<RwLock<Vec<CompletionRequest>>>,
    delay: Arc<RwLock<Duration>>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(RwLock::new(VecDeque::new())),
            default_response: Arc::new(RwLock::new(None)),
            requests: Arc::new(RwLock::new(Vec::new())),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Queue a successful reply.
    pub async fn push_response(&self, text: impl Into<String>) {
        self.script.write().await.push_back(Ok(text.into()));
    }

    /// Queue a failure.
    pub async fn push_error(&self, error: LlmError) {
        self.script.write().await.push_back(Err(error));
    }

    /// Reply used once the script is exhausted.
    pub async fn set_default_response(&self, text: impl Into<String>) {
        *self.default_response.write().await = Some(text.into());
    }

    /// Simulated latency for every call.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Requests received so far.
    pub async fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.read().await.clone()
    }

    /// Number of calls received so far.
    pub async fn call_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.write().await.push(request);

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.write().await.pop_front();
        let text = match next {
            Some(reply) => reply?,
            None => self
                .default_response
                .read()
                .await
                .clone()
                .ok_or_else(|| LlmError::Api {
                    status: 500,
                    message: "no scripted response".to_string(),
                })?,
        };

        Ok(CompletionResponse {
            usage: LlmUsage {
                input_tokens: 10,
                output_tokens: text.len() as u32 / 4,
            },
            text,
            model: self.model.clone(),
        })
    }
}
