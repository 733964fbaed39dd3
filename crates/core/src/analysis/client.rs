//! Ticket analysis on top of an [`LlmClient`].
//!
//! The model is treated as unreliable: every response goes through
//! [`parse_triage`], and anything that does not yield a JSON object collapses
//! into [`TriageResult::default`]. Only transport-level failures are errors.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::llm::{CompletionRequest, LlmClient, LlmError};
use super::types::TriageResult;
use crate::metrics;

/// Responses shorter than this cannot hold the expected object.
const MIN_RESPONSE_LEN: usize = 10;

const SYSTEM_PROMPT: &str = r#"You are an expert AI assistant that processes support tickets.

Respond ONLY with valid raw JSON. Do NOT include markdown, comments, or formatting.

Output format (strict JSON):
{
  "summary": "Short summary of the ticket",
  "priority": "low" | "medium" | "high",
  "helpfulNotes": "Detailed moderator notes and links",
  "relatedSkills": ["React", "Node.js"]
}

NO markdown or text outside this JSON."#;

static FENCE_OPEN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^```[A-Za-z]*\s*").ok());
static FENCE_CLOSE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s*```$").ok());

/// Errors that can occur while analyzing a ticket.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The backend could not be reached and no fallback applied.
    #[error("analysis backend {model} failed: {source}")]
    Transient {
        model: String,
        #[source]
        source: LlmError,
    },
}

impl AnalysisError {
    /// Returns true if running the analysis again may succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            AnalysisError::Transient { source, .. } => !matches!(source, LlmError::NotConfigured),
        }
    }
}

/// Produces a [`TriageResult`] for a ticket's title and description.
pub struct AnalysisClient {
    primary: Arc<dyn LlmClient>,
    fallback: Option<Arc<dyn LlmClient>>,
    max_tokens: u32,
    temperature: f32,
}

impl AnalysisClient {
    pub fn new(primary: Arc<dyn LlmClient>) -> Self {
        Self {
            primary,
            fallback: None,
            max_tokens: 1024,
            temperature: 0.0,
        }
    }

    /// Model substituted once when the primary reports quota or availability problems.
    pub fn with_fallback(mut self, fallback: Arc<dyn LlmClient>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build the completion request for a ticket.
    pub fn build_request(&self, title: &str, description: &str) -> CompletionRequest {
        let prompt = format!(
            r#"Analyze this support ticket:

- Title: {}
- Description: {}

Respond ONLY with this JSON format:
{{
  "summary": "Short summary",
  "priority": "low" | "medium" | "high",
  "helpfulNotes": "Detailed explanation",
  "relatedSkills": ["React", "Node.js"]
}}"#,
            title.trim(),
            description.trim()
        );

        CompletionRequest::new(prompt)
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }

    /// Classify a ticket.
    ///
    /// The primary model is tried first. If it fails with a quota, rate-limit
    /// or availability error, the fallback model is tried exactly once with
    /// the same request. Unusable output yields the default result.
    pub async fn analyze(
        &self,
        title: &str,
        description: &str,
    ) -> Result<TriageResult, AnalysisError> {
        let request = self.build_request(title, description);

        let (client, response) = match self.primary.complete(request.clone()).await {
            Ok(response) => (&self.primary, response),
            Err(e) => {
                metrics::ANALYSIS_REQUESTS
                    .with_label_values(&[self.primary.model(), "error"])
                    .inc();

                let Some(fallback) = self.fallback.as_ref().filter(|_| e.is_fallback_eligible())
                else {
                    return Err(AnalysisError::Transient {
                        model: self.primary.model().to_string(),
                        source: e,
                    });
                };

                warn!(
                    "Model {} unavailable ({}), falling back to {}",
                    self.primary.model(),
                    e,
                    fallback.model()
                );
                metrics::ANALYSIS_FALLBACKS.inc();

                match fallback.complete(request).await {
                    Ok(response) => (fallback, response),
                    Err(source) => {
                        metrics::ANALYSIS_REQUESTS
                            .with_label_values(&[fallback.model(), "error"])
                            .inc();
                        return Err(AnalysisError::Transient {
                            model: fallback.model().to_string(),
                            source,
                        });
                    }
                }
            }
        };

        metrics::ANALYSIS_REQUESTS
            .with_label_values(&[client.model(), "success"])
            .inc();
        metrics::LLM_TOKENS
            .with_label_values(&[client.provider(), "input"])
            .inc_by(response.usage.input_tokens as u64);
        metrics::LLM_TOKENS
            .with_label_values(&[client.provider(), "output"])
            .inc_by(response.usage.output_tokens as u64);

        debug!("Raw analysis output from {}: {}", response.model, response.text);

        match parse_triage(&response.text) {
            Some(result) => {
                info!(
                    "Ticket analyzed by {}: priority={}, skills={:?}",
                    response.model, result.priority, result.related_skills
                );
                Ok(result)
            }
            None => {
                warn!(
                    "Unusable analysis output from {}, using default triage",
                    response.model
                );
                metrics::ANALYSIS_DEFAULTED.inc();
                Ok(TriageResult::default())
            }
        }
    }
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fences(raw: &str) -> String {
    let mut cleaned = raw.trim().to_string();
    if let Some(re) = FENCE_OPEN.as_ref() {
        cleaned = re.replace(&cleaned, "").into_owned();
    }
    if let Some(re) = FENCE_CLOSE.as_ref() {
        cleaned = re.replace(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

/// Parse raw model output into a triage result.
///
/// Returns `None` for empty, too short, or non-object output. When the
/// cleaned text is not valid JSON on its own, the span between the first `{`
/// and the last `}` is tried as well.
pub fn parse_triage(raw: &str) -> Option<TriageResult> {
    let trimmed = raw.trim();
    if trimmed.len() < MIN_RESPONSE_LEN {
        return None;
    }

    let cleaned = strip_code_fences(trimmed);

    let value = serde_json::from_str::<serde_json::Value>(&cleaned)
        .ok()
        .or_else(|| {
            let start = cleaned.find('{')?;
            let end = cleaned.rfind('}')?;
            if end <= start {
                return None;
            }
            serde_json::from_str(&cleaned[start..=end]).ok()
        })?;

    TriageResult::from_json_value(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLlmClient;

    #[test]
    fn test_parse_plain_json() {
        let raw = r#"{"summary":"Crash on login","priority":"high","helpfulNotes":"See logs","relatedSkills":["React"]}"#;
        let result = parse_triage(raw).unwrap();
        assert_eq!(result.summary, "Crash on login");
        assert_eq!(result.priority, "high");
        assert_eq!(result.related_skills, vec!["React"]);
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"summary\":\"s\",\"priority\":\"low\",\"helpfulNotes\":\"n\",\"relatedSkills\":[]}\n```";
        let result = parse_triage(raw).unwrap();
        assert_eq!(result.priority, "low");
        assert_eq!(result.summary, "s");
    }

    #[test]
    fn test_parse_bare_fence() {
        let raw = "```\n{\"summary\":\"bare fence\",\"priority\":\"medium\"}\n```";
        let result = parse_triage(raw).unwrap();
        assert_eq!(result.summary, "bare fence");
        assert!(result.related_skills.is_empty());
    }

    #[test]
    fn test_parse_json_with_surrounding_prose() {
        let raw = "Sure! Here is the analysis:\n{\"summary\":\"x\",\"priority\":\"high\"}\nHope that helps.";
        let result = parse_triage(raw).unwrap();
        assert_eq!(result.priority, "high");
    }

    #[test]
    fn test_parse_rejects_short_and_garbage() {
        assert!(parse_triage("").is_none());
        assert!(parse_triage("   {}   ").is_none());
        assert!(parse_triage("I cannot help with that request.").is_none());
        assert!(parse_triage("[\"React\", \"Node\"]").is_none());
        assert!(parse_triage("} this is backwards {").is_none());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```{}```"), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
    }

    #[test]
    fn test_build_request_includes_ticket() {
        let client = AnalysisClient::new(Arc::new(MockLlmClient::new("primary")));
        let request = client.build_request("Title here", "Description here");
        assert!(request.prompt.contains("- Title: Title here"));
        assert!(request.prompt.contains("- Description: Description here"));
        assert!(request.system.as_deref().unwrap_or("").contains("strict JSON"));
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let primary = Arc::new(MockLlmClient::new("primary"));
        primary
            .push_response(r#"{"summary":"ok","priority":"low","helpfulNotes":"","relatedSkills":["SQL"]}"#)
            .await;

        let client = AnalysisClient::new(primary.clone());
        let result = client.analyze("t", "d").await.unwrap();

        assert_eq!(result.priority, "low");
        assert_eq!(result.related_skills, vec!["SQL"]);
        assert_eq!(primary.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_analyze_garbage_yields_default() {
        let primary = Arc::new(MockLlmClient::new("primary"));
        primary
            .push_response("the model rambled instead of answering")
            .await;

        let client = AnalysisClient::new(primary);
        let result = client.analyze("t", "d").await.unwrap();
        assert_eq!(result, TriageResult::default());
    }

    #[tokio::test]
    async fn test_analyze_falls_back_once_on_quota() {
        let primary = Arc::new(MockLlmClient::new("pro"));
        primary
            .push_error(LlmError::Api {
                status: 429,
                message: "quota exceeded".to_string(),
            })
            .await;
        let fallback = Arc::new(MockLlmClient::new("flash"));
        fallback
            .push_response(r#"{"summary":"from flash","priority":"high"}"#)
            .await;

        let client = AnalysisClient::new(primary.clone()).with_fallback(fallback.clone());
        let result = client.analyze("t", "d").await.unwrap();

        assert_eq!(result.summary, "from flash");
        assert_eq!(primary.call_count().await, 1);
        assert_eq!(fallback.call_count().await, 1);
        assert_eq!(
            primary.recorded_requests().await[0].prompt,
            fallback.recorded_requests().await[0].prompt
        );
    }

    #[tokio::test]
    async fn test_analyze_fallback_failure_is_not_retried() {
        let primary = Arc::new(MockLlmClient::new("pro"));
        primary
            .push_error(LlmError::Api {
                status: 404,
                message: "model not found".to_string(),
            })
            .await;
        let fallback = Arc::new(MockLlmClient::new("flash"));
        fallback
            .push_error(LlmError::Api {
                status: 429,
                message: "quota exceeded".to_string(),
            })
            .await;

        let client = AnalysisClient::new(primary.clone()).with_fallback(fallback.clone());
        let err = client.analyze("t", "d").await.unwrap_err();

        match err {
            AnalysisError::Transient { ref model, .. } => assert_eq!(model, "flash"),
        }
        assert!(err.is_retriable());
        assert_eq!(primary.call_count().await, 1);
        assert_eq!(fallback.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_analyze_transport_error_skips_fallback() {
        let primary = Arc::new(MockLlmClient::new("pro"));
        primary
            .push_error(LlmError::Http("connection refused".to_string()))
            .await;
        let fallback = Arc::new(MockLlmClient::new("flash"));

        let client = AnalysisClient::new(primary).with_fallback(fallback.clone());
        let err = client.analyze("t", "d").await.unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::Transient {
                source: LlmError::Http(_),
                ..
            }
        ));
        assert_eq!(fallback.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_analyze_quota_without_fallback_surfaces() {
        let primary = Arc::new(MockLlmClient::new("pro"));
        primary
            .push_error(LlmError::Api {
                status: 429,
                message: "rate limit".to_string(),
            })
            .await;

        let client = AnalysisClient::new(primary);
        assert!(client.analyze("t", "d").await.is_err());
    }
}
