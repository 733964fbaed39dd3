//! AI ticket analysis.
//!
//! Turns a ticket's free text into a [`TriageResult`] using a primary LLM and
//! an optional fallback model.

mod client;
mod config;
mod llm;
mod types;

pub use client::{parse_triage, strip_code_fences, AnalysisClient, AnalysisError};
pub use config::{build_analysis_client, build_llm_clients, AnalysisConfig, LlmProvider};
pub use llm::{
    CompletionRequest, CompletionResponse, GeminiClient, LlmClient, LlmError, LlmUsage,
    OllamaClient,
};
pub use types::TriageResult;
