//! Analysis backend configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::AnalysisClient;
use super::llm::{GeminiClient, LlmClient, LlmError, OllamaClient};

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Google Gemini API.
    #[default]
    Gemini,
    /// Local Ollama instance.
    Ollama,
}

/// Analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// LLM provider.
    #[serde(default)]
    pub provider: LlmProvider,
    /// Primary model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Model tried once when the primary is over quota or unavailable.
    #[serde(default = "default_fallback_model")]
    pub fallback_model: Option<String>,
    /// API key (required for Gemini).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or self-hosted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Maximum tokens for completions.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
}

fn default_model() -> String {
    "gemini-1.5-pro-002".to_string()
}

fn default_fallback_model() -> Option<String> {
    Some("gemini-1.5-flash".to_string())
}

fn default_timeout() -> u32 {
    30
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            fallback_model: default_fallback_model(),
            api_key: None,
            api_base: None,
            timeout_secs: default_timeout(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

impl AnalysisConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("analysis.model cannot be empty".to_string());
        }
        if let Some(fallback) = &self.fallback_model {
            if fallback.trim().is_empty() {
                return Err("analysis.fallback_model cannot be empty when set".to_string());
            }
        }
        if self.provider == LlmProvider::Gemini
            && self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err("analysis.api_key is required for the gemini provider".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("analysis.timeout_secs must be greater than 0".to_string());
        }
        if self.max_tokens == 0 {
            return Err("analysis.max_tokens must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "analysis.temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs as u64)
    }
}

fn build_llm_client(config: &AnalysisConfig, model: &str) -> Result<Arc<dyn LlmClient>, LlmError> {
    match config.provider {
        LlmProvider::Gemini => {
            let api_key = config.api_key.clone().ok_or(LlmError::NotConfigured)?;
            let mut client = GeminiClient::new(api_key, model, config.timeout())?;
            if let Some(ref api_base) = config.api_base {
                client = client.with_api_base(api_base.clone());
            }
            Ok(Arc::new(client))
        }
        LlmProvider::Ollama => {
            let mut client = OllamaClient::new(model, config.timeout())?;
            if let Some(ref api_base) = config.api_base {
                client = client.with_api_base(api_base.clone());
            }
            Ok(Arc::new(client))
        }
    }
}

/// Build the primary and optional fallback LLM clients for a configuration.
pub fn build_llm_clients(
    config: &AnalysisConfig,
) -> Result<(Arc<dyn LlmClient>, Option<Arc<dyn LlmClient>>), LlmError> {
    let primary = build_llm_client(config, &config.model)?;
    let fallback = match &config.fallback_model {
        Some(model) if model != &config.model => Some(build_llm_client(config, model)?),
        _ => None,
    };
    Ok((primary, fallback))
}

/// Build a ready-to-use [`AnalysisClient`] from configuration.
pub fn build_analysis_client(config: &AnalysisConfig) -> Result<AnalysisClient, LlmError> {
    let (primary, fallback) = build_llm_clients(config)?;

    info!(
        "Analysis enabled with {:?} ({}, fallback: {})",
        config.provider,
        primary.model(),
        fallback.as_ref().map(|f| f.model()).unwrap_or("none")
    );

    let mut client = AnalysisClient::new(primary)
        .with_max_tokens(config.max_tokens)
        .with_temperature(config.temperature);
    if let Some(fallback) = fallback {
        client = client.with_fallback(fallback);
    }
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gemini_config() -> AnalysisConfig {
        AnalysisConfig {
            api_key: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config: AnalysisConfig = toml::from_str("api_key = \"k\"").unwrap();
        assert_eq!(config.provider, LlmProvider::Gemini);
        assert_eq!(config.model, "gemini-1.5-pro-002");
        assert_eq!(config.fallback_model.as_deref(), Some("gemini-1.5-flash"));
        assert_eq!(config.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let config = AnalysisConfig::default();
        assert!(config.validate().unwrap_err().contains("api_key"));
    }

    #[test]
    fn test_ollama_without_key_is_valid() {
        let config: AnalysisConfig = toml::from_str(
            r#"
            provider = "ollama"
            model = "llama3"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = gemini_config();
        config.model = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = gemini_config();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = gemini_config();
        config.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_clients_with_fallback() {
        let (primary, fallback) = build_llm_clients(&gemini_config()).unwrap();
        assert_eq!(primary.provider(), "gemini");
        assert_eq!(primary.model(), "gemini-1.5-pro-002");
        assert_eq!(fallback.unwrap().model(), "gemini-1.5-flash");
    }

    #[test]
    fn test_build_clients_same_model_has_no_fallback() {
        let config = AnalysisConfig {
            fallback_model: Some("gemini-1.5-pro-002".to_string()),
            ..gemini_config()
        };
        let (_, fallback) = build_llm_clients(&config).unwrap();
        assert!(fallback.is_none());

        let config = AnalysisConfig {
            fallback_model: None,
            ..gemini_config()
        };
        let (_, fallback) = build_llm_clients(&config).unwrap();
        assert!(fallback.is_none());
    }

    #[test]
    fn test_build_gemini_without_key_fails() {
        assert!(matches!(
            build_llm_clients(&AnalysisConfig::default()),
            Err(LlmError::NotConfigured)
        ));
    }
}
