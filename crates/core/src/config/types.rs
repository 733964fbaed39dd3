use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::analysis::{AnalysisConfig, LlmProvider};
use crate::notify::{MailConfig, MailProvider};
use crate::orchestrator::DispatcherConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub analysis: AnalysisConfig,
    /// Assignment mail. Messages are only logged when absent.
    #[serde(default)]
    pub mail: Option<MailConfig>,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("triage.db")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub analysis: SanitizedAnalysisConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail: Option<SanitizedMailConfig>,
    pub dispatcher: DispatcherConfig,
}

/// Analysis config with the API key hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAnalysisConfig {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

/// Mail config with the API token hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMailConfig {
    pub provider: String,
    pub from_address: String,
    pub api_token_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let analysis = &config.analysis;
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            analysis: SanitizedAnalysisConfig {
                provider: match analysis.provider {
                    LlmProvider::Gemini => "gemini".to_string(),
                    LlmProvider::Ollama => "ollama".to_string(),
                },
                model: analysis.model.clone(),
                fallback_model: analysis.fallback_model.clone(),
                api_key_configured: analysis
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.is_empty()),
                timeout_secs: analysis.timeout_secs,
            },
            mail: config.mail.as_ref().map(|m| SanitizedMailConfig {
                provider: match m.provider {
                    MailProvider::Mailtrap => "mailtrap".to_string(),
                    MailProvider::Log => "log".to_string(),
                },
                from_address: m.from_address.clone(),
                api_token_configured: m.api_token.as_deref().is_some_and(|t| !t.is_empty()),
            }),
            dispatcher: config.dispatcher.clone(),
        }
    }
}
