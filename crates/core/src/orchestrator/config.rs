//! Dispatcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound for a single retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Configuration for the triage dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Run the background queue consumer and scan loop.
    /// When disabled, tickets are only triaged through inline dispatch.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Whole-workflow retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds), doubled for each further one.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Deadline for a single workflow attempt (milliseconds, 0 = none).
    #[serde(default)]
    pub run_timeout_ms: u64,

    /// How often to look for unprocessed tickets (milliseconds, 0 = never).
    #[serde(default = "default_scan_interval")]
    pub scan_interval_ms: u64,

    /// Maximum tickets re-submitted per scan.
    #[serde(default = "default_scan_batch")]
    pub scan_batch_size: i64,

    /// Capacity of the ticket-created event queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff() -> u64 {
    1000 // 1 second
}

fn default_scan_interval() -> u64 {
    60_000 // 1 minute
}

fn default_scan_batch() -> i64 {
    100
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff(),
            run_timeout_ms: 0,
            scan_interval_ms: default_scan_interval(),
            scan_batch_size: default_scan_batch(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl DispatcherConfig {
    /// Total attempts per event, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retrying after the given (1-based) failed attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor)).min(MAX_BACKOFF)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_ms > 0).then(|| Duration::from_millis(self.run_timeout_ms))
    }

    pub fn scan_interval(&self) -> Option<Duration> {
        (self.scan_interval_ms > 0).then(|| Duration::from_millis(self.scan_interval_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DispatcherConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.run_timeout(), None);
        assert_eq!(config.scan_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: DispatcherConfig = toml::from_str(
            r#"
            max_retries = 4
            run_timeout_ms = 30000
            scan_interval_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.max_attempts(), 5);
        assert_eq!(config.run_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.scan_interval(), None);
        assert_eq!(config.queue_capacity, 256);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = DispatcherConfig {
            retry_backoff_ms: 100,
            ..Default::default()
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(400));
        assert_eq!(config.backoff_for(40), MAX_BACKOFF);
    }
}
