use super::{types::Config, ConfigError};

const MAX_RETRIES_LIMIT: u32 = 10;

/// Validate configuration.
///
/// Section-level checks are delegated to each section's `validate()`.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    config
        .analysis
        .validate()
        .map_err(ConfigError::ValidationError)?;

    if let Some(mail) = &config.mail {
        mail.validate().map_err(ConfigError::ValidationError)?;
    }

    let dispatcher = &config.dispatcher;
    if dispatcher.max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::ValidationError(format!(
            "dispatcher.max_retries cannot exceed {}, got {}",
            MAX_RETRIES_LIMIT, dispatcher.max_retries
        )));
    }
    if dispatcher.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "dispatcher.queue_capacity must be greater than 0".to_string(),
        ));
    }
    if dispatcher.scan_batch_size <= 0 {
        return Err(ConfigError::ValidationError(
            "dispatcher.scan_batch_size must be greater than 0".to_string(),
        ));
    }

    Ok(())
}
