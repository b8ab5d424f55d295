use crate::config::types::{Config, FeedbackConfig, ProviderConfig, SweepConfig, TimeoutConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_sweep_config(&config.sweep)?;
    validate_timeout_config(&config.timeouts)?;
    validate_storage_config(config)?;
    validate_feedback_config(&config.feedback)?;
    validate_providers(&config.providers)?;
    validate_enabled_providers(config)?;
    Ok(())
}

/// Validates sweep configuration
fn validate_sweep_config(config: &SweepConfig) -> Result<(), ConfigError> {
    if config.keywords.is_empty() {
        return Err(ConfigError::Validation(
            "sweep.keywords must contain at least one keyword".to_string(),
        ));
    }

    if config.keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "sweep.keywords must not contain empty keywords".to_string(),
        ));
    }

    if config.providers.is_empty() {
        return Err(ConfigError::Validation(
            "sweep.providers must enable at least one provider".to_string(),
        ));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_failures < 1 {
        return Err(ConfigError::Validation(format!(
            "max-failures must be >= 1, got {}",
            config.max_failures
        )));
    }

    Ok(())
}

/// Validates timeout configuration
fn validate_timeout_config(config: &TimeoutConfig) -> Result<(), ConfigError> {
    if config.liveness_secs < 1 {
        return Err(ConfigError::Validation(
            "liveness-secs must be >= 1".to_string(),
        ));
    }

    if config.feedback_secs < 1 {
        return Err(ConfigError::Validation(
            "feedback-secs must be >= 1".to_string(),
        ));
    }

    if config.session_login_secs < 1 {
        return Err(ConfigError::Validation(
            "session-login-secs must be >= 1".to_string(),
        ));
    }

    if config.poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll-interval-ms must be >= 10ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &Config) -> Result<(), ConfigError> {
    if config.storage.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates feedback configuration
fn validate_feedback_config(config: &FeedbackConfig) -> Result<(), ConfigError> {
    if config.description.trim().is_empty() {
        return Err(ConfigError::Validation(
            "feedback.description cannot be empty".to_string(),
        ));
    }

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates provider definitions
fn validate_providers(providers: &[ProviderConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for provider in providers {
        if provider.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "provider id cannot be empty".to_string(),
            ));
        }

        if !seen.insert(provider.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate provider id '{}'",
                provider.id
            )));
        }

        if !provider.search_url.contains("{keyword}") {
            return Err(ConfigError::Validation(format!(
                "search-url for provider '{}' must contain a {{keyword}} placeholder",
                provider.id
            )));
        }

        // Templates must still be parseable once placeholders are filled
        let probe = provider
            .search_url
            .replace("{keyword}", "probe")
            .replace("{page}", "1");
        Url::parse(&probe).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid search-url for provider '{}': {}",
                provider.id, e
            ))
        })?;

        Url::parse(&provider.feedback_url).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid feedback-url for provider '{}': {}",
                provider.id, e
            ))
        })?;

        if let Some(session_url) = &provider.session_url {
            Url::parse(session_url).map_err(|e| {
                ConfigError::InvalidUrl(format!(
                    "Invalid session-url for provider '{}': {}",
                    provider.id, e
                ))
            })?;
        }
    }

    Ok(())
}

/// Checks that every enabled provider id has a definition
fn validate_enabled_providers(config: &Config) -> Result<(), ConfigError> {
    for id in &config.sweep.providers {
        if config.provider(id).is_none() {
            return Err(ConfigError::Validation(format!(
                "enabled provider '{}' has no [[provider]] definition",
                id
            )));
        }
    }

    Ok(())
}

/// Basic email validation: one '@', non-empty local and domain parts
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = email.split('@').collect();

    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "contact-email '{}' is not a valid email address",
            email
        )));
    }

    Ok(())
}
