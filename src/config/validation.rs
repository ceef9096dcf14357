use crate::config::types::{
    Config, DriverConfig, ExtractorConfig, IndexConfig, SelectorConfig, StorageConfig,
    UserAgentConfig, WalkerConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_driver_config(&config.driver)?;
    validate_walker_config(&config.walker)?;
    validate_selector_config(&config.selectors)?;
    validate_extractor_config(&config.extractor)?;
    validate_index_config(&config.index)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates page driver configuration
fn validate_driver_config(config: &DriverConfig) -> Result<(), ConfigError> {
    if config.mutation_poll_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "mutation_poll_ms must be >= 10ms, got {}ms",
            config.mutation_poll_ms
        )));
    }

    if let Some(path) = &config.chrome_executable {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "chrome_executable cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates list walking configuration
fn validate_walker_config(config: &WalkerConfig) -> Result<(), ConfigError> {
    if config.window_step < 1 {
        return Err(ConfigError::Validation(format!(
            "window_step must be >= 1, got {}",
            config.window_step
        )));
    }

    if config.wait_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "wait_timeout_ms must be >= 100ms, got {}ms",
            config.wait_timeout_ms
        )));
    }

    // NaN fails both comparisons and is rejected too
    if !(config.reorder_threshold > 0.0 && config.reorder_threshold <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "reorder_threshold must be in (0, 1], got {}",
            config.reorder_threshold
        )));
    }

    Ok(())
}

/// Validates that no selector or attribute name is blank
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    let fields = [
        ("list_container", &config.list_container),
        ("item_title", &config.item_title),
        ("item_title_attribute", &config.item_title_attribute),
        ("item_link_attribute", &config.item_link_attribute),
        ("scroll_target", &config.scroll_target),
        ("reorder_control", &config.reorder_control),
        ("detail_ready", &config.detail_ready),
        ("publish_time", &config.publish_time),
        ("content_blocks", &config.content_blocks),
    ];

    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "selectors.{} cannot be empty",
                name
            )));
        }
    }

    Ok(())
}

/// Validates extractor configuration
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    if !(-12..=14).contains(&config.publish_utc_offset_hours) {
        return Err(ConfigError::Validation(format!(
            "publish_utc_offset_hours must be between -12 and 14, got {}",
            config.publish_utc_offset_hours
        )));
    }

    if config.required_url_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "required_url_prefix cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates index configuration
fn validate_index_config(config: &IndexConfig) -> Result<(), ConfigError> {
    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll_interval_ms must be >= 1".to_string(),
        ));
    }

    if config.task_timeout_ms < config.poll_interval_ms {
        return Err(ConfigError::Validation(format!(
            "task_timeout_ms ({}) must not be shorter than poll_interval_ms ({})",
            config.task_timeout_ms, config.poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.sources_path.is_empty() {
        return Err(ConfigError::Validation(
            "sources_path cannot be empty".to_string(),
        ));
    }

    if config.journal_path.is_empty() {
        return Err(ConfigError::Validation(
            "journal_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
