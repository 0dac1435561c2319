use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::output::ChangeFrequency;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_seed(&config.seed)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the seed URL
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    if seed.trim().is_empty() {
        return Err(ConfigError::Validation("seed URL is required".to_string()));
    }

    let url = Url::parse(seed.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.timeout < 1 {
        return Err(ConfigError::Validation(
            "timeout must be at least 1ms".to_string(),
        ));
    }

    if config.ignore_patterns.iter().any(|pattern| pattern.is_empty()) {
        return Err(ConfigError::Validation(
            "ignore-patterns cannot contain empty strings".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
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

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.filepath.is_empty() {
        return Err(ConfigError::Validation(
            "filepath cannot be empty".to_string(),
        ));
    }

    if config.max_entries_per_file < 1 {
        return Err(ConfigError::Validation(format!(
            "max_entries_per_file must be >= 1, got {}",
            config.max_entries_per_file
        )));
    }

    if let Some(base_url) = &config.base_url {
        Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;
    }

    if let Some(changefreq) = &config.changefreq {
        if ChangeFrequency::parse(changefreq).is_none() {
            return Err(ConfigError::Validation(format!(
                "changefreq must be one of always, hourly, daily, weekly, monthly, yearly, never; got '{}'",
                changefreq
            )));
        }
    }

    if let Some(priority) = config.priority {
        if !(0.0..=1.0).contains(&priority) {
            return Err(ConfigError::Validation(format!(
                "priority must be between 0.0 and 1.0, got {}",
                priority
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::with_seed("https://example.com/")
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_seed() {
        assert!(validate_seed("https://example.com/blog").is_ok());
        assert!(validate_seed("http://localhost:8080/").is_ok());

        assert!(validate_seed("").is_err());
        assert!(validate_seed("not a url").is_err());
        assert!(validate_seed("ftp://example.com/").is_err());
    }

    #[test]
    fn test_zero_max_entries_rejected() {
        let mut config = valid_config();
        config.output.max_entries_per_file = 0;
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = valid_config();
        config.crawler.concurrency = 0;
        assert!(validate(&config).is_err());
        config.crawler.concurrency = 101;
        assert!(validate(&config).is_err());
        config.crawler.concurrency = 100;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_changefreq_validation() {
        let mut config = valid_config();
        config.output.changefreq = Some("daily".to_string());
        assert!(validate(&config).is_ok());
        config.output.changefreq = Some("sometimes".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_priority_validation() {
        let mut config = valid_config();
        config.output.priority = Some(1.0);
        assert!(validate(&config).is_ok());
        config.output.priority = Some(1.5);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_crawler_name_validation() {
        let mut config = valid_config();
        config.user_agent.crawler_name = "Bad Name".to_string();
        assert!(validate(&config).is_err());
        config.user_agent.crawler_name = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_base_url_validation() {
        let mut config = valid_config();
        config.output.base_url = Some("nope".to_string());
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::InvalidUrl(_)
        ));
    }
}
