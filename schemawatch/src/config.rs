//! Review service configuration.

use serde::{Deserialize, Serialize};

/// Configuration errors, raised before any network call is made.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("review service API URL must not be empty")]
    MissingApiUrl,

    #[error("review service app URL must not be empty")]
    MissingAppUrl,

    #[error("review service API token must not be empty")]
    MissingToken,
}

/// Connection settings for the remote review service.
///
/// The app URL is a separate value from the API URL; dashboard links are
/// built from it directly instead of being derived from the API URL by
/// string substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Base URL of the review API, without a trailing slash.
    pub api_url: String,
    /// Base URL of the review web app, used for dashboard links.
    pub app_url: String,
    /// Bearer token for the review API.
    pub api_token: String,
    /// Data source the service should associate findings with.
    pub data_source_id: u64,
}

impl ReviewConfig {
    pub fn new(
        api_url: impl Into<String>,
        app_url: impl Into<String>,
        api_token: impl Into<String>,
        data_source_id: u64,
    ) -> Self {
        Self {
            api_url: trim_base(api_url.into()),
            app_url: trim_base(app_url.into()),
            api_token: api_token.into(),
            data_source_id,
        }
    }

    /// Check that every required value is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::MissingApiUrl);
        }
        if self.app_url.trim().is_empty() {
            return Err(ConfigError::MissingAppUrl);
        }
        if self.api_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(())
    }
}

fn trim_base(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ReviewConfig::new(
            "https://gateway.example.com/api/v1",
            "https://app.example.com",
            "token",
            1,
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = ReviewConfig::new(
            "https://gateway.example.com/api/v1/",
            "https://app.example.com//",
            "token",
            1,
        );
        assert_eq!(config.api_url, "https://gateway.example.com/api/v1");
        assert_eq!(config.app_url, "https://app.example.com");
    }

    #[test]
    fn test_missing_values_rejected() {
        let config = ReviewConfig::new("", "https://app.example.com", "token", 1);
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiUrl)));

        let config = ReviewConfig::new("https://gateway.example.com", "", "token", 1);
        assert!(matches!(config.validate(), Err(ConfigError::MissingAppUrl)));

        let config = ReviewConfig::new("https://gateway.example.com", "https://app.example.com", "  ", 1);
        assert!(matches!(config.validate(), Err(ConfigError::MissingToken)));
    }
}
