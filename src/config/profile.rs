//! Redmine profile configuration.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result, ENV_PROFILE_NAME};
use crate::api::{self, ApiKey};

/// Environment variable holding the Redmine base URL.
pub const HOST_ENV: &str = "REDMINE_HOST";

/// Environment variable holding the API key; takes precedence over the keyring.
pub const API_KEY_ENV: &str = "REDMINE_API_KEY";

/// A Redmine profile configuration.
///
/// Profiles store connection details for a Redmine instance.
/// API keys are stored separately in the OS keychain for security.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// The name of this profile.
    ///
    /// Must be non-empty and unique across all profiles.
    pub name: String,

    /// The Redmine instance URL (e.g., "https://redmine.example.com").
    pub url: String,

    /// Page size to request from list endpoints; the server default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_limit: Option<u32>,

    /// Login to impersonate on every request (admin keys only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_user: Option<String>,
}

impl Profile {
    /// Create a new profile.
    pub fn new(name: String, url: String) -> Self {
        Self {
            name,
            url,
            page_limit: None,
            switch_user: None,
        }
    }

    /// Build a profile from `REDMINE_HOST`, if it is set.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(HOST_ENV).ok()?;
        if url.trim().is_empty() {
            return None;
        }
        Some(Self::new(ENV_PROFILE_NAME.to_string(), url.trim().to_string()))
    }

    /// Validate this profile.
    ///
    /// Checks that:
    /// - The name is non-empty and has no whitespace
    /// - The URL is non-empty and uses http(s)
    /// - The page limit, if set, is non-zero
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` with details if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "profile name cannot be empty".to_string(),
            ));
        }

        if self.name.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "profile name '{}' cannot contain whitespace",
                self.name
            )));
        }

        if self.url.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': URL cannot be empty",
                self.name
            )));
        }

        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': URL must start with http:// or https://",
                self.name
            )));
        }

        if self.page_limit == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': page_limit must be at least 1",
                self.name
            )));
        }

        Ok(())
    }

    /// Find the API key for this profile.
    ///
    /// `REDMINE_API_KEY` wins; otherwise the OS keyring entry named after the
    /// profile is used.
    pub fn resolve_api_key(&self) -> api::Result<ApiKey> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(ApiKey::new(&key)),
            _ => ApiKey::from_keyring(&self.name),
        }
    }
}
