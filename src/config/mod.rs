//! Configuration management for redmine-client.
//!
//! This module handles loading, saving, and managing user configuration
//! including profiles and client settings. The file lives at
//! `<config dir>/redmine-client/config.toml`.

mod profile;
mod settings;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use profile::{Profile, API_KEY_ENV, HOST_ENV};
pub use settings::Settings;

/// Name of the directory holding the config file.
const CONFIG_DIR_NAME: &str = "redmine-client";

/// Name of the config file.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Name given to the profile built from environment variables.
pub const ENV_PROFILE_NAME: &str = "env";

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("Could not determine the configuration directory")]
    NoConfigDir,

    /// The config directory could not be created.
    #[error("Failed to create configuration directory: {0}")]
    CreateDirError(#[source] std::io::Error),

    /// The config file could not be read.
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[source] std::io::Error),

    /// The config file could not be written.
    #[error("Failed to write configuration file: {0}")]
    WriteError(#[source] std::io::Error),

    /// The config file is not valid TOML for our schema.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A value failed validation.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// No profile with the given name exists.
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The on-disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Client-wide settings.
    #[serde(default)]
    pub settings: Settings,
    /// Configured Redmine instances.
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Config {
    /// The default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default path. A missing file yields an empty config.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from a specific path. A missing file yields an empty config.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;

        debug!(
            path = %path.display(),
            profiles = config.profiles.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    /// Save to a specific path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::CreateDirError)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(ConfigError::WriteError)?;

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Validate every profile and the default profile reference.
    pub fn validate(&self) -> Result<()> {
        for (i, profile) in self.profiles.iter().enumerate() {
            profile.validate()?;
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }

        if let Some(default) = &self.settings.default_profile {
            if self.profile(default).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "default profile '{}' does not exist",
                    default
                )));
            }
        }

        self.settings.validate()
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Add a profile. The first profile added becomes the default.
    pub fn add_profile(&mut self, profile: Profile) -> Result<()> {
        profile.validate()?;
        if self.profile(&profile.name).is_some() {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}' already exists",
                profile.name
            )));
        }

        if self.profiles.is_empty() && self.settings.default_profile.is_none() {
            self.settings.default_profile = Some(profile.name.clone());
        }
        self.profiles.push(profile);
        Ok(())
    }

    /// Remove a profile, clearing the default if it pointed there.
    pub fn remove_profile(&mut self, name: &str) -> Result<Profile> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?;

        if self.settings.default_profile.as_deref() == Some(name) {
            self.settings.default_profile = None;
        }
        Ok(self.profiles.remove(index))
    }

    /// Pick the profile to use.
    ///
    /// In order: the profile named explicitly, a profile built from
    /// `REDMINE_HOST`, the default profile, the only configured profile.
    pub fn resolve_profile(&self, name: Option<&str>) -> Result<Profile> {
        if let Some(name) = name {
            return self
                .profile(name)
                .cloned()
                .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()));
        }

        if let Some(profile) = Profile::from_env() {
            profile.validate()?;
            debug!("Using profile from environment");
            return Ok(profile);
        }

        if let Some(default) = &self.settings.default_profile {
            return self
                .profile(default)
                .cloned()
                .ok_or_else(|| ConfigError::ProfileNotFound(default.clone()));
        }

        match self.profiles.as_slice() {
            [only] => Ok(only.clone()),
            [] => Err(ConfigError::ValidationError(format!(
                "no profile configured; add one or set {}",
                HOST_ENV
            ))),
            _ => Err(ConfigError::ValidationError(
                "several profiles configured and no default; pass --profile".to_string(),
            )),
        }
    }
}
