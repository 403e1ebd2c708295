//! Centralized error types for the `rmine` command-line tool.
//!
//! The library surfaces [`ApiError`] and [`ConfigError`]; this module wraps
//! them for the CLI with user-friendly messages.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::{ConfigError, API_KEY_ENV};

/// The main application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// IO errors (file system, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with a message.
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        AppError::Other(msg.into())
    }

    /// Get a user-friendly message for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::ProfileNotFound(name) => format!("Profile '{}' not found.", name),
                other => other.to_string(),
            },
            AppError::Api(e) => match e {
                ApiError::NotFound(resource) => format!("{} was not found.", resource),
                ApiError::Service { message, .. } => message.clone(),
                ApiError::Transport(_) => {
                    "Connection failed. Please check the Redmine URL and your network.".to_string()
                }
                ApiError::Keyring(_) => {
                    "Could not read the API key from secure storage.".to_string()
                }
                ApiError::Parse(_) => {
                    "Unexpected response from Redmine. Is the REST API enabled?".to_string()
                }
                other => other.to_string(),
            },
            AppError::Io(e) => format!("A file operation failed: {}", e),
            AppError::Other(msg) => msg.clone(),
        }
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<String> {
        match self {
            AppError::Config(ConfigError::ValidationError(msg)) if msg.contains("no profile") => {
                Some("Run 'rmine profile add <name> <url>' to configure Redmine.".to_string())
            }
            AppError::Api(ApiError::Keyring(_)) => Some(format!(
                "Store a key with 'rmine profile add --api-key', or set {}.",
                API_KEY_ENV
            )),
            AppError::Api(ApiError::Service { status, .. }) if status.as_u16() == 401 => Some(
                "Check your API key under 'My account' in Redmine.".to_string(),
            ),
            AppError::Api(ApiError::Parse(_)) => Some(
                "Enable 'REST web service' under Administration > Settings > API.".to_string(),
            ),
            _ => None,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 2,
            AppError::Api(ApiError::NotFound(_)) => 3,
            _ => 1,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
