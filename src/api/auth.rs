//! Authentication handling for the Redmine API.
//!
//! Redmine authenticates REST calls with a per-user API key passed as the
//! `key` query parameter. Keys are stored in the OS keyring per profile.

use std::fmt;

use super::error::{ApiError, Result};

/// The keyring service name for redmine-client API keys.
const KEYRING_SERVICE: &str = "redmine-client";

/// Name of the query parameter carrying the API key.
pub const API_KEY_PARAM: &str = "key";

/// Header used to act as another user (requires admin privileges).
pub const SWITCH_USER_HEADER: &str = "X-Redmine-Switch-User";

/// A Redmine API key.
///
/// The key is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw API key.
    pub fn new(key: &str) -> Self {
        Self(key.trim().to_string())
    }

    /// Load the API key for a profile from the OS keyring.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be retrieved from the keyring.
    pub fn from_keyring(profile_name: &str) -> Result<Self> {
        let key = get_api_key(profile_name)?;
        Ok(Self::new(&key))
    }

    /// The raw key, for placing into a request URL.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// The `key=...` query pair, URL-encoded.
    pub fn query_pair(&self) -> String {
        format!("{}={}", API_KEY_PARAM, urlencoding::encode(&self.0))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Store an API key in the OS keyring.
///
/// # Errors
///
/// Returns an error if the key cannot be stored in the keyring.
pub fn store_api_key(profile_name: &str, key: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to create keyring entry: {}", e)))?;

    entry
        .set_password(key)
        .map_err(|e| ApiError::Keyring(format!("failed to store API key: {}", e)))?;

    Ok(())
}

/// Retrieve an API key from the OS keyring.
///
/// # Errors
///
/// Returns an error if the key cannot be retrieved from the keyring.
pub fn get_api_key(profile_name: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))?;

    entry
        .get_password()
        .map_err(|e| ApiError::Keyring(format!("failed to retrieve API key: {}", e)))
}

/// Delete an API key from the OS keyring.
///
/// # Errors
///
/// Returns an error if the key cannot be deleted from the keyring.
pub fn delete_api_key(profile_name: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))?;

    entry
        .delete_password()
        .map_err(|e| ApiError::Keyring(format!("failed to delete API key: {}", e)))?;

    Ok(())
}
