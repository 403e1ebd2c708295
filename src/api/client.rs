//! Redmine API client implementation.
//!
//! This module provides the main client for interacting with the Redmine REST
//! API. It handles authentication, URL building, request/response processing
//! and status-code mapping. Resource operations live in the sibling modules
//! (`issues`, `projects`, `memberships`, `uploads`) as `impl RedmineClient`
//! blocks built on the request helpers here.

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::auth::{ApiKey, SWITCH_USER_HEADER};
use super::error::{ApiError, Result};
use super::pagination::{drain_pages, Page};
use super::types::ErrorsEnvelope;
use crate::config::{Profile, Settings};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Statuses accepted for reads.
pub(crate) const READ_OK: &[StatusCode] = &[StatusCode::OK];

/// Statuses accepted for creates.
pub(crate) const CREATED: &[StatusCode] = &[StatusCode::CREATED];

/// Statuses accepted for updates.
pub(crate) const UPDATED: &[StatusCode] = &[StatusCode::OK, StatusCode::NO_CONTENT];

/// Statuses accepted for deletes.
pub(crate) const DELETED: &[StatusCode] = &[StatusCode::NO_CONTENT];

/// Query parameters for a request, in insertion order.
///
/// The API key is not part of this; the client appends it to every URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    /// An empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    /// Add a parameter in place.
    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.push((key.into(), value.to_string()));
    }

    /// Whether no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as `a=1&b=2`, URL-encoding keys and values.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (k, v) in iter {
            query.push(k, v);
        }
        query
    }
}

/// The Redmine API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct RedmineClient {
    /// The HTTP client.
    client: Client,
    /// The base URL for the Redmine instance.
    base_url: String,
    /// The API key sent with every request.
    api_key: ApiKey,
    /// Login to impersonate, if any.
    switch_user: Option<String>,
    /// Page size to request from list endpoints; server default when unset.
    page_limit: Option<u32>,
}

impl RedmineClient {
    /// Create a client from a configured profile.
    ///
    /// Resolves the API key from the environment or the OS keyring and applies
    /// the profile's page size and impersonation settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The API key cannot be found
    /// - The HTTP client cannot be built
    #[instrument(skip(profile, settings), fields(profile_name = %profile.name))]
    pub fn new(profile: &Profile, settings: &Settings) -> Result<Self> {
        info!("Creating Redmine client for profile");

        let api_key = profile.resolve_api_key()?;
        let client = Self::build_http_client(Duration::from_secs(settings.timeout_secs))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&profile.url),
            api_key,
            switch_user: profile.switch_user.clone(),
            page_limit: profile.page_limit,
        })
    }

    /// Create a client with explicit credentials.
    ///
    /// Use this for testing or when credentials are provided directly.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The Redmine instance URL
    /// * `api_key` - The user's REST API key
    pub fn with_credentials(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Self::build_http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            api_key: ApiKey::new(api_key),
            switch_user: None,
            page_limit: None,
        })
    }

    /// Return a client that requests pages of `limit` items from list
    /// endpoints (`None` leaves the server default).
    pub fn with_page_limit(mut self, limit: Option<u32>) -> Self {
        self.page_limit = limit;
        self
    }

    /// Return a client that performs every request as `login`.
    ///
    /// Requires the API key to belong to an administrator.
    pub fn acting_as(&self, login: &str) -> Self {
        Self {
            switch_user: Some(login.to_string()),
            ..self.clone()
        }
    }

    /// Build the HTTP client with appropriate settings.
    fn build_http_client(timeout: Duration) -> Result<Client> {
        Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The login being impersonated, if any.
    pub fn switch_user(&self) -> Option<&str> {
        self.switch_user.as_deref()
    }

    /// The configured page size for list endpoints.
    pub fn page_limit(&self) -> Option<u32> {
        self.page_limit
    }

    /// Build the full request URL, API key included.
    fn url(&self, path: &str, query: &Query) -> String {
        let mut url = format!("{}{}?{}", self.base_url, path, self.api_key.query_pair());
        if !query.is_empty() {
            url.push('&');
            url.push_str(&query.encode());
        }
        url
    }

    /// Start a request with the common headers applied.
    fn request(&self, method: Method, path: &str, query: &Query) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path, query))
            .header(header::ACCEPT, "application/json");

        if let Some(login) = &self.switch_user {
            builder = builder.header(SWITCH_USER_HEADER, login);
        }
        builder
    }

    /// Send a request and return the body if the status is one we expect.
    #[instrument(skip(self, builder, expected))]
    async fn execute(
        &self,
        builder: RequestBuilder,
        path: &str,
        expected: &[StatusCode],
        context: &str,
    ) -> Result<Vec<u8>> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Received response");

        if expected.contains(&status) {
            Ok(body.to_vec())
        } else {
            let err = error_from_response(status, &body, context);
            warn!("Request failed: {}", err);
            Err(err)
        }
    }

    /// GET a JSON document.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
        context: &str,
    ) -> Result<T> {
        let builder = self.request(Method::GET, path, query);
        let body = self.execute(builder, path, READ_OK, context).await?;
        serde_json::from_slice(&body).map_err(ApiError::Parse)
    }

    /// GET every page of a list endpoint.
    pub(crate) async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query,
        context: &str,
    ) -> Result<Vec<T>> {
        let query = &query;
        drain_pages(move |offset| async move {
            let mut page_query = query.clone();
            if let Some(limit) = self.page_limit {
                page_query.push("limit", limit);
            }
            page_query.push("offset", offset);
            self.get_json::<Page<T>>(path, &page_query, context).await
        })
        .await
    }

    /// POST a JSON body and decode the 201 response.
    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        context: &str,
    ) -> Result<T> {
        let payload = serde_json::to_vec(body).map_err(ApiError::Serialization)?;
        let builder = self
            .request(Method::POST, path, &Query::new())
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload);
        let body = self.execute(builder, path, CREATED, context).await?;
        serde_json::from_slice(&body).map_err(ApiError::Parse)
    }

    /// PUT a JSON body; the response body is ignored.
    pub(crate) async fn put_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        context: &str,
    ) -> Result<()> {
        let payload = serde_json::to_vec(body).map_err(ApiError::Serialization)?;
        let builder = self
            .request(Method::PUT, path, &Query::new())
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload);
        self.execute(builder, path, UPDATED, context).await?;
        Ok(())
    }

    /// DELETE a resource.
    pub(crate) async fn delete(&self, path: &str, context: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, path, &Query::new());
        self.execute(builder, path, DELETED, context).await?;
        Ok(())
    }

    /// POST raw bytes and decode the 201 response.
    pub(crate) async fn post_bytes<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
        content: Vec<u8>,
        context: &str,
    ) -> Result<T> {
        let builder = self
            .request(Method::POST, path, query)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(content);
        let body = self.execute(builder, path, CREATED, context).await?;
        serde_json::from_slice(&body).map_err(ApiError::Parse)
    }
}

/// Create an appropriate error from a failed HTTP response.
///
/// 404 maps to `NotFound` regardless of body. Other statuses carry the
/// server's `errors` messages joined by newlines when the body has them.
fn error_from_response(status: StatusCode, body: &[u8], context: &str) -> ApiError {
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound(context.to_string());
    }

    if let Ok(envelope) = serde_json::from_slice::<ErrorsEnvelope>(body) {
        if let Some(message) = envelope.joined() {
            return ApiError::from_status(status, &message);
        }
    }

    if status.is_success() {
        ApiError::from_status(status, &format!("Unexpected HTTP {} for {}", status, context))
    } else {
        ApiError::from_status(status, &format!("HTTP {}", status))
    }
}

/// Normalize the base URL by removing trailing slashes.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');

    // Warn if not HTTPS (but don't enforce for localhost/testing)
    if !url.starts_with("https://") && !url.contains("localhost") && !url.contains("127.0.0.1") {
        warn!("URL does not use HTTPS: {}. The API key will travel in clear text.", url);
    }

    url.to_string()
}
