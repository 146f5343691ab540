//! HTTP client for a forge server.
//!
//! This module provides the `ApiClient` struct for talking to a forge's
//! REST API: the authentication endpoints (login, token refresh) and the
//! authenticated-only account surface (profile, own repositories, SSH
//! keys). Resources that also exist on the public mirror are fetched
//! through `AccessResolver`, which drives the endpoint choice.

use anyhow::Context;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{NewSshKey, Repository, SshKey, UserProfile};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Authenticated API prefix.
const API_PREFIX: &str = "/api/v1";

/// Public mirror prefix: same resources, same response shapes, no
/// credentials required. Only public resources are served here.
const PUBLIC_PREFIX: &str = "/api/v1/public";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    token: Option<String>,
}

/// API client for a forge server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for the given server, e.g.
    /// `https://forge.example.com`.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, API_PREFIX, path)
    }

    pub(crate) fn public_url(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, PUBLIC_PREFIX, path)
    }

    /// Perform a GET without status handling; used by the resolver, which
    /// classifies statuses itself to drive the public-mirror fallback.
    pub(crate) async fn raw_get(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        request.send().await
    }

    /// Check if response is successful, returning a classified error if not.
    async fn check_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let mut request = self.client.get(url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = Self::check_response(request.send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Bad JSON from {}: {}", url, e)))
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let mut request = self.client.post(url).json(body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = Self::check_response(request.send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Bad JSON from {}: {}", url, e)))
    }

    // ===== Auth endpoints =====

    /// Authenticate with the forge and return the issued credentials.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        let url = self.api_url("auth/login");
        debug!(username = username, "Sending login request");
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });
        self.post(&url, &body).await
    }

    /// Exchange a refresh token for a new access token. Returns `None` when
    /// the server answered 2xx without a token; callers treat that the same
    /// as a failed refresh.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<String>, ApiError> {
        let url = self.api_url("auth/refresh");
        let body = serde_json::json!({ "refreshToken": refresh_token });
        let response: RefreshResponse = self.post(&url, &body).await?;
        Ok(response.token)
    }

    // ===== Authenticated-only account surface =====

    /// Fetch the profile of the authenticated user
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get(&self.api_url("user")).await
    }

    /// Fetch the repositories owned by the authenticated user
    pub async fn own_repositories(&self) -> Result<Vec<Repository>, ApiError> {
        self.get(&self.api_url("user/repos")).await
    }

    /// Fetch the registered SSH keys of the authenticated user
    pub async fn ssh_keys(&self) -> Result<Vec<SshKey>, ApiError> {
        self.get(&self.api_url("user/keys")).await
    }

    /// Register a new SSH key
    pub async fn add_ssh_key(&self, key: &NewSshKey) -> Result<SshKey, ApiError> {
        self.post(&self.api_url("user/keys"), key).await
    }

    /// Delete a registered SSH key
    pub async fn delete_ssh_key(&self, id: i64) -> Result<(), ApiError> {
        let url = self.api_url(&format!("user/keys/{}", id));
        let mut request = self.client.delete(&url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        Self::check_response(request.send().await?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = ApiClient::new("https://forge.example.com/").expect("Failed to build client");
        assert_eq!(
            client.api_url("repos/acme/widget"),
            "https://forge.example.com/api/v1/repos/acme/widget"
        );
        assert_eq!(
            client.public_url("repos/acme/widget"),
            "https://forge.example.com/api/v1/public/repos/acme/widget"
        );
    }

    #[test]
    fn test_parse_login_response() {
        let json = r#"{
            "token": "aaa.bbb.ccc",
            "refreshToken": "rrr",
            "user": {"id": 42, "username": "marin", "email": "marin@example.com"}
        }"#;
        let parsed: LoginResponse =
            serde_json::from_str(json).expect("Failed to parse login response");
        assert_eq!(parsed.token, "aaa.bbb.ccc");
        assert_eq!(parsed.refresh_token.as_deref(), Some("rrr"));
        assert_eq!(parsed.user.username, "marin");
    }

    #[test]
    fn test_parse_refresh_response_without_token() {
        // A 2xx body with no token field must parse, so the caller can
        // treat it as a failed refresh rather than a protocol error.
        let parsed: RefreshResponse =
            serde_json::from_str("{}").expect("Failed to parse refresh response");
        assert!(parsed.token.is_none());
    }
}
