//! Endpoint selection for resources that may be public or private.
//!
//! Every readable resource exists on two parallel URL families: the
//! authenticated API and a `/public/` mirror serving identical response
//! shapes for public resources. `AccessResolver` picks the endpoint from
//! the current session state:
//!
//! - Authenticated sessions try the authenticated endpoint first, whatever
//!   the resource's declared visibility. A 401/403 answer triggers exactly
//!   one follow-up attempt against the public mirror.
//! - Unauthenticated sessions go straight to the public mirror and never
//!   touch the authenticated endpoint.
//!
//! At most two network attempts happen per logical call, and every error
//! surfaced names the resource it was for. Calls are independent: nothing
//! is deduplicated or coalesced across concurrent resolutions.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::SessionHandle;
use crate::models::{Issue, Repository};

use super::{ApiClient, ApiError};

/// Outcome of the authenticated attempt.
enum Attempt<T> {
    Success(T),
    /// 401/403: fall back to the public mirror once.
    RetryWithPublic,
    Failure(ApiError),
}

pub struct AccessResolver {
    client: ApiClient,
    session: SessionHandle,
}

impl AccessResolver {
    pub fn new(client: ApiClient, session: SessionHandle) -> Self {
        Self { client, session }
    }

    /// Fetch a repository by owner and name.
    pub async fn repository(&self, owner: &str, name: &str) -> Result<Repository, ApiError> {
        let resource = format!("{}/{}", owner, name);
        self.fetch(&format!("repos/{}/{}", owner, name), &resource)
            .await
    }

    /// Fetch the issues of a repository.
    pub async fn issues(&self, owner: &str, name: &str) -> Result<Vec<Issue>, ApiError> {
        let resource = format!("{}/{}", owner, name);
        self.fetch(&format!("repos/{}/{}/issues", owner, name), &resource)
            .await
    }

    /// Fetch a single issue by number.
    pub async fn issue(&self, owner: &str, name: &str, number: i64) -> Result<Issue, ApiError> {
        let resource = format!("{}/{}#{}", owner, name, number);
        self.fetch(
            &format!("repos/{}/{}/issues/{}", owner, name, number),
            &resource,
        )
        .await
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, resource: &str) -> Result<T, ApiError> {
        if self.session.is_authenticated() {
            // A token about to lapse gets a background refresh; this
            // request still runs with the token we have.
            self.session.nudge_refresh();
            let token = self.session.bearer_token();
            match self.attempt_authenticated(path, token.as_deref(), resource).await {
                Attempt::Success(value) => Ok(value),
                Attempt::RetryWithPublic => {
                    debug!(
                        resource = resource,
                        "authenticated endpoint denied access, retrying public mirror"
                    );
                    self.attempt_public(path, resource).await
                }
                Attempt::Failure(e) => Err(e),
            }
        } else {
            self.attempt_public(path, resource).await
        }
    }

    async fn attempt_authenticated<T: DeserializeOwned>(
        &self,
        path: &str,
        bearer: Option<&str>,
        resource: &str,
    ) -> Attempt<T> {
        let url = self.client.api_url(path);
        let response = match self.client.raw_get(&url, bearer).await {
            Ok(response) => response,
            Err(e) => {
                return Attempt::Failure(ApiError::RequestFailed {
                    resource: resource.to_string(),
                    source: e,
                })
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.json().await {
                Ok(value) => Attempt::Success(value),
                Err(e) => Attempt::Failure(ApiError::InvalidResponse(format!(
                    "Bad JSON for {}: {}",
                    resource, e
                ))),
            };
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Attempt::RetryWithPublic;
        }

        let body = response.text().await.unwrap_or_default();
        Attempt::Failure(Self::classify(status, &body, resource))
    }

    async fn attempt_public<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
    ) -> Result<T, ApiError> {
        let url = self.client.public_url(path);
        let response =
            self.client
                .raw_get(&url, None)
                .await
                .map_err(|e| ApiError::RequestFailed {
                    resource: resource.to_string(),
                    source: e,
                })?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| {
                ApiError::InvalidResponse(format!("Bad JSON for {}: {}", resource, e))
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::classify(status, &body, resource))
    }

    /// Classify a non-success status, naming the resource instead of the
    /// response body where the body would leak or confuse.
    fn classify(status: reqwest::StatusCode, body: &str, resource: &str) -> ApiError {
        match status.as_u16() {
            // The public mirror answers 404 for private resources too, so
            // keep the message ambiguous and name only the resource.
            404 => ApiError::NotFound(resource.to_string()),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(resource.to_string()),
            _ => {
                warn!(resource = resource, status = %status, "request failed");
                ApiError::from_status(status, body)
            }
        }
    }
}
