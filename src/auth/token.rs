//! Access token decoding and expiry checks.
//!
//! Forge access tokens are three dot-separated segments; the middle segment
//! is base64url-encoded JSON carrying at least `exp` (unix seconds) and
//! `user_id`. The client never verifies the signature - it only needs the
//! payload to decide validity and derive a fallback user identity. A token
//! that cannot be decoded is treated as invalid, never as an error.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::models::UserProfile;

/// How close to expiry a token counts as "expiring soon" (5 minutes).
pub const DEFAULT_EXPIRY_THRESHOLD_MS: i64 = 300_000;

/// Decoded access token payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPayload {
    /// Expiry, unix seconds.
    pub exp: i64,
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenPayload {
    pub(crate) fn expires_at_ms(&self) -> i64 {
        self.exp.saturating_mul(1000)
    }
}

/// Decode a token's payload segment. Returns `None` for anything that is
/// not a well-formed three-segment token with a parseable JSON payload.
pub fn decode(token: &str) -> Option<TokenPayload> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        debug!(segments = parts.len(), "token does not have three segments");
        return None;
    }

    let payload = match URL_SAFE_NO_PAD.decode(parts[1]) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "token payload is not valid base64url");
            return None;
        }
    };

    match serde_json::from_slice(&payload) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            debug!(error = %e, "token payload is not a valid claims object");
            None
        }
    }
}

/// A token is valid iff it decodes and its expiry is in the future.
pub fn is_valid(token: &str) -> bool {
    match decode(token) {
        Some(payload) => payload.expires_at_ms() > Utc::now().timestamp_millis(),
        None => false,
    }
}

/// Whether the token expires within `threshold_ms` from now.
///
/// A malformed token counts as expiring soon, so callers fall through to
/// refresh-or-logout rather than keep using it.
pub fn is_expiring_soon(token: &str, threshold_ms: i64) -> bool {
    match decode(token) {
        Some(payload) => payload.expires_at_ms() < Utc::now().timestamp_millis() + threshold_ms,
        None => true,
    }
}

/// Resolve the user for a session from the token payload and the profile in
/// durable storage. A stored profile wins when its `id` matches the token's
/// `user_id` - it may carry fields the token payload lacks.
pub fn resolve_user(payload: &TokenPayload, stored: Option<UserProfile>) -> UserProfile {
    if let Some(profile) = stored {
        if profile.id == payload.user_id {
            return profile;
        }
    }

    UserProfile {
        id: payload.user_id,
        username: payload.username.clone().unwrap_or_default(),
        email: payload.email.clone(),
    }
}
