//! Durable session storage.
//!
//! Credentials and the cached user profile are persisted as one file per
//! key under the session directory, so a session survives process restarts.
//! Storage failures are absorbed here - logged, never surfaced to session
//! consumers. Missing keys simply read as `None`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::models::UserProfile;

/// Canonical access-token key.
const ACCESS_TOKEN_KEY: &str = "access_token";

/// Pre-0.2 releases stored the access token under this name; it is still
/// checked on read so existing sessions keep working.
const LEGACY_ACCESS_TOKEN_KEY: &str = "token";

const REFRESH_TOKEN_KEY: &str = "refresh_token";

const USER_PROFILE_KEY: &str = "user_profile";

/// File-backed key-value store for session credentials.
/// Clone is cheap - instances share the same directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create session directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn get(&self, key: &str) -> Option<String> {
        let path = self.key_path(key);
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read session key");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = std::fs::write(self.key_path(key), value) {
            warn!(key = key, error = %e, "Failed to write session key");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.key_path(key);
        if !path.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(key = key, error = %e, "Failed to remove session key");
        }
    }

    /// Stored access token, checking the canonical key first and the legacy
    /// key as a fallback.
    pub fn access_token(&self) -> Option<String> {
        self.get(ACCESS_TOKEN_KEY).or_else(|| {
            let legacy = self.get(LEGACY_ACCESS_TOKEN_KEY);
            if legacy.is_some() {
                debug!("access token found under legacy key");
            }
            legacy
        })
    }

    /// Store the access token under the canonical key. The legacy key is
    /// removed so the two can never disagree.
    pub fn set_access_token(&self, token: &str) {
        self.set(ACCESS_TOKEN_KEY, token);
        self.remove(LEGACY_ACCESS_TOKEN_KEY);
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_KEY)
    }

    pub fn set_refresh_token(&self, token: &str) {
        self.set(REFRESH_TOKEN_KEY, token);
    }

    /// Stored user profile, if present and parseable.
    pub fn profile(&self) -> Option<UserProfile> {
        let raw = self.get(USER_PROFILE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "Stored user profile is not parseable, ignoring");
                None
            }
        }
    }

    pub fn set_profile(&self, profile: &UserProfile) {
        match serde_json::to_string(profile) {
            Ok(raw) => self.set(USER_PROFILE_KEY, &raw),
            Err(e) => warn!(error = %e, "Failed to serialize user profile"),
        }
    }

    /// Remove every recognized key (legacy alias included). Clearing an
    /// already-empty store is a no-op.
    pub fn clear_all(&self) {
        self.remove(ACCESS_TOKEN_KEY);
        self.remove(LEGACY_ACCESS_TOKEN_KEY);
        self.remove(REFRESH_TOKEN_KEY);
        self.remove(USER_PROFILE_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = SessionStore::new(dir.path().join("session")).expect("Failed to create store");
        (dir, store)
    }

    #[test]
    fn test_round_trip_all_keys() {
        let (_dir, store) = temp_store();

        store.set_access_token("access-1");
        store.set_refresh_token("refresh-1");
        store.set_profile(&UserProfile {
            id: 42,
            username: "marin".to_string(),
            email: None,
        });

        assert_eq!(store.access_token().as_deref(), Some("access-1"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
        assert_eq!(store.profile().map(|p| p.id), Some(42));
    }

    #[test]
    fn test_legacy_access_token_key_is_read() {
        let (_dir, store) = temp_store();

        std::fs::write(store.key_path(LEGACY_ACCESS_TOKEN_KEY), "legacy-token")
            .expect("Failed to seed legacy key");
        assert_eq!(store.access_token().as_deref(), Some("legacy-token"));

        // A canonical write supersedes and removes the legacy key
        store.set_access_token("new-token");
        assert_eq!(store.access_token().as_deref(), Some("new-token"));
        assert!(!store.key_path(LEGACY_ACCESS_TOKEN_KEY).exists());
    }

    #[test]
    fn test_canonical_key_wins_over_legacy() {
        let (_dir, store) = temp_store();

        std::fs::write(store.key_path(LEGACY_ACCESS_TOKEN_KEY), "legacy-token")
            .expect("Failed to seed legacy key");
        store.set(ACCESS_TOKEN_KEY, "canonical-token");
        assert_eq!(store.access_token().as_deref(), Some("canonical-token"));
    }

    #[test]
    fn test_clear_all_is_idempotent() {
        let (_dir, store) = temp_store();

        store.set_access_token("a");
        store.set_refresh_token("r");
        store.clear_all();

        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.profile().is_none());

        // Clearing an already-empty store must not fail
        store.clear_all();
        assert!(store.access_token().is_none());
    }

    #[test]
    fn test_corrupt_profile_reads_as_none() {
        let (_dir, store) = temp_store();
        store.set(USER_PROFILE_KEY, "{not json");
        assert!(store.profile().is_none());
    }
}
