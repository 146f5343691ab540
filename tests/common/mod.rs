#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;

use forgedeck::{ApiClient, SessionController, SessionStore};

/// Build a structurally valid access token whose expiry is
/// `exp_offset_secs` from now. The client never verifies signatures, so a
/// fixed third segment is enough.
pub fn make_token(exp_offset_secs: i64, user_id: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({
        "exp": Utc::now().timestamp() + exp_offset_secs,
        "user_id": user_id,
        "username": "marin",
        "email": "marin@example.com",
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{}.{}.sig", header, payload)
}

/// A controller wired against a server URL with its own temp session
/// directory. The TempDir must stay alive for the duration of the test.
pub struct TestSession {
    pub dir: TempDir,
    pub store: SessionStore,
    pub client: ApiClient,
    pub controller: SessionController,
}

pub fn session_against(server_url: &str) -> TestSession {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store =
        SessionStore::new(dir.path().join("session")).expect("Failed to create session store");
    let client = ApiClient::new(server_url).expect("Failed to build API client");
    let controller = SessionController::new(store.clone(), client.clone());
    TestSession {
        dir,
        store,
        client,
        controller,
    }
}

pub fn repo_json(owner: &str, name: &str, private: bool) -> serde_json::Value {
    json!({
        "id": 7,
        "owner": owner,
        "name": name,
        "description": "A repository",
        "private": private,
        "defaultBranch": "main",
        "starsCount": 3,
        "forksCount": 1,
        "updatedAt": "2026-05-01T10:30:00Z"
    })
}
