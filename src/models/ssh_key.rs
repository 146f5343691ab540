use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered SSH public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshKey {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for registering a new SSH key.
#[derive(Debug, Clone, Serialize)]
pub struct NewSshKey {
    pub title: String,
    pub key: String,
}

impl SshKey {
    pub fn summary_line(&self) -> String {
        match self.fingerprint {
            Some(ref fp) => format!("{} ({}) {}", self.id, self.title, fp),
            None => format!("{} ({})", self.id, self.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ssh_key() {
        let json = r#"{
            "id": 3,
            "title": "laptop",
            "fingerprint": "SHA256:yc6BPWAei0cmEPCnJkzYyxuwUOKKTVyJ4S5cX5k5WJ8",
            "createdAt": "2026-01-05T12:00:00Z"
        }"#;

        let key: SshKey = serde_json::from_str(json).expect("Failed to parse SSH key");
        assert_eq!(key.id, 3);
        assert!(key.summary_line().starts_with("3 (laptop) SHA256:"));
    }
}
