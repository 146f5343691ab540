use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A hosted repository.
///
/// Private repositories are only visible through the authenticated API
/// surface; public ones are additionally served from the public mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(rename = "defaultBranch", default)]
    pub default_branch: Option<String>,
    #[serde(rename = "starsCount", default)]
    pub stars_count: Option<i64>,
    #[serde(rename = "forksCount", default)]
    pub forks_count: Option<i64>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn visibility_label(&self) -> &'static str {
        if self.private {
            "private"
        } else {
            "public"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository() {
        let json = r#"{
            "id": 7,
            "owner": "marin",
            "name": "forgedeck",
            "description": "Client core",
            "private": false,
            "defaultBranch": "main",
            "starsCount": 12,
            "forksCount": 3,
            "updatedAt": "2026-05-01T10:30:00Z"
        }"#;

        let repo: Repository = serde_json::from_str(json).expect("Failed to parse repository");
        assert_eq!(repo.full_name(), "marin/forgedeck");
        assert_eq!(repo.visibility_label(), "public");
        assert_eq!(repo.default_branch.as_deref(), Some("main"));
        assert_eq!(repo.stars_count, Some(12));
    }

    #[test]
    fn test_parse_repository_minimal() {
        // Optional fields may be absent from older servers
        let json = r#"{"id": 1, "owner": "org", "name": "infra", "private": true}"#;
        let repo: Repository = serde_json::from_str(json).expect("Failed to parse repository");
        assert_eq!(repo.visibility_label(), "private");
        assert_eq!(repo.description, None);
        assert_eq!(repo.updated_at, None);
    }
}
