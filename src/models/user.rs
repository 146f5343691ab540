use serde::{Deserialize, Serialize};

/// A forge user profile.
///
/// A stored profile may carry more complete data than the fields embedded
/// in an access token; when its `id` matches the token's `user_id` it takes
/// precedence over token-derived fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Display name for CLI output: "username <email>" when the email is known.
    pub fn display(&self) -> String {
        match self.email {
            Some(ref email) if !email.is_empty() => format!("{} <{}>", self.username, email),
            _ => self.username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_without_email() {
        let json = r#"{"id": 42, "username": "marin"}"#;
        let profile: UserProfile = serde_json::from_str(json).expect("Failed to parse profile");
        assert_eq!(profile.id, 42);
        assert_eq!(profile.username, "marin");
        assert_eq!(profile.email, None);
    }

    #[test]
    fn test_display_with_and_without_email() {
        let mut profile = UserProfile {
            id: 1,
            username: "marin".to_string(),
            email: Some("marin@example.com".to_string()),
        };
        assert_eq!(profile.display(), "marin <marin@example.com>");

        profile.email = None;
        assert_eq!(profile.display(), "marin");
    }
}
