use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An issue on a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: i64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: IssueState,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(rename = "commentsCount", default)]
    pub comments_count: Option<i64>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl Issue {
    /// One-line summary for list output.
    pub fn summary_line(&self) -> String {
        let state = match self.state {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        };
        let author = self.author.as_deref().unwrap_or("unknown");
        format!("#{} [{}] {} ({})", self.number, state, self.title, author)
    }
}
