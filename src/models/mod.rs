//! Data models for forge entities.
//!
//! This module contains the data structures exchanged with a forge server:
//!
//! - `UserProfile`: account identity (also persisted with the session)
//! - `Repository`: hosted repository metadata
//! - `Issue`: repository issues
//! - `SshKey`, `NewSshKey`: registered SSH public keys

pub mod issue;
pub mod repository;
pub mod ssh_key;
pub mod user;

pub use issue::{Issue, IssueState};
pub use repository::Repository;
pub use ssh_key::{NewSshKey, SshKey};
pub use user::UserProfile;
