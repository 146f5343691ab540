//! forgedeck - client core for self-hosted code forges.
//!
//! The crate centers on session and access management for a forge whose
//! resources may be public or private:
//!
//! - [`auth`]: token decoding, durable session storage, the session
//!   controller with scheduled single-flight refresh
//! - [`api`]: the HTTP client, the error taxonomy, and the
//!   [`api::AccessResolver`] that routes reads between the authenticated
//!   API and its public mirror
//! - [`models`]: repositories, issues, SSH keys, user profiles
//! - [`config`]: config file and environment handling

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{AccessResolver, ApiClient, ApiError};
pub use auth::{Session, SessionController, SessionHandle, SessionStore};
pub use config::Config;
