//! REST API client for a forge server.
//!
//! This module provides the `ApiClient` for the authentication and account
//! endpoints, the `AccessResolver` that routes resource reads between the
//! authenticated API and its public mirror, and the `ApiError` taxonomy
//! both surface.
//!
//! All requests use JWT bearer token authentication; the session module
//! owns obtaining and refreshing those tokens.

pub mod client;
pub mod error;
pub mod resolver;

pub use client::{ApiClient, LoginResponse};
pub use error::ApiError;
pub use resolver::AccessResolver;
