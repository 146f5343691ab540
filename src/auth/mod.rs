//! Session and credential management.
//!
//! This module provides:
//! - `token`: access-token decoding and expiry checks
//! - `SessionStore`: durable credential storage surviving restarts
//! - `SessionController` / `SessionHandle`: session lifecycle and the
//!   published `{is_authenticated, user, auth_error}` state
//! - a periodic refresh scheduler with single-flight semantics
//!
//! Access tokens are refreshed shortly before expiry; a failed refresh
//! clears the session and asks the user to log in again.

mod refresh;
pub mod session;
pub mod store;
pub mod token;

pub use session::{Session, SessionController, SessionHandle};
pub use store::SessionStore;
