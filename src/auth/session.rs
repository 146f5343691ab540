//! Session lifecycle and state publication.
//!
//! `SessionController` owns the session: boot-time reconstruction from
//! durable storage (`init`), login, logout, and the periodic refresh
//! scheduler. Consumers observe the session through `Session` snapshots
//! obtained from the controller or a cloned `SessionHandle`; the snapshot
//! carries only `{is_authenticated, user, auth_error}`.
//!
//! Credential persistence and the in-memory authentication flag are updated
//! while holding the state write lock, so a reader sees either the old
//! session or the new one, never a mix. No lock is held across an await.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::auth::refresh::{self, RefreshScheduler};
use crate::auth::store::SessionStore;
use crate::auth::token::{self, DEFAULT_EXPIRY_THRESHOLD_MS};
use crate::models::UserProfile;

/// Lifecycle of a session: `Loading` only between construction and the end
/// of `init()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Point-in-time view of the session published to the rest of the
/// application.
#[derive(Debug, Clone)]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<UserProfile>,
    /// Set only immediately after a failed refresh or an invalid login.
    pub auth_error: Option<String>,
}

pub(crate) struct SessionState {
    pub(crate) status: SessionStatus,
    pub(crate) user: Option<UserProfile>,
    pub(crate) auth_error: Option<String>,
    pub(crate) access_token: Option<String>,
    pub(crate) refresh_token: Option<String>,
    /// Whether credentials are mirrored to durable storage. Seeded true
    /// when `init` finds stored credentials, otherwise set by `login`.
    pub(crate) remember: bool,
}

/// State shared between the controller, the refresh scheduler, and any
/// handed-out `SessionHandle`s.
pub(crate) struct SessionShared {
    pub(crate) store: SessionStore,
    pub(crate) client: ApiClient,
    pub(crate) state: RwLock<SessionState>,
    /// Single-flight guard: set while a refresh is outstanding.
    pub(crate) refresh_in_flight: AtomicBool,
    /// Set on teardown; no refresh may start afterwards.
    pub(crate) closed: AtomicBool,
}

impl SessionShared {
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn snapshot(&self) -> Session {
        let state = self.read();
        Session {
            is_authenticated: state.status == SessionStatus::Authenticated,
            user: state.user.clone(),
            auth_error: state.auth_error.clone(),
        }
    }

    /// Logout cascade: clear durable credentials and reset in-memory state
    /// in one step. `auth_error` carries the refresh-failure message, or
    /// `None` for a user-initiated logout.
    pub(crate) fn apply_logout(&self, auth_error: Option<String>) {
        let mut state = self.write();
        self.store.clear_all();
        state.access_token = None;
        state.refresh_token = None;
        state.user = None;
        state.status = SessionStatus::Unauthenticated;
        state.auth_error = auth_error;
    }
}

/// Cloneable read/refresh handle for session consumers such as the access
/// resolver.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    pub fn session(&self) -> Session {
        self.shared.snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.read().status == SessionStatus::Authenticated
    }

    /// Current access token for authenticated requests.
    pub fn bearer_token(&self) -> Option<String> {
        self.shared.read().access_token.clone()
    }

    /// Force a refresh attempt now. Returns true when the session holds a
    /// fresh valid token afterwards; false when the attempt failed or was
    /// dropped because another refresh is already in flight.
    pub async fn refresh_now(&self) -> bool {
        refresh::refresh(&self.shared).await
    }

    /// Fire a background refresh if the current token is about to expire
    /// and a refresh token is available. Never blocks the caller; the
    /// single-flight guard drops the attempt when one is already running.
    pub(crate) fn nudge_refresh(&self) {
        let (expiring, has_refresh) = {
            let state = self.shared.read();
            match state.access_token {
                Some(ref t) => (
                    token::is_expiring_soon(t, DEFAULT_EXPIRY_THRESHOLD_MS),
                    state.refresh_token.is_some(),
                ),
                None => (false, false),
            }
        };
        if expiring && has_refresh {
            debug!("token close to expiry, refreshing in background");
            refresh::spawn_refresh(&self.shared);
        }
    }
}

/// Owns the session for the lifetime of the application.
pub struct SessionController {
    shared: Arc<SessionShared>,
    scheduler: RefreshScheduler,
}

impl SessionController {
    pub fn new(store: SessionStore, client: ApiClient) -> Self {
        let shared = Arc::new(SessionShared {
            store,
            client,
            state: RwLock::new(SessionState {
                status: SessionStatus::Loading,
                user: None,
                auth_error: None,
                access_token: None,
                refresh_token: None,
                remember: false,
            }),
            refresh_in_flight: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        let scheduler = RefreshScheduler::new(Arc::clone(&shared));
        Self { shared, scheduler }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn session(&self) -> Session {
        self.shared.snapshot()
    }

    /// Reconstruct the session from durable storage and start the periodic
    /// refresh timer.
    ///
    /// A stored valid token authenticates immediately; if it is close to
    /// expiry a background refresh is kicked off without blocking. A stored
    /// invalid token is exchanged via the refresh token when one exists
    /// (awaited - the outcome decides the final state), otherwise the
    /// session starts unauthenticated.
    pub async fn init(&mut self) -> Session {
        debug!("initializing session from storage");
        let shared = Arc::clone(&self.shared);

        match shared.store.access_token() {
            None => {
                debug!("no stored credentials");
                shared.write().status = SessionStatus::Unauthenticated;
            }
            Some(stored) => match token::decode(&stored) {
                Some(payload) if token::is_valid(&stored) => {
                    let user = token::resolve_user(&payload, shared.store.profile());
                    let refresh_token = shared.store.refresh_token();
                    let expiring = token::is_expiring_soon(&stored, DEFAULT_EXPIRY_THRESHOLD_MS);
                    let has_refresh = refresh_token.is_some();
                    {
                        let mut state = shared.write();
                        state.access_token = Some(stored);
                        state.refresh_token = refresh_token;
                        state.user = Some(user);
                        state.remember = true;
                        state.status = SessionStatus::Authenticated;
                        state.auth_error = None;
                    }
                    info!("session restored from storage");
                    if expiring && has_refresh {
                        debug!("stored token close to expiry, refreshing in background");
                        refresh::spawn_refresh(&shared);
                    }
                }
                _ => match shared.store.refresh_token() {
                    Some(refresh_token) => {
                        debug!("stored token no longer valid, trying refresh");
                        {
                            let mut state = shared.write();
                            state.refresh_token = Some(refresh_token);
                            state.remember = true;
                        }
                        refresh::refresh(&shared).await;
                    }
                    None => {
                        debug!("stored token no longer valid and no refresh token");
                        shared.apply_logout(None);
                    }
                },
            },
        }

        self.scheduler.start();
        self.session()
    }

    /// Establish a session from freshly issued credentials.
    ///
    /// Returns false without touching any state when the access token does
    /// not validate. With `remember_me` the credentials and the resolved
    /// profile are mirrored to durable storage; without it any previously
    /// persisted credentials are cleared and the session lives in memory
    /// only.
    pub fn login(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        remember_me: bool,
    ) -> bool {
        let Some(payload) = token::decode(access_token) else {
            warn!("login rejected: token is malformed");
            return false;
        };
        if !token::is_valid(access_token) {
            warn!("login rejected: token is expired");
            return false;
        }

        let user = token::resolve_user(&payload, self.shared.store.profile());

        let mut state = self.shared.write();
        if remember_me {
            self.shared.store.set_access_token(access_token);
            if let Some(rt) = refresh_token {
                self.shared.store.set_refresh_token(rt);
            }
            self.shared.store.set_profile(&user);
        } else {
            self.shared.store.clear_all();
        }
        state.access_token = Some(access_token.to_string());
        state.refresh_token = refresh_token.map(str::to_string);
        state.user = Some(user);
        state.remember = remember_me;
        state.status = SessionStatus::Authenticated;
        state.auth_error = None;
        drop(state);

        info!(user_id = payload.user_id, "logged in");
        true
    }

    /// Clear all credentials, durable and in-memory. Safe to call when
    /// already logged out.
    pub fn logout(&self) {
        self.shared.apply_logout(None);
        info!("logged out");
    }

    /// Clear a lingering auth error without touching the rest of the
    /// session (e.g. after the user has seen the message).
    pub fn clear_auth_error(&self) {
        self.shared.write().auth_error = None;
    }

    /// Stop the refresh timer. No refresh attempt fires after this.
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
    }
}
