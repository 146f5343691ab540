//! Scheduled and on-demand credential refresh.
//!
//! A refresh attempt moves through checking (is the token close to
//! expiry?) and refreshing (exchange at the refresh endpoint), then back to
//! idle. At most one refresh is in flight at any time: attempts arriving
//! while one is outstanding are dropped - not queued, and the caller does
//! not wait for the in-flight result. Both the periodic timer and the ad
//! hoc expiring-token triggers funnel through the same guarded `refresh`,
//! so the at-most-one invariant holds globally.
//!
//! A failed refresh is fatal for the session: all credentials are cleared
//! and `auth_error` tells the user to log in again.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::auth::session::{SessionShared, SessionStatus};
use crate::auth::token::{self, DEFAULT_EXPIRY_THRESHOLD_MS};

/// Interval between periodic expiry checks (4 minutes). Shorter than the
/// 5 minute expiring-soon window, so an expiring token is always seen
/// before it lapses.
const REFRESH_CHECK_INTERVAL_SECS: u64 = 240;

pub(crate) const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

#[derive(Error, Debug)]
enum RefreshError {
    #[error("no refresh token available")]
    NoRefreshToken,

    #[error("refresh request failed: {0}")]
    Transport(#[from] ApiError),

    #[error("refresh response carried no token")]
    MissingToken,

    #[error("refreshed token did not validate")]
    InvalidToken,
}

/// Owns the periodic refresh timer. Stopped on controller teardown; the
/// shared `closed` flag additionally keeps any late trigger from starting
/// a refresh after teardown.
pub(crate) struct RefreshScheduler {
    shared: Arc<SessionShared>,
    timer: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub(crate) fn new(shared: Arc<SessionShared>) -> Self {
        Self {
            shared,
            timer: None,
        }
    }

    /// Start the periodic expiry check. Idempotent.
    pub(crate) fn start(&mut self) {
        if self.timer.is_some() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        self.timer = Some(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(REFRESH_CHECK_INTERVAL_SECS));
            // The first tick completes immediately; init has just checked.
            interval.tick().await;
            loop {
                interval.tick().await;
                tick(&shared).await;
            }
        }));
        debug!(
            interval_secs = REFRESH_CHECK_INTERVAL_SECS,
            "refresh timer started"
        );
    }

    /// Stop the timer and close the session for refreshes.
    pub(crate) fn stop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        if let Some(timer) = self.timer.take() {
            timer.abort();
            debug!("refresh timer stopped");
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One periodic check: refresh when the current token is close to expiry
/// and a refresh token is on hand.
async fn tick(shared: &Arc<SessionShared>) {
    let (access_token, has_refresh) = {
        let state = shared.read();
        (state.access_token.clone(), state.refresh_token.is_some())
    };
    let Some(access_token) = access_token else {
        return;
    };
    if token::is_expiring_soon(&access_token, DEFAULT_EXPIRY_THRESHOLD_MS) && has_refresh {
        debug!("periodic check found token close to expiry");
        refresh(shared).await;
    }
}

/// Fire a refresh on a background task without blocking the caller.
pub(crate) fn spawn_refresh(shared: &Arc<SessionShared>) {
    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        refresh(&shared).await;
    });
}

/// Refresh the access token, single-flight.
///
/// Returns true when the session holds a fresh valid token afterwards.
/// Returns false when the attempt was dropped (closed session or another
/// refresh in flight) or failed; failure also runs the logout cascade and
/// sets `auth_error`.
pub(crate) async fn refresh(shared: &Arc<SessionShared>) -> bool {
    if shared.closed.load(Ordering::SeqCst) {
        debug!("session closed, skipping refresh");
        return false;
    }
    if shared
        .refresh_in_flight
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        debug!("refresh already in flight, dropping this attempt");
        return false;
    }

    let outcome = do_refresh(shared).await;
    shared.refresh_in_flight.store(false, Ordering::SeqCst);

    match outcome {
        Ok(user_id) => {
            info!(user_id, "access token refreshed");
            true
        }
        Err(e) => {
            warn!(error = %e, "refresh failed, ending session");
            shared.apply_logout(Some(SESSION_EXPIRED_MESSAGE.to_string()));
            false
        }
    }
}

async fn do_refresh(shared: &Arc<SessionShared>) -> Result<i64, RefreshError> {
    let refresh_token = shared
        .read()
        .refresh_token
        .clone()
        .ok_or(RefreshError::NoRefreshToken)?;

    let new_token = shared
        .client
        .refresh_access_token(&refresh_token)
        .await?
        .ok_or(RefreshError::MissingToken)?;

    let payload = token::decode(&new_token).ok_or(RefreshError::InvalidToken)?;
    if payload.expires_at_ms() <= Utc::now().timestamp_millis() {
        return Err(RefreshError::InvalidToken);
    }

    let user = token::resolve_user(&payload, shared.store.profile());

    let mut state = shared.write();
    if state.remember {
        shared.store.set_access_token(&new_token);
        shared.store.set_profile(&user);
    }
    state.access_token = Some(new_token);
    state.user = Some(user);
    state.status = SessionStatus::Authenticated;
    state.auth_error = None;
    Ok(payload.user_id)
}
