//! In-memory authentication service backing the HTTP API

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::AuthError,
    session::{AuthCollaborator, Role},
};

/// Where a logged-out client is sent.
pub const DEFAULT_ENTRY_POINT: &str = "/login";

/// Credential markers for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: String,
    pub role: Role,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct AuthInner {
    session: Option<AuthSession>,
    /// Set on login, consumed by the first logout that navigates away.
    navigation_pending: bool,
    last_redirect: Option<String>,
    redirects: u64,
}

/// Single-user authentication state.
#[derive(Debug)]
pub struct AuthService {
    entry_point: String,
    inner: Mutex<AuthInner>,
}

impl AuthService {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            inner: Mutex::new(AuthInner::default()),
        }
    }

    /// Sign a user in, replacing any previous session.
    pub fn login(&self, user: &str, role: Role) -> Result<AuthSession, AuthError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(AuthError::InvalidLogin("user must not be empty".to_string()));
        }
        if role.as_str().trim().is_empty() {
            return Err(AuthError::InvalidLogin("role must not be empty".to_string()));
        }

        let session = AuthSession {
            user: user.to_string(),
            role,
            signed_in_at: Utc::now(),
        };

        let mut inner = self.lock();
        if let Some(previous) = inner.session.replace(session.clone()) {
            info!("Replacing session of {}", previous.user);
        }
        inner.navigation_pending = true;
        info!("User {} signed in as {}", session.user, session.role);
        Ok(session)
    }

    pub fn current_session(&self) -> Option<AuthSession> {
        self.lock().session.clone()
    }

    pub fn last_redirect(&self) -> Option<String> {
        self.lock().last_redirect.clone()
    }

    /// Number of times a logout navigated to the entry point.
    pub fn redirect_count(&self) -> u64 {
        self.lock().redirects
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AuthInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_POINT)
    }
}

#[async_trait]
impl AuthCollaborator for AuthService {
    fn is_authenticated(&self) -> bool {
        self.lock().session.is_some()
    }

    fn current_role(&self) -> Option<Role> {
        self.lock().session.as_ref().map(|s| s.role.clone())
    }

    fn clear_credentials(&self) {
        if let Some(session) = self.lock().session.take() {
            debug!("Cleared credentials of {}", session.user);
        }
    }

    async fn logout(&self) -> Result<(), AuthError> {
        let mut inner = self.lock();
        inner.session = None;
        if !inner.navigation_pending {
            debug!("Logout already navigated, skipping redirect");
            return Ok(());
        }
        inner.navigation_pending = false;
        inner.last_redirect = Some(self.entry_point.clone());
        inner.redirects += 1;
        info!("Logged out, redirecting to {}", self.entry_point);
        Ok(())
    }
}
