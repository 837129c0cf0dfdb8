// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Token Manager
//!
//! Owns the backend session token pair for the portal user:
//!
//! ```text
//! LoggedOut --login()--------------------> LoggedIn
//! LoggedOut --restore_session() [hit]----> LoggedIn
//! LoggedIn  --refresh()------------------> LoggedIn   (access token replaced)
//! LoggedIn  --401 / on_unauthorized()----> LoggedOut  (pair cleared, store purged)
//! ```
//!
//! The pair is persisted under `(org_id, user_id)` keys so that a reload
//! with the same portal identity restores the session without a new login.
//! [`Session`] is the only writer of the token store.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use super::bridge::PortalBridge;
use super::claims::PortalClaims;
use super::error::AuthError;
use crate::client::{BackendClient, ClientError, TokenSource, UnauthorizedHook, WalletApi};
use crate::models::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};
use crate::storage::{TokenKeys, TokenStore};

pub const LOGIN_PATH: &str = "/auth";
pub const REFRESH_PATH: &str = "/auth/refresh";

const PORTAL_IDENTITY_MISSING: &str =
    "Get access token from portal failed. Please run this app in portal and try again.";

/// Identity resolved from the host portal. Derived fresh per login/restore
/// and never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct PortalIdentity {
    pub portal_token: String,
    pub user_id: String,
    pub org_id: String,
}

impl PortalIdentity {
    pub fn keys(&self) -> TokenKeys {
        TokenKeys::new(&self.org_id, &self.user_id)
    }
}

impl fmt::Debug for PortalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalIdentity")
            .field("portal_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("org_id", &self.org_id)
            .finish()
    }
}

/// Backend access/refresh token pair. Either side may be empty.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionTokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl SessionTokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Both tokens present.
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

impl fmt::Debug for SessionTokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |t: &str| if t.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("SessionTokenPair")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
}

#[derive(Debug, Default)]
struct SessionInner {
    tokens: SessionTokenPair,
    identity: Option<PortalIdentity>,
}

/// Current token pair plus the identity it belongs to.
///
/// Reads and writes take a short lock that is never held across `.await`.
pub struct Session {
    inner: RwLock<SessionInner>,
    store: Arc<dyn TokenStore>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("Session")
            .field("tokens", &inner.tokens)
            .field("identity", &inner.identity)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            inner: RwLock::new(SessionInner::default()),
            store,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        if self.is_logged_in() {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().tokens.is_authenticated()
    }

    pub fn tokens(&self) -> SessionTokenPair {
        self.read().tokens.clone()
    }

    pub fn access_token(&self) -> String {
        self.read().tokens.access_token.clone()
    }

    pub fn refresh_token(&self) -> String {
        self.read().tokens.refresh_token.clone()
    }

    pub fn identity(&self) -> Option<PortalIdentity> {
        self.read().identity.clone()
    }

    /// `Bearer <access token>`, or `None` while there is no access token.
    pub fn authorization_header(&self) -> Option<String> {
        self.bearer_token().map(|token| format!("Bearer {token}"))
    }

    fn install(&self, identity: Option<PortalIdentity>, tokens: SessionTokenPair) {
        let mut inner = self.write();
        inner.identity = identity;
        inner.tokens = tokens;
    }

    /// Swap in a refreshed access token, unless the session moved on while
    /// the refresh was in flight. Returns the owning identity when applied.
    fn replace_access_token(
        &self,
        refreshed_with: &str,
        access_token: String,
    ) -> Option<PortalIdentity> {
        let mut inner = self.write();
        if inner.tokens.refresh_token != refreshed_with {
            return None;
        }
        let identity = inner.identity.clone()?;
        inner.tokens.access_token = access_token;
        Some(identity)
    }

    /// Drop both tokens and purge the persisted pair. Idempotent.
    pub fn invalidate(&self) {
        let identity = {
            let mut inner = self.write();
            inner.tokens = SessionTokenPair::default();
            inner.identity.take()
        };

        if let Some(identity) = identity {
            let keys = identity.keys();
            for key in [keys.access_token(), keys.refresh_token()] {
                if let Err(e) = self.store.remove(&key) {
                    warn!(error = %e, "failed to purge persisted session token");
                }
            }
            info!(
                org_id = %identity.org_id,
                user_id = %identity.user_id,
                "session invalidated"
            );
        }
    }
}

impl UnauthorizedHook for Session {
    fn on_unauthorized(&self) {
        self.invalidate();
    }
}

impl TokenSource for Session {
    fn bearer_token(&self) -> Option<String> {
        let inner = self.read();
        (!inner.tokens.access_token.is_empty()).then(|| inner.tokens.access_token.clone())
    }
}

/// Raised for the lifetime of an operation, lowered on drop.
struct BusyFlag<'a>(&'a AtomicBool);

impl<'a> BusyFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives the session lifecycle against the host portal and the backend.
pub struct SessionTokenManager {
    bridge: Arc<dyn PortalBridge>,
    session: Arc<Session>,
    store: Arc<dyn TokenStore>,
    backend: BackendClient,
    login_guard: tokio::sync::Mutex<()>,
    logging_in: AtomicBool,
    refreshing: AtomicBool,
}

impl fmt::Debug for SessionTokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenManager")
            .field("session", &self.session)
            .field("backend", &self.backend)
            .field("logging_in", &self.is_logging_in())
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}

impl SessionTokenManager {
    /// Wire a manager; the session is registered as the backend's 401 hook.
    pub fn new(
        bridge: Arc<dyn PortalBridge>,
        store: Arc<dyn TokenStore>,
        backend: BackendClient,
    ) -> Self {
        let session = Arc::new(Session::new(store.clone()));
        let backend = backend.with_unauthorized_hook(session.clone());
        Self {
            bridge,
            session,
            store,
            backend,
            login_guard: tokio::sync::Mutex::new(()),
            logging_in: AtomicBool::new(false),
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Backend endpoints authorized with the current access token.
    pub fn api(&self) -> WalletApi<'_> {
        WalletApi::new(&self.backend, self.session.as_ref())
    }

    pub async fn resolve_identity(&self) -> Result<PortalIdentity, AuthError> {
        let auth_info = self.bridge.auth_info().await?;

        let portal_token = auth_info
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::IdentityUnavailable(PORTAL_IDENTITY_MISSING.to_string()))?;
        let user_id = auth_info
            .user_id
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AuthError::IdentityUnavailable(PORTAL_IDENTITY_MISSING.to_string()))?;

        let claims = PortalClaims::decode_unverified(&portal_token).map_err(|_| {
            AuthError::IdentityUnavailable("portal token claims could not be decoded".to_string())
        })?;
        if claims.org_id.is_empty() {
            return Err(AuthError::IdentityUnavailable(
                "portal token carries no org_id".to_string(),
            ));
        }

        Ok(PortalIdentity {
            portal_token,
            user_id,
            org_id: claims.org_id,
        })
    }

    /// Load the persisted pair for the current portal identity.
    ///
    /// A miss is not an error: the session is left logged out.
    pub async fn restore_session(&self) -> Result<SessionState, AuthError> {
        let identity = self.resolve_identity().await?;
        let keys = identity.keys();
        let tokens = SessionTokenPair::new(
            self.store.get(&keys.access_token())?.unwrap_or_default(),
            self.store.get(&keys.refresh_token())?.unwrap_or_default(),
        );

        if tokens.is_authenticated() {
            debug!(org_id = %identity.org_id, user_id = %identity.user_id, "session restored");
            self.session.install(Some(identity), tokens);
        } else {
            debug!(org_id = %identity.org_id, user_id = %identity.user_id, "no persisted session");
            self.session.install(None, SessionTokenPair::default());
        }
        Ok(self.session.state())
    }

    /// Exchange the portal token for a backend session. Never retried.
    pub async fn login(&self) -> Result<(), AuthError> {
        let _guard = self.login_guard.lock().await;
        let _busy = BusyFlag::raise(&self.logging_in);

        let identity = self.resolve_identity().await?;
        let request = LoginRequest {
            token: identity.portal_token.clone(),
        };
        let response: LoginResponse = self
            .backend
            .post(LOGIN_PATH, &request, None)
            .await
            .map_err(|e| AuthError::LoginFailed(e.to_string()))?;

        if response.token.is_empty() || response.refresh_token.is_empty() {
            return Err(AuthError::LoginFailed(
                "backend returned an empty token".to_string(),
            ));
        }

        let keys = identity.keys();
        self.store.set(&keys.access_token(), &response.token)?;
        self.store.set(&keys.refresh_token(), &response.refresh_token)?;

        info!(org_id = %identity.org_id, user_id = %identity.user_id, "session established");
        self.session.install(
            Some(identity),
            SessionTokenPair::new(response.token, response.refresh_token),
        );
        Ok(())
    }

    /// Replace the access token using the refresh token.
    ///
    /// Returns `Ok(false)` without a request when there is no refresh token.
    pub async fn refresh(&self) -> Result<bool, AuthError> {
        let _guard = self.login_guard.lock().await;

        let refresh_token = self.session.refresh_token();
        if refresh_token.is_empty() {
            return Ok(false);
        }
        let _busy = BusyFlag::raise(&self.refreshing);

        let request = RefreshRequest {
            refresh_token: refresh_token.clone(),
        };
        let bearer = self.session.bearer_token();
        let response: RefreshResponse = self
            .backend
            .post(REFRESH_PATH, &request, bearer.as_deref())
            .await
            .map_err(|e| match e {
                ClientError::AuthorizationExpired => AuthError::AuthorizationExpired,
                other => AuthError::RefreshFailed(other.to_string()),
            })?;

        if response.token.is_empty() {
            return Err(AuthError::RefreshFailed(
                "backend returned an empty token".to_string(),
            ));
        }

        match self
            .session
            .replace_access_token(&refresh_token, response.token.clone())
        {
            Some(identity) => {
                self.store
                    .set(&identity.keys().access_token(), &response.token)?;
                info!(org_id = %identity.org_id, user_id = %identity.user_id, "access token refreshed");
            }
            None => {
                debug!("session changed during refresh, discarding refreshed token");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Forget the session after the backend rejected it.
    pub fn on_unauthorized(&self) {
        self.session.invalidate();
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    pub fn access_token(&self) -> String {
        self.session.access_token()
    }

    pub fn refresh_token(&self) -> String {
        self.session.refresh_token()
    }

    pub fn identity(&self) -> Option<PortalIdentity> {
        self.session.identity()
    }

    pub fn authorization_header(&self) -> Option<String> {
        self.session.authorization_header()
    }

    pub fn is_logging_in(&self) -> bool {
        self.logging_in.load(Ordering::SeqCst)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }
}
