// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Host portal bridge.
//!
//! The dashboard runs embedded in a host portal which owns the user's login.
//! [`PortalBridge`] is the narrow surface the session needs from it: the
//! current auth info and locale change notifications.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::AuthError;

/// Auth info handed over by the host. Either field may be missing.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAuthInfo {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "userID")]
    pub user_id: Option<String>,
}

impl fmt::Debug for HostAuthInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostAuthInfo")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

pub type LocaleListener = Arc<dyn Fn(&str) + Send + Sync>;

#[async_trait]
pub trait PortalBridge: Send + Sync {
    async fn auth_info(&self) -> Result<HostAuthInfo, AuthError>;

    /// Register `listener` for locale changes until the returned
    /// subscription is dropped or unsubscribed.
    fn on_locale_change(&self, listener: LocaleListener) -> LocaleSubscription;
}

/// Handle to a registered locale listener.
#[must_use = "dropping the subscription removes the listener"]
pub struct LocaleSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl LocaleSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to remove.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for LocaleSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for LocaleSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocaleSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Default)]
struct BridgeState {
    auth_info: HostAuthInfo,
    locale: Option<String>,
    listeners: BTreeMap<u64, LocaleListener>,
    next_listener_id: u64,
}

/// In-process bridge with settable auth info and locale.
#[derive(Clone, Default)]
pub struct StaticPortalBridge {
    state: Arc<Mutex<BridgeState>>,
}

impl fmt::Debug for StaticPortalBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("StaticPortalBridge")
            .field("auth_info", &state.auth_info)
            .field("locale", &state.locale)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl StaticPortalBridge {
    pub fn new(token: Option<String>, user_id: Option<String>) -> Self {
        let bridge = Self::default();
        bridge.set_auth_info(HostAuthInfo { token, user_id });
        bridge
    }

    /// A bridge whose host has no logged-in user.
    pub fn detached() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_auth_info(&self, auth_info: HostAuthInfo) {
        self.lock().auth_info = auth_info;
    }

    pub fn locale(&self) -> Option<String> {
        self.lock().locale.clone()
    }

    /// Update the locale and notify every listener.
    pub fn set_locale(&self, locale: impl Into<String>) {
        let locale = locale.into();
        let listeners: Vec<LocaleListener> = {
            let mut state = self.lock();
            state.locale = Some(locale.clone());
            state.listeners.values().cloned().collect()
        };
        debug!(%locale, listeners = listeners.len(), "portal locale changed");
        for listener in listeners {
            listener(&locale);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

#[async_trait]
impl PortalBridge for StaticPortalBridge {
    async fn auth_info(&self) -> Result<HostAuthInfo, AuthError> {
        Ok(self.lock().auth_info.clone())
    }

    fn on_locale_change(&self, listener: LocaleListener) -> LocaleSubscription {
        let id = {
            let mut state = self.lock();
            let id = state.next_listener_id;
            state.next_listener_id += 1;
            state.listeners.insert(id, listener);
            id
        };

        let weak: Weak<Mutex<BridgeState>> = Arc::downgrade(&self.state);
        LocaleSubscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .remove(&id);
            }
        })
    }
}
