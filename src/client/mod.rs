// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Backend Client
//!
//! [`BackendClient`] is a thin facade over `reqwest` for the custodial wallet
//! backend. It holds no credentials: the bearer token is an explicit
//! per-request argument, supplied by whoever owns the session (see
//! [`TokenSource`]).
//!
//! Any 401 response invokes the registered [`UnauthorizedHook`] exactly once
//! for that response, then surfaces [`ClientError::AuthorizationExpired`].
//! No request is ever retried.
//!
//! Endpoint wrappers live in [`wallets`] and [`transactions`] as methods on
//! [`WalletApi`].

pub mod error;
pub mod latest;
pub mod transactions;
pub mod wallets;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::models::QueryParams;

pub use error::ClientError;
pub use latest::LatestSlot;
pub use wallets::{WalletPage, WalletPager};

/// Called when the backend rejects the caller's credentials.
pub trait UnauthorizedHook: Send + Sync {
    fn on_unauthorized(&self);
}

/// Supplies the bearer token for one outgoing request.
///
/// Implementations must return the value current at call time; callers do
/// not cache it beyond a single request.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    http: Client,
    on_unauthorized: Option<Arc<dyn UnauthorizedHook>>,
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .field("has_unauthorized_hook", &self.on_unauthorized.is_some())
            .finish()
    }
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            http,
            on_unauthorized: None,
        })
    }

    pub fn with_unauthorized_hook(mut self, hook: Arc<dyn UnauthorizedHook>) -> Self {
        self.on_unauthorized = Some(hook);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Dispatch one request and decode the JSON response.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        params: Option<&QueryParams>,
        bearer: Option<&str>,
    ) -> Result<T, ClientError> {
        let mut builder = self.http.request(method.clone(), self.url(path));
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            builder = builder.query(params.pairs());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(token) = bearer.filter(|t| !t.is_empty()) {
            builder = builder.bearer_auth(token);
        }

        debug!(%method, path, "backend request");
        let response = builder.send().await.map_err(|e| {
            error!(%method, path, error = %e, "API request error");
            ClientError::Request(format!("{method} {path} failed: {e}"))
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(%method, path, "Auth failed. Please login and try again");
            if let Some(hook) = &self.on_unauthorized {
                hook.on_unauthorized();
            }
            return Err(ClientError::AuthorizationExpired);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%method, path, status = status.as_u16(), "API request error");
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| {
            ClientError::InvalidResponse(format!("{method} {path} invalid JSON: {e}"))
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&QueryParams>,
        bearer: Option<&str>,
    ) -> Result<T, ClientError> {
        self.request(Method::GET, path, None, params, bearer).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B, bearer: Option<&str>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| ClientError::InvalidResponse(format!("serialize body failed: {e}")))?;
        self.request(Method::POST, path, Some(&body), None, bearer)
            .await
    }
}

/// Backend endpoints bound to a token source.
///
/// The token is read once per call, immediately before dispatch.
pub struct WalletApi<'a> {
    backend: &'a BackendClient,
    tokens: &'a dyn TokenSource,
}

impl<'a> WalletApi<'a> {
    pub fn new(backend: &'a BackendClient, tokens: &'a dyn TokenSource) -> Self {
        Self { backend, tokens }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        params: Option<&QueryParams>,
    ) -> Result<T, ClientError> {
        let token = self.tokens.bearer_token();
        self.backend
            .request(method, path, body, params, token.as_deref())
            .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&QueryParams>,
    ) -> Result<T, ClientError> {
        self.call(Method::GET, path, None, params).await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| ClientError::InvalidResponse(format!("serialize body failed: {e}")))?;
        self.call(Method::POST, path, Some(&body), None).await
    }
}
